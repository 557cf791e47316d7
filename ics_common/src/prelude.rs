//! Prelude module for common re-exports.
//!
//! Consumers can `use ics_common::prelude::*;` and get the protocol
//! types without listing individual paths.

// ─── Command Protocol ───────────────────────────────────────────────
pub use crate::command::{Command, ParamValue, Parameter, RunId};
pub use crate::response::{CommandIssue, SubmitResponse, ValidationResult};

// ─── Components & Tracking ──────────────────────────────────────────
pub use crate::component::{ComponentId, ComponentKind, TrackingEvent, TrackingStatus};

// ─── Modes & Lifecycle ──────────────────────────────────────────────
pub use crate::lifecycle::{LifecycleMachine, LifecycleState, LifecycleTransition};
pub use crate::mode::{OperatingMode, RunMode};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::CommandError;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

/// Default deadline for a composite command's sub-command completion.
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 5_000;
