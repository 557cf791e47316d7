//! ICS Common Library
//!
//! This crate provides the shared command protocol types used by every
//! crate in the WFOS ICS workspace: the command data model, validation and
//! submit responses, component identity and tracking events, operating
//! modes, the component lifecycle state machine, the error taxonomy, and
//! configuration loading utilities.
//!
//! # Module Structure
//!
//! - [`command`] - Commands, parameters, and run identifiers
//! - [`response`] - Validation and submit response types
//! - [`component`] - Component identity and location tracking events
//! - [`mode`] - Online/Offline and Operations/Diagnostic modes
//! - [`lifecycle`] - Component lifecycle state machine
//! - [`error`] - Command error taxonomy
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use ics_common::prelude::*;
//!
//! let target = ComponentId::hcd("wfos.lgrip");
//! let cmd = Command::new(target, "rotate").with_param("angle", ParamValue::Float(30.0));
//! assert_eq!(cmd.float_param("angle"), Some(30.0));
//! ```

pub mod command;
pub mod component;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mode;
pub mod prelude;
pub mod response;
