//! Command error taxonomy.
//!
//! All non-fatal classes are recovered locally and surfaced as response
//! values correlated to the originating run id; only [`CommandError::FatalInit`]
//! aborts a component instead of producing a response.

use crate::component::ComponentId;
use crate::response::CommandIssue;
use thiserror::Error;

/// Errors in the command pipeline.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// Malformed, out-of-range, or mode-disallowed command.
    /// Reported synchronously as `Invalid`, never thrown.
    #[error("validation failed: {0}")]
    Validation(#[from] CommandIssue),

    /// Hardware or sub-command failure during execution.
    #[error("execution failed: {0}")]
    Execution(String),

    /// A tracked deadline elapsed before the terminal response arrived.
    #[error("no terminal response within {after_ms} ms")]
    Timeout {
        /// The deadline that elapsed.
        after_ms: u64,
    },

    /// The addressed peer is currently untracked.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(ComponentId),

    /// The addressed component instance is not running (queue closed).
    #[error("component {0} is not running")]
    ComponentDown(ComponentId),

    /// Initialization failed; the component never reaches Running.
    #[error("initialization failed: {0}")]
    FatalInit(String),
}
