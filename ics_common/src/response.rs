//! Validation and submit response types.
//!
//! [`ValidationResult`] is produced synchronously before a command may run.
//! [`SubmitResponse`] carries the outcome of execution; `Started` is the
//! only non-final variant and promises a later final response on the
//! completion channel, correlated by the same [`RunId`].

use crate::command::RunId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a command failed validation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CommandIssue {
    /// Command name not handled by this component.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A required parameter is absent or has the wrong type.
    #[error("missing or ill-typed parameter '{0}'")]
    MissingParameter(String),

    /// A parameter value is outside its permitted range.
    #[error("parameter '{key}' out of range: {detail}")]
    ParameterOutOfRange {
        /// Offending parameter key.
        key: String,
        /// Human-readable range description.
        detail: String,
    },

    /// Component is Offline; no submission accepted.
    #[error("component is offline")]
    ComponentOffline,

    /// Command is not diagnostic-safe and the component is in Diagnostic mode.
    #[error("command not permitted in diagnostic mode")]
    DiagnosticRestricted,

    /// Component lifecycle state does not accept command traffic.
    #[error("component not accepting commands ({0})")]
    WrongComponentState(String),

    /// The run id was already resolved; re-submission is rejected.
    #[error("run id already resolved")]
    AlreadyResolved,

    /// The run id is still executing; re-submission is rejected.
    #[error("run id already in flight")]
    AlreadyInFlight,
}

/// Synchronous validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationResult {
    /// The command may run.
    Accepted(RunId),
    /// The command is rejected; it never executes.
    Invalid(RunId, CommandIssue),
}

impl ValidationResult {
    /// The correlated run id.
    pub const fn run_id(&self) -> RunId {
        match self {
            ValidationResult::Accepted(id) | ValidationResult::Invalid(id, _) => *id,
        }
    }

    /// True for `Accepted`.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted(_))
    }
}

/// Execution outcome of a submitted command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmitResponse {
    /// Long-running command accepted; final response follows asynchronously.
    Started(RunId),
    /// Command finished successfully.
    Completed(RunId),
    /// Command failed; the message is the human-readable cause.
    Error(RunId, String),
    /// Command was cancelled before completion.
    Cancelled(RunId),
}

impl SubmitResponse {
    /// The correlated run id.
    pub const fn run_id(&self) -> RunId {
        match self {
            SubmitResponse::Started(id)
            | SubmitResponse::Completed(id)
            | SubmitResponse::Error(id, _)
            | SubmitResponse::Cancelled(id) => *id,
        }
    }

    /// True for every variant except `Started`.
    pub const fn is_final(&self) -> bool {
        !matches!(self, SubmitResponse::Started(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_is_only_non_final_variant() {
        let id = RunId::next();
        assert!(!SubmitResponse::Started(id).is_final());
        assert!(SubmitResponse::Completed(id).is_final());
        assert!(SubmitResponse::Error(id, "boom".into()).is_final());
        assert!(SubmitResponse::Cancelled(id).is_final());
    }

    #[test]
    fn test_run_id_correlation() {
        let id = RunId::next();
        assert_eq!(SubmitResponse::Completed(id).run_id(), id);
        assert_eq!(
            ValidationResult::Invalid(id, CommandIssue::ComponentOffline).run_id(),
            id
        );
    }

    #[test]
    fn test_issue_messages_are_operator_readable() {
        let issue = CommandIssue::ParameterOutOfRange {
            key: "angle".into(),
            detail: "must be within 0..=360".into(),
        };
        assert_eq!(
            issue.to_string(),
            "parameter 'angle' out of range: must be within 0..=360"
        );
    }
}
