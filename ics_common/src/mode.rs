//! Operating modes.
//!
//! A running component carries two independent mode axes:
//!
//! - [`OperatingMode`]: Online components accept command submission,
//!   Offline components reject everything at validation.
//! - [`RunMode`]: Diagnostic mode restricts validation to the
//!   diagnostic-safe command subset; Operations is unrestricted.

use serde::{Deserialize, Serialize};

/// Online/Offline axis. Commands are only accepted while Online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Accepting command submission.
    #[default]
    Online,
    /// Rejecting all command submission at validation time.
    Offline,
}

impl OperatingMode {
    /// True while Online.
    #[inline]
    pub const fn is_online(&self) -> bool {
        matches!(self, OperatingMode::Online)
    }
}

/// Operations/Diagnostic axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Normal operation, all commands permitted.
    #[default]
    Operations,
    /// Maintenance/test mode; only diagnostic-safe commands permitted.
    Diagnostic,
}
