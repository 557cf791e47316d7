//! Assembly configuration.
//!
//! # TOML Example
//!
//! ```toml
//! submit_timeout_ms = 5000
//! grippers = ["wfos.lgrip1", "wfos.lgrip2"]
//!
//! [shared]
//! log_level = "info"
//! component_name = "wfos.bgrx"
//! ```

use ics_common::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of the bgrx assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BgrxConfig {
    /// Common fields (log level, component name).
    pub shared: SharedConfig,

    /// Deadline for a composite command's sub-commands to all complete.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,

    /// Instance names of the gripper HCDs this assembly coordinates.
    pub grippers: Vec<String>,
}

fn default_submit_timeout_ms() -> u64 {
    DEFAULT_SUBMIT_TIMEOUT_MS
}

impl BgrxConfig {
    /// Config for an in-process simulated setup (tests and the demo
    /// container).
    pub fn simulated(grippers: &[&str]) -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                component_name: "wfos.bgrx".to_string(),
            },
            submit_timeout_ms: DEFAULT_SUBMIT_TIMEOUT_MS,
            grippers: grippers.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the sub-command deadline.
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// The sub-command deadline as a `Duration`.
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - the shared section fails validation
    /// - `submit_timeout_ms` is zero
    /// - `grippers` is empty or contains duplicates
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.submit_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "submit_timeout_ms must be nonzero".to_string(),
            ));
        }
        if self.grippers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one gripper HCD must be configured".to_string(),
            ));
        }
        let mut names = self.grippers.clone();
        names.sort();
        names.dedup();
        if names.len() != self.grippers.len() {
            return Err(ConfigError::Invalid(
                "duplicate gripper names".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "submit_timeout_ms = 250\ngrippers = [\"wfos.lgrip1\"]\n\n\
             [shared]\nlog_level = \"debug\"\ncomponent_name = \"wfos.bgrx\""
        )
        .unwrap();

        let config = BgrxConfig::load(file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.submit_timeout(), Duration::from_millis(250));
        assert_eq!(config.grippers, vec!["wfos.lgrip1"]);
    }

    #[test]
    fn test_timeout_defaults_when_absent() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "grippers = [\"wfos.lgrip1\"]\n\n[shared]\ncomponent_name = \"wfos.bgrx\""
        )
        .unwrap();

        let config = BgrxConfig::load(file.path()).unwrap();
        assert_eq!(config.submit_timeout_ms, DEFAULT_SUBMIT_TIMEOUT_MS);
    }

    #[test]
    fn test_rejects_empty_and_duplicate_grippers() {
        let mut config = BgrxConfig::simulated(&[]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(_))
        ));

        config = BgrxConfig::simulated(&["wfos.lgrip1", "wfos.lgrip1"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config =
            BgrxConfig::simulated(&["wfos.lgrip1"]).with_submit_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }
}
