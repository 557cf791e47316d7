//! Configuration loading.
//!
//! Every deployable in this workspace reads one TOML file: a `[shared]`
//! table with the fields below, plus whatever the application defines at
//! the top level. [`ConfigLoader`] gives any deserializable config struct
//! a `load` constructor with uniform error reporting, so the container
//! can print one line and exit on a bad deployment.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure while locating, parsing, or vetting a config file.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("config file missing: {}", .0.display())]
    Missing(PathBuf),

    /// File exists but could not be read or parsed as TOML.
    #[error("config unreadable: {0}")]
    Parse(String),

    /// Syntactically fine, semantically rejected.
    #[error("config rejected: {0}")]
    Invalid(String),
}

/// Verbosity of the tracing subscriber, settable per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string accepted by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// The `[shared]` table carried by every ICS config.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// component_name = "wfos.bgrx"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity for this deployment.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Subsystem-qualified instance name, e.g. `wfos.bgrx`.
    pub component_name: String,
}

impl SharedConfig {
    /// Check the instance naming rules.
    ///
    /// # Errors
    /// `ConfigError::Invalid` unless `component_name` is a
    /// subsystem-qualified name like `wfos.bgrx`: lowercase, dotted, no
    /// whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.component_name;
        if name.is_empty() {
            return Err(ConfigError::Invalid("component_name is empty".to_string()));
        }
        if !name.contains('.') || name.chars().any(|c| c.is_whitespace() || c.is_uppercase()) {
            return Err(ConfigError::Invalid(format!(
                "component_name '{name}' is not a subsystem-qualified name like 'wfos.bgrx'"
            )));
        }
        Ok(())
    }
}

/// Uniform TOML loading for config structs.
///
/// Blanket-implemented for every `DeserializeOwned` type; application
/// configs embed [`SharedConfig`] and call their own `validate` after
/// loading.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and deserialize one TOML file.
    ///
    /// # Errors
    /// `ConfigError::Missing` when there is no file at `path`;
    /// `ConfigError::Parse` for I/O or TOML failures, with the path named
    /// in the message.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Parse(e.to_string())),
        };
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
    }

    /// `load` for the conventional `<config-dir>/<file>` layout.
    fn load_from_dir(dir: &Path, file_name: &str) -> Result<Self, ConfigError> {
        Self::load(&dir.join(file_name))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
