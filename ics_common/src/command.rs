//! Command data model.
//!
//! A [`Command`] is an immutable, named request addressed to a component,
//! carrying an ordered list of typed parameters. Each submission of a
//! command is correlated end-to-end by a [`RunId`] that is unique for the
//! lifetime of the invocation: the same id appears in the validation
//! response, the initial submit response, and the final completion.

use crate::component::ComponentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation identifier for one command invocation.
///
/// Allocated from a process-wide counter; never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(u64);

impl RunId {
    /// Allocate the next unique run id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value (for logging and test assertions).
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RID-{}", self.0)
    }
}

/// Typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValue {
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Boolean flag.
    Bool(bool),
}

/// A single `(key, typed value)` command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter key, unique within one command.
    pub key: String,
    /// Typed value.
    pub value: ParamValue,
}

/// An immutable command request.
///
/// The wire representation of commands is owned by the outer protocol
/// layer; the serde derives are the boundary contract, nothing here
/// defines a bit-level format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command name, e.g. `"rotate"`.
    pub name: String,
    /// Component the command is addressed to.
    pub target: ComponentId,
    /// Ordered parameter list.
    pub params: Vec<Parameter>,
}

impl Command {
    /// Create a command with no parameters.
    pub fn new(target: ComponentId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target,
            params: Vec::new(),
        }
    }

    /// Append a parameter (builder style).
    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.params.push(Parameter {
            key: key.into(),
            value,
        });
        self
    }

    /// Look up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    /// Float parameter by key. Integer values coerce to float so that
    /// `angle=30` and `angle=30.0` validate identically.
    pub fn float_param(&self, key: &str) -> Option<f64> {
        match self.param(key)? {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer parameter by key (no coercion).
    pub fn int_param(&self, key: &str) -> Option<i64> {
        match self.param(key)? {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String parameter by key.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        match self.param(key)? {
            ParamValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Boolean parameter by key.
    pub fn bool_param(&self, key: &str) -> Option<bool> {
        match self.param(key)? {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_unique_and_monotonic() {
        let a = RunId::next();
        let b = RunId::next();
        assert!(b > a, "run ids must be strictly increasing: {a} vs {b}");
    }

    #[test]
    fn test_run_id_display() {
        let id = RunId::next();
        assert_eq!(format!("{id}"), format!("RID-{}", id.as_u64()));
    }

    #[test]
    fn test_param_lookup_and_order() {
        let cmd = Command::new(ComponentId::hcd("wfos.lgrip"), "rotate")
            .with_param("angle", ParamValue::Float(30.0))
            .with_param("fast", ParamValue::Bool(true));

        assert_eq!(cmd.float_param("angle"), Some(30.0));
        assert_eq!(cmd.bool_param("fast"), Some(true));
        assert_eq!(cmd.param("missing"), None);
        // Parameter order is preserved.
        assert_eq!(cmd.params[0].key, "angle");
        assert_eq!(cmd.params[1].key, "fast");
    }

    #[test]
    fn test_int_coerces_to_float_only() {
        let cmd = Command::new(ComponentId::hcd("wfos.lgrip"), "rotate")
            .with_param("angle", ParamValue::Int(30));

        assert_eq!(cmd.float_param("angle"), Some(30.0));
        // Strict accessors do not coerce.
        assert_eq!(cmd.int_param("angle"), Some(30));
        assert_eq!(cmd.str_param("angle"), None);
    }
}
