//! Injectable time source.
//!
//! `onDiagnosticMode` carries a start instant supplied by the caller; the
//! runtime itself stamps events through a [`TimeSource`] so tests can
//! substitute a fixed clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UtcTime(SystemTime);

impl UtcTime {
    /// Wrap a raw `SystemTime`.
    pub const fn from_system(t: SystemTime) -> Self {
        Self(t)
    }

    /// The underlying `SystemTime`.
    pub const fn as_system(&self) -> SystemTime {
        self.0
    }

    /// Microseconds since the Unix epoch (for logging).
    pub fn as_epoch_micros(&self) -> u64 {
        self.0
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_micros() as u64
    }
}

/// Supplies the current instant. Injectable for testability.
pub trait TimeSource: Send + Sync {
    /// Current UTC instant.
    fn utc_now(&self) -> UtcTime;
}

/// Production time source backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn utc_now(&self) -> UtcTime {
        UtcTime(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_source_is_monotonic_enough() {
        let src = SystemTimeSource;
        let a = src.utc_now();
        let b = src.utc_now();
        assert!(b >= a);
    }

    #[test]
    fn test_epoch_micros() {
        let t = UtcTime::from_system(UNIX_EPOCH + Duration::from_micros(42));
        assert_eq!(t.as_epoch_micros(), 42);
    }
}
