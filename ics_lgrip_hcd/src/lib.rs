//! lgrip HCD
//!
//! Leaf component driving the WFOS linear grism gripper mechanism. The
//! physical device is simulated; the command contract is real:
//!
//! | Command  | Parameters                  | Shape        | Diagnostic-safe |
//! |----------|-----------------------------|--------------|-----------------|
//! | `rotate` | `angle` ∈ 0.0..=360.0 deg   | long-running | no              |
//! | `move`   | `position` ∈ 0.0..=120.0 mm | long-running | no              |
//! | `stop`   | none                        | immediate    | yes             |
//! | `read`   | none                        | immediate    | yes             |
//!
//! Long-running commands return `Started` and complete through the
//! component's completion channel; cancellation is cooperative via a
//! per-run flag checked by the motion worker.

pub mod handlers;
pub mod hardware;

pub use handlers::LgripHandlers;
pub use hardware::GripperSim;

/// Permitted rotation range in degrees.
pub const ANGLE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=360.0;

/// Permitted linear travel range in millimetres.
pub const POSITION_RANGE: std::ops::RangeInclusive<f64> = 0.0..=120.0;
