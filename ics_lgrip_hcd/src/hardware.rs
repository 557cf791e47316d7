//! Simulated gripper mechanism.
//!
//! Stands in for the hardware link an HCD would own exclusively. Motion
//! takes wall-clock time proportional to travel distance so the
//! long-running command shape (`Started` → worker → `Completed`) is
//! exercised for real.

use std::time::Duration;

/// Linear axis slew rate in mm/s.
const LINEAR_RATE_MM_S: f64 = 20.0;

/// Rotation slew rate in deg/s.
const ROTATION_RATE_DEG_S: f64 = 90.0;

/// Simulated state of the gripper mechanism.
#[derive(Debug, Clone)]
pub struct GripperSim {
    connected: bool,
    position_mm: f64,
    angle_deg: f64,
}

impl GripperSim {
    /// A parked, disconnected mechanism.
    pub const fn new() -> Self {
        Self {
            connected: false,
            position_mm: 0.0,
            angle_deg: 0.0,
        }
    }

    /// Establish the (simulated) hardware link.
    ///
    /// # Errors
    /// Always succeeds in simulation; real drivers report link failures
    /// here, which the component surfaces as fatal init errors.
    pub fn connect(&mut self) -> Result<(), String> {
        self.connected = true;
        Ok(())
    }

    /// Drop the hardware link.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub const fn position_mm(&self) -> f64 {
        self.position_mm
    }

    pub const fn angle_deg(&self) -> f64 {
        self.angle_deg
    }

    /// Time to slew the linear axis to `target` from the current position.
    pub fn linear_travel_time(&self, target: f64) -> Duration {
        Duration::from_secs_f64((target - self.position_mm).abs() / LINEAR_RATE_MM_S)
    }

    /// Time to slew the rotation axis to `target` from the current angle.
    pub fn rotation_travel_time(&self, target: f64) -> Duration {
        Duration::from_secs_f64((target - self.angle_deg).abs() / ROTATION_RATE_DEG_S)
    }

    /// Record the linear axis as arrived at `target`.
    pub fn settle_position(&mut self, target: f64) {
        self.position_mm = target;
    }

    /// Record the rotation axis as arrived at `target`.
    pub fn settle_angle(&mut self, target: f64) {
        self.angle_deg = target;
    }
}

impl Default for GripperSim {
    fn default() -> Self {
        Self::new()
    }
}
