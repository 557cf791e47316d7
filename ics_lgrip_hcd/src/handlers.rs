//! Command handlers for the lgrip HCD.

use crate::hardware::GripperSim;
use crate::{ANGLE_RANGE, POSITION_RANGE};
use ics_common::prelude::*;
use ics_framework::{ComponentContext, ComponentHandlers, UtcTime};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Worker poll interval for the cooperative cancel flag.
const MOTION_SLICE: Duration = Duration::from_millis(10);

/// Handlers for the linear grism gripper HCD.
pub struct LgripHandlers {
    /// Device handle; shared only with this instance's motion workers.
    sim: Arc<Mutex<GripperSim>>,
    /// Cooperative cancel flags of in-flight motions.
    inflight: HashMap<RunId, Arc<AtomicBool>>,
}

impl LgripHandlers {
    pub fn new() -> Self {
        Self {
            sim: Arc::new(Mutex::new(GripperSim::new())),
            inflight: HashMap::new(),
        }
    }

    /// Readback of the simulated mechanism (for tests and telemetry).
    pub fn sim_handle(&self) -> Arc<Mutex<GripperSim>> {
        self.sim.clone()
    }

    fn diagnostic_safe(name: &str) -> bool {
        matches!(name, "read" | "stop")
    }

    /// Range-checked float parameter lookup.
    fn checked_float(
        run_id: RunId,
        command: &Command,
        key: &str,
        range: std::ops::RangeInclusive<f64>,
    ) -> Result<f64, ValidationResult> {
        let Some(value) = command.float_param(key) else {
            return Err(ValidationResult::Invalid(
                run_id,
                CommandIssue::MissingParameter(key.to_string()),
            ));
        };
        if !range.contains(&value) {
            return Err(ValidationResult::Invalid(
                run_id,
                CommandIssue::ParameterOutOfRange {
                    key: key.to_string(),
                    detail: format!("must be within {:?}..={:?}", range.start(), range.end()),
                },
            ));
        }
        Ok(value)
    }

    /// Flag every in-flight motion for cancellation. The workers observe
    /// the flag at the next slice and report `Cancelled`.
    fn abort_motion(&mut self) {
        for flag in self.inflight.values() {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// Start a motion worker for `run_id`, reporting through the
    /// completion channel once the travel time has elapsed.
    fn start_motion(
        &mut self,
        ctx: &ComponentContext,
        run_id: RunId,
        travel: Duration,
        settle: impl FnOnce(&mut GripperSim) + Send + 'static,
    ) -> SubmitResponse {
        // Entries of finished workers are only referenced here anymore.
        self.inflight.retain(|_, f| Arc::strong_count(f) > 1);

        let flag = Arc::new(AtomicBool::new(false));
        self.inflight.insert(run_id, flag.clone());
        let sim = self.sim.clone();
        let completion = ctx.completion();
        tokio::spawn(async move {
            let mut elapsed = Duration::ZERO;
            while elapsed < travel {
                let slice = MOTION_SLICE.min(travel - elapsed);
                tokio::time::sleep(slice).await;
                elapsed += slice;
                if flag.load(Ordering::SeqCst) {
                    completion.update(SubmitResponse::Cancelled(run_id));
                    return;
                }
            }
            settle(&mut sim.lock());
            completion.update(SubmitResponse::Completed(run_id));
        });
        SubmitResponse::Started(run_id)
    }
}

impl Default for LgripHandlers {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentHandlers for LgripHandlers {
    fn initialize(&mut self, ctx: &ComponentContext) -> Result<(), CommandError> {
        info!(component = %ctx.id(), "connecting gripper mechanism");
        self.sim
            .lock()
            .connect()
            .map_err(CommandError::FatalInit)?;
        Ok(())
    }

    fn validate_command(
        &mut self,
        ctx: &ComponentContext,
        run_id: RunId,
        command: &Command,
    ) -> ValidationResult {
        if ctx.run_mode() == RunMode::Diagnostic && !Self::diagnostic_safe(&command.name) {
            return ValidationResult::Invalid(run_id, CommandIssue::DiagnosticRestricted);
        }
        match command.name.as_str() {
            "rotate" => match Self::checked_float(run_id, command, "angle", ANGLE_RANGE) {
                Ok(_) => ValidationResult::Accepted(run_id),
                Err(invalid) => invalid,
            },
            "move" => match Self::checked_float(run_id, command, "position", POSITION_RANGE) {
                Ok(_) => ValidationResult::Accepted(run_id),
                Err(invalid) => invalid,
            },
            "stop" | "read" => ValidationResult::Accepted(run_id),
            other => {
                ValidationResult::Invalid(run_id, CommandIssue::UnknownCommand(other.to_string()))
            }
        }
    }

    fn on_submit(
        &mut self,
        ctx: &ComponentContext,
        run_id: RunId,
        command: &Command,
    ) -> SubmitResponse {
        match command.name.as_str() {
            "rotate" => {
                // Validation guarantees presence and range.
                let Some(angle) = command.float_param("angle") else {
                    return SubmitResponse::Error(run_id, "angle parameter vanished".into());
                };
                let travel = self.sim.lock().rotation_travel_time(angle);
                info!(component = %ctx.id(), %run_id, angle, travel_ms = travel.as_millis() as u64,
                      "rotation started");
                self.start_motion(ctx, run_id, travel, move |sim| sim.settle_angle(angle))
            }
            "move" => {
                let Some(position) = command.float_param("position") else {
                    return SubmitResponse::Error(run_id, "position parameter vanished".into());
                };
                let travel = self.sim.lock().linear_travel_time(position);
                info!(component = %ctx.id(), %run_id, position, travel_ms = travel.as_millis() as u64,
                      "linear move started");
                self.start_motion(ctx, run_id, travel, move |sim| sim.settle_position(position))
            }
            "stop" => {
                info!(component = %ctx.id(), %run_id, "stop: aborting in-flight motion");
                self.abort_motion();
                SubmitResponse::Completed(run_id)
            }
            "read" => {
                let sim = self.sim.lock();
                info!(component = %ctx.id(), %run_id,
                      position_mm = sim.position_mm(), angle_deg = sim.angle_deg(),
                      "mechanism readback");
                SubmitResponse::Completed(run_id)
            }
            other => SubmitResponse::Error(run_id, format!("unvalidated command '{other}'")),
        }
    }

    fn on_oneway(&mut self, ctx: &ComponentContext, run_id: RunId, command: &Command) {
        // Same effects as submit; the outcome is observable via log only.
        if let SubmitResponse::Error(_, msg) = self.on_submit(ctx, run_id, command) {
            warn!(component = %ctx.id(), %run_id, command = %command.name,
                  "oneway failed: {msg}");
        }
    }

    fn on_cancel(&mut self, ctx: &ComponentContext, run_id: RunId) {
        if let Some(flag) = self.inflight.get(&run_id) {
            info!(component = %ctx.id(), %run_id, "cancelling motion");
            flag.store(true, Ordering::SeqCst);
        }
    }

    fn on_go_online(&mut self, ctx: &ComponentContext) {
        info!(component = %ctx.id(), "online");
    }

    fn on_go_offline(&mut self, ctx: &ComponentContext) {
        info!(component = %ctx.id(), "offline");
    }

    fn on_diagnostic_mode(&mut self, ctx: &ComponentContext, start_time: UtcTime, hint: &str) {
        info!(component = %ctx.id(), start_us = start_time.as_epoch_micros(), hint,
              "diagnostic mode");
    }

    fn on_operations_mode(&mut self, ctx: &ComponentContext) {
        info!(component = %ctx.id(), "operations mode");
    }

    fn on_shutdown(&mut self, ctx: &ComponentContext) {
        self.abort_motion();
        self.sim.lock().disconnect();
        info!(component = %ctx.id(), "gripper mechanism disconnected");
    }
}
