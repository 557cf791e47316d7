//! Command handlers for the bgrx assembly.
//!
//! The pending-set bookkeeping is lock-free by construction: every entry
//! point runs on the component's single message queue, and sub-command
//! completions re-enter that same queue.

use crate::config::BgrxConfig;
use ics_common::prelude::*;
use ics_framework::{ComponentContext, ComponentHandlers, ComponentRef, UtcTime};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Rotation range accepted for `moveGrism`, mirroring the gripper HCDs.
const GRISM_ANGLE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=360.0;

/// Bookkeeping for one in-flight composite command.
struct PendingCommand {
    /// Sub run id → addressed gripper, removed as terminal responses land.
    subs: HashMap<RunId, ComponentId>,
}

/// Handlers for the blue grism exchange assembly.
pub struct BgrxHandlers {
    config: BgrxConfig,
    grippers: Vec<ComponentId>,
    /// Last known endpoint per gripper; `None` while untracked.
    available: HashMap<ComponentId, Option<ComponentRef>>,
    /// Parent run id → pending sub-commands.
    pending: HashMap<RunId, PendingCommand>,
}

impl BgrxHandlers {
    /// Build handlers for a validated configuration.
    ///
    /// # Errors
    /// Propagates configuration validation failures.
    pub fn new(config: BgrxConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grippers: Vec<ComponentId> = config
            .grippers
            .iter()
            .map(|name| ComponentId::hcd(name.clone()))
            .collect();
        let available = grippers.iter().map(|id| (id.clone(), None)).collect();
        Ok(Self {
            config,
            grippers,
            available,
            pending: HashMap::new(),
        })
    }

    fn diagnostic_safe(name: &str) -> bool {
        name == "stop"
    }

    /// Endpoint of a gripper, if currently tracked.
    fn endpoint(&self, id: &ComponentId) -> Option<ComponentRef> {
        self.available.get(id).and_then(|slot| slot.clone())
    }

    /// The first configured gripper that is currently untracked.
    fn first_missing(&self) -> Option<&ComponentId> {
        self.grippers.iter().find(|id| self.endpoint(id).is_none())
    }

    /// Advisory cancellation of every remaining sub-command of a parent
    /// being resolved.
    fn cancel_subs(&self, ctx: &ComponentContext, entry: PendingCommand) {
        for (sub_id, target) in entry.subs {
            if let Some(endpoint) = self.endpoint(&target) {
                ctx.cancel_to(&endpoint, sub_id);
            }
        }
    }

    /// Resolve the parent as failed: cancel the remaining sub-commands
    /// (advisory) and deliver the terminal error.
    fn fail_parent(&mut self, ctx: &ComponentContext, parent: RunId, message: String) {
        let Some(entry) = self.pending.remove(&parent) else {
            return;
        };
        self.cancel_subs(ctx, entry);
        warn!(component = %ctx.id(), %parent, "composite command failed: {message}");
        ctx.completion()
            .update(SubmitResponse::Error(parent, message));
    }
}

impl ComponentHandlers for BgrxHandlers {
    fn initialize(&mut self, ctx: &ComponentContext) -> Result<(), CommandError> {
        info!(component = %ctx.id(), grippers = self.grippers.len(),
              "tracking gripper HCDs");
        for id in &self.grippers {
            ctx.track(id);
        }
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
            "moveGrism" => {
                let Some(angle) = command.float_param("angle") else {
                    return ValidationResult::Invalid(
                        run_id,
                        CommandIssue::MissingParameter("angle".to_string()),
                    );
                };
                if !GRISM_ANGLE_RANGE.contains(&angle) {
                    return ValidationResult::Invalid(
                        run_id,
                        CommandIssue::ParameterOutOfRange {
                            key: "angle".to_string(),
                            detail: "must be within 0.0..=360.0".to_string(),
                        },
                    );
                }
                ValidationResult::Accepted(run_id)
            }
            "stop" => ValidationResult::Accepted(run_id),
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
            "moveGrism" => {
                // Dependency check happens at submission, not validation.
                if let Some(missing) = self.first_missing() {
                    return SubmitResponse::Error(
                        run_id,
                        CommandError::DependencyUnavailable(missing.clone()).to_string(),
                    );
                }
                let Some(angle) = command.float_param("angle") else {
                    return SubmitResponse::Error(run_id, "angle parameter vanished".into());
                };

                let mut subs = HashMap::new();
                for id in self.grippers.clone() {
                    // first_missing() guarantees resolvability here.
                    let Some(endpoint) = self.endpoint(&id) else {
                        continue;
                    };
                    let sub_cmd = Command::new(id.clone(), "rotate")
                        .with_param("angle", ParamValue::Float(angle));
                    let sub_id = ctx.submit_to(&endpoint, run_id, sub_cmd);
                    subs.insert(sub_id, id);
                }
                info!(component = %ctx.id(), %run_id, angle, fanout = subs.len(),
                      "moveGrism decomposed");
                self.pending.insert(run_id, PendingCommand { subs });
                ctx.schedule_timeout(run_id, self.config.submit_timeout());
                SubmitResponse::Started(run_id)
            }
            "stop" => {
                for id in &self.grippers {
                    if let Some(endpoint) = self.endpoint(id) {
                        ctx.oneway_to(&endpoint, Command::new(id.clone(), "stop"));
                    }
                }
                SubmitResponse::Completed(run_id)
            }
            other => SubmitResponse::Error(run_id, format!("unvalidated command '{other}'")),
        }
    }

    fn on_oneway(&mut self, ctx: &ComponentContext, run_id: RunId, command: &Command) {
        // Only `stop` makes sense without a reply; composite commands
        // need their aggregated response.
        if command.name == "stop" {
            self.on_submit(ctx, run_id, command);
        } else {
            warn!(component = %ctx.id(), %run_id, command = %command.name,
                  "oneway not supported for composite commands");
        }
    }

    fn on_cancel(&mut self, ctx: &ComponentContext, run_id: RunId) {
        let Some(entry) = self.pending.remove(&run_id) else {
            return;
        };
        self.cancel_subs(ctx, entry);
        info!(component = %ctx.id(), %run_id, "composite command cancelled");
        ctx.completion().update(SubmitResponse::Cancelled(run_id));
    }

    fn on_sub_command_response(
        &mut self,
        ctx: &ComponentContext,
        parent: RunId,
        response: SubmitResponse,
    ) {
        let sub_id = response.run_id();
        // First failure message, when this response fails the parent.
        let failure = {
            let Some(entry) = self.pending.get_mut(&parent) else {
                // Parent already resolved (error, timeout, or cancel race).
                debug!(component = %ctx.id(), %parent, %sub_id, "late sub-command response");
                return;
            };
            let Some(target) = entry.subs.remove(&sub_id) else {
                debug!(component = %ctx.id(), %parent, %sub_id, "unknown sub run id");
                return;
            };
            match response {
                SubmitResponse::Completed(_) => {
                    if !entry.subs.is_empty() {
                        return;
                    }
                    None
                }
                SubmitResponse::Error(_, message) => Some(format!("{target}: {message}")),
                // Unsolicited cancel counts as failure; our own cancels
                // only follow parent resolution, which removes the
                // pending entry first.
                SubmitResponse::Cancelled(_) => Some(format!("{target}: sub-command cancelled")),
                SubmitResponse::Started(_) => {
                    debug!(component = %ctx.id(), %parent, %sub_id, "non-final sub response ignored");
                    entry.subs.insert(sub_id, target);
                    return;
                }
            }
        };

        match failure {
            None => {
                self.pending.remove(&parent);
                info!(component = %ctx.id(), %parent, "composite command completed");
                ctx.completion().update(SubmitResponse::Completed(parent));
            }
            Some(message) => self.fail_parent(ctx, parent, message),
        }
    }

    fn on_command_timeout(&mut self, ctx: &ComponentContext, run_id: RunId) {
        if self.pending.contains_key(&run_id) {
            let message = CommandError::Timeout {
                after_ms: self.config.submit_timeout_ms,
            }
            .to_string();
            self.fail_parent(ctx, run_id, message);
        }
    }

    fn on_location_tracking_event(&mut self, ctx: &ComponentContext, event: TrackingEvent) {
        match event.status {
            TrackingStatus::LocationUpdated => {
                let endpoint = ctx.location().resolve(&event.id);
                self.available.insert(event.id.clone(), endpoint);
                info!(component = %ctx.id(), gripper = %event.id, "gripper available");
            }
            TrackingStatus::LocationRemoved => {
                self.available.insert(event.id.clone(), None);
                warn!(component = %ctx.id(), gripper = %event.id, "gripper unavailable");

                // Pending sub-commands addressed to the lost gripper can
                // no longer complete; fail their parents. Bookkeeping and
                // queued completions only, no synchronous submits here.
                let affected: Vec<RunId> = self
                    .pending
                    .iter()
                    .filter(|(_, entry)| entry.subs.values().any(|t| t == &event.id))
                    .map(|(parent, _)| *parent)
                    .collect();
                for parent in affected {
                    self.fail_parent(
                        ctx,
                        parent,
                        CommandError::DependencyUnavailable(event.id.clone()).to_string(),
                    );
                }
            }
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
        // The runtime reports still-inflight parents as Cancelled.
        if !self.pending.is_empty() {
            warn!(component = %ctx.id(), pending = self.pending.len(),
                  "shutting down with composite commands in flight");
        }
        self.pending.clear();
    }
}
