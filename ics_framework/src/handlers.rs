//! The component handler contract.
//!
//! `ComponentHandlers` is the explicit capability set any concrete
//! Assembly or HCD type implements; the runtime drives it through the
//! single message queue of [`crate::component`]. All methods are
//! synchronous and must return promptly: long-running work is handed to a
//! worker via [`ComponentContext`] and reports back through the
//! completion channel as a new queue message.

use crate::component::{ComponentMessage, ComponentRef};
use crate::location::LocationService;
use crate::time::{TimeSource, UtcTime};
use ics_common::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Handle for delivering terminal responses of started commands back into
/// the owning component's queue. Cheap to clone into worker tasks.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<ComponentMessage>,
}

impl CompletionSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ComponentMessage>) -> Self {
        Self { tx }
    }

    /// Deliver the terminal response for a previously `Started` run id.
    ///
    /// A send after the component shut down is dropped; the runtime has
    /// already resolved every in-flight run id as `Cancelled` by then.
    pub fn update(&self, response: SubmitResponse) {
        if self.tx.send(ComponentMessage::CommandResponse(response)).is_err() {
            debug!("completion update after component shutdown, dropped");
        }
    }
}

/// Per-instance context threaded through every handler call.
///
/// Replaces framework-injected ambient state: component identity, current
/// lifecycle/mode, the location service, the time source, and the helpers
/// for spawning cross-component calls all live here explicitly.
pub struct ComponentContext {
    pub(crate) id: ComponentId,
    pub(crate) lifecycle: LifecycleMachine,
    pub(crate) self_tx: mpsc::UnboundedSender<ComponentMessage>,
    pub(crate) location: LocationService,
    pub(crate) time: Arc<dyn TimeSource>,
}

impl ComponentContext {
    /// This component's identity.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Current lifecycle state.
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Current Online/Offline mode.
    pub fn operating_mode(&self) -> OperatingMode {
        self.lifecycle.operating_mode()
    }

    /// Current Operations/Diagnostic mode.
    pub fn run_mode(&self) -> RunMode {
        self.lifecycle.run_mode()
    }

    /// The location service collaborator.
    pub fn location(&self) -> &LocationService {
        &self.location
    }

    /// The injectable time source.
    pub fn time(&self) -> &dyn TimeSource {
        self.time.as_ref()
    }

    /// Current instant from the time source.
    pub fn utc_now(&self) -> UtcTime {
        self.time.utc_now()
    }

    /// Completion handle for worker tasks of long-running commands.
    pub fn completion(&self) -> CompletionSender {
        CompletionSender::new(self.self_tx.clone())
    }

    /// Subscribe to tracking events for a peer. The current availability
    /// is delivered immediately as a first event.
    pub fn track(&self, watched: &ComponentId) {
        self.location
            .subscribe(watched.clone(), self.id.clone(), self.self_tx.clone());
    }

    /// Arm a deadline for a run id. When it elapses and the run id is
    /// still unresolved, `on_command_timeout` fires on this component.
    pub fn schedule_timeout(&self, run_id: RunId, after: Duration) {
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(ComponentMessage::CommandTimeout(run_id));
        });
    }

    /// Fan a sub-command out to a peer component.
    ///
    /// Allocates and returns the sub run id synchronously so the caller
    /// can record it in its pending set before any response can arrive.
    /// The peer's terminal response (or the failure to obtain one) comes
    /// back through this component's queue as `on_sub_command_response`
    /// for `parent`.
    pub fn submit_to(&self, target: &ComponentRef, parent: RunId, command: Command) -> RunId {
        let run_id = RunId::next();
        let target = target.clone();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let response = match target.submit_and_wait_with_id(run_id, command).await {
                Ok(resp) => resp,
                Err(e) => SubmitResponse::Error(run_id, e.to_string()),
            };
            let _ = tx.send(ComponentMessage::SubCommandResponse { parent, response });
        });
        run_id
    }

    /// Fire-and-forget a command to a peer. Failures are logged by the
    /// peer, no response is routed back.
    pub fn oneway_to(&self, target: &ComponentRef, command: Command) {
        if let Err(e) = target.oneway(command) {
            debug!(target_id = %target.id(), "oneway dropped: {e}");
        }
    }

    /// Best-effort cancellation of a sub-command on a peer. Advisory: the
    /// peer may already have completed the run.
    pub fn cancel_to(&self, target: &ComponentRef, run_id: RunId) {
        if let Err(e) = target.cancel(run_id) {
            debug!(target_id = %target.id(), %run_id, "cancel dropped: {e}");
        }
    }
}

/// Contract implemented by every Assembly and HCD.
///
/// # Invocation model
///
/// The runtime calls these one at a time per instance, in queue order.
/// `initialize` runs exactly once before any traffic; a failed
/// `initialize` is fatal and the component never starts. `on_shutdown`
/// runs exactly once at teardown and must release acquired resources.
///
/// # Timing Contracts
///
/// | Operation | Constraint |
/// |-----------|------------|
/// | `validate_command` | pure, bounded time, no hardware I/O |
/// | `on_submit` | returns `Started` for long-running work, never blocks the queue |
/// | `on_location_tracking_event` | bookkeeping only, no synchronous submits |
pub trait ComponentHandlers: Send + 'static {
    /// One-shot initialization before any command traffic. Establish
    /// session/hardware-link state here.
    ///
    /// # Errors
    /// Return `CommandError::FatalInit`; the component then never reaches
    /// Running.
    fn initialize(&mut self, ctx: &ComponentContext) -> Result<(), CommandError>;

    /// Side-effect-free check of command shape, parameter ranges, and
    /// current mode. The runtime has already rejected traffic while not
    /// Running/Online and re-submissions of resolved run ids.
    fn validate_command(
        &mut self,
        ctx: &ComponentContext,
        run_id: RunId,
        command: &Command,
    ) -> ValidationResult;

    /// Execute a validated command.
    ///
    /// Either complete synchronously (`Completed`/`Error`) or return
    /// `Started` and deliver the terminal response later through
    /// [`ComponentContext::completion`].
    fn on_submit(
        &mut self,
        ctx: &ComponentContext,
        run_id: RunId,
        command: &Command,
    ) -> SubmitResponse;

    /// Execute a validated fire-and-forget command. No response is
    /// returned; failures must still be logged.
    fn on_oneway(&mut self, ctx: &ComponentContext, run_id: RunId, command: &Command);

    /// Advisory cancellation for an unresolved run id.
    fn on_cancel(&mut self, _ctx: &ComponentContext, _run_id: RunId) {}

    /// Terminal response for a sub-command previously fanned out with
    /// [`ComponentContext::submit_to`], correlated to the parent run id.
    fn on_sub_command_response(
        &mut self,
        _ctx: &ComponentContext,
        _parent: RunId,
        _response: SubmitResponse,
    ) {
    }

    /// A deadline armed with [`ComponentContext::schedule_timeout`]
    /// elapsed while the run id was still unresolved.
    fn on_command_timeout(&mut self, _ctx: &ComponentContext, _run_id: RunId) {}

    /// A tracked peer changed availability. Bookkeeping only; queue any
    /// resulting commands, never submit synchronously from here.
    fn on_location_tracking_event(&mut self, _ctx: &ComponentContext, _event: TrackingEvent) {}

    /// The component went Online (mode already updated in `ctx`).
    fn on_go_online(&mut self, _ctx: &ComponentContext) {}

    /// The component went Offline (mode already updated in `ctx`).
    fn on_go_offline(&mut self, _ctx: &ComponentContext) {}

    /// Diagnostic mode begins at `start_time`; `hint` selects the
    /// diagnostic regime.
    fn on_diagnostic_mode(&mut self, _ctx: &ComponentContext, _start_time: UtcTime, _hint: &str) {}

    /// Back to normal operations.
    fn on_operations_mode(&mut self, _ctx: &ComponentContext) {}

    /// One-shot teardown; release all acquired resources.
    fn on_shutdown(&mut self, _ctx: &ComponentContext) {}
}
