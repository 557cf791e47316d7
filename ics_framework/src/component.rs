//! Component message loop and client handle.
//!
//! [`Component::spawn`] turns a [`ComponentHandlers`] implementation into
//! a running instance: one tokio task draining one unbounded queue. The
//! returned [`ComponentRef`] is the cloneable client handle used by
//! callers, peers, and the lifecycle driver.
//!
//! The loop owns the correctness backbone of the command pipeline:
//!
//! - lifecycle gating (no traffic before Running, `Invalid` while Offline)
//! - the resolved-set idempotence guard (a run id executes at most once)
//! - subscriber bookkeeping so every accepted run id yields exactly one
//!   terminal response, including `Cancelled` at shutdown

use crate::handlers::{ComponentContext, ComponentHandlers};
use crate::location::LocationService;
use crate::time::{SystemTimeSource, TimeSource, UtcTime};
use ics_common::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Messages processed by a component instance, in arrival order.
#[derive(Debug)]
pub enum ComponentMessage {
    /// Synchronous validation request.
    Validate {
        run_id: RunId,
        command: Command,
        reply: oneshot::Sender<ValidationResult>,
    },
    /// Command submission. `reply` receives the initial response;
    /// `final_reply`, when present, receives the terminal response.
    Submit {
        run_id: RunId,
        command: Command,
        reply: oneshot::Sender<SubmitResponse>,
        final_reply: Option<oneshot::Sender<SubmitResponse>>,
    },
    /// Fire-and-forget command.
    Oneway { run_id: RunId, command: Command },
    /// Advisory cancellation of an unresolved run id.
    Cancel(RunId),
    /// Terminal response for one of this component's started run ids,
    /// delivered by a worker through the completion channel.
    CommandResponse(SubmitResponse),
    /// Terminal response of a fanned-out sub-command, correlated to the
    /// parent run id.
    SubCommandResponse {
        parent: RunId,
        response: SubmitResponse,
    },
    /// An armed deadline elapsed.
    CommandTimeout(RunId),
    /// A tracked peer changed availability.
    Track(TrackingEvent),
    /// Go Online.
    GoOnline,
    /// Go Offline.
    GoOffline,
    /// Enter Diagnostic mode at `start_time` with a regime hint.
    DiagnosticMode { start_time: UtcTime, hint: String },
    /// Return to Operations mode.
    OperationsMode,
    /// Tear down; acked once `on_shutdown` has run.
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable client handle to a running component instance.
#[derive(Debug, Clone)]
pub struct ComponentRef {
    id: ComponentId,
    tx: mpsc::UnboundedSender<ComponentMessage>,
}

impl ComponentRef {
    /// Identity of the referenced component.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    fn down(&self) -> CommandError {
        CommandError::ComponentDown(self.id.clone())
    }

    /// Validate a command. Allocates and returns the run id inside the
    /// result.
    pub async fn validate(&self, command: Command) -> Result<ValidationResult, CommandError> {
        self.validate_with_id(RunId::next(), command).await
    }

    /// Validate under a caller-allocated run id.
    pub async fn validate_with_id(
        &self,
        run_id: RunId,
        command: Command,
    ) -> Result<ValidationResult, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ComponentMessage::Validate {
                run_id,
                command,
                reply,
            })
            .map_err(|_| self.down())?;
        rx.await.map_err(|_| self.down())
    }

    /// Submit a command and return the initial response (`Started` for
    /// long-running commands).
    pub async fn submit(&self, command: Command) -> Result<SubmitResponse, CommandError> {
        self.submit_with_id(RunId::next(), command).await
    }

    /// Submit under a caller-allocated run id.
    pub async fn submit_with_id(
        &self,
        run_id: RunId,
        command: Command,
    ) -> Result<SubmitResponse, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ComponentMessage::Submit {
                run_id,
                command,
                reply,
                final_reply: None,
            })
            .map_err(|_| self.down())?;
        rx.await.map_err(|_| self.down())
    }

    /// Submit a command and wait for the terminal response.
    pub async fn submit_and_wait(&self, command: Command) -> Result<SubmitResponse, CommandError> {
        self.submit_and_wait_with_id(RunId::next(), command).await
    }

    /// Submit under a caller-allocated run id and wait for the terminal
    /// response.
    pub async fn submit_and_wait_with_id(
        &self,
        run_id: RunId,
        command: Command,
    ) -> Result<SubmitResponse, CommandError> {
        let (reply, initial_rx) = oneshot::channel();
        let (final_reply, final_rx) = oneshot::channel();
        self.tx
            .send(ComponentMessage::Submit {
                run_id,
                command,
                reply,
                final_reply: Some(final_reply),
            })
            .map_err(|_| self.down())?;
        // The initial response is observed first so a synchronous error
        // surfaces even if the final channel is never written.
        let initial = initial_rx.await.map_err(|_| self.down())?;
        if initial.is_final() {
            return Ok(initial);
        }
        final_rx.await.map_err(|_| self.down())
    }

    /// Fire-and-forget submission. Returns the allocated run id.
    pub fn oneway(&self, command: Command) -> Result<RunId, CommandError> {
        let run_id = RunId::next();
        self.tx
            .send(ComponentMessage::Oneway { run_id, command })
            .map_err(|_| self.down())?;
        Ok(run_id)
    }

    /// Advisory cancellation of an in-flight run id.
    pub fn cancel(&self, run_id: RunId) -> Result<(), CommandError> {
        self.tx
            .send(ComponentMessage::Cancel(run_id))
            .map_err(|_| self.down())
    }

    /// Lifecycle driver: transition to Online.
    pub fn go_online(&self) -> Result<(), CommandError> {
        self.tx
            .send(ComponentMessage::GoOnline)
            .map_err(|_| self.down())
    }

    /// Lifecycle driver: transition to Offline.
    pub fn go_offline(&self) -> Result<(), CommandError> {
        self.tx
            .send(ComponentMessage::GoOffline)
            .map_err(|_| self.down())
    }

    /// Lifecycle driver: enter Diagnostic mode.
    pub fn diagnostic_mode(&self, start_time: UtcTime, hint: &str) -> Result<(), CommandError> {
        self.tx
            .send(ComponentMessage::DiagnosticMode {
                start_time,
                hint: hint.to_string(),
            })
            .map_err(|_| self.down())
    }

    /// Lifecycle driver: return to Operations mode.
    pub fn operations_mode(&self) -> Result<(), CommandError> {
        self.tx
            .send(ComponentMessage::OperationsMode)
            .map_err(|_| self.down())
    }

    /// Deliver a tracking event (normally done by the location service).
    pub fn deliver_tracking_event(&self, event: TrackingEvent) -> Result<(), CommandError> {
        self.tx
            .send(ComponentMessage::Track(event))
            .map_err(|_| self.down())
    }

    /// Tear the component down. Resolves once `on_shutdown` has run;
    /// unresolved started run ids are reported as `Cancelled`.
    pub async fn shutdown(&self) -> Result<(), CommandError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(ComponentMessage::Shutdown(ack))
            .map_err(|_| self.down())?;
        rx.await.map_err(|_| self.down())
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<ComponentMessage> {
        self.tx.clone()
    }
}

/// Factory for running component instances.
pub struct Component;

impl Component {
    /// Spawn a component with the system clock.
    pub async fn spawn<H: ComponentHandlers>(
        id: ComponentId,
        handlers: H,
        location: &LocationService,
    ) -> Result<ComponentRef, CommandError> {
        Self::spawn_with_time(id, handlers, location, Arc::new(SystemTimeSource)).await
    }

    /// Spawn a component with an injected time source.
    ///
    /// Runs `initialize` before returning; a failed initialization is
    /// fatal and surfaces as `CommandError::FatalInit` without the
    /// component ever reaching Running.
    pub async fn spawn_with_time<H: ComponentHandlers>(
        id: ComponentId,
        mut handlers: H,
        location: &LocationService,
        time: Arc<dyn TimeSource>,
    ) -> Result<ComponentRef, CommandError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = ComponentContext {
            id: id.clone(),
            lifecycle: LifecycleMachine::new(),
            self_tx: tx.clone(),
            location: location.clone(),
            time,
        };
        let (init_tx, init_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut state = ComponentLoop {
                ctx,
                resolved: HashSet::new(),
                started: HashMap::new(),
            };

            if let Err(e) = handlers.initialize(&state.ctx) {
                error!(component = %state.ctx.id, "initialization failed: {e}");
                let _ = init_tx.send(Err(e));
                return;
            }
            state.ctx.lifecycle.initialize();
            state.ctx.lifecycle.start(OperatingMode::Online);
            info!(component = %state.ctx.id, "initialized and running");
            let _ = init_tx.send(Ok(()));

            state.run(handlers, rx).await;
        });

        match init_rx.await {
            Ok(Ok(())) => Ok(ComponentRef { id, tx }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CommandError::FatalInit("component task aborted".into())),
        }
    }
}

struct ComponentLoop {
    ctx: ComponentContext,
    /// Run ids with a delivered terminal response. Guards idempotence.
    resolved: HashSet<RunId>,
    /// In-flight started run ids and their final-response subscribers.
    started: HashMap<RunId, Vec<oneshot::Sender<SubmitResponse>>>,
}

impl ComponentLoop {
    async fn run<H: ComponentHandlers>(
        &mut self,
        mut handlers: H,
        mut rx: mpsc::UnboundedReceiver<ComponentMessage>,
    ) {
        while let Some(msg) = rx.recv().await {
            match msg {
                ComponentMessage::Validate {
                    run_id,
                    command,
                    reply,
                } => {
                    let result = self.validate(&mut handlers, run_id, &command);
                    let _ = reply.send(result);
                }

                ComponentMessage::Submit {
                    run_id,
                    command,
                    reply,
                    final_reply,
                } => {
                    self.submit(&mut handlers, run_id, command, reply, final_reply);
                }

                ComponentMessage::Oneway { run_id, command } => {
                    match self.validate(&mut handlers, run_id, &command) {
                        ValidationResult::Accepted(_) => {
                            handlers.on_oneway(&self.ctx, run_id, &command);
                        }
                        ValidationResult::Invalid(_, issue) => {
                            // No reply channel for oneway; observable via log only.
                            warn!(component = %self.ctx.id, %run_id,
                                  command = %command.name, "oneway rejected: {issue}");
                        }
                    }
                }

                ComponentMessage::Cancel(run_id) => {
                    if self.resolved.contains(&run_id) {
                        debug!(component = %self.ctx.id, %run_id,
                               "cancel after resolution, ignored");
                    } else {
                        handlers.on_cancel(&self.ctx, run_id);
                    }
                }

                ComponentMessage::CommandResponse(response) => {
                    self.resolve(response);
                }

                ComponentMessage::SubCommandResponse { parent, response } => {
                    handlers.on_sub_command_response(&self.ctx, parent, response);
                }

                ComponentMessage::CommandTimeout(run_id) => {
                    if !self.resolved.contains(&run_id) {
                        handlers.on_command_timeout(&self.ctx, run_id);
                    }
                }

                ComponentMessage::Track(event) => {
                    debug!(component = %self.ctx.id, peer = %event.id,
                           status = ?event.status, "tracking event");
                    handlers.on_location_tracking_event(&self.ctx, event);
                }

                ComponentMessage::GoOnline => {
                    match self.ctx.lifecycle.set_operating_mode(OperatingMode::Online) {
                        LifecycleTransition::Ok(_) => handlers.on_go_online(&self.ctx),
                        LifecycleTransition::Rejected(why) => {
                            warn!(component = %self.ctx.id, "go online rejected: {why}");
                        }
                    }
                }

                ComponentMessage::GoOffline => {
                    match self.ctx.lifecycle.set_operating_mode(OperatingMode::Offline) {
                        LifecycleTransition::Ok(_) => handlers.on_go_offline(&self.ctx),
                        LifecycleTransition::Rejected(why) => {
                            warn!(component = %self.ctx.id, "go offline rejected: {why}");
                        }
                    }
                }

                ComponentMessage::DiagnosticMode { start_time, hint } => {
                    match self.ctx.lifecycle.set_run_mode(RunMode::Diagnostic) {
                        LifecycleTransition::Ok(_) => {
                            handlers.on_diagnostic_mode(&self.ctx, start_time, &hint);
                        }
                        LifecycleTransition::Rejected(why) => {
                            warn!(component = %self.ctx.id, "diagnostic mode rejected: {why}");
                        }
                    }
                }

                ComponentMessage::OperationsMode => {
                    match self.ctx.lifecycle.set_run_mode(RunMode::Operations) {
                        LifecycleTransition::Ok(_) => handlers.on_operations_mode(&self.ctx),
                        LifecycleTransition::Rejected(why) => {
                            warn!(component = %self.ctx.id, "operations mode rejected: {why}");
                        }
                    }
                }

                ComponentMessage::Shutdown(ack) => {
                    self.shutdown(&mut handlers);
                    let _ = ack.send(());
                    return;
                }
            }
        }
    }

    /// Runtime admission check shared by validate, submit, and oneway.
    fn admission_issue(&self, run_id: RunId) -> Option<CommandIssue> {
        if self.resolved.contains(&run_id) {
            return Some(CommandIssue::AlreadyResolved);
        }
        // A started-but-unresolved run id must not re-trigger execution.
        if self.started.contains_key(&run_id) {
            return Some(CommandIssue::AlreadyInFlight);
        }
        match self.ctx.lifecycle.state() {
            LifecycleState::Running => {
                if self.ctx.lifecycle.operating_mode().is_online() {
                    None
                } else {
                    Some(CommandIssue::ComponentOffline)
                }
            }
            LifecycleState::Uninitialized => {
                Some(CommandIssue::WrongComponentState("uninitialized".into()))
            }
            LifecycleState::Initialized => {
                Some(CommandIssue::WrongComponentState("initialized".into()))
            }
            LifecycleState::ShuttingDown => {
                Some(CommandIssue::WrongComponentState("shutting down".into()))
            }
            LifecycleState::Terminated => {
                Some(CommandIssue::WrongComponentState("terminated".into()))
            }
        }
    }

    fn validate<H: ComponentHandlers>(
        &mut self,
        handlers: &mut H,
        run_id: RunId,
        command: &Command,
    ) -> ValidationResult {
        if let Some(issue) = self.admission_issue(run_id) {
            return ValidationResult::Invalid(run_id, issue);
        }
        handlers.validate_command(&self.ctx, run_id, command)
    }

    fn submit<H: ComponentHandlers>(
        &mut self,
        handlers: &mut H,
        run_id: RunId,
        command: Command,
        reply: oneshot::Sender<SubmitResponse>,
        final_reply: Option<oneshot::Sender<SubmitResponse>>,
    ) {
        // Re-validation in the same queue message keeps the accepted ⇒
        // exactly-one-final-response invariant immune to interleavings
        // between a separate validate call and the submit.
        let response = match self.validate(handlers, run_id, &command) {
            ValidationResult::Invalid(_, issue) => {
                SubmitResponse::Error(run_id, format!("validation failed: {issue}"))
            }
            ValidationResult::Accepted(_) => handlers.on_submit(&self.ctx, run_id, &command),
        };

        match &response {
            SubmitResponse::Started(_) => {
                let subs = self.started.entry(run_id).or_default();
                if let Some(f) = final_reply {
                    subs.push(f);
                }
            }
            _ => {
                self.resolved.insert(run_id);
                if let Some(f) = final_reply {
                    let _ = f.send(response.clone());
                }
            }
        }
        let _ = reply.send(response);
    }

    /// Deliver a terminal response from the completion channel.
    fn resolve(&mut self, response: SubmitResponse) {
        let run_id = response.run_id();
        if !response.is_final() {
            warn!(component = %self.ctx.id, %run_id,
                  "non-final completion update ignored");
            return;
        }
        if self.resolved.contains(&run_id) {
            // Advisory-cancel race or duplicate worker update.
            debug!(component = %self.ctx.id, %run_id,
                   "duplicate terminal response dropped");
            return;
        }
        self.resolved.insert(run_id);
        if let Some(subs) = self.started.remove(&run_id) {
            for sub in subs {
                let _ = sub.send(response.clone());
            }
        }
    }

    fn shutdown<H: ComponentHandlers>(&mut self, handlers: &mut H) {
        self.ctx.lifecycle.begin_shutdown();
        handlers.on_shutdown(&self.ctx);
        // Every still-inflight run id gets its one terminal response.
        for (run_id, subs) in self.started.drain() {
            self.resolved.insert(run_id);
            for sub in subs {
                let _ = sub.send(SubmitResponse::Cancelled(run_id));
            }
        }
        self.ctx.lifecycle.terminated();
        info!(component = %self.ctx.id, "terminated");
    }
}
