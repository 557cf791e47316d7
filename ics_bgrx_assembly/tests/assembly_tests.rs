//! # bgrx Assembly Tests
//!
//! Composite command aggregation against running component instances:
//! fan-out to three grippers, first-error + sibling-cancel policy,
//! deadline enforcement, location loss mid-flight, and mode gating.

use ics_bgrx_assembly::{BgrxConfig, BgrxHandlers};
use ics_common::prelude::*;
use ics_framework::{
    Component, ComponentContext, ComponentHandlers, ComponentRef, LocationService,
    SystemTimeSource, TimeSource,
};
use ics_lgrip_hcd::LgripHandlers;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

// ─── Scripted gripper stand-in ──────────────────────────────────────

#[derive(Clone, Copy)]
enum Script {
    /// `rotate` completes immediately.
    Complete,
    /// `rotate` fails with the given message.
    Fail(&'static str),
    /// `rotate` starts and never completes.
    Hang,
}

/// Gripper-shaped handler with a scripted `rotate` outcome; counts
/// received cancellation signals.
struct ScriptedGripper {
    script: Script,
    cancels: Arc<AtomicU32>,
}

impl ScriptedGripper {
    fn new(script: Script) -> Self {
        Self {
            script,
            cancels: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl ComponentHandlers for ScriptedGripper {
    fn initialize(&mut self, _ctx: &ComponentContext) -> Result<(), CommandError> {
        Ok(())
    }

    fn validate_command(
        &mut self,
        _ctx: &ComponentContext,
        run_id: RunId,
        command: &Command,
    ) -> ValidationResult {
        match command.name.as_str() {
            "rotate" | "stop" => ValidationResult::Accepted(run_id),
            other => {
                ValidationResult::Invalid(run_id, CommandIssue::UnknownCommand(other.to_string()))
            }
        }
    }

    fn on_submit(
        &mut self,
        _ctx: &ComponentContext,
        run_id: RunId,
        command: &Command,
    ) -> SubmitResponse {
        match (command.name.as_str(), self.script) {
            ("stop", _) => SubmitResponse::Completed(run_id),
            (_, Script::Complete) => SubmitResponse::Completed(run_id),
            (_, Script::Fail(msg)) => SubmitResponse::Error(run_id, msg.to_string()),
            (_, Script::Hang) => SubmitResponse::Started(run_id),
        }
    }

    fn on_oneway(&mut self, _ctx: &ComponentContext, _run_id: RunId, _command: &Command) {}

    fn on_cancel(&mut self, _ctx: &ComponentContext, _run_id: RunId) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

const GRIPPERS: [&str; 3] = ["wfos.lgrip1", "wfos.lgrip2", "wfos.lgrip3"];

async fn spawn_assembly(
    location: &LocationService,
    timeout: Duration,
) -> ComponentRef {
    let config = BgrxConfig::simulated(&GRIPPERS).with_submit_timeout(timeout);
    let handlers = BgrxHandlers::new(config).expect("valid config");
    Component::spawn(ComponentId::assembly("wfos.bgrx"), handlers, location)
        .await
        .expect("assembly init")
}

async fn spawn_scripted(
    location: &LocationService,
    scripts: [Script; 3],
) -> Vec<Arc<AtomicU32>> {
    let mut counters = Vec::new();
    for (name, script) in GRIPPERS.iter().zip(scripts) {
        let handlers = ScriptedGripper::new(script);
        counters.push(handlers.cancels.clone());
        let hcd = Component::spawn(ComponentId::hcd(*name), handlers, location)
            .await
            .expect("gripper init");
        location.register(hcd);
    }
    counters
}

fn move_grism(assembly: &ComponentRef, angle: f64) -> Command {
    Command::new(assembly.id().clone(), "moveGrism").with_param("angle", ParamValue::Float(angle))
}

// ─── Aggregation ────────────────────────────────────────────────────

/// End-to-end worked scenario: `moveGrism(angle=30)` decomposes into
/// `rotate(angle=30)` per gripper, every gripper completes, and the
/// parent aggregates to `Completed`.
#[tokio::test]
async fn test_move_grism_completes_when_all_grippers_complete() {
    let location = LocationService::new();
    let mut sims = Vec::new();
    for name in GRIPPERS {
        let handlers = LgripHandlers::new();
        sims.push(handlers.sim_handle());
        let hcd = Component::spawn(ComponentId::hcd(name), handlers, &location)
            .await
            .unwrap();
        location.register(hcd);
    }
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    let run_id = RunId::next();
    let resp = assembly
        .submit_and_wait_with_id(run_id, move_grism(&assembly, 30.0))
        .await
        .unwrap();
    assert_eq!(resp, SubmitResponse::Completed(run_id));

    for sim in &sims {
        assert_eq!(sim.lock().angle_deg(), 30.0, "every gripper must settle at 30°");
    }

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_first_error_fails_parent_and_cancels_siblings() {
    let location = LocationService::new();
    let cancels = spawn_scripted(
        &location,
        [Script::Fail("axis fault"), Script::Hang, Script::Hang],
    )
    .await;
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    let resp = assembly
        .submit_and_wait(move_grism(&assembly, 30.0))
        .await
        .unwrap();
    match resp {
        SubmitResponse::Error(_, msg) => {
            assert!(msg.contains("axis fault"), "first error message preserved, got: {msg}");
        }
        other => panic!("expected Error, got {other:?}"),
    }

    // Siblings receive the advisory cancellation signal.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cancels[1].load(Ordering::SeqCst), 1);
    assert_eq!(cancels[2].load(Ordering::SeqCst), 1);
    assert_eq!(cancels[0].load(Ordering::SeqCst), 0, "failed sub is not cancelled");

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_deadline_resolves_parent_as_timeout_error() {
    let location = LocationService::new();
    let cancels =
        spawn_scripted(&location, [Script::Hang, Script::Hang, Script::Hang]).await;
    let assembly = spawn_assembly(&location, Duration::from_millis(100)).await;

    let resp = tokio::time::timeout(
        Duration::from_secs(2),
        assembly.submit_and_wait(move_grism(&assembly, 30.0)),
    )
    .await
    .expect("parent must resolve instead of hanging")
    .unwrap();
    match resp {
        SubmitResponse::Error(_, msg) => {
            assert!(msg.contains("no terminal response"), "got: {msg}");
        }
        other => panic!("expected timeout Error, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    for counter in &cancels {
        assert_eq!(counter.load(Ordering::SeqCst), 1, "pending subs get cancelled");
    }

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_resolves_parent_and_fans_out() {
    let location = LocationService::new();
    let cancels =
        spawn_scripted(&location, [Script::Hang, Script::Hang, Script::Hang]).await;
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    let run_id = RunId::next();
    let waiter = {
        let assembly = assembly.clone();
        let command = move_grism(&assembly, 30.0);
        tokio::spawn(async move { assembly.submit_and_wait_with_id(run_id, command).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    assembly.cancel(run_id).unwrap();

    let resp = waiter.await.unwrap().unwrap();
    assert_eq!(resp, SubmitResponse::Cancelled(run_id));

    // Every pending sub-command receives the advisory cancel.
    tokio::time::sleep(Duration::from_millis(50)).await;
    for counter in &cancels {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_location_loss_mid_flight_fails_parent() {
    let location = LocationService::new();
    let cancels =
        spawn_scripted(&location, [Script::Hang, Script::Hang, Script::Hang]).await;
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    let run_id = RunId::next();
    let waiter = {
        let assembly = assembly.clone();
        let command = move_grism(&assembly, 30.0);
        tokio::spawn(async move { assembly.submit_and_wait_with_id(run_id, command).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    location.unregister(&ComponentId::hcd("wfos.lgrip2"));

    let resp = waiter.await.unwrap().unwrap();
    match resp {
        SubmitResponse::Error(_, msg) => {
            assert!(msg.contains("unavailable"), "got: {msg}");
            assert!(msg.contains("wfos.lgrip2"), "lost gripper named, got: {msg}");
        }
        other => panic!("expected Error, got {other:?}"),
    }

    // The reachable siblings get the advisory cancel.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cancels[0].load(Ordering::SeqCst), 1);
    assert_eq!(cancels[2].load(Ordering::SeqCst), 1);

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_dependency_errors_at_submission() {
    let location = LocationService::new();
    // Only two of the three configured grippers are registered.
    for name in &GRIPPERS[..2] {
        let hcd = Component::spawn(
            ComponentId::hcd(*name),
            ScriptedGripper::new(Script::Complete),
            &location,
        )
        .await
        .unwrap();
        location.register(hcd);
    }
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    // Shape is fine, so validation passes.
    let v = assembly.validate(move_grism(&assembly, 30.0)).await.unwrap();
    assert!(v.is_accepted());

    // The missing dependency surfaces at submission time.
    let resp = assembly.submit(move_grism(&assembly, 30.0)).await.unwrap();
    match resp {
        SubmitResponse::Error(_, msg) => {
            assert!(msg.contains("wfos.lgrip3"), "got: {msg}");
        }
        other => panic!("expected Error, got {other:?}"),
    }

    assembly.shutdown().await.unwrap();
}

// ─── Validation & modes ─────────────────────────────────────────────

#[tokio::test]
async fn test_validation_rules() {
    let location = LocationService::new();
    spawn_scripted(&location, [Script::Complete; 3]).await;
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    let v = assembly
        .validate(Command::new(assembly.id().clone(), "exchangeFilter"))
        .await
        .unwrap();
    assert!(matches!(
        v,
        ValidationResult::Invalid(_, CommandIssue::UnknownCommand(_))
    ));

    let v = assembly
        .validate(Command::new(assembly.id().clone(), "moveGrism"))
        .await
        .unwrap();
    assert!(matches!(
        v,
        ValidationResult::Invalid(_, CommandIssue::MissingParameter(_))
    ));

    let v = assembly.validate(move_grism(&assembly, -5.0)).await.unwrap();
    assert!(matches!(
        v,
        ValidationResult::Invalid(_, CommandIssue::ParameterOutOfRange { .. })
    ));

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_diagnostic_mode_gates_move_grism() {
    let location = LocationService::new();
    spawn_scripted(&location, [Script::Complete; 3]).await;
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    assembly
        .diagnostic_mode(SystemTimeSource.utc_now(), "exchange checkout")
        .unwrap();

    let v = assembly.validate(move_grism(&assembly, 30.0)).await.unwrap();
    assert!(matches!(
        v,
        ValidationResult::Invalid(_, CommandIssue::DiagnosticRestricted)
    ));
    let v = assembly
        .validate(Command::new(assembly.id().clone(), "stop"))
        .await
        .unwrap();
    assert!(v.is_accepted(), "stop is diagnostic-safe");

    assembly.operations_mode().unwrap();
    let v = assembly.validate(move_grism(&assembly, 30.0)).await.unwrap();
    assert!(v.is_accepted());

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_offline_assembly_rejects_submission() {
    let location = LocationService::new();
    spawn_scripted(&location, [Script::Complete; 3]).await;
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    assembly.go_offline().unwrap();
    let v = assembly.validate(move_grism(&assembly, 30.0)).await.unwrap();
    assert!(matches!(
        v,
        ValidationResult::Invalid(_, CommandIssue::ComponentOffline)
    ));

    assembly.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stop_passes_through_to_grippers() {
    let location = LocationService::new();
    let handlers = LgripHandlers::new();
    let hcd = Component::spawn(ComponentId::hcd(GRIPPERS[0]), handlers, &location)
        .await
        .unwrap();
    location.register(hcd.clone());
    for name in &GRIPPERS[1..] {
        let hcd = Component::spawn(ComponentId::hcd(*name), LgripHandlers::new(), &location)
            .await
            .unwrap();
        location.register(hcd);
    }
    let assembly = spawn_assembly(&location, Duration::from_secs(5)).await;

    // Long slew directly on the gripper, then an assembly-level stop.
    let run_id = RunId::next();
    let waiter = {
        let hcd = hcd.clone();
        let command = Command::new(hcd.id().clone(), "rotate")
            .with_param("angle", ParamValue::Float(270.0));
        tokio::spawn(async move { hcd.submit_and_wait_with_id(run_id, command).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let resp = assembly
        .submit(Command::new(assembly.id().clone(), "stop"))
        .await
        .unwrap();
    assert!(matches!(resp, SubmitResponse::Completed(_)));

    let resp = waiter.await.unwrap().unwrap();
    assert_eq!(resp, SubmitResponse::Cancelled(run_id));

    assembly.shutdown().await.unwrap();
}
