//! Component lifecycle state machine.
//!
//! `Uninitialized → Initialized → Running → ShuttingDown → Terminated`,
//! with the Online/Offline and Operations/Diagnostic sub-axes carried
//! while Running. Transitions are guard-checked; a rejected transition
//! leaves the machine unchanged and names the violated guard.

use crate::mode::{OperatingMode, RunMode};

/// Lifecycle states of one component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, `initialize` not yet run.
    Uninitialized,
    /// `initialize` succeeded, not yet accepting traffic.
    Initialized,
    /// Accepting handler traffic (subject to OperatingMode).
    Running,
    /// `shutdown` in progress, resources being released.
    ShuttingDown,
    /// Final state; the component never leaves it.
    Terminated,
}

/// Result of a lifecycle transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// Transition applied.
    Ok(LifecycleState),
    /// Transition rejected; machine unchanged.
    Rejected(&'static str),
}

/// Per-component lifecycle machine.
#[derive(Debug, Clone)]
pub struct LifecycleMachine {
    state: LifecycleState,
    operating: OperatingMode,
    run_mode: RunMode,
}

impl LifecycleMachine {
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            operating: OperatingMode::Online,
            run_mode: RunMode::Operations,
        }
    }

    #[inline]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    #[inline]
    pub const fn operating_mode(&self) -> OperatingMode {
        self.operating
    }

    #[inline]
    pub const fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// True when command submission may be accepted at all
    /// (Running and Online; Diagnostic gating is per-command).
    #[inline]
    pub const fn accepts_commands(&self) -> bool {
        matches!(self.state, LifecycleState::Running) && self.operating.is_online()
    }

    /// Mark initialization complete. Runs exactly once.
    pub fn initialize(&mut self) -> LifecycleTransition {
        // Guard: initialization is one-shot.
        if self.state != LifecycleState::Uninitialized {
            return LifecycleTransition::Rejected("initialize requires Uninitialized");
        }
        self.state = LifecycleState::Initialized;
        LifecycleTransition::Ok(self.state)
    }

    /// Enter Running with the given initial operating mode.
    pub fn start(&mut self, mode: OperatingMode) -> LifecycleTransition {
        // Guard: must have initialized successfully.
        if self.state != LifecycleState::Initialized {
            return LifecycleTransition::Rejected("start requires Initialized");
        }
        self.state = LifecycleState::Running;
        self.operating = mode;
        self.run_mode = RunMode::Operations;
        LifecycleTransition::Ok(self.state)
    }

    /// Transition the Online/Offline axis. Same mode is a no-op success.
    pub fn set_operating_mode(&mut self, mode: OperatingMode) -> LifecycleTransition {
        if self.state != LifecycleState::Running {
            return LifecycleTransition::Rejected("mode change requires Running");
        }
        self.operating = mode;
        LifecycleTransition::Ok(self.state)
    }

    /// Transition the Operations/Diagnostic axis.
    pub fn set_run_mode(&mut self, mode: RunMode) -> LifecycleTransition {
        if self.state != LifecycleState::Running {
            return LifecycleTransition::Rejected("mode change requires Running");
        }
        self.run_mode = mode;
        LifecycleTransition::Ok(self.state)
    }

    /// Begin teardown. Allowed from Initialized (init-only components)
    /// or Running; rejected once shutdown has already begun.
    pub fn begin_shutdown(&mut self) -> LifecycleTransition {
        match self.state {
            LifecycleState::Initialized | LifecycleState::Running => {
                self.state = LifecycleState::ShuttingDown;
                LifecycleTransition::Ok(self.state)
            }
            _ => LifecycleTransition::Rejected("shutdown requires Initialized or Running"),
        }
    }

    /// Final transition after resources are released.
    pub fn terminated(&mut self) -> LifecycleTransition {
        if self.state != LifecycleState::ShuttingDown {
            return LifecycleTransition::Rejected("terminated requires ShuttingDown");
        }
        self.state = LifecycleState::Terminated;
        LifecycleTransition::Ok(self.state)
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_path() {
        let mut m = LifecycleMachine::new();
        assert_eq!(m.state(), LifecycleState::Uninitialized);
        assert!(!m.accepts_commands());

        assert_eq!(
            m.initialize(),
            LifecycleTransition::Ok(LifecycleState::Initialized)
        );
        assert_eq!(
            m.start(OperatingMode::Online),
            LifecycleTransition::Ok(LifecycleState::Running)
        );
        assert!(m.accepts_commands());

        assert_eq!(
            m.begin_shutdown(),
            LifecycleTransition::Ok(LifecycleState::ShuttingDown)
        );
        assert_eq!(
            m.terminated(),
            LifecycleTransition::Ok(LifecycleState::Terminated)
        );
        assert!(!m.accepts_commands());
    }

    #[test]
    fn test_initialize_is_one_shot() {
        let mut m = LifecycleMachine::new();
        m.initialize();
        assert!(matches!(m.initialize(), LifecycleTransition::Rejected(_)));
    }

    #[test]
    fn test_start_requires_initialized() {
        let mut m = LifecycleMachine::new();
        assert!(matches!(
            m.start(OperatingMode::Online),
            LifecycleTransition::Rejected(_)
        ));
        assert_eq!(m.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_offline_blocks_command_acceptance() {
        let mut m = LifecycleMachine::new();
        m.initialize();
        m.start(OperatingMode::Online);

        m.set_operating_mode(OperatingMode::Offline);
        assert!(!m.accepts_commands());

        m.set_operating_mode(OperatingMode::Online);
        assert!(m.accepts_commands());
    }

    #[test]
    fn test_mode_changes_require_running() {
        let mut m = LifecycleMachine::new();
        assert!(matches!(
            m.set_operating_mode(OperatingMode::Offline),
            LifecycleTransition::Rejected(_)
        ));
        assert!(matches!(
            m.set_run_mode(RunMode::Diagnostic),
            LifecycleTransition::Rejected(_)
        ));
    }

    #[test]
    fn test_shutdown_is_one_shot() {
        let mut m = LifecycleMachine::new();
        m.initialize();
        m.start(OperatingMode::Online);
        assert!(matches!(m.begin_shutdown(), LifecycleTransition::Ok(_)));
        assert!(matches!(
            m.begin_shutdown(),
            LifecycleTransition::Rejected(_)
        ));
        assert!(matches!(m.terminated(), LifecycleTransition::Ok(_)));
        // Terminated is final.
        assert!(matches!(m.terminated(), LifecycleTransition::Rejected(_)));
    }

    #[test]
    fn test_run_mode_reset_on_start() {
        let mut m = LifecycleMachine::new();
        m.initialize();
        m.start(OperatingMode::Offline);
        assert_eq!(m.run_mode(), RunMode::Operations);
        m.set_run_mode(RunMode::Diagnostic);
        assert_eq!(m.run_mode(), RunMode::Diagnostic);
    }
}
