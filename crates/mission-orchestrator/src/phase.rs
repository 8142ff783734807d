//! Per-mission phase state machine.
//!
//! A mission registers its phases once, in order. Transitions may only
//! target registered phases; anything else is a programming error and
//! panics. The machine itself has no opinion on ordering: each mission
//! strategy decides the next phase when the current one ends.

use mission_core::enums::MissionPhase;
use mission_core::types::MarsTime;

#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    registered: Vec<MissionPhase>,
    current: Option<MissionPhase>,
    ended: bool,
    description: String,
    started_at: MarsTime,
}

impl PhaseMachine {
    /// Register a phase. Registering twice keeps the first position.
    pub fn register(&mut self, phase: MissionPhase) {
        if !self.registered.contains(&phase) {
            self.registered.push(phase);
        }
    }

    pub fn is_registered(&self, phase: MissionPhase) -> bool {
        self.registered.contains(&phase)
    }

    pub fn registered(&self) -> &[MissionPhase] {
        &self.registered
    }

    /// Enter `phase`, returning the phase that was left.
    ///
    /// # Panics
    /// If `phase` was never registered.
    pub fn set_phase(
        &mut self,
        phase: MissionPhase,
        description: impl Into<String>,
        now: MarsTime,
    ) -> Option<MissionPhase> {
        assert!(
            self.is_registered(phase),
            "transition to unregistered phase {phase:?} (registered: {:?})",
            self.registered
        );
        let previous = self.current.replace(phase);
        self.ended = false;
        self.description = description.into();
        self.started_at = now;
        previous
    }

    /// The current phase.
    ///
    /// # Panics
    /// If no phase has been set yet.
    pub fn current(&self) -> MissionPhase {
        match self.current {
            Some(phase) => phase,
            None => panic!("phase logic invoked with no phase set"),
        }
    }

    pub fn current_opt(&self) -> Option<MissionPhase> {
        self.current
    }

    pub fn end_phase(&mut self) {
        self.ended = true;
    }

    pub fn phase_ended(&self) -> bool {
        self.ended
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn started_at(&self) -> MarsTime {
        self.started_at
    }

    /// Millisols spent in the current phase.
    pub fn elapsed_in_phase(&self, now: MarsTime) -> f64 {
        now.since(self.started_at)
    }
}
