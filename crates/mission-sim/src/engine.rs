//! Mission engine: the clock-driven host of every mission.
//!
//! `MissionEngine` owns the colony world and the mission table, processes
//! queued commands, pulses the missions and produces `MissionSnapshot`s.
//! Completely headless, so runs are reproducible from a seed.

use std::collections::{BTreeMap, VecDeque};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use mission_core::commands::MissionCommand;
use mission_core::config::MissionConfig;
use mission_core::constants::DEFAULT_PULSE_MILLISOLS;
use mission_core::enums::{EngineState, MissionKind};
use mission_core::events::MissionEvent;
use mission_core::state::MissionSnapshot;
use mission_core::types::{AgentId, ClockPulse, MarsTime, MissionId};
use mission_orchestrator::context::AgentDirectory;
use mission_orchestrator::{Mission, MissionContext};

use crate::systems;
use crate::systems::missions::MissionSlot;
use crate::world::ColonyWorld;

/// Configuration for starting a new engine.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same run.
    pub seed: u64,
    /// Millisols covered by each tick.
    pub pulse_millisols: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            pulse_millisols: DEFAULT_PULSE_MILLISOLS,
        }
    }
}

/// The mission engine. Owns the colony world and all mission state.
pub struct MissionEngine {
    colony: ColonyWorld,
    missions: BTreeMap<MissionId, MissionSlot>,
    config: MissionConfig,
    pulse: ClockPulse,
    pulse_millisols: f64,
    state: EngineState,
    rng: ChaCha8Rng,
    next_mission_id: u32,
    command_queue: VecDeque<MissionCommand>,
    despawn_buffer: Vec<MissionId>,
    events: Vec<MissionEvent>,
    event_log: Vec<MissionEvent>,
}

impl MissionEngine {
    /// Create an engine over an empty colony.
    pub fn new(config: SimConfig, mission_config: MissionConfig) -> Self {
        let colony = ColonyWorld::new(mission_config.trade.deal_cache_ttl_millisols);
        Self::with_colony(config, mission_config, colony)
    }

    /// Create an engine over an already populated colony.
    pub fn with_colony(config: SimConfig, mission_config: MissionConfig, colony: ColonyWorld) -> Self {
        Self {
            colony,
            missions: BTreeMap::new(),
            config: mission_config,
            pulse: ClockPulse::default(),
            pulse_millisols: config.pulse_millisols,
            state: EngineState::default(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next_mission_id: 0,
            command_queue: VecDeque::new(),
            despawn_buffer: Vec::new(),
            events: Vec::new(),
            event_log: Vec::new(),
        }
    }

    /// Queue a command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: MissionCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = MissionCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance the engine by one tick and return the resulting snapshot.
    ///
    /// Commands are applied before the pulse, so a mission started here is
    /// first performed within the same tick.
    pub fn tick(&mut self) -> MissionSnapshot {
        self.process_commands();

        if self.state == EngineState::Running {
            self.pulse = self.pulse.next(self.pulse_millisols);
            self.run_systems();
        }

        let events = std::mem::take(&mut self.events);
        self.event_log.extend(events.iter().cloned());
        systems::snapshot::build_snapshot(&self.missions, &self.colony, self.pulse, self.state, events)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn time(&self) -> MarsTime {
        self.pulse.time
    }

    pub fn pulse(&self) -> ClockPulse {
        self.pulse
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn colony(&self) -> &ColonyWorld {
        &self.colony
    }

    /// Mutable colony access for scenario setup and external events such as
    /// a medical emergency.
    pub fn colony_mut(&mut self) -> &mut ColonyWorld {
        &mut self.colony
    }

    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(&id).map(|slot| &slot.mission)
    }

    /// Missions still held by the engine, in id order.
    pub fn missions(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values().map(|slot| &slot.mission)
    }

    /// Every event emitted since the engine was created.
    pub fn event_log(&self) -> &[MissionEvent] {
        &self.event_log
    }

    /// Process all queued commands.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    /// Handle a single command.
    fn handle_command(&mut self, command: MissionCommand) {
        match command {
            MissionCommand::StartMission { kind, starter } => self.start_mission(kind, starter),
            MissionCommand::ReviewPlan { mission, approve } => {
                let Some(slot) = self.missions.get_mut(&mission) else {
                    warn!(mission = %mission, "review for unknown mission ignored");
                    return;
                };
                let mut ctx = MissionContext {
                    colony: &mut self.colony,
                    pulse: self.pulse,
                    rng: &mut self.rng,
                    events: &mut self.events,
                    config: &self.config,
                };
                slot.mission.review_plan(approve, &mut ctx);
            }
            MissionCommand::AbortMission { mission } => {
                let Some(slot) = self.missions.get_mut(&mission) else {
                    warn!(mission = %mission, "abort for unknown mission ignored");
                    return;
                };
                let mut ctx = MissionContext {
                    colony: &mut self.colony,
                    pulse: self.pulse,
                    rng: &mut self.rng,
                    events: &mut self.events,
                    config: &self.config,
                };
                slot.mission.abort(&mut ctx);
                slot.note_closed(self.pulse.tick);
            }
            MissionCommand::Pause => {
                if self.state == EngineState::Running {
                    self.state = EngineState::Paused;
                }
            }
            MissionCommand::Resume => {
                if self.state == EngineState::Paused {
                    self.state = EngineState::Running;
                }
            }
        }
    }

    fn start_mission(&mut self, kind: MissionKind, starter: AgentId) {
        if self.colony.agent_settlement(starter).is_none() {
            warn!(agent = %starter, ?kind, "starter unknown or not at a settlement; ignored");
            return;
        }
        if let Some(current) = self.colony.agent_mission(starter) {
            warn!(agent = %starter, mission = %current, ?kind, "starter already on a mission; ignored");
            return;
        }

        self.next_mission_id += 1;
        let id = MissionId(self.next_mission_id);
        let mut ctx = MissionContext {
            colony: &mut self.colony,
            pulse: self.pulse,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
        };
        let mission = Mission::start(id, kind, starter, &mut ctx);
        self.missions.insert(id, MissionSlot::new(mission, self.pulse.tick));
    }

    /// Run all systems in order.
    fn run_systems(&mut self) {
        // 1. Colonist tasks (boarding, disembarking, negotiation)
        systems::tasks::run(self.colony.world_mut(), self.pulse.elapsed);
        // 2. Missions, ascending id
        let mut ctx = MissionContext {
            colony: &mut self.colony,
            pulse: self.pulse,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
        };
        systems::missions::run(&mut self.missions, &mut ctx);
        // 3. Cleanup (retired missions, stale deals)
        systems::cleanup::run(
            &mut self.missions,
            &mut self.colony,
            self.pulse.tick,
            self.pulse.time,
            &mut self.despawn_buffer,
        );
    }

    /// Spawn-time hook for tests that need a mission without going through
    /// the command queue.
    #[cfg(test)]
    pub(crate) fn start_now(&mut self, kind: MissionKind, starter: AgentId) -> Option<MissionId> {
        let before = self.next_mission_id;
        self.start_mission(kind, starter);
        (self.next_mission_id != before).then_some(MissionId(self.next_mission_id))
    }
}
