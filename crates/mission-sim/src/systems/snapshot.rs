//! Snapshot system: builds a `MissionSnapshot` from the engine state.

use std::collections::BTreeMap;

use mission_core::enums::EngineState;
use mission_core::events::MissionEvent;
use mission_core::state::MissionSnapshot;
use mission_core::types::{ClockPulse, MissionId};

use crate::systems::missions::MissionSlot;
use crate::world::ColonyWorld;

/// Build the snapshot for the current tick. Missions appear in id order.
pub fn build_snapshot(
    missions: &BTreeMap<MissionId, MissionSlot>,
    colony: &ColonyWorld,
    pulse: ClockPulse,
    state: EngineState,
    events: Vec<MissionEvent>,
) -> MissionSnapshot {
    MissionSnapshot {
        tick: pulse.tick,
        time: pulse.time,
        state,
        missions: missions.values().map(|slot| slot.mission.view(colony)).collect(),
        events,
    }
}
