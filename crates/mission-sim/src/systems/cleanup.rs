//! Cleanup system: drops long-closed missions and stale trade deals.

use std::collections::BTreeMap;

use mission_core::constants::CLOSED_MISSION_RETENTION_TICKS;
use mission_core::types::{MarsTime, MissionId};

use crate::systems::missions::MissionSlot;
use crate::world::ColonyWorld;

/// Remove missions closed at least [`CLOSED_MISSION_RETENTION_TICKS`] ago.
/// Uses a pre-allocated buffer to avoid per-tick allocation.
pub fn run(
    missions: &mut BTreeMap<MissionId, MissionSlot>,
    colony: &mut ColonyWorld,
    tick: u64,
    now: MarsTime,
    despawn_buffer: &mut Vec<MissionId>,
) {
    despawn_buffer.clear();

    for (id, slot) in missions.iter() {
        if slot
            .closed_at
            .is_some_and(|closed| tick.saturating_sub(closed) >= CLOSED_MISSION_RETENTION_TICKS)
        {
            despawn_buffer.push(*id);
        }
    }

    for id in despawn_buffer.iter() {
        missions.remove(id);
    }

    colony.deals_mut().evict_stale(now);
}
