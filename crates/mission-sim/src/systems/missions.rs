//! Mission system: delivers the clock pulse to every open mission.

use std::collections::BTreeMap;

use tracing::debug;

use mission_core::types::MissionId;
use mission_orchestrator::{Mission, MissionContext};

/// A mission held by the engine, with the tick it closed on.
pub struct MissionSlot {
    pub mission: Mission,
    pub closed_at: Option<u64>,
}

impl MissionSlot {
    pub fn new(mission: Mission, tick: u64) -> Self {
        let closed_at = mission.is_done().then_some(tick);
        Self { mission, closed_at }
    }

    /// Record the closing tick the first time the mission is seen done.
    pub fn note_closed(&mut self, tick: u64) {
        if self.closed_at.is_none() && self.mission.is_done() {
            self.closed_at = Some(tick);
        }
    }
}

/// Perform one pulse of every open mission, in ascending id order, on behalf
/// of its lead.
pub fn run(missions: &mut BTreeMap<MissionId, MissionSlot>, ctx: &mut MissionContext<'_>) {
    for (id, slot) in missions.iter_mut() {
        if slot.mission.is_done() {
            continue;
        }
        let lead = slot.mission.core().lead();
        slot.mission.perform_mission(lead, ctx);
        slot.note_closed(ctx.pulse.tick);
        if slot.closed_at.is_some() {
            debug!(mission = %id, tick = ctx.pulse.tick, "mission closed");
        }
    }
}
