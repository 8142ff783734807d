//! Engine snapshot — the visible mission state after each tick.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::MissionEvent;
use crate::types::{AgentId, MarsTime, MissionId, VehicleId, Waypoint};

/// Complete mission state broadcast after each tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionSnapshot {
    pub tick: u64,
    pub time: MarsTime,
    pub state: EngineState,
    pub missions: Vec<MissionView>,
    /// Events emitted during this tick.
    pub events: Vec<MissionEvent>,
}

/// One mission as seen from outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionView {
    pub id: MissionId,
    pub kind: MissionKind,
    pub name: String,
    pub phase: Option<MissionPhase>,
    pub phase_description: String,
    pub done: bool,
    pub statuses: Vec<MissionStatus>,
    pub members: Vec<MemberView>,
    pub plan: Option<PlanStatus>,
    pub vehicle: Option<VehicleId>,
    pub waypoints: Vec<Waypoint>,
    /// Index of the next waypoint to reach.
    pub next_waypoint: usize,
    /// Remaining route length (km).
    pub remaining_distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    pub agent: AgentId,
    pub role: MemberRole,
}
