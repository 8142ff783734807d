//! Commands sent to the mission engine.
//!
//! Commands are queued and processed at the next tick boundary.

use serde::{Deserialize, Serialize};

use crate::enums::MissionKind;
use crate::types::{AgentId, MissionId};

/// All external actions the engine accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MissionCommand {
    /// An agent decided to start a mission of the given kind.
    StartMission { kind: MissionKind, starter: AgentId },
    /// Approve or reject a plan awaiting review.
    ReviewPlan { mission: MissionId, approve: bool },
    /// Abort a mission; travelling missions return home first.
    AbortMission { mission: MissionId },
    /// Pause the clock.
    Pause,
    /// Resume the clock.
    Resume,
}
