//! Mission lifecycle notifications for the audit log and presentation layer.
//!
//! Every state-changing mission operation emits exactly one event.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{AgentId, MissionId, SettlementId, VehicleId};

/// A single mission lifecycle notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionEvent {
    pub mission: MissionId,
    pub tick: u64,
    pub kind: MissionEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MissionEventKind {
    /// Mission created by its starting agent.
    Started {
        mission_kind: MissionKind,
        starter: AgentId,
    },
    MemberAdded {
        agent: AgentId,
        role: MemberRole,
    },
    MemberRemoved {
        agent: AgentId,
    },
    PhaseChanged {
        from: Option<MissionPhase>,
        to: MissionPhase,
    },
    StatusAdded {
        status: MissionStatus,
    },
    VehicleReserved {
        vehicle: VehicleId,
    },
    PlanReviewed {
        status: PlanStatus,
    },
    /// Route replaced after an emergency.
    Emergency {
        status: MissionStatus,
        destination: Option<SettlementId>,
    },
    /// Rescue vehicle reached its target.
    Rendezvous {
        rescuer: VehicleId,
        target: VehicleId,
    },
    Completed {
        statuses: Vec<MissionStatus>,
    },
}
