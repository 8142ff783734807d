//! ECS components for colony entities.
//!
//! Components are plain data. Behaviour lives in the world's trait
//! implementations and in the systems.

use std::collections::BTreeMap;

use mission_core::enums::{MissionKind, Task};
use mission_core::types::*;
use mission_orchestrator::context::ConstructionSiteInfo;
use mission_orchestrator::ledger::ResourceLedger;

/// Identity of a colonist.
#[derive(Debug, Clone)]
pub struct Colonist {
    pub id: AgentId,
    pub name: String,
}

/// Where a colonist is: the settlement they belong to and the vehicle they
/// sit in, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct Whereabouts {
    pub settlement: Option<SettlementId>,
    pub aboard: Option<VehicleId>,
}

#[derive(Debug, Clone, Copy)]
pub struct Health {
    pub fit: bool,
    pub medical_emergency: bool,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            fit: true,
            medical_emergency: false,
        }
    }
}

/// Mission qualification in `[0, 1]`, with per-kind overrides.
#[derive(Debug, Clone, Default)]
pub struct Skills {
    pub base: f64,
    pub by_kind: BTreeMap<MissionKind, f64>,
}

/// Opinions of other colonists in `[0, 100]`.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    pub opinions: BTreeMap<AgentId, f64>,
}

/// Mission membership and the task currently pushed by it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Assignment {
    pub mission: Option<MissionId>,
    pub task: Option<Task>,
    /// Millisols spent on the current task.
    pub task_elapsed: f64,
}

/// Cargo hold of a vehicle.
#[derive(Debug, Clone, Default)]
pub struct Cargo(pub ResourceLedger);

/// Identity and housing of a settlement.
#[derive(Debug, Clone)]
pub struct Habitat {
    pub id: SettlementId,
    pub name: String,
    pub location: Coordinates,
    pub capacity: usize,
}

/// Settlement stores.
#[derive(Debug, Clone, Default)]
pub struct Stores(pub ResourceLedger);

/// A construction site and its progress through the stage list.
#[derive(Debug, Clone)]
pub struct Construction {
    pub info: ConstructionSiteInfo,
    /// Index of the next stage to start.
    pub next_stage: usize,
    pub finished: bool,
}
