//! Collaborator interfaces and the per-tick mission context.
//!
//! The orchestrator never touches agents, vehicles or settlements directly.
//! It reads and mutates them through these narrow traits, which the
//! simulation host implements over its own storage. A [`MissionContext`]
//! bundles the collaborators with the clock pulse, the seeded RNG, the
//! event sink and the configuration, and is passed into every mission
//! constructor and tick call.

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use mission_core::config::MissionConfig;
use mission_core::enums::*;
use mission_core::events::{MissionEvent, MissionEventKind};
use mission_core::types::*;

use crate::ledger::ResourceLedger;

/// A mutation named an entity the colony does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColonyError {
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),
    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),
    #[error("unknown settlement {0}")]
    UnknownSettlement(SettlementId),
    #[error("vehicle {0} cannot tow {1}")]
    TowRejected(VehicleId, VehicleId),
}

/// Read-only view of a vehicle.
#[derive(Debug, Clone)]
pub struct VehicleInfo {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub name: String,
    pub home: SettlementId,
    pub location: Coordinates,
    pub parked_at: Option<SettlementId>,
    pub reserved: bool,
    pub crew_capacity: usize,
    pub cargo_capacity_kg: f64,
    pub fuel_capacity_kg: f64,
    pub base_speed_kmh: f64,
    pub fuel_efficiency_km_per_kg: f64,
    pub emergency_beacon: bool,
    pub towing: Option<VehicleId>,
    pub towed_by: Option<VehicleId>,
}

impl VehicleInfo {
    /// Range on a full tank (km).
    pub fn range_km(&self) -> f64 {
        self.fuel_capacity_kg * self.fuel_efficiency_km_per_kg
    }
}

/// Read-only view of a settlement.
#[derive(Debug, Clone)]
pub struct SettlementInfo {
    pub id: SettlementId,
    pub name: String,
    pub location: Coordinates,
    pub population: usize,
    /// Residents the settlement can house.
    pub capacity: usize,
}

/// A known surface location that may be explored or mined.
#[derive(Debug, Clone)]
pub struct ExploredSite {
    pub id: SiteId,
    pub location: Coordinates,
    pub settlement: Option<SettlementId>,
    pub explored: bool,
    pub claimed: bool,
    /// Estimated mineral concentration in percent; zero until explored.
    pub mineral_estimate: f64,
}

/// The best trade available from a settlement.
#[derive(Debug, Clone, Default)]
pub struct TradeDeal {
    pub buyer: Option<SettlementId>,
    pub profit: f64,
    /// Goods carried out and sold to the buyer.
    pub sell_load: BTreeMap<ResourceId, f64>,
    /// Goods bought from the buyer and brought home.
    pub buy_load: BTreeMap<ResourceId, f64>,
}

/// A construction site at a settlement.
#[derive(Debug, Clone)]
pub struct ConstructionSiteInfo {
    pub id: SiteId,
    pub settlement: SettlementId,
    pub stage: Option<String>,
    pub work_required: f64,
    pub work_done: f64,
    /// Materials the current stage consumes.
    pub materials: BTreeMap<ResourceId, f64>,
    pub materials_delivered: bool,
}

impl ConstructionSiteInfo {
    pub fn stage_complete(&self) -> bool {
        self.stage.is_some() && self.work_done >= self.work_required
    }
}

/// Agent collaborator: qualification, health, mission reference and tasks.
pub trait AgentDirectory {
    fn agent_settlement(&self, agent: AgentId) -> Option<SettlementId>;
    fn agent_mission(&self, agent: AgentId) -> Option<MissionId>;
    fn set_agent_mission(&mut self, agent: AgentId, mission: Option<MissionId>) -> Result<(), ColonyError>;
    /// No disqualifying health condition.
    fn is_fit_for_mission(&self, agent: AgentId) -> bool;
    fn has_medical_emergency(&self, agent: AgentId) -> bool;
    /// How suited the agent is to the mission kind, in `[0, 1]`.
    fn mission_qualification(&self, agent: AgentId, kind: MissionKind) -> f64;
    /// Opinion of `agent` about `other` in `[0, 100]`, if they know each other.
    fn opinion_of(&self, agent: AgentId, other: AgentId) -> Option<f64>;
    fn assign_task(&mut self, agent: AgentId, task: Task) -> Result<(), ColonyError>;
    fn current_task(&self, agent: AgentId) -> Option<Task>;
    fn clear_task(&mut self, agent: AgentId);
    fn aboard_vehicle(&self, agent: AgentId) -> Option<VehicleId>;
    fn relocate_agent(&mut self, agent: AgentId, settlement: SettlementId) -> Result<(), ColonyError>;
}

/// Vehicle collaborator: reservation, cargo, movement and towing.
pub trait VehicleFleet {
    fn vehicle(&self, id: VehicleId) -> Option<VehicleInfo>;
    fn vehicles(&self) -> Vec<VehicleId>;
    fn vehicles_parked_at(&self, settlement: SettlementId) -> Vec<VehicleId>;
    fn vehicle_occupants(&self, id: VehicleId) -> Vec<AgentId>;
    fn set_vehicle_reserved(&mut self, id: VehicleId, reserved: bool) -> Result<(), ColonyError>;
    fn vehicle_amount(&self, id: VehicleId, resource: ResourceId) -> f64;
    fn vehicle_equipment(&self, id: VehicleId, kind: EquipmentKind) -> u32;
    /// Mass of everything stored, equipment included (kg).
    fn vehicle_stored_mass(&self, id: VehicleId) -> f64;
    fn vehicle_cargo(&self, id: VehicleId) -> ResourceLedger;
    /// Store up to `amount`; returns what fit.
    fn store_in_vehicle(&mut self, id: VehicleId, resource: ResourceId, amount: f64) -> f64;
    /// Retrieve up to `amount`; returns what was available.
    fn retrieve_from_vehicle(&mut self, id: VehicleId, resource: ResourceId, amount: f64) -> f64;
    fn store_equipment_in_vehicle(&mut self, id: VehicleId, kind: EquipmentKind, count: u32) -> u32;
    fn retrieve_equipment_from_vehicle(&mut self, id: VehicleId, kind: EquipmentKind, count: u32) -> u32;
    fn move_vehicle(&mut self, id: VehicleId, location: Coordinates) -> Result<(), ColonyError>;
    fn park_vehicle(&mut self, id: VehicleId, settlement: Option<SettlementId>) -> Result<(), ColonyError>;
    fn hook_tow(&mut self, tower: VehicleId, towed: VehicleId) -> Result<(), ColonyError>;
    fn unhook_tow(&mut self, tower: VehicleId);
    fn set_emergency_beacon(&mut self, id: VehicleId, on: bool);
}

/// Settlement collaborator: population, stores, trade and construction.
pub trait SettlementRegistry {
    fn settlement(&self, id: SettlementId) -> Option<SettlementInfo>;
    fn settlements(&self) -> Vec<SettlementId>;
    fn indoor_agents(&self, id: SettlementId) -> Vec<AgentId>;
    fn settlement_amount(&self, id: SettlementId, resource: ResourceId) -> f64;
    fn settlement_equipment(&self, id: SettlementId, kind: EquipmentKind) -> u32;
    fn store_in_settlement(&mut self, id: SettlementId, resource: ResourceId, amount: f64);
    fn retrieve_from_settlement(&mut self, id: SettlementId, resource: ResourceId, amount: f64) -> f64;
    fn store_equipment_in_settlement(&mut self, id: SettlementId, kind: EquipmentKind, count: u32);
    fn retrieve_equipment_from_settlement(&mut self, id: SettlementId, kind: EquipmentKind, count: u32) -> u32;
    /// Best trade reachable from `from` with `vehicle`.
    fn best_deal(&mut self, from: SettlementId, vehicle: VehicleId, now: MarsTime) -> Option<TradeDeal>;
    fn unfinished_construction_site(&self, settlement: SettlementId) -> Option<ConstructionSiteInfo>;
    fn create_construction_site(&mut self, settlement: SettlementId) -> Option<ConstructionSiteInfo>;
    fn construction_site(&self, site: SiteId) -> Option<ConstructionSiteInfo>;
    /// Pick and start the next stage on a site; `None` when nothing can be built.
    fn start_next_construction_stage(&mut self, site: SiteId) -> Option<String>;
    fn mark_materials_delivered(&mut self, site: SiteId);
    /// Add work (millisols) to the current stage; returns the work now done.
    fn add_construction_work(&mut self, site: SiteId, amount: f64) -> f64;
    fn complete_construction_stage(&mut self, site: SiteId);
}

/// Surface collaborator: daylight and known sites.
pub trait SurfaceSites {
    fn solar_irradiance(&self, location: Coordinates, now: MarsTime) -> f64;
    fn mineral_concentration(&self, location: Coordinates) -> f64;
    fn explored_sites(&self) -> Vec<ExploredSite>;
    fn register_site(&mut self, location: Coordinates, settlement: Option<SettlementId>) -> SiteId;
    fn claim_site(&mut self, id: SiteId, claimed: bool);
    fn mark_explored(&mut self, id: SiteId, estimate: f64);
}

/// Everything a mission can reach in the colony.
pub trait Colony: AgentDirectory + VehicleFleet + SettlementRegistry + SurfaceSites {}

impl<T> Colony for T where T: AgentDirectory + VehicleFleet + SettlementRegistry + SurfaceSites {}

/// Explicit context passed into every mission constructor and tick call.
pub struct MissionContext<'a> {
    pub colony: &'a mut dyn Colony,
    pub pulse: ClockPulse,
    pub rng: &'a mut ChaCha8Rng,
    pub events: &'a mut Vec<MissionEvent>,
    pub config: &'a MissionConfig,
}

impl MissionContext<'_> {
    pub fn now(&self) -> MarsTime {
        self.pulse.time
    }

    /// Record one lifecycle notification.
    pub fn emit(&mut self, mission: MissionId, kind: MissionEventKind) {
        self.events.push(MissionEvent {
            mission,
            tick: self.pulse.tick,
            kind,
        });
    }
}
