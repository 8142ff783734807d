//! In-memory colony and test harness for orchestrator tests.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use mission_core::config::MissionConfig;
use mission_core::constants::DEFAULT_PULSE_MILLISOLS;
use mission_core::enums::*;
use mission_core::events::MissionEvent;
use mission_core::types::*;

use crate::context::*;
use crate::ledger::ResourceLedger;
use crate::mission::Mission;

pub struct FakeAgent {
    pub settlement: Option<SettlementId>,
    pub mission: Option<MissionId>,
    pub fit: bool,
    pub medical: bool,
    pub qualification: f64,
    pub task: Option<Task>,
    pub aboard: Option<VehicleId>,
}

pub struct FakeVehicle {
    pub info: VehicleInfo,
    pub cargo: ResourceLedger,
}

pub struct FakeSettlement {
    pub info: SettlementInfo,
    pub stores: ResourceLedger,
}

#[derive(Default)]
pub struct FakeColony {
    pub agents: BTreeMap<AgentId, FakeAgent>,
    pub opinions: BTreeMap<(AgentId, AgentId), f64>,
    pub vehicles: BTreeMap<VehicleId, FakeVehicle>,
    pub settlements: BTreeMap<SettlementId, FakeSettlement>,
    pub deal: Option<TradeDeal>,
    pub sites: Vec<ExploredSite>,
    pub construction: BTreeMap<SiteId, ConstructionSiteInfo>,
    pub irradiance: f64,
    pub concentration: f64,
    next_id: u32,
}

impl FakeColony {
    pub fn new() -> Self {
        Self {
            irradiance: 500.0,
            concentration: 10.0,
            ..Self::default()
        }
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_settlement(&mut self, name: &str, location: Coordinates, capacity: usize) -> SettlementId {
        let id = SettlementId(self.next());
        self.settlements.insert(
            id,
            FakeSettlement {
                info: SettlementInfo {
                    id,
                    name: name.to_string(),
                    location,
                    population: 0,
                    capacity,
                },
                stores: ResourceLedger::new(),
            },
        );
        id
    }

    pub fn add_agent(&mut self, settlement: SettlementId, qualification: f64) -> AgentId {
        let id = AgentId(self.next());
        self.agents.insert(
            id,
            FakeAgent {
                settlement: Some(settlement),
                mission: None,
                fit: true,
                medical: false,
                qualification,
                task: None,
                aboard: None,
            },
        );
        if let Some(s) = self.settlements.get_mut(&settlement) {
            s.info.population += 1;
        }
        id
    }

    pub fn add_vehicle(&mut self, settlement: SettlementId, kind: VehicleKind) -> VehicleId {
        let id = VehicleId(self.next());
        let location = self.settlements[&settlement].info.location;
        let (crew_capacity, cargo_capacity_kg) = match kind {
            VehicleKind::Rover => (8, 5000.0),
            VehicleKind::Drone => (0, 500.0),
            VehicleKind::LightUtility => (1, 100.0),
        };
        self.vehicles.insert(
            id,
            FakeVehicle {
                info: VehicleInfo {
                    id,
                    kind,
                    name: format!("{kind:?} {}", id.0),
                    home: settlement,
                    location,
                    parked_at: Some(settlement),
                    reserved: false,
                    crew_capacity,
                    cargo_capacity_kg,
                    fuel_capacity_kg: 100.0,
                    base_speed_kmh: 30.0,
                    fuel_efficiency_km_per_kg: 2.0,
                    emergency_beacon: false,
                    towing: None,
                    towed_by: None,
                },
                cargo: ResourceLedger::new(),
            },
        );
        id
    }

    /// Fill a settlement with plenty of everything a trip draws on.
    pub fn stock(&mut self, settlement: SettlementId) {
        if let Some(s) = self.settlements.get_mut(&settlement) {
            for resource in [
                ResourceId::Oxygen,
                ResourceId::Water,
                ResourceId::Food,
                ResourceId::Methane,
                ResourceId::SpareParts,
            ] {
                s.stores.add_resource(resource, 10_000.0);
            }
            for kind in [
                EquipmentKind::EvaSuit,
                EquipmentKind::SpecimenBox,
                EquipmentKind::LargeBag,
            ] {
                s.stores.add_equipment(kind, 20);
            }
        }
    }

    fn settlement_store(&mut self, id: SettlementId) -> Option<&mut ResourceLedger> {
        self.settlements.get_mut(&id).map(|s| &mut s.stores)
    }
}

impl AgentDirectory for FakeColony {
    fn agent_settlement(&self, agent: AgentId) -> Option<SettlementId> {
        self.agents.get(&agent)?.settlement
    }

    fn agent_mission(&self, agent: AgentId) -> Option<MissionId> {
        self.agents.get(&agent)?.mission
    }

    fn set_agent_mission(&mut self, agent: AgentId, mission: Option<MissionId>) -> Result<(), ColonyError> {
        let a = self.agents.get_mut(&agent).ok_or(ColonyError::UnknownAgent(agent))?;
        a.mission = mission;
        Ok(())
    }

    fn is_fit_for_mission(&self, agent: AgentId) -> bool {
        self.agents.get(&agent).is_some_and(|a| a.fit)
    }

    fn has_medical_emergency(&self, agent: AgentId) -> bool {
        self.agents.get(&agent).is_some_and(|a| a.medical)
    }

    fn mission_qualification(&self, agent: AgentId, _kind: MissionKind) -> f64 {
        self.agents.get(&agent).map_or(0.0, |a| a.qualification)
    }

    fn opinion_of(&self, agent: AgentId, other: AgentId) -> Option<f64> {
        self.opinions.get(&(agent, other)).copied()
    }

    fn assign_task(&mut self, agent: AgentId, task: Task) -> Result<(), ColonyError> {
        let a = self.agents.get_mut(&agent).ok_or(ColonyError::UnknownAgent(agent))?;
        match task {
            Task::Board { vehicle } => {
                a.aboard = Some(vehicle);
                a.task = None;
            }
            Task::Disembark { .. } => {
                a.aboard = None;
                a.task = None;
            }
            other => a.task = Some(other),
        }
        Ok(())
    }

    fn current_task(&self, agent: AgentId) -> Option<Task> {
        self.agents.get(&agent)?.task
    }

    fn clear_task(&mut self, agent: AgentId) {
        if let Some(a) = self.agents.get_mut(&agent) {
            a.task = None;
        }
    }

    fn aboard_vehicle(&self, agent: AgentId) -> Option<VehicleId> {
        self.agents.get(&agent)?.aboard
    }

    fn relocate_agent(&mut self, agent: AgentId, settlement: SettlementId) -> Result<(), ColonyError> {
        if !self.settlements.contains_key(&settlement) {
            return Err(ColonyError::UnknownSettlement(settlement));
        }
        let a = self.agents.get_mut(&agent).ok_or(ColonyError::UnknownAgent(agent))?;
        let previous = a.settlement.replace(settlement);
        a.aboard = None;
        if previous != Some(settlement) {
            if let Some(old) = previous.and_then(|p| self.settlements.get_mut(&p)) {
                old.info.population = old.info.population.saturating_sub(1);
            }
            if let Some(new) = self.settlements.get_mut(&settlement) {
                new.info.population += 1;
            }
        }
        Ok(())
    }
}

impl VehicleFleet for FakeColony {
    fn vehicle(&self, id: VehicleId) -> Option<VehicleInfo> {
        self.vehicles.get(&id).map(|v| v.info.clone())
    }

    fn vehicles(&self) -> Vec<VehicleId> {
        self.vehicles.keys().copied().collect()
    }

    fn vehicles_parked_at(&self, settlement: SettlementId) -> Vec<VehicleId> {
        self.vehicles
            .values()
            .filter(|v| v.info.parked_at == Some(settlement))
            .map(|v| v.info.id)
            .collect()
    }

    fn vehicle_occupants(&self, id: VehicleId) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|(_, a)| a.aboard == Some(id))
            .map(|(id, _)| *id)
            .collect()
    }

    fn set_vehicle_reserved(&mut self, id: VehicleId, reserved: bool) -> Result<(), ColonyError> {
        let v = self.vehicles.get_mut(&id).ok_or(ColonyError::UnknownVehicle(id))?;
        v.info.reserved = reserved;
        Ok(())
    }

    fn vehicle_amount(&self, id: VehicleId, resource: ResourceId) -> f64 {
        self.vehicles.get(&id).map_or(0.0, |v| v.cargo.resource(resource))
    }

    fn vehicle_equipment(&self, id: VehicleId, kind: EquipmentKind) -> u32 {
        self.vehicles.get(&id).map_or(0, |v| v.cargo.equipment(kind))
    }

    fn vehicle_stored_mass(&self, id: VehicleId) -> f64 {
        self.vehicles.get(&id).map_or(0.0, |v| v.cargo.total_mass())
    }

    fn vehicle_cargo(&self, id: VehicleId) -> ResourceLedger {
        self.vehicles.get(&id).map(|v| v.cargo.clone()).unwrap_or_default()
    }

    fn store_in_vehicle(&mut self, id: VehicleId, resource: ResourceId, amount: f64) -> f64 {
        let Some(v) = self.vehicles.get_mut(&id) else {
            return 0.0;
        };
        let free = (v.info.cargo_capacity_kg - v.cargo.total_mass()).max(0.0);
        let stored = amount.max(0.0).min(free);
        v.cargo.add_resource(resource, stored);
        stored
    }

    fn retrieve_from_vehicle(&mut self, id: VehicleId, resource: ResourceId, amount: f64) -> f64 {
        self.vehicles
            .get_mut(&id)
            .map_or(0.0, |v| v.cargo.remove_resource(resource, amount))
    }

    fn store_equipment_in_vehicle(&mut self, id: VehicleId, kind: EquipmentKind, count: u32) -> u32 {
        let Some(v) = self.vehicles.get_mut(&id) else {
            return 0;
        };
        let free = (v.info.cargo_capacity_kg - v.cargo.total_mass()).max(0.0);
        let fits = (free / kind.mass()).floor() as u32;
        let stored = count.min(fits);
        v.cargo.add_equipment(kind, stored);
        stored
    }

    fn retrieve_equipment_from_vehicle(&mut self, id: VehicleId, kind: EquipmentKind, count: u32) -> u32 {
        self.vehicles
            .get_mut(&id)
            .map_or(0, |v| v.cargo.remove_equipment(kind, count))
    }

    fn move_vehicle(&mut self, id: VehicleId, location: Coordinates) -> Result<(), ColonyError> {
        let v = self.vehicles.get_mut(&id).ok_or(ColonyError::UnknownVehicle(id))?;
        v.info.location = location;
        if let Some(towed) = v.info.towing {
            if let Some(t) = self.vehicles.get_mut(&towed) {
                t.info.location = location;
            }
        }
        Ok(())
    }

    fn park_vehicle(&mut self, id: VehicleId, settlement: Option<SettlementId>) -> Result<(), ColonyError> {
        let v = self.vehicles.get_mut(&id).ok_or(ColonyError::UnknownVehicle(id))?;
        v.info.parked_at = settlement;
        Ok(())
    }

    fn hook_tow(&mut self, tower: VehicleId, towed: VehicleId) -> Result<(), ColonyError> {
        if tower == towed || !self.vehicles.contains_key(&towed) {
            return Err(ColonyError::TowRejected(tower, towed));
        }
        let t = self.vehicles.get_mut(&tower).ok_or(ColonyError::UnknownVehicle(tower))?;
        t.info.towing = Some(towed);
        if let Some(v) = self.vehicles.get_mut(&towed) {
            v.info.towed_by = Some(tower);
            v.info.parked_at = None;
        }
        Ok(())
    }

    fn unhook_tow(&mut self, tower: VehicleId) {
        let Some(t) = self.vehicles.get_mut(&tower) else {
            return;
        };
        let parked_at = t.info.parked_at;
        if let Some(towed) = t.info.towing.take() {
            if let Some(v) = self.vehicles.get_mut(&towed) {
                v.info.towed_by = None;
                v.info.parked_at = parked_at;
            }
        }
    }

    fn set_emergency_beacon(&mut self, id: VehicleId, on: bool) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.info.emergency_beacon = on;
        }
    }
}

impl SettlementRegistry for FakeColony {
    fn settlement(&self, id: SettlementId) -> Option<SettlementInfo> {
        self.settlements.get(&id).map(|s| s.info.clone())
    }

    fn settlements(&self) -> Vec<SettlementId> {
        self.settlements.keys().copied().collect()
    }

    fn indoor_agents(&self, id: SettlementId) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|(_, a)| a.settlement == Some(id) && a.aboard.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    fn settlement_amount(&self, id: SettlementId, resource: ResourceId) -> f64 {
        self.settlements.get(&id).map_or(0.0, |s| s.stores.resource(resource))
    }

    fn settlement_equipment(&self, id: SettlementId, kind: EquipmentKind) -> u32 {
        self.settlements.get(&id).map_or(0, |s| s.stores.equipment(kind))
    }

    fn store_in_settlement(&mut self, id: SettlementId, resource: ResourceId, amount: f64) {
        if let Some(store) = self.settlement_store(id) {
            store.add_resource(resource, amount);
        }
    }

    fn retrieve_from_settlement(&mut self, id: SettlementId, resource: ResourceId, amount: f64) -> f64 {
        self.settlement_store(id)
            .map_or(0.0, |store| store.remove_resource(resource, amount))
    }

    fn store_equipment_in_settlement(&mut self, id: SettlementId, kind: EquipmentKind, count: u32) {
        if let Some(store) = self.settlement_store(id) {
            store.add_equipment(kind, count);
        }
    }

    fn retrieve_equipment_from_settlement(&mut self, id: SettlementId, kind: EquipmentKind, count: u32) -> u32 {
        self.settlement_store(id)
            .map_or(0, |store| store.remove_equipment(kind, count))
    }

    fn best_deal(&mut self, _from: SettlementId, _vehicle: VehicleId, _now: MarsTime) -> Option<TradeDeal> {
        self.deal.clone()
    }

    fn unfinished_construction_site(&self, settlement: SettlementId) -> Option<ConstructionSiteInfo> {
        self.construction
            .values()
            .find(|s| s.settlement == settlement)
            .cloned()
    }

    fn create_construction_site(&mut self, settlement: SettlementId) -> Option<ConstructionSiteInfo> {
        let id = SiteId(self.next());
        let site = ConstructionSiteInfo {
            id,
            settlement,
            stage: None,
            work_required: 0.0,
            work_done: 0.0,
            materials: BTreeMap::new(),
            materials_delivered: false,
        };
        self.construction.insert(id, site.clone());
        Some(site)
    }

    fn construction_site(&self, site: SiteId) -> Option<ConstructionSiteInfo> {
        self.construction.get(&site).cloned()
    }

    fn start_next_construction_stage(&mut self, site: SiteId) -> Option<String> {
        let s = self.construction.get_mut(&site)?;
        s.stage = Some("Foundation".to_string());
        s.work_required = 100.0;
        s.work_done = 0.0;
        s.materials = BTreeMap::from([(ResourceId::ConstructionMaterials, 50.0)]);
        s.materials_delivered = false;
        s.stage.clone()
    }

    fn mark_materials_delivered(&mut self, site: SiteId) {
        if let Some(s) = self.construction.get_mut(&site) {
            s.materials_delivered = true;
        }
    }

    fn add_construction_work(&mut self, site: SiteId, amount: f64) -> f64 {
        self.construction.get_mut(&site).map_or(0.0, |s| {
            s.work_done += amount.max(0.0);
            s.work_done
        })
    }

    fn complete_construction_stage(&mut self, site: SiteId) {
        self.construction.remove(&site);
    }
}

impl SurfaceSites for FakeColony {
    fn solar_irradiance(&self, _location: Coordinates, _now: MarsTime) -> f64 {
        self.irradiance
    }

    fn mineral_concentration(&self, _location: Coordinates) -> f64 {
        self.concentration
    }

    fn explored_sites(&self) -> Vec<ExploredSite> {
        self.sites.clone()
    }

    fn register_site(&mut self, location: Coordinates, settlement: Option<SettlementId>) -> SiteId {
        let id = SiteId(self.next());
        self.sites.push(ExploredSite {
            id,
            location,
            settlement,
            explored: false,
            claimed: false,
            mineral_estimate: 0.0,
        });
        id
    }

    fn claim_site(&mut self, id: SiteId, claimed: bool) {
        if let Some(s) = self.sites.iter_mut().find(|s| s.id == id) {
            s.claimed = claimed;
        }
    }

    fn mark_explored(&mut self, id: SiteId, estimate: f64) {
        if let Some(s) = self.sites.iter_mut().find(|s| s.id == id) {
            s.explored = true;
            s.mineral_estimate = estimate;
        }
    }
}

/// Colony, clock, RNG and event sink for driving missions by hand.
pub struct Harness {
    pub colony: FakeColony,
    pub config: MissionConfig,
    pub rng: ChaCha8Rng,
    pub events: Vec<MissionEvent>,
    pub pulse: ClockPulse,
}

impl Harness {
    pub fn new(colony: FakeColony) -> Self {
        let mut config = MissionConfig::default();
        config.approval.auto_approve = true;
        Self {
            colony,
            config,
            rng: ChaCha8Rng::seed_from_u64(7),
            events: Vec::new(),
            pulse: ClockPulse::default(),
        }
    }

    pub fn ctx(&mut self) -> MissionContext<'_> {
        MissionContext {
            colony: &mut self.colony,
            pulse: self.pulse,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
        }
    }

    pub fn start(&mut self, id: u32, kind: MissionKind, starter: AgentId) -> Mission {
        Mission::start(MissionId(id), kind, starter, &mut self.ctx())
    }

    /// Advance the clock one pulse and tick the mission for its lead.
    pub fn tick(&mut self, mission: &mut Mission) {
        self.pulse = self.pulse.next(DEFAULT_PULSE_MILLISOLS);
        let lead = mission.core().lead();
        mission.perform_mission(lead, &mut self.ctx());
    }

    /// Tick until the mission closes or `max_ticks` pass.
    pub fn run(&mut self, mission: &mut Mission, max_ticks: u32) {
        for _ in 0..max_ticks {
            if mission.is_done() {
                break;
            }
            self.tick(mission);
        }
    }
}
