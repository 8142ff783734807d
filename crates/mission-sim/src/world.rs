//! The colony world: hecs storage for agents, vehicles, settlements and
//! sites, with the orchestrator's collaborator traits implemented over it.

use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

use hecs::{Component, Entity, World};

use mission_core::constants::MILLISOLS_PER_SOL;
use mission_core::enums::*;
use mission_core::types::*;
use mission_orchestrator::context::*;
use mission_orchestrator::ledger::ResourceLedger;

use crate::components::*;
use crate::market::{evaluate_best_deal, DealCache, Market};

/// Noon irradiance at the equator (W/m²).
pub const PEAK_IRRADIANCE: f64 = 590.0;

/// Mean mineral concentration of the surface (percent).
pub const MINERAL_BASE_PERCENT: f64 = 10.0;

/// Share of a vehicle's cargo capacity offered to a trade deal, each way.
pub const TRADE_CARGO_SHARE: f64 = 0.5;

/// Construction stages built in order on every site.
pub struct StageSpec {
    pub name: &'static str,
    pub work_millisols: f64,
    pub materials_kg: f64,
}

pub const CONSTRUCTION_STAGES: [StageSpec; 3] = [
    StageSpec {
        name: "Foundation",
        work_millisols: 150.0,
        materials_kg: 100.0,
    },
    StageSpec {
        name: "Frame",
        work_millisols: 250.0,
        materials_kg: 150.0,
    },
    StageSpec {
        name: "Habitat Module",
        work_millisols: 400.0,
        materials_kg: 200.0,
    },
];

/// Static description of a vehicle to spawn.
#[derive(Debug, Clone)]
pub struct VehicleSpec {
    pub kind: VehicleKind,
    pub name: String,
    pub crew_capacity: usize,
    pub cargo_capacity_kg: f64,
    pub fuel_capacity_kg: f64,
    pub base_speed_kmh: f64,
    pub fuel_efficiency_km_per_kg: f64,
}

/// Solar irradiance on a sphere lit from a sun that circles once per sol.
/// Local midnight is at millisol 0 on the prime meridian.
pub fn irradiance_at(location: Coordinates, now: MarsTime) -> f64 {
    let local = (now.millisol_of_sol() + location.lon / TAU * MILLISOLS_PER_SOL).rem_euclid(MILLISOLS_PER_SOL);
    let sun = (PI * (local - 250.0) / 500.0).sin();
    (PEAK_IRRADIANCE * sun * location.lat.cos()).max(0.0)
}

/// Deterministic mineral field in `[0, 2 × MINERAL_BASE_PERCENT]`.
pub fn mineral_field(location: Coordinates) -> f64 {
    let ripple = (location.lat * 170.0).sin() * (location.lon * 230.0).cos();
    MINERAL_BASE_PERCENT * (1.0 + ripple)
}

/// hecs-backed colony. Id indices are ordered maps so every iteration the
/// missions observe is deterministic.
pub struct ColonyWorld {
    world: World,
    agents: BTreeMap<AgentId, Entity>,
    vehicles: BTreeMap<VehicleId, Entity>,
    settlements: BTreeMap<SettlementId, Entity>,
    sites: BTreeMap<SiteId, Entity>,
    construction: BTreeMap<SiteId, Entity>,
    next_id: u32,
    deals: DealCache,
}

impl ColonyWorld {
    pub fn new(deal_ttl_millisols: f64) -> Self {
        Self {
            world: World::new(),
            agents: BTreeMap::new(),
            vehicles: BTreeMap::new(),
            settlements: BTreeMap::new(),
            sites: BTreeMap::new(),
            construction: BTreeMap::new(),
            next_id: 0,
            deals: DealCache::new(deal_ttl_millisols),
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Read-only access to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub(crate) fn deals_mut(&mut self) -> &mut DealCache {
        &mut self.deals
    }

    // --- Spawning ---

    pub fn add_settlement(&mut self, name: &str, location: Coordinates, capacity: usize) -> SettlementId {
        let id = SettlementId(self.next_id());
        let entity = self.world.spawn((
            Habitat {
                id,
                name: name.to_string(),
                location,
                capacity,
            },
            Stores::default(),
        ));
        self.settlements.insert(id, entity);
        id
    }

    pub fn add_agent(&mut self, name: &str, settlement: SettlementId, skills: Skills) -> AgentId {
        let id = AgentId(self.next_id());
        let entity = self.world.spawn((
            Colonist {
                id,
                name: name.to_string(),
            },
            Whereabouts {
                settlement: Some(settlement),
                aboard: None,
            },
            Health::default(),
            skills,
            Relationships::default(),
            Assignment::default(),
        ));
        self.agents.insert(id, entity);
        id
    }

    /// Spawn a vehicle parked at `settlement`. `None` for an unknown settlement.
    pub fn add_vehicle(&mut self, spec: VehicleSpec, settlement: SettlementId) -> Option<VehicleId> {
        let location = self.habitat(settlement)?.location;
        let id = VehicleId(self.next_id());
        let info = VehicleInfo {
            id,
            kind: spec.kind,
            name: spec.name,
            home: settlement,
            location,
            parked_at: Some(settlement),
            reserved: false,
            crew_capacity: spec.crew_capacity,
            cargo_capacity_kg: spec.cargo_capacity_kg,
            fuel_capacity_kg: spec.fuel_capacity_kg,
            base_speed_kmh: spec.base_speed_kmh,
            fuel_efficiency_km_per_kg: spec.fuel_efficiency_km_per_kg,
            emergency_beacon: false,
            towing: None,
            towed_by: None,
        };
        let entity = self.world.spawn((info, Cargo::default()));
        self.vehicles.insert(id, entity);
        Some(id)
    }

    pub fn stock(&mut self, settlement: SettlementId, resource: ResourceId, amount: f64) {
        if let Some(mut stores) = self.settlement_component::<Stores>(settlement) {
            stores.0.add_resource(resource, amount);
        }
    }

    pub fn stock_equipment(&mut self, settlement: SettlementId, kind: EquipmentKind, count: u32) {
        if let Some(mut stores) = self.settlement_component::<Stores>(settlement) {
            stores.0.add_equipment(kind, count);
        }
    }

    pub fn set_opinion(&mut self, agent: AgentId, other: AgentId, opinion: f64) {
        if let Some(mut rel) = self.agent_component::<Relationships>(agent) {
            rel.opinions.insert(other, opinion.clamp(0.0, 100.0));
        }
    }

    pub fn set_medical_emergency(&mut self, agent: AgentId, emergency: bool) {
        if let Some(mut health) = self.agent_component::<Health>(agent) {
            health.medical_emergency = emergency;
        }
    }

    pub fn set_fit(&mut self, agent: AgentId, fit: bool) {
        if let Some(mut health) = self.agent_component::<Health>(agent) {
            health.fit = fit;
        }
    }

    /// Leave a vehicle out on the surface with `crew` aboard and its beacon on.
    pub fn strand_vehicle(&mut self, id: VehicleId, location: Coordinates, crew: &[AgentId]) -> Result<(), ColonyError> {
        {
            let mut info = self.vehicle_mut(id)?;
            info.location = location;
            info.parked_at = None;
            info.emergency_beacon = true;
        }
        for agent in crew {
            let mut place = self
                .agent_component::<Whereabouts>(*agent)
                .ok_or(ColonyError::UnknownAgent(*agent))?;
            place.aboard = Some(id);
        }
        Ok(())
    }

    // --- Lookups ---

    fn agent_component<T: Component>(&self, id: AgentId) -> Option<hecs::RefMut<'_, T>> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<&mut T>(entity).ok()
    }

    fn agent_ref<T: Component>(&self, id: AgentId) -> Option<hecs::Ref<'_, T>> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<&T>(entity).ok()
    }

    fn settlement_component<T: Component>(&self, id: SettlementId) -> Option<hecs::RefMut<'_, T>> {
        let entity = *self.settlements.get(&id)?;
        self.world.get::<&mut T>(entity).ok()
    }

    fn habitat(&self, id: SettlementId) -> Option<hecs::Ref<'_, Habitat>> {
        let entity = *self.settlements.get(&id)?;
        self.world.get::<&Habitat>(entity).ok()
    }

    fn vehicle_ref(&self, id: VehicleId) -> Option<hecs::Ref<'_, VehicleInfo>> {
        let entity = *self.vehicles.get(&id)?;
        self.world.get::<&VehicleInfo>(entity).ok()
    }

    fn vehicle_mut(&self, id: VehicleId) -> Result<hecs::RefMut<'_, VehicleInfo>, ColonyError> {
        let entity = *self.vehicles.get(&id).ok_or(ColonyError::UnknownVehicle(id))?;
        self.world
            .get::<&mut VehicleInfo>(entity)
            .map_err(|_| ColonyError::UnknownVehicle(id))
    }

    fn cargo(&self, id: VehicleId) -> Option<hecs::RefMut<'_, Cargo>> {
        let entity = *self.vehicles.get(&id)?;
        self.world.get::<&mut Cargo>(entity).ok()
    }

    fn site_mut(&self, id: SiteId) -> Option<hecs::RefMut<'_, ExploredSite>> {
        let entity = *self.sites.get(&id)?;
        self.world.get::<&mut ExploredSite>(entity).ok()
    }

    fn construction_mut(&self, id: SiteId) -> Option<hecs::RefMut<'_, Construction>> {
        let entity = *self.construction.get(&id)?;
        self.world.get::<&mut Construction>(entity).ok()
    }

    /// Agents matching `filter` on their whereabouts, in id order.
    fn agents_where(&self, filter: impl Fn(&Whereabouts) -> bool) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|(_, entity)| {
                self.world
                    .get::<&Whereabouts>(**entity)
                    .is_ok_and(|place| filter(&*place))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn markets(&self) -> Vec<Market> {
        self.settlements
            .values()
            .filter_map(|entity| {
                let habitat = self.world.get::<&Habitat>(*entity).ok()?;
                let stores = self.world.get::<&Stores>(*entity).ok()?;
                Some(Market {
                    id: habitat.id,
                    location: habitat.location,
                    stock: stores.0.resources().collect(),
                })
            })
            .collect()
    }

    /// Ids of every agent, in order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn agent_name(&self, id: AgentId) -> Option<String> {
        self.agent_ref::<Colonist>(id).map(|c| c.name.clone())
    }

    /// Construction sites, finished or not.
    pub fn construction_sites(&self) -> Vec<SiteId> {
        self.construction.keys().copied().collect()
    }

    pub fn is_construction_finished(&self, site: SiteId) -> bool {
        self.construction_mut(site).is_some_and(|c| c.finished)
    }
}

impl AgentDirectory for ColonyWorld {
    fn agent_settlement(&self, agent: AgentId) -> Option<SettlementId> {
        self.agent_ref::<Whereabouts>(agent)?.settlement
    }

    fn agent_mission(&self, agent: AgentId) -> Option<MissionId> {
        self.agent_ref::<Assignment>(agent)?.mission
    }

    fn set_agent_mission(&mut self, agent: AgentId, mission: Option<MissionId>) -> Result<(), ColonyError> {
        let mut assignment = self
            .agent_component::<Assignment>(agent)
            .ok_or(ColonyError::UnknownAgent(agent))?;
        assignment.mission = mission;
        Ok(())
    }

    fn is_fit_for_mission(&self, agent: AgentId) -> bool {
        self.agent_ref::<Health>(agent).is_some_and(|h| h.fit && !h.medical_emergency)
    }

    fn has_medical_emergency(&self, agent: AgentId) -> bool {
        self.agent_ref::<Health>(agent).is_some_and(|h| h.medical_emergency)
    }

    fn mission_qualification(&self, agent: AgentId, kind: MissionKind) -> f64 {
        self.agent_ref::<Skills>(agent).map_or(0.0, |s| {
            s.by_kind.get(&kind).copied().unwrap_or(s.base).clamp(0.0, 1.0)
        })
    }

    fn opinion_of(&self, agent: AgentId, other: AgentId) -> Option<f64> {
        self.agent_ref::<Relationships>(agent)?.opinions.get(&other).copied()
    }

    /// Tasks take effect in the task system; assigning only records them.
    fn assign_task(&mut self, agent: AgentId, task: Task) -> Result<(), ColonyError> {
        let mut assignment = self
            .agent_component::<Assignment>(agent)
            .ok_or(ColonyError::UnknownAgent(agent))?;
        if assignment.task != Some(task) {
            assignment.task = Some(task);
            assignment.task_elapsed = 0.0;
        }
        Ok(())
    }

    fn current_task(&self, agent: AgentId) -> Option<Task> {
        self.agent_ref::<Assignment>(agent)?.task
    }

    fn clear_task(&mut self, agent: AgentId) {
        if let Some(mut assignment) = self.agent_component::<Assignment>(agent) {
            assignment.task = None;
        }
    }

    fn aboard_vehicle(&self, agent: AgentId) -> Option<VehicleId> {
        self.agent_ref::<Whereabouts>(agent)?.aboard
    }

    fn relocate_agent(&mut self, agent: AgentId, settlement: SettlementId) -> Result<(), ColonyError> {
        if !self.settlements.contains_key(&settlement) {
            return Err(ColonyError::UnknownSettlement(settlement));
        }
        let mut place = self
            .agent_component::<Whereabouts>(agent)
            .ok_or(ColonyError::UnknownAgent(agent))?;
        place.settlement = Some(settlement);
        place.aboard = None;
        Ok(())
    }
}

impl VehicleFleet for ColonyWorld {
    fn vehicle(&self, id: VehicleId) -> Option<VehicleInfo> {
        self.vehicle_ref(id).map(|v| VehicleInfo::clone(&v))
    }

    fn vehicles(&self) -> Vec<VehicleId> {
        self.vehicles.keys().copied().collect()
    }

    fn vehicles_parked_at(&self, settlement: SettlementId) -> Vec<VehicleId> {
        self.vehicles
            .keys()
            .filter(|id| self.vehicle_ref(**id).is_some_and(|v| v.parked_at == Some(settlement)))
            .copied()
            .collect()
    }

    fn vehicle_occupants(&self, id: VehicleId) -> Vec<AgentId> {
        self.agents_where(|place| place.aboard == Some(id))
    }

    fn set_vehicle_reserved(&mut self, id: VehicleId, reserved: bool) -> Result<(), ColonyError> {
        self.vehicle_mut(id)?.reserved = reserved;
        Ok(())
    }

    fn vehicle_amount(&self, id: VehicleId, resource: ResourceId) -> f64 {
        self.cargo(id).map_or(0.0, |c| c.0.resource(resource))
    }

    fn vehicle_equipment(&self, id: VehicleId, kind: EquipmentKind) -> u32 {
        self.cargo(id).map_or(0, |c| c.0.equipment(kind))
    }

    fn vehicle_stored_mass(&self, id: VehicleId) -> f64 {
        self.cargo(id).map_or(0.0, |c| c.0.total_mass())
    }

    fn vehicle_cargo(&self, id: VehicleId) -> ResourceLedger {
        self.cargo(id).map(|c| c.0.clone()).unwrap_or_default()
    }

    fn store_in_vehicle(&mut self, id: VehicleId, resource: ResourceId, amount: f64) -> f64 {
        let Some(capacity) = self.vehicle_ref(id).map(|v| v.cargo_capacity_kg) else {
            return 0.0;
        };
        let Some(mut cargo) = self.cargo(id) else {
            return 0.0;
        };
        let free = (capacity - cargo.0.total_mass()).max(0.0);
        let stored = amount.max(0.0).min(free);
        cargo.0.add_resource(resource, stored);
        stored
    }

    fn retrieve_from_vehicle(&mut self, id: VehicleId, resource: ResourceId, amount: f64) -> f64 {
        self.cargo(id).map_or(0.0, |mut c| c.0.remove_resource(resource, amount))
    }

    fn store_equipment_in_vehicle(&mut self, id: VehicleId, kind: EquipmentKind, count: u32) -> u32 {
        let Some(capacity) = self.vehicle_ref(id).map(|v| v.cargo_capacity_kg) else {
            return 0;
        };
        let Some(mut cargo) = self.cargo(id) else {
            return 0;
        };
        let free = (capacity - cargo.0.total_mass()).max(0.0);
        let stored = count.min((free / kind.mass()).floor() as u32);
        cargo.0.add_equipment(kind, stored);
        stored
    }

    fn retrieve_equipment_from_vehicle(&mut self, id: VehicleId, kind: EquipmentKind, count: u32) -> u32 {
        self.cargo(id).map_or(0, |mut c| c.0.remove_equipment(kind, count))
    }

    fn move_vehicle(&mut self, id: VehicleId, location: Coordinates) -> Result<(), ColonyError> {
        let towing = {
            let mut info = self.vehicle_mut(id)?;
            info.location = location;
            info.towing
        };
        if let Some(towed) = towing {
            self.vehicle_mut(towed)?.location = location;
        }
        Ok(())
    }

    fn park_vehicle(&mut self, id: VehicleId, settlement: Option<SettlementId>) -> Result<(), ColonyError> {
        self.vehicle_mut(id)?.parked_at = settlement;
        Ok(())
    }

    fn hook_tow(&mut self, tower: VehicleId, towed: VehicleId) -> Result<(), ColonyError> {
        if tower == towed || self.vehicle_ref(towed).is_none() {
            return Err(ColonyError::TowRejected(tower, towed));
        }
        self.vehicle_mut(tower)?.towing = Some(towed);
        let mut trailer = self.vehicle_mut(towed)?;
        trailer.towed_by = Some(tower);
        trailer.parked_at = None;
        Ok(())
    }

    fn unhook_tow(&mut self, tower: VehicleId) {
        let Ok((towed, parked_at, location)) = self
            .vehicle_mut(tower)
            .map(|mut t| (t.towing.take(), t.parked_at, t.location))
        else {
            return;
        };
        if let Some(Ok(mut trailer)) = towed.map(|v| self.vehicle_mut(v)) {
            trailer.towed_by = None;
            trailer.parked_at = parked_at;
            trailer.location = location;
        }
    }

    fn set_emergency_beacon(&mut self, id: VehicleId, on: bool) {
        if let Ok(mut info) = self.vehicle_mut(id) {
            info.emergency_beacon = on;
        }
    }
}

impl SettlementRegistry for ColonyWorld {
    fn settlement(&self, id: SettlementId) -> Option<SettlementInfo> {
        let habitat = self.habitat(id)?;
        Some(SettlementInfo {
            id,
            name: habitat.name.clone(),
            location: habitat.location,
            population: self.agents_where(|place| place.settlement == Some(id)).len(),
            capacity: habitat.capacity,
        })
    }

    fn settlements(&self) -> Vec<SettlementId> {
        self.settlements.keys().copied().collect()
    }

    fn indoor_agents(&self, id: SettlementId) -> Vec<AgentId> {
        self.agents_where(|place| place.settlement == Some(id) && place.aboard.is_none())
    }

    fn settlement_amount(&self, id: SettlementId, resource: ResourceId) -> f64 {
        self.settlement_component::<Stores>(id).map_or(0.0, |s| s.0.resource(resource))
    }

    fn settlement_equipment(&self, id: SettlementId, kind: EquipmentKind) -> u32 {
        self.settlement_component::<Stores>(id).map_or(0, |s| s.0.equipment(kind))
    }

    fn store_in_settlement(&mut self, id: SettlementId, resource: ResourceId, amount: f64) {
        self.stock(id, resource, amount);
    }

    fn retrieve_from_settlement(&mut self, id: SettlementId, resource: ResourceId, amount: f64) -> f64 {
        self.settlement_component::<Stores>(id)
            .map_or(0.0, |mut s| s.0.remove_resource(resource, amount))
    }

    fn store_equipment_in_settlement(&mut self, id: SettlementId, kind: EquipmentKind, count: u32) {
        self.stock_equipment(id, kind, count);
    }

    fn retrieve_equipment_from_settlement(&mut self, id: SettlementId, kind: EquipmentKind, count: u32) -> u32 {
        self.settlement_component::<Stores>(id)
            .map_or(0, |mut s| s.0.remove_equipment(kind, count))
    }

    fn best_deal(&mut self, from: SettlementId, vehicle: VehicleId, now: MarsTime) -> Option<TradeDeal> {
        let info = self.vehicle(vehicle)?;
        let markets = self.markets();
        self.deals.get_or_compute(from, vehicle, now, || {
            let home = markets.iter().find(|m| m.id == from)?;
            evaluate_best_deal(
                home,
                &markets,
                info.cargo_capacity_kg * TRADE_CARGO_SHARE,
                info.range_km(),
            )
        })
    }

    fn unfinished_construction_site(&self, settlement: SettlementId) -> Option<ConstructionSiteInfo> {
        self.construction.keys().find_map(|id| {
            let site = self.construction_mut(*id)?;
            (!site.finished && site.info.settlement == settlement).then(|| site.info.clone())
        })
    }

    fn create_construction_site(&mut self, settlement: SettlementId) -> Option<ConstructionSiteInfo> {
        self.habitat(settlement)?;
        let id = SiteId(self.next_id());
        let info = ConstructionSiteInfo {
            id,
            settlement,
            stage: None,
            work_required: 0.0,
            work_done: 0.0,
            materials: BTreeMap::new(),
            materials_delivered: false,
        };
        let entity = self.world.spawn((Construction {
            info: info.clone(),
            next_stage: 0,
            finished: false,
        },));
        self.construction.insert(id, entity);
        Some(info)
    }

    fn construction_site(&self, site: SiteId) -> Option<ConstructionSiteInfo> {
        self.construction_mut(site).map(|c| c.info.clone())
    }

    fn start_next_construction_stage(&mut self, site: SiteId) -> Option<String> {
        let mut construction = self.construction_mut(site)?;
        let spec = CONSTRUCTION_STAGES.get(construction.next_stage)?;
        construction.next_stage += 1;
        construction.info.stage = Some(spec.name.to_string());
        construction.info.work_required = spec.work_millisols;
        construction.info.work_done = 0.0;
        construction.info.materials = BTreeMap::from([(ResourceId::ConstructionMaterials, spec.materials_kg)]);
        construction.info.materials_delivered = false;
        Some(spec.name.to_string())
    }

    fn mark_materials_delivered(&mut self, site: SiteId) {
        if let Some(mut construction) = self.construction_mut(site) {
            construction.info.materials_delivered = true;
        }
    }

    fn add_construction_work(&mut self, site: SiteId, amount: f64) -> f64 {
        self.construction_mut(site).map_or(0.0, |mut c| {
            c.info.work_done += amount.max(0.0);
            c.info.work_done
        })
    }

    fn complete_construction_stage(&mut self, site: SiteId) {
        if let Some(mut construction) = self.construction_mut(site) {
            construction.info.work_done = construction.info.work_done.max(construction.info.work_required);
            if construction.next_stage >= CONSTRUCTION_STAGES.len() {
                construction.finished = true;
            }
        }
    }
}

impl SurfaceSites for ColonyWorld {
    fn solar_irradiance(&self, location: Coordinates, now: MarsTime) -> f64 {
        irradiance_at(location, now)
    }

    fn mineral_concentration(&self, location: Coordinates) -> f64 {
        mineral_field(location)
    }

    fn explored_sites(&self) -> Vec<ExploredSite> {
        self.sites
            .values()
            .filter_map(|entity| self.world.get::<&ExploredSite>(*entity).ok().map(|s| ExploredSite::clone(&s)))
            .collect()
    }

    fn register_site(&mut self, location: Coordinates, settlement: Option<SettlementId>) -> SiteId {
        let id = SiteId(self.next_id());
        let entity = self.world.spawn((ExploredSite {
            id,
            location,
            settlement,
            explored: false,
            claimed: false,
            mineral_estimate: 0.0,
        },));
        self.sites.insert(id, entity);
        id
    }

    fn claim_site(&mut self, id: SiteId, claimed: bool) {
        if let Some(mut site) = self.site_mut(id) {
            site.claimed = claimed;
        }
    }

    fn mark_explored(&mut self, id: SiteId, estimate: f64) {
        if let Some(mut site) = self.site_mut(id) {
            site.explored = true;
            site.mineral_estimate = estimate;
        }
    }
}
