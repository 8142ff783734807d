//! Resource and equipment requirements for the remainder of a trip, and the
//! loadability checks that compare them against a vehicle.

use std::collections::BTreeMap;

use mission_core::config::MissionConfig;
use mission_core::constants::{EQUIPMENT_BUFFER_FACTOR, MILLISOLS_PER_HOUR, MILLISOLS_PER_SOL};
use mission_core::enums::{EquipmentKind, ResourceId};
use mission_core::types::{SettlementId, VehicleId};

use crate::context::Colony;
use crate::navigation::NavigationPlan;

/// Amounts below this are treated as zero (kg).
const AMOUNT_EPSILON: f64 = 1e-6;

/// Amounts of resources (kg) and counts of equipment. Never negative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLedger {
    resources: BTreeMap<ResourceId, f64>,
    equipment: BTreeMap<EquipmentKind, u32>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to a resource amount. Non-positive amounts are ignored.
    pub fn add_resource(&mut self, resource: ResourceId, amount: f64) {
        if amount > 0.0 && amount.is_finite() {
            *self.resources.entry(resource).or_insert(0.0) += amount;
        }
    }

    pub fn add_equipment(&mut self, kind: EquipmentKind, count: u32) {
        if count > 0 {
            *self.equipment.entry(kind).or_insert(0) += count;
        }
    }

    /// Raise an equipment count to at least `count`.
    pub fn require_equipment(&mut self, kind: EquipmentKind, count: u32) {
        if count > 0 {
            let entry = self.equipment.entry(kind).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    /// Take up to `amount` of a resource; returns what was taken.
    pub fn remove_resource(&mut self, resource: ResourceId, amount: f64) -> f64 {
        let Some(held) = self.resources.get_mut(&resource) else {
            return 0.0;
        };
        let taken = amount.max(0.0).min(*held);
        *held -= taken;
        if *held <= AMOUNT_EPSILON {
            self.resources.remove(&resource);
        }
        taken
    }

    /// Take up to `count` items; returns how many were taken.
    pub fn remove_equipment(&mut self, kind: EquipmentKind, count: u32) -> u32 {
        let Some(held) = self.equipment.get_mut(&kind) else {
            return 0;
        };
        let taken = count.min(*held);
        *held -= taken;
        if *held == 0 {
            self.equipment.remove(&kind);
        }
        taken
    }

    pub fn resource(&self, resource: ResourceId) -> f64 {
        self.resources.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn equipment(&self, kind: EquipmentKind) -> u32 {
        self.equipment.get(&kind).copied().unwrap_or(0)
    }

    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, f64)> + '_ {
        self.resources.iter().map(|(r, a)| (*r, *a))
    }

    pub fn equipment_items(&self) -> impl Iterator<Item = (EquipmentKind, u32)> + '_ {
        self.equipment.iter().map(|(k, c)| (*k, *c))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.equipment.is_empty()
    }

    /// Mass of all resources and equipment (kg).
    pub fn total_mass(&self) -> f64 {
        let resources: f64 = self.resources.values().sum();
        let equipment: f64 = self
            .equipment
            .iter()
            .map(|(kind, count)| kind.mass() * *count as f64)
            .sum();
        resources + equipment
    }

    pub fn merge(&mut self, other: &ResourceLedger) {
        for (resource, amount) in other.resources() {
            self.add_resource(resource, amount);
        }
        for (kind, count) in other.equipment_items() {
            self.add_equipment(kind, count);
        }
    }

    /// What `held` lacks to satisfy this ledger.
    pub fn shortfall(&self, held: &ResourceLedger) -> ResourceLedger {
        let mut missing = ResourceLedger::new();
        for (resource, amount) in self.resources() {
            let gap = amount - held.resource(resource);
            if gap > AMOUNT_EPSILON {
                missing.add_resource(resource, gap);
            }
        }
        for (kind, count) in self.equipment_items() {
            missing.add_equipment(kind, count.saturating_sub(held.equipment(kind)));
        }
        missing
    }

    /// Whether `held` covers every listed resource of this ledger.
    pub fn resources_covered_by(&self, held: &ResourceLedger, resources: &[ResourceId]) -> bool {
        resources
            .iter()
            .all(|r| held.resource(*r) + AMOUNT_EPSILON >= self.resource(*r))
    }
}

/// Buffered equipment count: `max(ceil(1.5 × average_crew), required_min)`.
pub fn equipment_buffer(average_crew: f64, required_min: u32) -> u32 {
    let buffered = (EQUIPMENT_BUFFER_FACTOR * average_crew).ceil().max(0.0) as u32;
    buffered.max(required_min)
}

/// Resources a vehicle must keep on board to survive the rest of a trip.
pub const TRIP_SUPPLIES: [ResourceId; 4] = [
    ResourceId::Oxygen,
    ResourceId::Water,
    ResourceId::Food,
    ResourceId::Methane,
];

/// Mission-specific inputs to a trip estimate.
#[derive(Debug, Clone, Default)]
pub struct TripDemand {
    /// Millisols still to be spent at sites.
    pub site_time: f64,
    /// Millisols of EVA still planned; drives spare-parts provisioning.
    pub eva_time: f64,
    /// Mission-specific resources and equipment (trade goods, containers).
    pub optional: ResourceLedger,
    /// People on board who are not members, e.g. a rescued crew.
    pub extra_crew: usize,
}

/// Spare parts expected to be consumed repairing EVA accident damage (kg).
pub fn spare_parts_needed(config: &MissionConfig, eva_time: f64, crew: usize) -> f64 {
    let accidents = eva_time * crew as f64 * config.eva.base_accident_chance;
    accidents * config.eva.malfunctions_per_accident * config.eva.parts_mass_per_malfunction
}

/// Estimate everything the rest of a trip needs.
///
/// Trip time is the remaining route at the vehicle's base speed plus the
/// remaining site time. Life support scales with trip sols and people on
/// board; fuel with remaining distance. `use_buffer` applies the safety
/// margin and the equipment buffer.
pub fn estimate_trip(
    colony: &dyn Colony,
    config: &MissionConfig,
    vehicle: VehicleId,
    nav: &NavigationPlan,
    crew: usize,
    demand: &TripDemand,
    use_buffer: bool,
) -> ResourceLedger {
    let mut ledger = ResourceLedger::new();
    let Some(info) = colony.vehicle(vehicle) else {
        ledger.merge(&demand.optional);
        return ledger;
    };

    let distance = nav.remaining_distance(info.location);
    let travel_time = if info.base_speed_kmh > 0.0 {
        distance / info.base_speed_kmh * MILLISOLS_PER_HOUR
    } else {
        0.0
    };
    let sols = (travel_time + demand.site_time) / MILLISOLS_PER_SOL;
    let margin = if use_buffer {
        config.life_support.safety_margin
    } else {
        1.0
    };

    let people = if info.kind.carries_crew() {
        crew + demand.extra_crew
    } else {
        0
    };
    let heads = people as f64;
    let life = &config.life_support;
    ledger.add_resource(ResourceId::Oxygen, life.oxygen_per_sol * sols * heads * margin);
    ledger.add_resource(ResourceId::Water, life.water_per_sol * sols * heads * margin);
    ledger.add_resource(ResourceId::Food, life.food_per_sol * sols * heads * margin);

    if info.fuel_efficiency_km_per_kg > 0.0 {
        ledger.add_resource(
            ResourceId::Methane,
            distance / info.fuel_efficiency_km_per_kg * margin,
        );
    }

    if info.kind.carries_crew() && crew > 0 {
        let suits = if use_buffer {
            equipment_buffer(crew as f64, crew as u32)
        } else {
            crew as u32
        };
        ledger.require_equipment(EquipmentKind::EvaSuit, suits);
        ledger.add_resource(
            ResourceId::SpareParts,
            spare_parts_needed(config, demand.eva_time, crew),
        );
    }

    ledger.merge(&demand.optional);
    ledger
}

/// Whether `required` can still be brought aboard: the missing mass fits the
/// vehicle's free capacity and the settlement can supply every missing item.
pub fn is_loadable(
    colony: &dyn Colony,
    vehicle: VehicleId,
    settlement: SettlementId,
    required: &ResourceLedger,
) -> bool {
    let Some(info) = colony.vehicle(vehicle) else {
        return false;
    };
    let missing = required.shortfall(&colony.vehicle_cargo(vehicle));
    let free = info.cargo_capacity_kg - colony.vehicle_stored_mass(vehicle);
    if missing.total_mass() > free + AMOUNT_EPSILON {
        return false;
    }
    missing
        .resources()
        .all(|(r, amount)| colony.settlement_amount(settlement, r) + AMOUNT_EPSILON >= amount)
        && missing
            .equipment_items()
            .all(|(kind, count)| colony.settlement_equipment(settlement, kind) >= count)
}

/// Whether the vehicle already holds every required amount and count.
pub fn is_loaded(colony: &dyn Colony, vehicle: VehicleId, required: &ResourceLedger) -> bool {
    required.shortfall(&colony.vehicle_cargo(vehicle)).is_empty()
}
