//! Spawn factories for setting up a colony.
//!
//! Creates settlements with their crew, standard stores and vehicle pool.

use mission_core::enums::*;
use mission_core::types::{AgentId, Coordinates, SettlementId, VehicleId};

use crate::components::Skills;
use crate::world::{ColonyWorld, VehicleSpec};

/// Opinion colonists of the same outpost hold of each other by default.
pub const DEFAULT_CREW_OPINION: f64 = 70.0;

/// Qualification given to spawned colonists for every mission kind.
pub const DEFAULT_QUALIFICATION: f64 = 0.8;

/// Stock of each standard resource a new outpost starts with (kg).
pub const STANDARD_STOCK: [(ResourceId, f64); 6] = [
    (ResourceId::Oxygen, 2000.0),
    (ResourceId::Water, 4000.0),
    (ResourceId::Food, 2000.0),
    (ResourceId::Methane, 5000.0),
    (ResourceId::SpareParts, 200.0),
    (ResourceId::ConstructionMaterials, 600.0),
];

/// Equipment a new outpost starts with.
pub const STANDARD_EQUIPMENT: [(EquipmentKind, u32); 4] = [
    (EquipmentKind::EvaSuit, 12),
    (EquipmentKind::SpecimenBox, 12),
    (EquipmentKind::LargeBag, 12),
    (EquipmentKind::Barrel, 12),
];

/// Default performance figures for a vehicle kind.
pub fn vehicle_spec(kind: VehicleKind, name: impl Into<String>) -> VehicleSpec {
    let name = name.into();
    match kind {
        // 250 kg of methane at 2.5 km/kg: 625 km range.
        VehicleKind::Rover => VehicleSpec {
            kind,
            name,
            crew_capacity: 6,
            cargo_capacity_kg: 5000.0,
            fuel_capacity_kg: 250.0,
            base_speed_kmh: 30.0,
            fuel_efficiency_km_per_kg: 2.5,
        },
        VehicleKind::Drone => VehicleSpec {
            kind,
            name,
            crew_capacity: 0,
            cargo_capacity_kg: 600.0,
            fuel_capacity_kg: 60.0,
            base_speed_kmh: 60.0,
            fuel_efficiency_km_per_kg: 4.0,
        },
        VehicleKind::LightUtility => VehicleSpec {
            kind,
            name,
            crew_capacity: 1,
            cargo_capacity_kg: 200.0,
            fuel_capacity_kg: 20.0,
            base_speed_kmh: 15.0,
            fuel_efficiency_km_per_kg: 3.0,
        },
    }
}

/// An outpost spawned by [`setup_outpost`].
#[derive(Debug, Clone)]
pub struct Outpost {
    pub settlement: SettlementId,
    pub crew: Vec<AgentId>,
    pub vehicles: Vec<VehicleId>,
}

/// Spawn a settlement with `crew` colonists, standard stores and the given
/// vehicles. The crew all know each other.
pub fn setup_outpost(
    colony: &mut ColonyWorld,
    name: &str,
    location: Coordinates,
    capacity: usize,
    crew: usize,
    vehicles: &[VehicleKind],
) -> Outpost {
    let settlement = colony.add_settlement(name, location, capacity);
    stock_standard_supplies(colony, settlement);
    let crew = spawn_crew(colony, settlement, name, crew, DEFAULT_QUALIFICATION);
    befriend(colony, &crew, DEFAULT_CREW_OPINION);

    let vehicles = vehicles
        .iter()
        .enumerate()
        .filter_map(|(i, kind)| {
            let spec = vehicle_spec(*kind, format!("{name} {kind:?} {}", i + 1));
            colony.add_vehicle(spec, settlement)
        })
        .collect();

    Outpost {
        settlement,
        crew,
        vehicles,
    }
}

pub fn stock_standard_supplies(colony: &mut ColonyWorld, settlement: SettlementId) {
    for (resource, amount) in STANDARD_STOCK {
        colony.stock(settlement, resource, amount);
    }
    for (kind, count) in STANDARD_EQUIPMENT {
        colony.stock_equipment(settlement, kind, count);
    }
}

/// Spawn `count` colonists named after their settlement.
pub fn spawn_crew(
    colony: &mut ColonyWorld,
    settlement: SettlementId,
    prefix: &str,
    count: usize,
    qualification: f64,
) -> Vec<AgentId> {
    (1..=count)
        .map(|i| {
            let skills = Skills {
                base: qualification.clamp(0.0, 1.0),
                ..Skills::default()
            };
            colony.add_agent(&format!("{prefix} Colonist {i}"), settlement, skills)
        })
        .collect()
}

/// Set every pairwise opinion among `agents` to `opinion`.
pub fn befriend(colony: &mut ColonyWorld, agents: &[AgentId], opinion: f64) {
    for a in agents {
        for b in agents {
            if a != b {
                colony.set_opinion(*a, *b, opinion);
            }
        }
    }
}
