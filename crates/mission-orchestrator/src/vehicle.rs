//! Shared behavior of missions that travel in a rover or drone: vehicle
//! reservation, provisioning, loading, driving, emergency rerouting and
//! disembarking.

use tracing::{debug, info, warn};

use mission_core::config::MissionConfig;
use mission_core::constants::*;
use mission_core::enums::*;
use mission_core::events::MissionEventKind;
use mission_core::types::*;

use crate::context::{Colony, MissionContext, SettlementInfo, VehicleInfo};
use crate::ledger::{self, ResourceLedger, TripDemand, TRIP_SUPPLIES};
use crate::mission::MissionCore;
use crate::navigation::NavigationPlan;

/// Phases every vehicle mission registers, in order.
pub const TRAVEL_PHASES: [MissionPhase; 4] = [
    MissionPhase::Embarking,
    MissionPhase::Travelling,
    MissionPhase::Disembarking,
    MissionPhase::Completed,
];

/// Vehicle and route of a travel mission.
#[derive(Debug, Clone)]
pub struct Travel {
    pub vehicle: VehicleId,
    pub home: SettlementId,
    pub home_location: Coordinates,
    pub nav: NavigationPlan,
    /// Crew rides in the vehicle (rover) rather than staying home (drone).
    pub carries_crew: bool,
    /// The vehicle has left its starting settlement.
    pub departed: bool,
    /// An emergency reroute is in effect.
    pub emergency: bool,
}

/// Best parked, unreserved vehicle of `kind`: largest range, then lowest id.
fn best_parked(colony: &dyn Colony, settlement: SettlementId, kind: VehicleKind) -> Option<VehicleInfo> {
    colony
        .vehicles_parked_at(settlement)
        .into_iter()
        .filter_map(|id| colony.vehicle(id))
        .filter(|v| v.kind == kind && !v.reserved && v.towed_by.is_none())
        .max_by(|a, b| a.range_km().total_cmp(&b.range_km()).then(b.id.cmp(&a.id)))
}

/// Reserve the mission vehicle at the starter's settlement. Ends the
/// mission with `NoAvailableVehicles` when none is free.
pub fn reserve_vehicle(core: &mut MissionCore, ctx: &mut MissionContext<'_>, kind: VehicleKind) -> bool {
    let found = core
        .home()
        .and_then(|home| best_parked(&*ctx.colony, home, kind).map(|v| (home, v)));
    let Some((home, info)) = found else {
        core.end_mission(MissionStatus::NoAvailableVehicles, ctx);
        return false;
    };
    if let Err(err) = ctx.colony.set_vehicle_reserved(info.id, true) {
        warn!(mission = %core.id(), error = %err, "vehicle reservation failed");
        core.end_mission(MissionStatus::NoAvailableVehicles, ctx);
        return false;
    }
    let home_location = ctx
        .colony
        .settlement(home)
        .map_or(info.location, |s| s.location);
    core.travel = Some(Travel {
        vehicle: info.id,
        home,
        home_location,
        nav: NavigationPlan::default(),
        carries_crew: kind.carries_crew(),
        departed: false,
        emergency: false,
    });
    if kind.carries_crew() {
        core.capacity = core.capacity.min(info.crew_capacity);
    }
    info!(mission = %core.id(), vehicle = %info.id, name = %info.name, "vehicle reserved");
    ctx.emit(core.id(), MissionEventKind::VehicleReserved { vehicle: info.id });
    true
}

/// Reserve a light utility vehicle at the mission's home, if one is free.
pub fn reserve_luv(core: &mut MissionCore, ctx: &mut MissionContext<'_>) -> Option<VehicleId> {
    let home = core.home()?;
    let luv = best_parked(&*ctx.colony, home, VehicleKind::LightUtility)?;
    if let Err(err) = ctx.colony.set_vehicle_reserved(luv.id, true) {
        warn!(mission = %core.id(), error = %err, "LUV reservation failed");
        return None;
    }
    core.reserved_vehicles.push(luv.id);
    debug!(mission = %core.id(), vehicle = %luv.id, "LUV reserved");
    ctx.emit(core.id(), MissionEventKind::VehicleReserved { vehicle: luv.id });
    Some(luv.id)
}

/// Append the home settlement as the final waypoint.
pub fn add_home_waypoint(core: &mut MissionCore, ctx: &MissionContext<'_>) {
    let Some(travel) = core.travel.as_mut() else {
        return;
    };
    let name = ctx
        .colony
        .settlement(travel.home)
        .map_or_else(|| travel.home.to_string(), |s| s.name);
    travel
        .nav
        .add_waypoint(Waypoint::settlement(travel.home_location, travel.home, name));
}

/// Longest trip the vehicle can support (millisols): the configured cap, or
/// the sols a share of the cargo capacity can feed the crew, whichever is less.
pub fn trip_time_limit(vehicle: &VehicleInfo, crew: usize, config: &MissionConfig, use_buffer: bool) -> f64 {
    let mut sols = config.travel.max_trip_sols;
    let margin = if use_buffer {
        config.life_support.safety_margin
    } else {
        1.0
    };
    let daily = config.life_support.daily_mass() * crew as f64 * margin;
    if vehicle.kind.carries_crew() && daily > 0.0 {
        sols = sols.min(vehicle.cargo_capacity_kg * LIFE_SUPPORT_CARGO_SHARE / daily);
    }
    sols * MILLISOLS_PER_SOL
}

/// Check the planned trip against the home settlement's stores: spare parts
/// first, then general loadability. Ends the mission on failure.
pub fn check_provisions(core: &mut MissionCore, ctx: &mut MissionContext<'_>, demand: &TripDemand) -> bool {
    let Some(travel) = core.travel.as_ref() else {
        return true;
    };
    let (vehicle, home) = (travel.vehicle, travel.home);
    let required = ledger::estimate_trip(
        &*ctx.colony,
        ctx.config,
        vehicle,
        &travel.nav,
        core.members().len(),
        demand,
        true,
    );

    let parts_needed = required.resource(ResourceId::SpareParts);
    let parts_available = ctx.colony.settlement_amount(home, ResourceId::SpareParts)
        + ctx.colony.vehicle_amount(vehicle, ResourceId::SpareParts);
    if parts_needed > parts_available {
        debug!(mission = %core.id(), parts_needed, parts_available, "spare parts short");
        core.end_mission(MissionStatus::InsufficientSpareParts, ctx);
        return false;
    }
    if !ledger::is_loadable(&*ctx.colony, vehicle, home, &required) {
        debug!(mission = %core.id(), mass = required.total_mass(), "trip supplies not loadable");
        core.end_mission(MissionStatus::CannotLoadResources, ctx);
        return false;
    }
    true
}

/// Shared transitions of the travel contract.
///
/// `Reviewing → Embarking → Travelling`; arriving at the last waypoint leads
/// to `Disembarking`, any other waypoint to `site_phase` (or straight back
/// to `Travelling`); `Disembarking` ends the mission with the last recorded
/// failure, or `MissionAccomplished`.
pub fn determine_travel_phase(core: &mut MissionCore, ctx: &mut MissionContext<'_>, site_phase: Option<MissionPhase>) {
    match core.phases.current() {
        MissionPhase::Reviewing => {
            core.set_phase(MissionPhase::Embarking, "Loading and boarding", ctx);
        }
        MissionPhase::Travelling => {
            let Some(travel) = core.travel.as_ref() else {
                return;
            };
            if travel.nav.is_at_last() {
                let at = waypoint_name(travel.nav.current_waypoint());
                core.set_phase(MissionPhase::Disembarking, format!("Disembarking at {at}"), ctx);
            } else if let Some(phase) = site_phase {
                let at = waypoint_name(travel.nav.current_waypoint());
                core.set_phase(phase, format!("{} at {at}", phase.name()), ctx);
            } else {
                start_leg(core, ctx);
            }
        }
        MissionPhase::Disembarking => {
            let status = core
                .statuses()
                .iter()
                .rev()
                .find(|s| !s.is_success())
                .cloned()
                .unwrap_or(MissionStatus::MissionAccomplished);
            core.end_mission(status, ctx);
        }
        _ => start_leg(core, ctx),
    }
}

/// Enter `Travelling` toward the next waypoint.
pub fn start_leg(core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
    let to = core
        .travel
        .as_ref()
        .map(|t| waypoint_name(t.nav.next_waypoint()))
        .unwrap_or_default();
    core.set_phase(MissionPhase::Travelling, format!("Driving to {to}"), ctx);
}

fn waypoint_name(waypoint: Option<&Waypoint>) -> String {
    waypoint.map_or_else(|| "unknown".to_string(), |w| w.description.clone())
}

/// Run one tick of a shared travel phase.
pub fn perform_travel_phase(
    core: &mut MissionCore,
    ctx: &mut MissionContext<'_>,
    phase: MissionPhase,
    demand: &TripDemand,
    agent: AgentId,
) {
    match phase {
        MissionPhase::Embarking => perform_embarking(core, ctx, demand),
        MissionPhase::Travelling => perform_travelling(core, ctx, demand, agent),
        MissionPhase::Disembarking => perform_disembarking(core, ctx),
        _ => {}
    }
}

fn perform_embarking(core: &mut MissionCore, ctx: &mut MissionContext<'_>, demand: &TripDemand) {
    let Some(travel) = core.travel.as_ref() else {
        return;
    };
    let (vehicle, home, carries_crew) = (travel.vehicle, travel.home, travel.carries_crew);
    let required = ledger::estimate_trip(
        &*ctx.colony,
        ctx.config,
        vehicle,
        &travel.nav,
        core.members().len(),
        demand,
        true,
    );
    if !ledger::is_loadable(&*ctx.colony, vehicle, home, &required) {
        warn!(mission = %core.id(), vehicle = %vehicle, "supplies no longer loadable");
        core.end_mission(MissionStatus::CannotLoadResources, ctx);
        return;
    }

    let budget = ctx.config.travel.loading_rate_kg_per_millisol * ctx.pulse.elapsed;
    let moved = load_toward(ctx.colony, vehicle, home, &required, budget);
    if moved > 0.0 {
        debug!(mission = %core.id(), vehicle = %vehicle, moved, "loading");
    }
    let loaded = ledger::is_loaded(&*ctx.colony, vehicle, &required);
    let boarded = !carries_crew || board_members(core, ctx, vehicle);
    if loaded && boarded {
        core.phases.end_phase();
        return;
    }

    if core.phases.elapsed_in_phase(ctx.now()) > ctx.config.travel.embark_timeout_millisols {
        if carries_crew {
            for agent in core.member_ids() {
                if ctx.colony.aboard_vehicle(agent) != Some(vehicle) {
                    warn!(mission = %core.id(), agent = %agent, "did not board in time; dropped");
                    core.remove_member(agent, ctx);
                    if core.is_done() {
                        return;
                    }
                }
            }
        }
        if loaded {
            core.phases.end_phase();
        }
    }
}

/// Push boarding tasks; true once every member is aboard.
fn board_members(core: &MissionCore, ctx: &mut MissionContext<'_>, vehicle: VehicleId) -> bool {
    let mut all_aboard = true;
    for agent in core.member_ids() {
        if ctx.colony.aboard_vehicle(agent) == Some(vehicle) {
            continue;
        }
        all_aboard = false;
        let task = Task::Board { vehicle };
        if ctx.colony.current_task(agent) != Some(task) {
            if let Err(err) = ctx.colony.assign_task(agent, task) {
                warn!(mission = %core.id(), agent = %agent, error = %err, "cannot assign boarding");
            }
        }
    }
    all_aboard
}

fn perform_travelling(core: &mut MissionCore, ctx: &mut MissionContext<'_>, demand: &TripDemand, agent: AgentId) {
    let id = core.id();
    let Some(travel) = core.travel.as_mut() else {
        return;
    };
    let vehicle = travel.vehicle;
    if !travel.departed {
        travel.departed = true;
        let task = if travel.carries_crew {
            Task::Drive { vehicle }
        } else {
            Task::PilotDrone { vehicle }
        };
        if let Err(err) = ctx.colony.park_vehicle(vehicle, None) {
            warn!(mission = %id, error = %err, "cannot leave parking");
        }
        if let Err(err) = ctx.colony.assign_task(agent, task) {
            warn!(mission = %id, agent = %agent, error = %err, "cannot assign driver");
        }
        info!(mission = %id, vehicle = %vehicle, "departed");
    }

    if check_emergency(core, ctx, demand) {
        return;
    }

    let Some(info) = ctx.colony.vehicle(vehicle) else {
        core.end_mission(MissionStatus::NoAvailableVehicles, ctx);
        return;
    };
    let Some(target) = core
        .travel
        .as_ref()
        .and_then(|t| t.nav.next_waypoint())
        .map(|w| w.location)
    else {
        core.phases.end_phase();
        return;
    };

    let remaining = info.location.distance_to(&target);
    let mut step = (info.base_speed_kmh * ctx.pulse.elapsed / MILLISOLS_PER_HOUR).min(remaining);
    if info.fuel_efficiency_km_per_kg > 0.0 {
        let fuel = ctx.colony.vehicle_amount(vehicle, ResourceId::Methane);
        step = step.min(fuel * info.fuel_efficiency_km_per_kg);
    }
    if step <= 0.0 && remaining > ARRIVAL_TOLERANCE_KM {
        warn!(mission = %id, vehicle = %vehicle, "stranded without fuel");
        ctx.colony.set_emergency_beacon(vehicle, true);
        core.end_mission(MissionStatus::NotEnoughResources, ctx);
        return;
    }

    let location = info.location.toward(&target, step);
    if let Err(err) = ctx.colony.move_vehicle(vehicle, location) {
        warn!(mission = %id, error = %err, "cannot move vehicle");
        return;
    }
    if info.fuel_efficiency_km_per_kg > 0.0 {
        ctx.colony
            .retrieve_from_vehicle(vehicle, ResourceId::Methane, step / info.fuel_efficiency_km_per_kg);
    }

    if location.distance_to(&target) <= ARRIVAL_TOLERANCE_KM {
        if let Some(travel) = core.travel.as_mut() {
            travel.nav.advance();
            debug!(
                mission = %id,
                waypoint = %waypoint_name(travel.nav.current_waypoint()),
                "arrived"
            );
        }
        core.phases.end_phase();
    }
}

/// Reroute to the nearest reachable settlement when a crew member has a
/// medical emergency or the vehicle cannot supply the rest of the trip.
/// Returns true if the mission ended.
fn check_emergency(core: &mut MissionCore, ctx: &mut MissionContext<'_>, demand: &TripDemand) -> bool {
    let Some(travel) = core.travel.as_ref() else {
        return false;
    };
    if travel.emergency {
        return false;
    }
    let vehicle = travel.vehicle;
    // A drone's pilot stays home, so only an aboard crew can turn it around.
    let medical = travel.carries_crew
        && core
            .members()
            .iter()
            .any(|m| ctx.colony.has_medical_emergency(m.agent));
    let short = if medical {
        false
    } else {
        let required = ledger::estimate_trip(
            &*ctx.colony,
            ctx.config,
            vehicle,
            &travel.nav,
            core.members().len(),
            demand,
            false,
        );
        !required.resources_covered_by(&ctx.colony.vehicle_cargo(vehicle), &TRIP_SUPPLIES)
    };
    if !medical && !short {
        return false;
    }

    let status = if medical {
        MissionStatus::MedicalEmergency
    } else {
        MissionStatus::NotEnoughResources
    };
    let destination = nearest_reachable_settlement(&*ctx.colony, vehicle);
    core.add_status(status.clone(), ctx);
    ctx.emit(
        core.id(),
        MissionEventKind::Emergency {
            status: status.clone(),
            destination: destination.as_ref().map(|s| s.id),
        },
    );

    match destination {
        Some(settlement) => {
            warn!(
                mission = %core.id(),
                status = %status,
                destination = %settlement.name,
                "emergency reroute"
            );
            if let Some(travel) = core.travel.as_mut() {
                travel.nav.reset_remaining_to(vec![Waypoint::settlement(
                    settlement.location,
                    settlement.id,
                    settlement.name,
                )]);
                travel.emergency = true;
            }
            false
        }
        None => {
            warn!(mission = %core.id(), status = %status, "no settlement in range; beacon on");
            ctx.colony.set_emergency_beacon(vehicle, true);
            core.end_mission(MissionStatus::NoEmergencySettlementDestinationFound, ctx);
            true
        }
    }
}

/// Closest settlement the vehicle can reach on the fuel it carries.
fn nearest_reachable_settlement(colony: &dyn Colony, vehicle: VehicleId) -> Option<SettlementInfo> {
    let info = colony.vehicle(vehicle)?;
    let fuel_range = if info.fuel_efficiency_km_per_kg > 0.0 {
        colony.vehicle_amount(vehicle, ResourceId::Methane) * info.fuel_efficiency_km_per_kg
    } else {
        f64::INFINITY
    };
    colony
        .settlements()
        .into_iter()
        .filter_map(|id| colony.settlement(id))
        .map(|s| (info.location.distance_to(&s.location), s))
        .filter(|(d, _)| *d <= fuel_range)
        .min_by(|(da, a), (db, b)| da.total_cmp(db).then(a.id.cmp(&b.id)))
        .map(|(_, s)| s)
}

fn perform_disembarking(core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
    let Some(travel) = core.travel.as_ref() else {
        return;
    };
    let vehicle = travel.vehicle;
    let settlement = travel.nav.current_waypoint().and_then(|w| w.settlement);
    let parked_at = ctx.colony.vehicle(vehicle).and_then(|v| v.parked_at);
    if parked_at != settlement {
        if let Err(err) = ctx.colony.park_vehicle(vehicle, settlement) {
            warn!(mission = %core.id(), error = %err, "cannot park vehicle");
        }
    }
    let Some(settlement) = settlement else {
        core.phases.end_phase();
        return;
    };

    let mut all_off = true;
    for agent in core.member_ids() {
        if ctx.colony.aboard_vehicle(agent) != Some(vehicle) {
            continue;
        }
        all_off = false;
        let task = Task::Disembark { vehicle };
        if ctx.colony.current_task(agent) != Some(task) {
            if let Err(err) = ctx.colony.assign_task(agent, task) {
                warn!(mission = %core.id(), agent = %agent, error = %err, "cannot assign disembark");
            }
        }
    }

    let budget = ctx.config.travel.loading_rate_kg_per_millisol * ctx.pulse.elapsed;
    let left = unload_cargo(ctx.colony, vehicle, settlement, budget);
    if all_off && left <= 0.0 {
        core.phases.end_phase();
    }
}

/// Abandon the remaining route and head for the home settlement.
pub fn return_home(core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
    let Some(travel) = core.travel.as_mut() else {
        return;
    };
    let vehicle = travel.vehicle;
    let name = ctx
        .colony
        .settlement(travel.home)
        .map_or_else(|| travel.home.to_string(), |s| s.name);
    travel
        .nav
        .reset_remaining_to(vec![Waypoint::settlement(travel.home_location, travel.home, name)]);
    info!(mission = %core.id(), "returning home");

    if ctx.colony.vehicle(vehicle).is_some_and(|v| v.parked_at.is_some()) {
        if let Err(err) = ctx.colony.park_vehicle(vehicle, None) {
            warn!(mission = %core.id(), error = %err, "cannot leave parking");
        }
    }
    for agent in core.member_ids() {
        if matches!(ctx.colony.current_task(agent), Some(Task::Eva { .. } | Task::Negotiate { .. })) {
            ctx.colony.clear_task(agent);
        }
    }
    // An arrival this tick leaves the leg ended; restart it toward home.
    if core.phase() != Some(MissionPhase::Travelling) || core.phases.phase_ended() {
        start_leg(core, ctx);
    }
}

/// Draw the crew's life support from the vehicle while out in the field.
pub fn consume_supplies(core: &MissionCore, ctx: &mut MissionContext<'_>, phase: MissionPhase) {
    let Some(travel) = core.travel.as_ref() else {
        return;
    };
    if !travel.departed
        || !travel.carries_crew
        || matches!(phase, MissionPhase::Disembarking | MissionPhase::Completed)
    {
        return;
    }
    let person_sols = core.members().len() as f64 * ctx.pulse.elapsed / MILLISOLS_PER_SOL;
    let life = &ctx.config.life_support;
    for (resource, rate) in [
        (ResourceId::Oxygen, life.oxygen_per_sol),
        (ResourceId::Water, life.water_per_sol),
        (ResourceId::Food, life.food_per_sol),
    ] {
        ctx.colony
            .retrieve_from_vehicle(travel.vehicle, resource, rate * person_sols);
    }
}

/// Release the mission vehicle. A vehicle parked at a settlement is emptied
/// and everyone aboard (towed vehicle included) moves indoors.
pub fn release_vehicle(travel: &Travel, ctx: &mut MissionContext<'_>) {
    let Some(info) = ctx.colony.vehicle(travel.vehicle) else {
        return;
    };
    if let Some(settlement) = info.parked_at {
        let mut aboard = ctx.colony.vehicle_occupants(info.id);
        if let Some(towed) = info.towing {
            aboard.extend(ctx.colony.vehicle_occupants(towed));
        }
        for agent in aboard {
            if let Err(err) = ctx.colony.relocate_agent(agent, settlement) {
                warn!(vehicle = %info.id, agent = %agent, error = %err, "cannot move agent indoors");
            }
        }
        unload_cargo(ctx.colony, info.id, settlement, f64::INFINITY);
    }
    if info.towing.is_some() {
        ctx.colony.unhook_tow(info.id);
    }
    if let Err(err) = ctx.colony.set_vehicle_reserved(info.id, false) {
        warn!(vehicle = %info.id, error = %err, "cannot release vehicle");
    }
}

/// Move up to `budget` kg of what `required` still lacks from the settlement
/// into the vehicle. Returns the mass moved.
pub fn load_toward(
    colony: &mut dyn Colony,
    vehicle: VehicleId,
    settlement: SettlementId,
    required: &ResourceLedger,
    budget: f64,
) -> f64 {
    let missing = required.shortfall(&colony.vehicle_cargo(vehicle));
    let mut left = budget;
    for (kind, count) in missing.equipment_items() {
        let mut moved = 0;
        while moved < count && left > 0.0 {
            if colony.retrieve_equipment_from_settlement(settlement, kind, 1) == 0 {
                break;
            }
            if colony.store_equipment_in_vehicle(vehicle, kind, 1) == 0 {
                colony.store_equipment_in_settlement(settlement, kind, 1);
                break;
            }
            moved += 1;
            left -= kind.mass();
        }
    }
    for (resource, amount) in missing.resources() {
        if left <= 0.0 {
            break;
        }
        let taken = colony.retrieve_from_settlement(settlement, resource, amount.min(left));
        let stored = colony.store_in_vehicle(vehicle, resource, taken);
        if stored < taken {
            colony.store_in_settlement(settlement, resource, taken - stored);
        }
        left -= stored;
    }
    budget - left
}

/// Move up to `budget` kg of cargo (fuel excluded) from the vehicle into the
/// settlement. Returns the cargo mass still aboard.
pub fn unload_cargo(colony: &mut dyn Colony, vehicle: VehicleId, settlement: SettlementId, budget: f64) -> f64 {
    let cargo = colony.vehicle_cargo(vehicle);
    let mut left = budget;
    for (resource, amount) in cargo.resources() {
        if resource == ResourceId::Methane {
            continue;
        }
        if left <= 0.0 {
            break;
        }
        let taken = colony.retrieve_from_vehicle(vehicle, resource, amount.min(left));
        colony.store_in_settlement(settlement, resource, taken);
        left -= taken;
    }
    if left > 0.0 {
        for (kind, count) in cargo.equipment_items() {
            let taken = colony.retrieve_equipment_from_vehicle(vehicle, kind, count);
            colony.store_equipment_in_settlement(settlement, kind, taken);
        }
    }
    let after = colony.vehicle_cargo(vehicle);
    (after.total_mass() - after.resource(ResourceId::Methane)).max(0.0)
}
