//! Rescue: reach a vehicle whose emergency beacon is on, resupply it and tow
//! it home.

use tracing::{info, warn};

use mission_core::config::MissionConfig;
use mission_core::constants::{MILLISOLS_PER_HOUR, MILLISOLS_PER_SOL};
use mission_core::enums::*;
use mission_core::events::MissionEventKind;
use mission_core::types::*;

use crate::context::{Colony, MissionContext, VehicleInfo};
use crate::ledger::TripDemand;
use crate::mission::{MissionCore, MissionStrategy};
use crate::sites::time_range_km;
use crate::vehicle;

const PHASES: &[MissionPhase] = &[MissionPhase::Rendezvous];

#[derive(Debug, Clone, Default)]
pub struct Rescue {
    target: Option<VehicleId>,
    stranded: usize,
    rendezvous_done: bool,
}

impl Rescue {
    pub fn target(&self) -> Option<VehicleId> {
        self.target
    }

    /// Nearest beaconing vehicle within `reach_km` of `from`, ties by id.
    pub fn find_target(colony: &dyn Colony, own: VehicleId, from: Coordinates, reach_km: f64) -> Option<VehicleInfo> {
        colony
            .vehicles()
            .into_iter()
            .filter(|id| *id != own)
            .filter_map(|id| colony.vehicle(id))
            .filter(|v| v.emergency_beacon && v.towed_by.is_none() && !v.reserved)
            .map(|v| (from.distance_to(&v.location), v))
            .filter(|(d, _)| *d <= reach_km)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)))
            .map(|(_, v)| v)
    }

    /// Hand over life support for the stranded crew's ride home, then hook
    /// the target up.
    fn rendezvous(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let (Some(rescuer), Some(target)) = (core.vehicle(), self.target) else {
            core.phases.end_phase();
            return;
        };
        let Some(info) = ctx.colony.vehicle(rescuer) else {
            core.phases.end_phase();
            return;
        };

        let home_km = core
            .travel()
            .map_or(0.0, |t| t.nav.remaining_distance(info.location));
        let sols = if info.base_speed_kmh > 0.0 {
            home_km / info.base_speed_kmh * MILLISOLS_PER_HOUR / MILLISOLS_PER_SOL
        } else {
            0.0
        };
        let life = &ctx.config.life_support;
        let heads = ctx.colony.vehicle_occupants(target).len() as f64;
        let margin = life.safety_margin;
        let rates = [
            (ResourceId::Oxygen, life.oxygen_per_sol),
            (ResourceId::Water, life.water_per_sol),
            (ResourceId::Food, life.food_per_sol),
        ];
        for (resource, rate) in rates {
            let wanted = rate * sols * heads * margin - ctx.colony.vehicle_amount(target, resource);
            if wanted <= 0.0 {
                continue;
            }
            let taken = ctx.colony.retrieve_from_vehicle(rescuer, resource, wanted);
            let stored = ctx.colony.store_in_vehicle(target, resource, taken);
            if stored < taken {
                ctx.colony.store_in_vehicle(rescuer, resource, taken - stored);
            }
        }

        if let Err(err) = ctx.colony.hook_tow(rescuer, target) {
            warn!(mission = %core.id(), error = %err, "cannot hook up target");
        }
        ctx.colony.set_emergency_beacon(target, false);
        self.rendezvous_done = true;
        info!(mission = %core.id(), rescuer = %rescuer, target = %target, "rendezvous");
        ctx.emit(core.id(), MissionEventKind::Rendezvous { rescuer, target });
        core.phases.end_phase();
    }
}

impl MissionStrategy for Rescue {
    fn phases(&self) -> &'static [MissionPhase] {
        PHASES
    }

    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        if !super::crew_up(core, ctx) {
            return;
        }
        let Some(info) = core.vehicle().and_then(|v| ctx.colony.vehicle(v)) else {
            return;
        };
        let Some(home) = core.travel().map(|t| t.home_location) else {
            return;
        };
        let limit = vehicle::trip_time_limit(&info, core.members().len(), ctx.config, true);
        let range = info
            .range_km()
            .min(time_range_km(limit, 0.0, 0, info.base_speed_kmh));
        let Some(target) = Self::find_target(&*ctx.colony, info.id, home, range / 2.0) else {
            core.end_mission(MissionStatus::TargetVehicleNotFound, ctx);
            return;
        };
        if let Err(err) = ctx.colony.set_vehicle_reserved(target.id, true) {
            warn!(mission = %core.id(), error = %err, "cannot reserve target");
            core.end_mission(MissionStatus::TargetVehicleNotFound, ctx);
            return;
        }
        core.reserved_vehicles.push(target.id);
        self.target = Some(target.id);
        self.stranded = ctx.colony.vehicle_occupants(target.id).len();

        if let Some(travel) = core.travel.as_mut() {
            travel
                .nav
                .add_waypoint(Waypoint::site(target.location, format!("Rescue of {}", target.name)));
        }
        vehicle::add_home_waypoint(core, ctx);
        info!(mission = %core.id(), target = %target.id, stranded = self.stranded, "rescue planned");

        let demand = self.demand(core, &*ctx.colony, ctx.config);
        vehicle::check_provisions(core, ctx, &demand);
    }

    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        match core.phases.current() {
            MissionPhase::Rendezvous => vehicle::start_leg(core, ctx),
            _ => vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::Rendezvous)),
        }
    }

    fn perform_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, _agent: AgentId) {
        if core.phases.current() == MissionPhase::Rendezvous {
            self.rendezvous(core, ctx);
        }
    }

    /// Supplies for the stranded crew ride along until they are handed over.
    fn demand(&self, _core: &MissionCore, _colony: &dyn Colony, _config: &MissionConfig) -> TripDemand {
        TripDemand {
            extra_crew: if self.rendezvous_done { 0 } else { self.stranded },
            ..TripDemand::default()
        }
    }
}
