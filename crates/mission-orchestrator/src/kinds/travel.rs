//! Relocation of a group to another settlement.

use tracing::{info, warn};

use mission_core::enums::*;
use mission_core::types::*;

use crate::context::{Colony, MissionContext, SettlementInfo};
use crate::mission::{MissionCore, MissionStrategy};
use crate::sites::time_range_km;
use crate::vehicle;

/// Penalty per kilometre when ranking destinations, in beds.
const DISTANCE_PENALTY_PER_KM: f64 = 0.01;

#[derive(Debug, Clone, Default)]
pub struct TravelToSettlement {
    destination: Option<SettlementId>,
}

impl TravelToSettlement {
    pub fn destination(&self) -> Option<SettlementId> {
        self.destination
    }

    /// Settlement with the most spare beds net of distance that can take
    /// `group` people and lies within `reach_km`; ties by id.
    pub fn best_destination(
        colony: &dyn Colony,
        home: SettlementId,
        from: Coordinates,
        reach_km: f64,
        group: usize,
    ) -> Option<SettlementInfo> {
        colony
            .settlements()
            .into_iter()
            .filter(|id| *id != home)
            .filter_map(|id| colony.settlement(id))
            .filter(|s| s.capacity.saturating_sub(s.population) >= group)
            .map(|s| (from.distance_to(&s.location), s))
            .filter(|(d, _)| *d <= reach_km)
            .map(|(d, s)| {
                let spare = s.capacity.saturating_sub(s.population) as f64;
                (spare - d * DISTANCE_PENALTY_PER_KM, s)
            })
            .max_by(|a, b| a.0.total_cmp(&b.0).then(b.1.id.cmp(&a.1.id)))
            .map(|(_, s)| s)
    }
}

impl MissionStrategy for TravelToSettlement {
    fn phases(&self) -> &'static [MissionPhase] {
        &[]
    }

    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        if !super::crew_up(core, ctx) {
            return;
        }
        let Some(info) = core.vehicle().and_then(|v| ctx.colony.vehicle(v)) else {
            return;
        };
        let Some((home, from)) = core.travel().map(|t| (t.home, t.home_location)) else {
            return;
        };
        let limit = vehicle::trip_time_limit(&info, core.members().len(), ctx.config, true);
        let reach = info
            .range_km()
            .min(time_range_km(limit, 0.0, 0, info.base_speed_kmh));
        let Some(dest) = Self::best_destination(&*ctx.colony, home, from, reach, core.members().len()) else {
            core.end_mission(MissionStatus::NoDestinationSettlement, ctx);
            return;
        };
        self.destination = Some(dest.id);
        if let Some(travel) = core.travel.as_mut() {
            travel
                .nav
                .add_waypoint(Waypoint::settlement(dest.location, dest.id, dest.name.clone()));
        }
        info!(mission = %core.id(), destination = %dest.id, "relocation planned");

        let demand = self.demand(core, &*ctx.colony, ctx.config);
        vehicle::check_provisions(core, ctx, &demand);
    }

    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        if core.phases.current() == MissionPhase::Disembarking {
            let arrived = core
                .travel()
                .and_then(|t| t.nav.current_waypoint())
                .and_then(|w| w.settlement);
            if let (Some(dest), Some(arrived)) = (self.destination, arrived) {
                if dest == arrived {
                    for agent in core.member_ids() {
                        if let Err(err) = ctx.colony.relocate_agent(agent, dest) {
                            warn!(mission = %core.id(), agent = %agent, error = %err, "cannot relocate");
                        }
                    }
                    info!(mission = %core.id(), destination = %dest, "group relocated");
                }
            }
        }
        vehicle::determine_travel_phase(core, ctx, None);
    }

    fn perform_phase(&mut self, _core: &mut MissionCore, _ctx: &mut MissionContext<'_>, _agent: AgentId) {}
}
