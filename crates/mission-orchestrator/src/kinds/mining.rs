//! Mining: tow a light utility vehicle to the richest explored site and
//! bring back ore.

use tracing::{debug, info, warn};

use mission_core::config::MissionConfig;
use mission_core::constants::MINING_RATE;
use mission_core::enums::*;
use mission_core::types::*;

use crate::context::{Colony, ExploredSite, MissionContext};
use crate::ledger::{ResourceLedger, TripDemand};
use crate::mission::{MissionCore, MissionStrategy};
use crate::sites::{self, HasSiteSelection};
use crate::vehicle;

const PHASES: &[MissionPhase] = &[MissionPhase::MiningSite];

#[derive(Debug, Clone, Default)]
pub struct Mining {
    site: Option<SiteId>,
    luv: Option<VehicleId>,
    site_elapsed: f64,
}

impl Mining {
    pub fn site(&self) -> Option<SiteId> {
        self.site
    }

    pub fn luv(&self) -> Option<VehicleId> {
        self.luv
    }

    /// Richest explored, unclaimed site meeting the estimate floor within
    /// half of `range_km`; ties go to the lower id.
    pub fn best_site(colony: &dyn Colony, home: Coordinates, range_km: f64, min_estimate: f64) -> Option<ExploredSite> {
        colony
            .explored_sites()
            .into_iter()
            .filter(|s| s.explored && !s.claimed && s.mineral_estimate >= min_estimate)
            .filter(|s| home.distance_to(&s.location) <= range_km / 2.0)
            .max_by(|a, b| {
                a.mineral_estimate
                    .total_cmp(&b.mineral_estimate)
                    .then(b.id.cmp(&a.id))
            })
    }

    fn mine(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let Some(info) = core.vehicle().and_then(|v| ctx.colony.vehicle(v)) else {
            core.phases.end_phase();
            return;
        };
        let demand = self.demand(core, &*ctx.colony, ctx.config);
        if let Some(exit) = sites::should_end_site_phase(core, &*ctx.colony, ctx.config, &demand, ctx.now()) {
            debug!(mission = %core.id(), ?exit, "leaving mining site");
            core.phases.end_phase();
            return;
        }
        sites::assign_eva(core, ctx);

        let concentration = ctx.colony.mineral_concentration(info.location);
        let wanted = MINING_RATE * core.members().len() as f64 * ctx.pulse.elapsed * concentration / 100.0;
        let stored = ctx.colony.store_in_vehicle(info.id, ResourceId::Ore, wanted);
        self.site_elapsed += ctx.pulse.elapsed;

        let cargo_full = stored + 1e-9 < wanted;
        if cargo_full || self.site_elapsed >= self.site_time(ctx.config) {
            debug!(mission = %core.id(), cargo_full, "mining done");
            core.phases.end_phase();
        }
    }
}

impl HasSiteSelection for Mining {
    fn site_phase(&self) -> MissionPhase {
        MissionPhase::MiningSite
    }

    fn site_time(&self, config: &MissionConfig) -> f64 {
        config.sites.mining_site_time
    }

    fn requested_sites(&self, _config: &MissionConfig) -> usize {
        1
    }

    fn not_determined_status(&self) -> MissionStatus {
        MissionStatus::MiningSiteNotBeDetermined
    }

    fn site_label(&self) -> &'static str {
        "Mining Site"
    }
}

impl MissionStrategy for Mining {
    fn phases(&self) -> &'static [MissionPhase] {
        PHASES
    }

    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        if !super::crew_up(core, ctx) {
            return;
        }
        let Some(luv) = vehicle::reserve_luv(core, ctx) else {
            core.end_mission(MissionStatus::LuvNotAvailable, ctx);
            return;
        };
        self.luv = Some(luv);

        let Some(home) = core.travel().map(|t| t.home_location) else {
            return;
        };
        let site = sites::site_budget(self, core, &*ctx.colony, ctx.config)
            .and_then(|budget| Self::best_site(&*ctx.colony, home, budget.range_km, ctx.config.sites.min_mineral_estimate));
        let Some(site) = site else {
            core.end_mission(self.not_determined_status(), ctx);
            return;
        };
        ctx.colony.claim_site(site.id, true);
        core.claimed_sites.push(site.id);
        self.site = Some(site.id);
        if let Some(travel) = core.travel.as_mut() {
            travel.nav.add_waypoint(Waypoint::site(site.location, self.site_label()));
        }
        vehicle::add_home_waypoint(core, ctx);
        info!(mission = %core.id(), site = %site.id, estimate = site.mineral_estimate, "mining planned");

        let demand = self.demand(core, &*ctx.colony, ctx.config);
        vehicle::check_provisions(core, ctx, &demand);
    }

    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        match core.phases.current() {
            MissionPhase::Embarking => {
                if let (Some(rover), Some(luv)) = (core.vehicle(), self.luv) {
                    if let Err(err) = ctx.colony.hook_tow(rover, luv) {
                        warn!(mission = %core.id(), error = %err, "cannot tow LUV");
                    }
                }
                vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::MiningSite));
            }
            MissionPhase::MiningSite => {
                sites::end_eva(core, ctx);
                vehicle::start_leg(core, ctx);
            }
            MissionPhase::Travelling => {
                self.site_elapsed = 0.0;
                vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::MiningSite));
            }
            _ => vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::MiningSite)),
        }
    }

    fn perform_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, _agent: AgentId) {
        if core.phases.current() == MissionPhase::MiningSite {
            self.mine(core, ctx);
        }
    }

    fn demand(&self, core: &MissionCore, _colony: &dyn Colony, config: &MissionConfig) -> TripDemand {
        let site_time = sites::remaining_site_time(core, MissionPhase::MiningSite, self.site_time(config), self.site_elapsed);
        let mut optional = ResourceLedger::new();
        optional.require_equipment(EquipmentKind::LargeBag, config.sites.large_bags);
        TripDemand {
            site_time,
            eva_time: site_time,
            optional,
            extra_crew: 0,
        }
    }
}
