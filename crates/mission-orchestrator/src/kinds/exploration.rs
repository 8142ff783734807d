//! Exploration: survey sites for mineral content so they can be mined later.

use rand::Rng;
use tracing::{debug, info};

use mission_core::config::MissionConfig;
use mission_core::constants::{SAMPLE_RATE, SPECIMEN_BOX_CAPACITY};
use mission_core::enums::*;
use mission_core::types::*;

use crate::context::{Colony, MissionContext};
use crate::ledger::{ResourceLedger, TripDemand};
use crate::mission::{MissionCore, MissionStrategy};
use crate::navigation::optimize_route;
use crate::sites::{self, HasSiteSelection};
use crate::vehicle;

const PHASES: &[MissionPhase] = &[MissionPhase::ExploreSite];

#[derive(Debug, Clone, Default)]
pub struct Exploration {
    /// Surveyed sites in visiting order; index matches the waypoint index.
    sites: Vec<SiteId>,
    site_elapsed: f64,
}

impl Exploration {
    pub fn sites(&self) -> &[SiteId] {
        &self.sites
    }

    /// Unclaimed, unexplored known sites within half of `range_km` from home,
    /// nearest first.
    fn reusable_sites(colony: &dyn Colony, home: Coordinates, range_km: f64, limit: usize) -> Vec<(SiteId, Coordinates)> {
        let mut found: Vec<(SiteId, Coordinates, f64)> = colony
            .explored_sites()
            .into_iter()
            .filter(|s| !s.claimed && !s.explored)
            .map(|s| (s.id, s.location, home.distance_to(&s.location)))
            .filter(|(_, _, d)| *d <= range_km / 2.0)
            .collect();
        found.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));
        found.into_iter().take(limit).map(|(id, loc, _)| (id, loc)).collect()
    }

    fn current_site(&self, core: &MissionCore) -> Option<SiteId> {
        let index = core.travel()?.nav.current_index()?;
        self.sites.get(index).copied()
    }

    fn finish_site(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let location = core
            .vehicle()
            .and_then(|v| ctx.colony.vehicle(v))
            .map(|v| v.location);
        if let (true, Some(site), Some(location)) = (self.site_elapsed > 0.0, self.current_site(core), location) {
            let estimate = ctx.colony.mineral_concentration(location) * ctx.rng.gen_range(0.9..1.1);
            ctx.colony.mark_explored(site, estimate);
            info!(mission = %core.id(), site = %site, estimate, "site explored");
        }
        core.phases.end_phase();
    }

    fn explore(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let Some(vehicle) = core.vehicle() else {
            core.phases.end_phase();
            return;
        };
        let demand = self.demand(core, &*ctx.colony, ctx.config);
        if let Some(exit) = sites::should_end_site_phase(core, &*ctx.colony, ctx.config, &demand, ctx.now()) {
            debug!(mission = %core.id(), ?exit, "leaving exploration site");
            self.finish_site(core, ctx);
            return;
        }
        sites::assign_eva(core, ctx);

        let box_room = ctx.colony.vehicle_equipment(vehicle, EquipmentKind::SpecimenBox) as f64 * SPECIMEN_BOX_CAPACITY
            - ctx.colony.vehicle_amount(vehicle, ResourceId::RockSamples);
        let samples = (SAMPLE_RATE * core.members().len() as f64 * ctx.pulse.elapsed).min(box_room);
        if samples > 0.0 {
            ctx.colony.store_in_vehicle(vehicle, ResourceId::RockSamples, samples);
        }
        self.site_elapsed += ctx.pulse.elapsed;
        if self.site_elapsed >= self.site_time(ctx.config) {
            self.finish_site(core, ctx);
        }
    }
}

impl HasSiteSelection for Exploration {
    fn site_phase(&self) -> MissionPhase {
        MissionPhase::ExploreSite
    }

    fn site_time(&self, config: &MissionConfig) -> f64 {
        config.sites.exploration_site_time
    }

    fn requested_sites(&self, config: &MissionConfig) -> usize {
        config.sites.exploration_sites
    }

    fn not_determined_status(&self) -> MissionStatus {
        MissionStatus::ExplorationSitesNotDetermined
    }

    fn site_label(&self) -> &'static str {
        "Exploration Site"
    }
}

impl MissionStrategy for Exploration {
    fn phases(&self) -> &'static [MissionPhase] {
        PHASES
    }

    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        if !super::crew_up(core, ctx) {
            return;
        }
        let Some((home, home_location)) = core.travel().map(|t| (t.home, t.home_location)) else {
            return;
        };
        let Some(budget) = sites::site_budget(self, core, &*ctx.colony, ctx.config) else {
            core.end_mission(self.not_determined_status(), ctx);
            return;
        };

        let mut planned = Self::reusable_sites(&*ctx.colony, home_location, budget.range_km, budget.num_sites);
        if planned.is_empty() {
            let Some(locations) = sites::plan_sites(self, core, ctx) else {
                core.end_mission(self.not_determined_status(), ctx);
                return;
            };
            planned = locations
                .into_iter()
                .map(|loc| (ctx.colony.register_site(loc, Some(home)), loc))
                .collect();
        } else {
            debug!(mission = %core.id(), reused = planned.len(), "reusing known sites");
        }
        let planned = optimize_route(home_location, planned, |(_, loc)| *loc);

        for (id, _) in &planned {
            ctx.colony.claim_site(*id, true);
            core.claimed_sites.push(*id);
        }
        self.sites = planned.iter().map(|(id, _)| *id).collect();
        if let Some(travel) = core.travel.as_mut() {
            for (i, (_, location)) in planned.into_iter().enumerate() {
                travel
                    .nav
                    .add_waypoint(Waypoint::site(location, format!("{} {}", self.site_label(), i + 1)));
            }
        }
        vehicle::add_home_waypoint(core, ctx);
        info!(mission = %core.id(), sites = self.sites.len(), "exploration planned");

        let demand = self.demand(core, &*ctx.colony, ctx.config);
        vehicle::check_provisions(core, ctx, &demand);
    }

    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        match core.phases.current() {
            MissionPhase::ExploreSite => {
                sites::end_eva(core, ctx);
                vehicle::start_leg(core, ctx);
            }
            MissionPhase::Travelling => {
                self.site_elapsed = 0.0;
                vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::ExploreSite));
            }
            _ => vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::ExploreSite)),
        }
    }

    fn perform_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, _agent: AgentId) {
        if core.phases.current() == MissionPhase::ExploreSite {
            self.explore(core, ctx);
        }
    }

    fn demand(&self, core: &MissionCore, _colony: &dyn Colony, config: &MissionConfig) -> TripDemand {
        let site_time = sites::remaining_site_time(core, MissionPhase::ExploreSite, self.site_time(config), self.site_elapsed);
        let mut optional = ResourceLedger::new();
        optional.require_equipment(EquipmentKind::SpecimenBox, config.sites.specimen_boxes);
        TripDemand {
            site_time,
            eva_time: site_time,
            optional,
            extra_crew: 0,
        }
    }
}
