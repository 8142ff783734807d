//! Ice and regolith collection.

use tracing::{debug, info};

use mission_core::config::MissionConfig;
use mission_core::constants::COLLECTION_RATE;
use mission_core::enums::*;
use mission_core::types::*;

use crate::context::{Colony, MissionContext};
use crate::ledger::{ResourceLedger, TripDemand};
use crate::mission::{MissionCore, MissionStrategy};
use crate::sites::{self, HasSiteSelection};
use crate::vehicle;

const PHASES: &[MissionPhase] = &[MissionPhase::CollectResources];

/// Drive out to a few sites and fill large bags with one resource.
#[derive(Debug, Clone)]
pub struct CollectResources {
    resource: ResourceId,
    num_sites: usize,
    site_elapsed: f64,
    collected_here: f64,
}

impl CollectResources {
    pub fn new(resource: ResourceId) -> Self {
        Self {
            resource,
            num_sites: 0,
            site_elapsed: 0.0,
            collected_here: 0.0,
        }
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    fn site_target(&self, config: &MissionConfig) -> f64 {
        config.sites.collection_target_kg / self.num_sites.max(1) as f64
    }

    fn collect(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let Some(vehicle) = core.vehicle() else {
            core.phases.end_phase();
            return;
        };
        let demand = self.demand(core, &*ctx.colony, ctx.config);
        if let Some(exit) = sites::should_end_site_phase(core, &*ctx.colony, ctx.config, &demand, ctx.now()) {
            debug!(mission = %core.id(), ?exit, "leaving collection site");
            core.phases.end_phase();
            return;
        }
        sites::assign_eva(core, ctx);

        let target = self.site_target(ctx.config);
        let wanted = (COLLECTION_RATE * core.members().len() as f64 * ctx.pulse.elapsed)
            .min(target - self.collected_here);
        let stored = ctx.colony.store_in_vehicle(vehicle, self.resource, wanted);
        self.collected_here += stored;
        self.site_elapsed += ctx.pulse.elapsed;

        let cargo_full = stored + 1e-9 < wanted;
        if cargo_full || self.collected_here >= target || self.site_elapsed >= self.site_time(ctx.config) {
            debug!(
                mission = %core.id(),
                resource = ?self.resource,
                collected = self.collected_here,
                cargo_full,
                "site collection done"
            );
            core.phases.end_phase();
        }
    }
}

impl HasSiteSelection for CollectResources {
    fn site_phase(&self) -> MissionPhase {
        MissionPhase::CollectResources
    }

    fn site_time(&self, config: &MissionConfig) -> f64 {
        config.sites.collection_site_time
    }

    fn requested_sites(&self, config: &MissionConfig) -> usize {
        config.sites.collection_sites
    }

    fn not_determined_status(&self) -> MissionStatus {
        MissionStatus::CollectionSitesNotDetermined
    }

    fn site_label(&self) -> &'static str {
        "Collection Site"
    }
}

impl MissionStrategy for CollectResources {
    fn phases(&self) -> &'static [MissionPhase] {
        PHASES
    }

    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        if !super::crew_up(core, ctx) {
            return;
        }
        let Some(locations) = sites::plan_sites(self, core, ctx) else {
            core.end_mission(self.not_determined_status(), ctx);
            return;
        };
        self.num_sites = locations.len();
        if let Some(travel) = core.travel.as_mut() {
            for (i, location) in locations.into_iter().enumerate() {
                travel
                    .nav
                    .add_waypoint(Waypoint::site(location, format!("{} {}", self.site_label(), i + 1)));
            }
        }
        vehicle::add_home_waypoint(core, ctx);
        info!(mission = %core.id(), resource = ?self.resource, sites = self.num_sites, "collection planned");

        let demand = self.demand(core, &*ctx.colony, ctx.config);
        vehicle::check_provisions(core, ctx, &demand);
    }

    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        match core.phases.current() {
            MissionPhase::CollectResources => {
                sites::end_eva(core, ctx);
                vehicle::start_leg(core, ctx);
            }
            MissionPhase::Travelling => {
                self.site_elapsed = 0.0;
                self.collected_here = 0.0;
                vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::CollectResources));
            }
            _ => vehicle::determine_travel_phase(core, ctx, Some(MissionPhase::CollectResources)),
        }
    }

    fn perform_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, _agent: AgentId) {
        if core.phases.current() == MissionPhase::CollectResources {
            self.collect(core, ctx);
        }
    }

    fn demand(&self, core: &MissionCore, _colony: &dyn Colony, config: &MissionConfig) -> TripDemand {
        let site_time = sites::remaining_site_time(core, MissionPhase::CollectResources, self.site_time(config), self.site_elapsed);
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
