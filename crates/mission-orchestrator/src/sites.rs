//! Site selection for multi-site missions, and the per-tick test that ends
//! work at a site.

use rand::Rng;
use tracing::debug;

use mission_core::config::MissionConfig;
use mission_core::constants::*;
use mission_core::enums::*;
use mission_core::types::*;

use crate::context::{Colony, MissionContext};
use crate::ledger::{self, TripDemand, TRIP_SUPPLIES};
use crate::mission::MissionCore;
use crate::navigation::optimize_route;
use crate::random::{random_direction, regression_f64, regression_u32};
use crate::vehicle;

/// Missions that pick remote work sites.
pub trait HasSiteSelection {
    /// Phase performed at each site.
    fn site_phase(&self) -> MissionPhase;
    /// Millisols spent at each site.
    fn site_time(&self, config: &MissionConfig) -> f64;
    /// Sites wanted before trip limits are applied.
    fn requested_sites(&self, config: &MissionConfig) -> usize;
    /// Fatal status when no site can be determined.
    fn not_determined_status(&self) -> MissionStatus;
    /// Waypoint label prefix.
    fn site_label(&self) -> &'static str;
}

/// How many sites fit a trip, and how far they may spread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteBudget {
    pub num_sites: usize,
    /// Total route length available (km).
    pub range_km: f64,
}

/// Distance the vehicle can cover in the trip time not spent at sites (km).
pub fn time_range_km(time_limit: f64, site_time: f64, num_sites: usize, speed_kmh: f64) -> f64 {
    (time_limit - site_time * num_sites as f64) / MILLISOLS_PER_HOUR * speed_kmh
}

/// Reduce the site count until some travel time remains. Returns the count
/// and the matching time range.
pub fn fit_site_count(time_limit: f64, site_time: f64, requested: usize, speed_kmh: f64) -> Option<(usize, f64)> {
    (1..=requested).rev().find_map(|n| {
        let range = time_range_km(time_limit, site_time, n, speed_kmh);
        (range > 0.0).then_some((n, range))
    })
}

/// Site budget for the mission's reserved vehicle and current crew.
pub fn site_budget<S: HasSiteSelection + ?Sized>(
    selector: &S,
    core: &MissionCore,
    colony: &dyn Colony,
    config: &MissionConfig,
) -> Option<SiteBudget> {
    let info = colony.vehicle(core.vehicle()?)?;
    let time_limit = vehicle::trip_time_limit(&info, core.members().len(), config, true);
    let requested = selector.requested_sites(config);
    let (num_sites, time_range) =
        fit_site_count(time_limit, selector.site_time(config), requested, info.base_speed_kmh)?;
    if num_sites < requested {
        debug!(mission = %core.id(), requested, num_sites, "site count reduced to fit trip time");
    }
    Some(SiteBudget {
        num_sites,
        range_km: info.range_km().min(time_range),
    })
}

/// Confidence grows with the colony's age, pushing sites further out.
pub fn site_confidence<R: Rng + ?Sized>(rng: &mut R, base: u32, mission_sol: u32) -> u32 {
    base + regression_u32(rng, mission_sol)
}

/// Furthest the first site may be from home. Rises with `confidence` toward
/// half the range without reaching it.
pub fn first_site_limit(confidence: u32, range_km: f64) -> f64 {
    let confidence = confidence as f64;
    range_km / 2.0 * confidence / (confidence + SITE_CONFIDENCE_SCALE)
}

/// Generate up to `num_sites` sites around `home` whose closed tour stays
/// within `range_km`. The first site stays inside [`first_site_limit`]; each
/// later one is bounded so the vehicle can still make it home.
pub fn generate_sites<R: Rng + ?Sized>(
    rng: &mut R,
    home: Coordinates,
    range_km: f64,
    num_sites: usize,
    confidence: u32,
) -> Vec<Coordinates> {
    let mut sites = Vec::with_capacity(num_sites);
    if num_sites == 0 || range_km <= 0.0 {
        return sites;
    }

    let distance = regression_f64(rng, first_site_limit(confidence, range_km));
    let mut current = home.destination(random_direction(rng), distance);
    let mut travelled = distance;
    sites.push(current);

    while sites.len() < num_sites {
        let back = current.distance_to(&home);
        let remaining = range_km - travelled;
        if remaining <= back {
            break;
        }
        let direction = random_direction(rng);
        let theta = direction - current.bearing_to(&home);
        // Law of cosines: the leg `s` and the way home must fit `remaining`.
        let limit = (remaining * remaining - back * back) / (2.0 * remaining - 2.0 * back * theta.cos());
        let distance = regression_f64(rng, limit.min(range_km / 4.0));
        current = current.destination(direction, distance);
        travelled += distance;
        sites.push(current);
    }
    sites
}

/// Budget, generate and order sites for `selector`. `None` when no viable
/// set was found within the allowed attempts.
pub fn plan_sites<S: HasSiteSelection + ?Sized>(
    selector: &S,
    core: &MissionCore,
    ctx: &mut MissionContext<'_>,
) -> Option<Vec<Coordinates>> {
    let budget = site_budget(selector, core, &*ctx.colony, ctx.config)?;
    let home = core.travel()?.home_location;
    for attempt in 1..=SITE_SELECTION_ATTEMPTS {
        let confidence = site_confidence(ctx.rng, ctx.config.sites.confidence_base, ctx.now().mission_sol());
        let sites = generate_sites(ctx.rng, home, budget.range_km, budget.num_sites, confidence);
        if sites.len() == budget.num_sites {
            debug!(mission = %core.id(), sites = sites.len(), range_km = budget.range_km, "sites determined");
            return Some(optimize_route(home, sites, |c| *c));
        }
        debug!(mission = %core.id(), attempt, "site generation fell short");
    }
    None
}

/// Why work at a site stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteExit {
    Darkness,
    MedicalEmergency,
    Supplies,
}

/// Early-exit test for a site phase: darkness, a crew medical emergency, or
/// vehicle supplies short of the rest of the trip.
pub fn should_end_site_phase(
    core: &MissionCore,
    colony: &dyn Colony,
    config: &MissionConfig,
    demand: &TripDemand,
    now: MarsTime,
) -> Option<SiteExit> {
    let travel = core.travel()?;
    let info = colony.vehicle(travel.vehicle)?;
    if colony.solar_irradiance(info.location, now) <= DARKNESS_IRRADIANCE {
        return Some(SiteExit::Darkness);
    }
    if core
        .members()
        .iter()
        .any(|m| colony.has_medical_emergency(m.agent))
    {
        return Some(SiteExit::MedicalEmergency);
    }
    let required = ledger::estimate_trip(
        colony,
        config,
        travel.vehicle,
        &travel.nav,
        core.members().len(),
        demand,
        false,
    );
    if !required.resources_covered_by(&colony.vehicle_cargo(travel.vehicle), &TRIP_SUPPLIES) {
        return Some(SiteExit::Supplies);
    }
    None
}

/// Site time still ahead: unvisited sites plus what is left at the current one.
pub fn remaining_site_time(core: &MissionCore, site_phase: MissionPhase, site_time: f64, spent_here: f64) -> f64 {
    let Some(travel) = core.travel() else {
        return 0.0;
    };
    let upcoming = travel.nav.remaining_site_count() as f64 * site_time;
    let current = if core.phase() == Some(site_phase) {
        (site_time - spent_here).max(0.0)
    } else {
        0.0
    };
    upcoming + current
}

/// Send every member out on EVA.
pub fn assign_eva(core: &MissionCore, ctx: &mut MissionContext<'_>) {
    let task = Task::Eva { kind: core.kind() };
    for agent in core.member_ids() {
        if ctx.colony.current_task(agent) != Some(task) {
            if let Err(err) = ctx.colony.assign_task(agent, task) {
                debug!(mission = %core.id(), agent = %agent, error = %err, "cannot assign EVA");
            }
        }
    }
}

/// Call every member back from EVA.
pub fn end_eva(core: &MissionCore, ctx: &mut MissionContext<'_>) {
    for agent in core.member_ids() {
        if matches!(ctx.colony.current_task(agent), Some(Task::Eva { .. })) {
            ctx.colony.clear_task(agent);
        }
    }
}
