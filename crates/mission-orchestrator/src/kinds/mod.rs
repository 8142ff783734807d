//! Mission kinds.
//!
//! Each kind is a [`MissionStrategy`] over the shared [`MissionCore`]. Vehicle
//! kinds plan in the same order: reserve the vehicle, recruit, pick the
//! destination or sites, lay the route home, then check provisions.

mod collect;
mod construction;
mod exploration;
mod mining;
mod rescue;
mod trade;
mod travel;

pub use collect::CollectResources;
pub use construction::Construction;
pub use exploration::Exploration;
pub use mining::Mining;
pub use rescue::Rescue;
pub use trade::TradeMission;
pub use travel::TravelToSettlement;

use mission_core::enums::{MissionKind, ResourceId};

use crate::context::MissionContext;
use crate::mission::{MissionCore, MissionStrategy};
use crate::{recruiter, vehicle};

/// Strategy for a mission kind.
pub fn strategy_for(kind: MissionKind) -> Box<dyn MissionStrategy> {
    match kind {
        MissionKind::CollectIce => Box::new(CollectResources::new(ResourceId::Ice)),
        MissionKind::CollectRegolith => Box::new(CollectResources::new(ResourceId::Regolith)),
        MissionKind::Exploration => Box::new(Exploration::default()),
        MissionKind::Mining => Box::new(Mining::default()),
        MissionKind::Trade => Box::new(TradeMission::trade()),
        MissionKind::Delivery => Box::new(TradeMission::delivery()),
        MissionKind::Construction => Box::new(Construction::default()),
        MissionKind::Rescue => Box::new(Rescue::default()),
        MissionKind::TravelToSettlement => Box::new(TravelToSettlement::default()),
    }
}

/// Reserve the kind's vehicle (if any), then recruit.
fn crew_up(core: &mut MissionCore, ctx: &mut MissionContext<'_>) -> bool {
    if let Some(kind) = core.kind().vehicle_kind() {
        if !vehicle::reserve_vehicle(core, ctx, kind) {
            return false;
        }
    }
    recruiter::recruit(core, ctx)
}
