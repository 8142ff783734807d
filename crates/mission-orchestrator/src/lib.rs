//! Mission orchestration for the colony engine.
//!
//! Implements the mission lifecycle (phases, statuses, membership, plan
//! review), travel and provisioning for vehicle missions, site selection,
//! recruitment, and the nine mission kinds. Talks to the colony only through
//! the collaborator traits in [`context`].

pub mod context;
pub mod kinds;
pub mod ledger;
pub mod mission;
pub mod navigation;
pub mod phase;
pub mod random;
pub mod recruiter;
pub mod sites;
pub mod status;
pub mod vehicle;

pub use context::{Colony, ColonyError, MissionContext};
pub use mission::{HasNavigation, HasResourceLedger, Mission, MissionCore, MissionStrategy};
pub use mission_core as core;

#[cfg(test)]
mod testing;
