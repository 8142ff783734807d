//! Headless simulation host for the colony mission engine.
//!
//! Owns a hecs world holding agents, vehicles, settlements and sites,
//! implements the orchestrator's collaborator traits over it, runs the
//! missions at a fixed clock pulse and produces `MissionSnapshot`s.

pub mod components;
pub mod engine;
pub mod market;
pub mod scenario;
pub mod systems;
pub mod world;
pub mod world_setup;

pub use engine::{MissionEngine, SimConfig};
pub use mission_core as core;
pub use world::ColonyWorld;

#[cfg(test)]
mod tests;
