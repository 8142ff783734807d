//! Systems run by the engine each tick.
//!
//! Systems are free functions over the colony world and the mission table.
//! They do not own state; everything they touch is passed in.

pub mod cleanup;
pub mod missions;
pub mod snapshot;
pub mod tasks;
