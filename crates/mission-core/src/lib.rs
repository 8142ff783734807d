//! Core types and definitions for the colony mission engine.
//!
//! This crate defines the vocabulary shared across all other crates:
//! identifiers, coordinates, Mars time, mission enums, events, commands,
//! snapshot views, tuning constants and runtime configuration.
//! It has no dependency on the simulation host or any entity storage.

pub mod commands;
pub mod config;
pub mod constants;
pub mod enums;
pub mod events;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
