//! Task system: carries out the tasks missions push to colonists.
//!
//! Boarding and disembarking take effect on the next pulse. A negotiation
//! finishes once the trader has spent [`NEGOTIATION_MILLISOLS`] on it while
//! fit. Every other task is long-running and stays until its mission clears it.

use hecs::World;

use mission_core::enums::Task;

use crate::components::{Assignment, Health, Whereabouts};

/// Millisols a fit trader needs to close a deal.
pub const NEGOTIATION_MILLISOLS: f64 = 50.0;

pub fn run(world: &mut World, elapsed: f64) {
    for (_entity, (assignment, place, health)) in
        world.query_mut::<(&mut Assignment, &mut Whereabouts, &Health)>()
    {
        let Some(task) = assignment.task else {
            continue;
        };
        assignment.task_elapsed += elapsed;

        match task {
            Task::Board { vehicle } => {
                place.aboard = Some(vehicle);
                finish(assignment);
            }
            Task::Disembark { .. } => {
                place.aboard = None;
                finish(assignment);
            }
            Task::Negotiate { .. } => {
                if health.fit && assignment.task_elapsed >= NEGOTIATION_MILLISOLS {
                    finish(assignment);
                }
            }
            _ => {}
        }
    }
}

fn finish(assignment: &mut Assignment) {
    assignment.task = None;
    assignment.task_elapsed = 0.0;
}
