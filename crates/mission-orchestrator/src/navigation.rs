//! Ordered waypoints for travel missions, plus route optimization.

use mission_core::types::{Coordinates, Waypoint};

/// Waypoints a travel mission visits in order. The last one is where the
/// vehicle ends up (home, unless rerouted).
#[derive(Debug, Clone, Default)]
pub struct NavigationPlan {
    waypoints: Vec<Waypoint>,
    /// Index of the waypoint being headed to; `waypoints.len()` once all
    /// have been reached.
    next: usize,
}

impl NavigationPlan {
    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    /// The last waypoint reached, if any.
    pub fn current_waypoint(&self) -> Option<&Waypoint> {
        self.next.checked_sub(1).and_then(|i| self.waypoints.get(i))
    }

    /// Index of the last waypoint reached.
    pub fn current_index(&self) -> Option<usize> {
        self.next.checked_sub(1)
    }

    /// The waypoint being headed to.
    pub fn next_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.get(self.next)
    }

    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Mark the next waypoint as reached.
    pub fn advance(&mut self) {
        if self.next < self.waypoints.len() {
            self.next += 1;
        }
    }

    /// Great-circle distance from `from` through every unvisited waypoint (km).
    pub fn remaining_distance(&self, from: Coordinates) -> f64 {
        let mut total = 0.0;
        let mut position = from;
        for waypoint in &self.waypoints[self.next.min(self.waypoints.len())..] {
            total += position.distance_to(&waypoint.location);
            position = waypoint.location;
        }
        total
    }

    /// Replace every unvisited waypoint with `sequence`.
    pub fn reset_remaining_to(&mut self, sequence: Vec<Waypoint>) {
        self.waypoints.truncate(self.next);
        self.waypoints.extend(sequence);
    }

    /// Unvisited waypoints that are not settlements.
    pub fn remaining_site_count(&self) -> usize {
        self.waypoints[self.next.min(self.waypoints.len())..]
            .iter()
            .filter(|w| w.settlement.is_none())
            .count()
    }

    /// True once the final waypoint has been reached.
    pub fn is_at_last(&self) -> bool {
        !self.waypoints.is_empty() && self.next >= self.waypoints.len()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }
}

/// Length of the closed tour `start → items… → start` (km).
pub fn route_length<T>(start: Coordinates, items: &[T], location: impl Fn(&T) -> Coordinates) -> f64 {
    let mut total = 0.0;
    let mut position = start;
    for item in items {
        let next = location(item);
        total += position.distance_to(&next);
        position = next;
    }
    total + position.distance_to(&start)
}

/// Reorder `items` with a nearest-neighbour pass from `start`.
///
/// The reordered route is adopted only when its closed tour is strictly
/// shorter than the input order; otherwise the input comes back unchanged.
/// Ties between equally near items go to the earlier one, so the result is
/// a pure function of the input order.
pub fn optimize_route<T>(start: Coordinates, items: Vec<T>, location: impl Fn(&T) -> Coordinates) -> Vec<T> {
    if items.len() < 2 {
        return items;
    }
    let original = route_length(start, &items, &location);

    let mut pending: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut order = Vec::with_capacity(pending.len());
    let mut position = start;
    while order.len() < pending.len() {
        let mut best: Option<(usize, f64)> = None;
        for (i, slot) in pending.iter().enumerate() {
            if order.contains(&i) {
                continue;
            }
            if let Some(item) = slot {
                let d = position.distance_to(&location(item));
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((i, d));
                }
            }
        }
        let Some((index, _)) = best else { break };
        if let Some(item) = &pending[index] {
            position = location(item);
        }
        order.push(index);
    }

    let reordered_length = {
        let mut total = 0.0;
        let mut at = start;
        for &i in &order {
            if let Some(item) = &pending[i] {
                let next = location(item);
                total += at.distance_to(&next);
                at = next;
            }
        }
        total + at.distance_to(&start)
    };

    if reordered_length < original {
        order.iter().filter_map(|&i| pending[i].take()).collect()
    } else {
        pending.into_iter().flatten().collect()
    }
}
