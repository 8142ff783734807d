//! Trade valuation between settlements and the cache of best deals.
//!
//! A resource is worth more where it is scarce: its unit value falls from
//! twice the base value at zero stock toward zero as stock grows, and equals
//! the base value at [`REFERENCE_STOCK_KG`]. A deal sells what the buyer
//! values more than home does and buys back the reverse, minus the cost of
//! the round trip.

use std::collections::BTreeMap;

use mission_core::enums::ResourceId;
use mission_core::types::{Coordinates, MarsTime, SettlementId, VehicleId};
use mission_orchestrator::context::TradeDeal;

/// Resources settlements trade with each other.
pub const TRADED_RESOURCES: [ResourceId; 8] = [
    ResourceId::Oxygen,
    ResourceId::Water,
    ResourceId::Food,
    ResourceId::Ice,
    ResourceId::Regolith,
    ResourceId::Ore,
    ResourceId::SpareParts,
    ResourceId::ConstructionMaterials,
];

/// Stock at which a resource trades at its base value (kg).
pub const REFERENCE_STOCK_KG: f64 = 1000.0;

/// Stock a settlement never sells below (kg).
pub const RESERVE_STOCK_KG: f64 = 500.0;

/// Cost charged per kilometre of the round trip.
pub const TRAVEL_COST_PER_KM: f64 = 2.0;

/// Base value per kg.
pub fn base_value(resource: ResourceId) -> f64 {
    match resource {
        ResourceId::Oxygen => 4.0,
        ResourceId::Water => 2.0,
        ResourceId::Food => 6.0,
        ResourceId::Methane => 3.0,
        ResourceId::Ice => 1.0,
        ResourceId::Regolith => 0.5,
        ResourceId::Ore => 5.0,
        ResourceId::RockSamples => 8.0,
        ResourceId::SpareParts => 20.0,
        ResourceId::ConstructionMaterials => 3.0,
    }
}

/// Value per kg at a settlement holding `stock` kg.
pub fn unit_value(resource: ResourceId, stock: f64) -> f64 {
    base_value(resource) * 2.0 * REFERENCE_STOCK_KG / (stock.max(0.0) + REFERENCE_STOCK_KG)
}

/// What a settlement offers the market.
#[derive(Debug, Clone)]
pub struct Market {
    pub id: SettlementId,
    pub location: Coordinates,
    pub stock: BTreeMap<ResourceId, f64>,
}

impl Market {
    fn amount(&self, resource: ResourceId) -> f64 {
        self.stock.get(&resource).copied().unwrap_or(0.0)
    }

    fn surplus(&self, resource: ResourceId) -> f64 {
        (self.amount(resource) - RESERVE_STOCK_KG).max(0.0)
    }
}

/// Fill up to `budget` kg from `(resource, gain per kg, available)` offers,
/// best gain first. Returns the load and its total gain.
fn fill_load(mut offers: Vec<(ResourceId, f64, f64)>, budget: f64) -> (BTreeMap<ResourceId, f64>, f64) {
    offers.retain(|(_, gain, available)| *gain > 0.0 && *available > 0.0);
    offers.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut load = BTreeMap::new();
    let mut left = budget;
    let mut gain = 0.0;
    for (resource, unit_gain, available) in offers {
        if left <= 0.0 {
            break;
        }
        let amount = available.min(left);
        load.insert(resource, amount);
        gain += amount * unit_gain;
        left -= amount;
    }
    (load, gain)
}

/// Best deal from `home` with any of `others` whose round trip fits
/// `range_km`, carrying at most `cargo_kg` each way. Ties go to the lower
/// settlement id. `None` when nothing worth carrying exists anywhere.
pub fn evaluate_best_deal(home: &Market, others: &[Market], cargo_kg: f64, range_km: f64) -> Option<TradeDeal> {
    let mut best: Option<TradeDeal> = None;
    for buyer in others.iter().filter(|m| m.id != home.id) {
        let distance = home.location.distance_to(&buyer.location);
        if 2.0 * distance > range_km {
            continue;
        }

        let sell_offers = TRADED_RESOURCES
            .iter()
            .map(|r| {
                let gain = unit_value(*r, buyer.amount(*r)) - unit_value(*r, home.amount(*r));
                (*r, gain, home.surplus(*r))
            })
            .collect();
        let buy_offers = TRADED_RESOURCES
            .iter()
            .map(|r| {
                let gain = unit_value(*r, home.amount(*r)) - unit_value(*r, buyer.amount(*r));
                (*r, gain, buyer.surplus(*r))
            })
            .collect();
        let (sell_load, sell_gain) = fill_load(sell_offers, cargo_kg);
        let (buy_load, buy_gain) = fill_load(buy_offers, cargo_kg);
        if sell_load.is_empty() && buy_load.is_empty() {
            continue;
        }

        let profit = sell_gain + buy_gain - 2.0 * distance * TRAVEL_COST_PER_KM;
        let better = best.as_ref().map_or(true, |b| profit > b.profit);
        if better {
            best = Some(TradeDeal {
                buyer: Some(buyer.id),
                profit,
                sell_load,
                buy_load,
            });
        }
    }
    best
}

#[derive(Debug, Clone)]
struct CachedDeal {
    deal: Option<TradeDeal>,
    computed_at: MarsTime,
}

/// Best deals per (settlement, vehicle), reused until they are older than
/// the time-to-live.
#[derive(Debug, Clone, Default)]
pub struct DealCache {
    ttl_millisols: f64,
    entries: BTreeMap<(SettlementId, VehicleId), CachedDeal>,
}

impl DealCache {
    pub fn new(ttl_millisols: f64) -> Self {
        Self {
            ttl_millisols,
            entries: BTreeMap::new(),
        }
    }

    /// Cached deal if still fresh at `now`, otherwise `compute` a new one and
    /// remember it.
    pub fn get_or_compute(
        &mut self,
        from: SettlementId,
        vehicle: VehicleId,
        now: MarsTime,
        compute: impl FnOnce() -> Option<TradeDeal>,
    ) -> Option<TradeDeal> {
        let key = (from, vehicle);
        if let Some(cached) = self.entries.get(&key) {
            if now.since(cached.computed_at) <= self.ttl_millisols {
                return cached.deal.clone();
            }
        }
        let deal = compute();
        self.entries.insert(
            key,
            CachedDeal {
                deal: deal.clone(),
                computed_at: now,
            },
        );
        deal
    }

    /// Drop entries older than the time-to-live.
    pub fn evict_stale(&mut self, now: MarsTime) {
        let ttl = self.ttl_millisols;
        self.entries.retain(|_, cached| now.since(cached.computed_at) <= ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
