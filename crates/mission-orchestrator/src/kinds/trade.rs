//! Trade and delivery runs to another settlement.
//!
//! Both carry the best available deal's goods to the buyer, swap them for
//! the goods bought and return home. A trade mission drives a crewed rover
//! and negotiates on site; a delivery flies a drone its pilot steers from
//! home.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use mission_core::config::MissionConfig;
use mission_core::enums::*;
use mission_core::types::*;

use crate::context::{Colony, MissionContext, TradeDeal};
use crate::ledger::{ResourceLedger, TripDemand};
use crate::mission::{MissionCore, MissionStrategy};
use crate::vehicle;

const TRADE_PHASES: &[MissionPhase] = &[
    MissionPhase::TradeDisembarking,
    MissionPhase::TradeNegotiating,
    MissionPhase::UnloadGoods,
    MissionPhase::LoadGoods,
    MissionPhase::TradeEmbarking,
];

const DELIVERY_PHASES: &[MissionPhase] = &[
    MissionPhase::DeliveryDisembarking,
    MissionPhase::UnloadGoods,
    MissionPhase::LoadGoods,
    MissionPhase::DeliveryEmbarking,
];

const STALLED_NEGOTIATION: &str = "Trade negotiation stalled";

#[derive(Debug, Clone, Default)]
pub struct TradeMission {
    delivery: bool,
    deal: Option<TradeDeal>,
    to_unload: BTreeMap<ResourceId, f64>,
    to_load: BTreeMap<ResourceId, f64>,
    negotiating: bool,
    stalled: bool,
}

impl TradeMission {
    pub fn trade() -> Self {
        Self::default()
    }

    pub fn delivery() -> Self {
        Self {
            delivery: true,
            ..Self::default()
        }
    }

    pub fn deal(&self) -> Option<&TradeDeal> {
        self.deal.as_ref()
    }

    fn buyer(&self) -> Option<SettlementId> {
        self.deal.as_ref().and_then(|d| d.buyer)
    }

    fn arrival_phase(&self) -> MissionPhase {
        if self.delivery {
            MissionPhase::DeliveryDisembarking
        } else {
            MissionPhase::TradeDisembarking
        }
    }

    fn departure_phase(&self) -> MissionPhase {
        if self.delivery {
            MissionPhase::DeliveryEmbarking
        } else {
            MissionPhase::TradeEmbarking
        }
    }

    fn buyer_name(&self, ctx: &MissionContext<'_>) -> String {
        self.buyer()
            .and_then(|b| ctx.colony.settlement(b))
            .map_or_else(|| "buyer".to_string(), |s| s.name)
    }

    fn negotiate(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, trader: AgentId) {
        let Some(buyer) = self.buyer() else {
            core.phases.end_phase();
            return;
        };
        let task = Task::Negotiate { settlement: buyer };
        if !self.negotiating {
            match ctx.colony.assign_task(trader, task) {
                Ok(()) => self.negotiating = true,
                Err(err) => warn!(mission = %core.id(), agent = %trader, error = %err, "cannot negotiate"),
            }
            return;
        }
        if ctx.colony.current_task(trader) != Some(task) {
            info!(mission = %core.id(), buyer = %buyer, "deal struck");
            core.phases.end_phase();
            return;
        }
        if core.phases.elapsed_in_phase(ctx.now()) > ctx.config.trade.negotiation_timeout_millisols {
            warn!(mission = %core.id(), buyer = %buyer, "negotiation stalled, heading home");
            ctx.colony.clear_task(trader);
            core.add_status(MissionStatus::Custom(STALLED_NEGOTIATION.to_string()), ctx);
            self.stalled = true;
            core.phases.end_phase();
        }
    }

    /// Move sold goods from the vehicle into the buyer's stores.
    fn unload_goods(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let (Some(vehicle), Some(buyer)) = (core.vehicle(), self.buyer()) else {
            core.phases.end_phase();
            return;
        };
        let mut left = ctx.config.travel.loading_rate_kg_per_millisol * ctx.pulse.elapsed;
        for (resource, pending) in self.to_unload.iter_mut() {
            if left <= 0.0 {
                break;
            }
            let wanted = pending.min(left);
            let taken = ctx.colony.retrieve_from_vehicle(vehicle, *resource, wanted);
            ctx.colony.store_in_settlement(buyer, *resource, taken);
            left -= taken;
            // Nothing more of this aboard.
            *pending = if taken < wanted { 0.0 } else { *pending - taken };
        }
        self.to_unload.retain(|_, pending| *pending > 1e-6);
        if self.to_unload.is_empty() {
            debug!(mission = %core.id(), "goods unloaded");
            core.phases.end_phase();
        }
    }

    /// Move bought goods from the buyer's stores into the vehicle.
    fn load_goods(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let (Some(vehicle), Some(buyer)) = (core.vehicle(), self.buyer()) else {
            core.phases.end_phase();
            return;
        };
        let mut left = ctx.config.travel.loading_rate_kg_per_millisol * ctx.pulse.elapsed;
        for (resource, pending) in self.to_load.iter_mut() {
            if left <= 0.0 {
                break;
            }
            let wanted = pending.min(left);
            let taken = ctx.colony.retrieve_from_settlement(buyer, *resource, wanted);
            let stored = ctx.colony.store_in_vehicle(vehicle, *resource, taken);
            if stored < taken {
                ctx.colony.store_in_settlement(buyer, *resource, taken - stored);
            }
            left -= stored;
            *pending = if stored < wanted { 0.0 } else { *pending - stored };
        }
        self.to_load.retain(|_, pending| *pending > 1e-6);
        if self.to_load.is_empty() {
            debug!(mission = %core.id(), "goods loaded");
            core.phases.end_phase();
        }
    }
}

impl MissionStrategy for TradeMission {
    fn phases(&self) -> &'static [MissionPhase] {
        if self.delivery {
            DELIVERY_PHASES
        } else {
            TRADE_PHASES
        }
    }

    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        if !super::crew_up(core, ctx) {
            return;
        }
        let Some((vehicle, home)) = core.travel().map(|t| (t.vehicle, t.home)) else {
            return;
        };
        let now = ctx.now();
        let deal = match ctx.colony.best_deal(home, vehicle, now) {
            Some(deal) if deal.buyer.is_some() && deal.profit >= ctx.config.trade.min_profit => deal,
            other => {
                debug!(mission = %core.id(), profit = ?other.map(|d| d.profit), "no profitable deal");
                core.end_mission(MissionStatus::NoTradingSettlement, ctx);
                return;
            }
        };
        let Some(buyer) = deal.buyer.and_then(|b| ctx.colony.settlement(b)) else {
            core.end_mission(MissionStatus::NoTradingSettlement, ctx);
            return;
        };

        if let Some(travel) = core.travel.as_mut() {
            travel
                .nav
                .add_waypoint(Waypoint::settlement(buyer.location, buyer.id, buyer.name.clone()));
        }
        vehicle::add_home_waypoint(core, ctx);
        info!(mission = %core.id(), buyer = %buyer.id, profit = deal.profit, "trade planned");
        self.to_unload = deal.sell_load.clone();
        self.to_load = deal.buy_load.clone();
        self.deal = Some(deal);

        let demand = self.demand(core, &*ctx.colony, ctx.config);
        vehicle::check_provisions(core, ctx, &demand);
    }

    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        let at = self.buyer_name(ctx);
        match core.phases.current() {
            MissionPhase::TradeDisembarking => {
                core.set_phase(MissionPhase::TradeNegotiating, format!("Negotiating at {at}"), ctx);
            }
            MissionPhase::DeliveryDisembarking => {
                core.set_phase(MissionPhase::UnloadGoods, format!("Unloading goods at {at}"), ctx);
            }
            MissionPhase::TradeNegotiating if self.stalled => {
                core.set_phase(MissionPhase::TradeEmbarking, format!("Leaving {at}"), ctx);
            }
            MissionPhase::TradeNegotiating => {
                core.set_phase(MissionPhase::UnloadGoods, format!("Unloading goods at {at}"), ctx);
            }
            MissionPhase::UnloadGoods => {
                core.set_phase(MissionPhase::LoadGoods, format!("Loading goods at {at}"), ctx);
            }
            MissionPhase::LoadGoods => {
                core.set_phase(self.departure_phase(), format!("Leaving {at}"), ctx);
            }
            MissionPhase::TradeEmbarking | MissionPhase::DeliveryEmbarking => vehicle::start_leg(core, ctx),
            _ => vehicle::determine_travel_phase(core, ctx, Some(self.arrival_phase())),
        }
    }

    fn perform_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, agent: AgentId) {
        match core.phases.current() {
            MissionPhase::TradeDisembarking | MissionPhase::DeliveryDisembarking => {
                if let (Some(vehicle), Some(buyer)) = (core.vehicle(), self.buyer()) {
                    if let Err(err) = ctx.colony.park_vehicle(vehicle, Some(buyer)) {
                        warn!(mission = %core.id(), error = %err, "cannot park at buyer");
                    }
                }
                core.phases.end_phase();
            }
            MissionPhase::TradeNegotiating => self.negotiate(core, ctx, agent),
            MissionPhase::UnloadGoods => self.unload_goods(core, ctx),
            MissionPhase::LoadGoods => self.load_goods(core, ctx),
            MissionPhase::TradeEmbarking | MissionPhase::DeliveryEmbarking => {
                if let Some(vehicle) = core.vehicle() {
                    if let Err(err) = ctx.colony.park_vehicle(vehicle, None) {
                        warn!(mission = %core.id(), error = %err, "cannot leave buyer");
                    }
                }
                core.phases.end_phase();
            }
            _ => {}
        }
    }

    fn demand(&self, _core: &MissionCore, _colony: &dyn Colony, _config: &MissionConfig) -> TripDemand {
        let mut optional = ResourceLedger::new();
        for (resource, amount) in &self.to_unload {
            optional.add_resource(*resource, *amount);
        }
        TripDemand {
            optional,
            ..TripDemand::default()
        }
    }
}
