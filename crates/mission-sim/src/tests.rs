//! Tests for the mission engine, the colony world, its systems and the
//! trade market.

use std::cell::Cell;

use mission_core::commands::MissionCommand;
use mission_core::config::MissionConfig;
use mission_core::constants::CLOSED_MISSION_RETENTION_TICKS;
use mission_core::enums::*;
use mission_core::types::*;
use mission_orchestrator::context::*;

use crate::engine::{MissionEngine, SimConfig};
use crate::market::{evaluate_best_deal, unit_value, DealCache, Market, REFERENCE_STOCK_KG};
use crate::scenario::Scenario;
use crate::systems::tasks::{self, NEGOTIATION_MILLISOLS};
use crate::world::{irradiance_at, ColonyWorld, CONSTRUCTION_STAGES};
use crate::world_setup::{self, Outpost};

/// Well-stocked outpost at the origin whose crew always accept each other.
fn outpost(colony: &mut ColonyWorld, crew: usize, vehicles: &[VehicleKind]) -> Outpost {
    let settlement = colony.add_settlement("Base", Coordinates::from_degrees(0.0, 0.0), 30);
    world_setup::stock_standard_supplies(colony, settlement);
    for resource in ResourceId::LIFE_SUPPORT.into_iter().chain([ResourceId::Methane, ResourceId::SpareParts]) {
        colony.stock(settlement, resource, 10_000.0);
    }
    let crew = world_setup::spawn_crew(colony, settlement, "Base", crew, 1.0);
    world_setup::befriend(colony, &crew, 100.0);
    let vehicles = vehicles
        .iter()
        .filter_map(|kind| colony.add_vehicle(world_setup::vehicle_spec(*kind, format!("{kind:?}")), settlement))
        .collect();
    Outpost {
        settlement,
        crew,
        vehicles,
    }
}

fn market(id: u32, lon_deg: f64, stock: &[(ResourceId, f64)]) -> Market {
    Market {
        id: SettlementId(id),
        location: Coordinates::from_degrees(0.0, lon_deg),
        stock: stock.iter().copied().collect(),
    }
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let scenario = Scenario::demo();
    let mut run_a = scenario.build(SimConfig { seed: 12345, ..Default::default() }).unwrap();
    let mut run_b = scenario.build(SimConfig { seed: 12345, ..Default::default() }).unwrap();

    for (snap_a, snap_b) in run_a.run(600).iter().zip(run_b.run(600).iter()) {
        let json_a = serde_json::to_string(snap_a).unwrap();
        let json_b = serde_json::to_string(snap_b).unwrap();
        assert_eq!(json_a, json_b, "Snapshots diverged with same seed");
    }
    assert_eq!(run_a.engine.event_log(), run_b.engine.event_log());
}

#[test]
fn test_determinism_different_seeds() {
    let scenario = Scenario::demo();
    let mut run_a = scenario.build(SimConfig { seed: 111, ..Default::default() }).unwrap();
    let mut run_b = scenario.build(SimConfig { seed: 222, ..Default::default() }).unwrap();

    // Site generation and recruitment both roll on the seed.
    let json_a = serde_json::to_string(&run_a.run(600)).unwrap();
    let json_b = serde_json::to_string(&run_b.run(600)).unwrap();
    assert_ne!(json_a, json_b, "Different seeds should produce divergent output");
}

// ---- Engine ----

#[test]
fn test_tick_advances_clock() {
    let mut engine = MissionEngine::new(SimConfig::default(), MissionConfig::default());
    let snap = engine.tick();
    assert_eq!(snap.tick, 1);
    assert_eq!(snap.time.millisols, 5.0);
    assert_eq!(snap.state, EngineState::Running);
    assert!(snap.missions.is_empty());
}

#[test]
fn test_pause_and_resume() {
    let mut engine = MissionEngine::new(SimConfig::default(), MissionConfig::default());
    engine.tick();

    engine.queue_command(MissionCommand::Pause);
    let paused = engine.tick();
    assert_eq!(paused.state, EngineState::Paused);
    assert_eq!(paused.tick, 1, "Clock must not advance while paused");
    engine.tick();
    assert_eq!(engine.pulse().tick, 1);

    engine.queue_command(MissionCommand::Resume);
    let resumed = engine.tick();
    assert_eq!(resumed.state, EngineState::Running);
    assert_eq!(resumed.tick, 2);
}

#[test]
fn test_start_rejected_for_unknown_starter() {
    let mut engine = MissionEngine::new(SimConfig::default(), MissionConfig::default());
    outpost(engine.colony_mut(), 4, &[VehicleKind::Rover]);

    engine.queue_command(MissionCommand::StartMission {
        kind: MissionKind::CollectIce,
        starter: AgentId(999),
    });
    let snap = engine.tick();
    assert!(snap.missions.is_empty());
    assert!(snap.events.is_empty());
}

#[test]
fn test_start_rejected_for_busy_starter() {
    let mut engine = MissionEngine::new(SimConfig::default(), MissionConfig::default());
    let base = outpost(engine.colony_mut(), 6, &[VehicleKind::Rover, VehicleKind::Rover]);
    let starter = base.crew[0];

    let first = engine.start_now(MissionKind::CollectIce, starter);
    assert!(first.is_some());
    assert_eq!(engine.colony().agent_mission(starter), first);

    engine.queue_command(MissionCommand::StartMission {
        kind: MissionKind::CollectRegolith,
        starter,
    });
    let snap = engine.tick();
    assert_eq!(snap.missions.len(), 1, "A busy starter cannot open a second mission");
    assert_eq!(snap.missions[0].id, MissionId(1));
}

#[test]
fn test_closed_missions_retained_then_dropped() {
    let mut engine = MissionEngine::new(SimConfig::default(), MissionConfig::default());
    // No vehicles: the mission closes as soon as it starts.
    let base = outpost(engine.colony_mut(), 3, &[]);
    engine.queue_command(MissionCommand::StartMission {
        kind: MissionKind::CollectIce,
        starter: base.crew[0],
    });

    let first = engine.tick();
    assert_eq!(first.missions.len(), 1);
    assert!(first.missions[0].done);
    assert!(first.missions[0].statuses.contains(&MissionStatus::NoAvailableVehicles));

    for _ in 1..CLOSED_MISSION_RETENTION_TICKS - 1 {
        engine.tick();
    }
    assert!(engine.mission(MissionId(1)).is_some(), "Closed mission kept for the retention window");
    let last = engine.tick();
    assert!(last.missions.is_empty(), "Closed mission dropped after the retention window");
    assert!(engine
        .event_log()
        .iter()
        .any(|e| matches!(e.kind, mission_core::events::MissionEventKind::Completed { .. })));
}

#[test]
fn test_abort_command_closes_unstarted_mission() {
    let mut engine = MissionEngine::new(SimConfig::default(), MissionConfig::default());
    let base = outpost(engine.colony_mut(), 6, &[VehicleKind::Rover]);
    let id = engine.start_now(MissionKind::CollectIce, base.crew[0]).unwrap();

    engine.queue_command(MissionCommand::AbortMission { mission: id });
    let snap = engine.tick();
    let view = &snap.missions[0];
    assert!(view.done);
    assert!(view.statuses.contains(&MissionStatus::UserAbortedMission));
    assert_eq!(engine.colony().agent_mission(base.crew[0]), None);
    let rover = engine.colony().vehicle(base.vehicles[0]).unwrap();
    assert!(!rover.reserved, "Aborted mission must release its vehicle");
}

#[test]
fn test_plan_review_command() {
    let mut config = MissionConfig::default();
    config.approval.auto_approve = false;
    let mut engine = MissionEngine::new(SimConfig::default(), config);
    let base = outpost(engine.colony_mut(), 6, &[VehicleKind::Rover]);
    let id = engine.start_now(MissionKind::CollectIce, base.crew[0]).unwrap();

    let snap = engine.tick();
    assert_eq!(snap.missions[0].plan, Some(PlanStatus::Pending));

    engine.queue_command(MissionCommand::ReviewPlan {
        mission: id,
        approve: false,
    });
    let snap = engine.tick();
    assert_eq!(snap.missions[0].plan, Some(PlanStatus::Rejected));
    assert!(snap.missions[0].done, "Rejection is acted on within the same tick");
    assert!(snap.missions[0].statuses.contains(&MissionStatus::MissionNotApproved));
}

// ---- Tasks ----

#[test]
fn test_boarding_takes_effect_next_pulse() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = outpost(&mut colony, 1, &[VehicleKind::Rover]);
    let (agent, rover) = (base.crew[0], base.vehicles[0]);

    colony.assign_task(agent, Task::Board { vehicle: rover }).unwrap();
    assert_eq!(colony.aboard_vehicle(agent), None);
    tasks::run(colony.world_mut(), 5.0);
    assert_eq!(colony.aboard_vehicle(agent), Some(rover));
    assert_eq!(colony.current_task(agent), None);
    assert_eq!(colony.vehicle_occupants(rover), vec![agent]);
    assert!(colony.indoor_agents(base.settlement).is_empty());

    colony.assign_task(agent, Task::Disembark { vehicle: rover }).unwrap();
    tasks::run(colony.world_mut(), 5.0);
    assert_eq!(colony.aboard_vehicle(agent), None);
    assert_eq!(colony.indoor_agents(base.settlement), vec![agent]);
}

#[test]
fn test_negotiation_needs_a_fit_trader() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = outpost(&mut colony, 2, &[]);
    let task = Task::Negotiate {
        settlement: base.settlement,
    };

    let trader = base.crew[0];
    colony.assign_task(trader, task).unwrap();
    let pulses = (NEGOTIATION_MILLISOLS / 5.0) as usize;
    for _ in 0..pulses - 1 {
        tasks::run(colony.world_mut(), 5.0);
    }
    assert_eq!(colony.current_task(trader), Some(task));
    tasks::run(colony.world_mut(), 5.0);
    assert_eq!(colony.current_task(trader), None, "Negotiation finishes after its duration");

    let unfit = base.crew[1];
    colony.set_fit(unfit, false);
    colony.assign_task(unfit, task).unwrap();
    for _ in 0..pulses * 4 {
        tasks::run(colony.world_mut(), 5.0);
    }
    assert_eq!(colony.current_task(unfit), Some(task), "An unfit trader never closes");
}

#[test]
fn test_long_tasks_persist_until_cleared() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = outpost(&mut colony, 1, &[]);
    let agent = base.crew[0];
    let task = Task::Eva {
        kind: MissionKind::CollectIce,
    };
    colony.assign_task(agent, task).unwrap();
    for _ in 0..100 {
        tasks::run(colony.world_mut(), 5.0);
    }
    assert_eq!(colony.current_task(agent), Some(task));
    colony.clear_task(agent);
    assert_eq!(colony.current_task(agent), None);
}

// ---- Colony world ----

#[test]
fn test_outpost_setup() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = world_setup::setup_outpost(
        &mut colony,
        "Base",
        Coordinates::from_degrees(0.0, 0.0),
        30,
        5,
        &[VehicleKind::Rover, VehicleKind::Drone],
    );

    let info = colony.settlement(base.settlement).unwrap();
    assert_eq!(info.population, 5);
    assert_eq!(colony.vehicles_parked_at(base.settlement), base.vehicles);
    assert_eq!(colony.settlement_amount(base.settlement, ResourceId::Methane), 5000.0);
    assert_eq!(colony.settlement_equipment(base.settlement, EquipmentKind::EvaSuit), 12);
    assert_eq!(colony.opinion_of(base.crew[0], base.crew[1]), Some(world_setup::DEFAULT_CREW_OPINION));
    assert_eq!(colony.opinion_of(base.crew[0], base.crew[0]), None);

    let drone = colony.vehicle(base.vehicles[1]).unwrap();
    assert_eq!(drone.kind, VehicleKind::Drone);
    assert!(!drone.kind.carries_crew());
}

#[test]
fn test_vehicle_cargo_respects_capacity() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = outpost(&mut colony, 1, &[VehicleKind::LightUtility]);
    let luv = base.vehicles[0];

    let stored = colony.store_in_vehicle(luv, ResourceId::Ore, 500.0);
    assert_eq!(stored, 200.0, "Light utility vehicle holds 200 kg");
    assert_eq!(colony.vehicle_stored_mass(luv), 200.0);
    assert_eq!(colony.retrieve_from_vehicle(luv, ResourceId::Ore, 50.0), 50.0);
    assert_eq!(colony.vehicle_amount(luv, ResourceId::Ore), 150.0);
}

#[test]
fn test_tow_parks_trailer_with_tower() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = outpost(&mut colony, 1, &[VehicleKind::Rover, VehicleKind::LightUtility]);
    let (rover, luv) = (base.vehicles[0], base.vehicles[1]);

    colony.hook_tow(rover, luv).unwrap();
    assert_eq!(colony.vehicle(luv).unwrap().towed_by, Some(rover));
    assert_eq!(colony.vehicle(luv).unwrap().parked_at, None);
    assert!(colony.hook_tow(rover, rover).is_err());

    colony.unhook_tow(rover);
    let trailer = colony.vehicle(luv).unwrap();
    assert_eq!(trailer.towed_by, None);
    assert_eq!(trailer.parked_at, Some(base.settlement));
    assert_eq!(colony.vehicle(rover).unwrap().towing, None);
}

#[test]
fn test_construction_stages_in_order() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = outpost(&mut colony, 1, &[]);
    let site = colony.create_construction_site(base.settlement).unwrap().id;
    assert_eq!(colony.unfinished_construction_site(base.settlement).map(|s| s.id), Some(site));

    for spec in CONSTRUCTION_STAGES.iter() {
        let stage = colony.start_next_construction_stage(site);
        assert_eq!(stage.as_deref(), Some(spec.name));
        let info = colony.construction_site(site).unwrap();
        assert_eq!(info.materials.get(&ResourceId::ConstructionMaterials), Some(&spec.materials_kg));
        assert!(!info.stage_complete());

        let done = colony.add_construction_work(site, spec.work_millisols);
        assert_eq!(done, spec.work_millisols);
        assert!(colony.construction_site(site).unwrap().stage_complete());
        colony.complete_construction_stage(site);
    }

    assert!(colony.is_construction_finished(site));
    assert_eq!(colony.start_next_construction_stage(site), None);
    assert!(colony.unfinished_construction_site(base.settlement).is_none());
}

#[test]
fn test_irradiance_follows_the_sun() {
    let origin = Coordinates::from_degrees(0.0, 0.0);
    assert_eq!(irradiance_at(origin, MarsTime::new(100.0)), 0.0, "Night before millisol 250");
    assert!((irradiance_at(origin, MarsTime::new(500.0)) - 590.0).abs() < 1e-9, "Peak at local noon");
    assert_eq!(irradiance_at(origin, MarsTime::new(900.0)), 0.0, "Night after millisol 750");
    // Half a planet away, noon and midnight swap.
    let antipode = Coordinates::from_degrees(0.0, 180.0);
    assert!(irradiance_at(antipode, MarsTime::new(0.0)) > 500.0);
}

#[test]
fn test_stranded_vehicle_keeps_crew_aboard() {
    let mut colony = ColonyWorld::new(1000.0);
    let base = outpost(&mut colony, 2, &[VehicleKind::Rover]);
    let rover = base.vehicles[0];
    let out = Coordinates::from_degrees(0.0, 1.0);

    colony.strand_vehicle(rover, out, &base.crew[..1]).unwrap();
    let info = colony.vehicle(rover).unwrap();
    assert!(info.emergency_beacon);
    assert_eq!(info.parked_at, None);
    assert_eq!(colony.vehicle_occupants(rover), vec![base.crew[0]]);
    assert_eq!(colony.indoor_agents(base.settlement), vec![base.crew[1]]);
    assert!(colony.strand_vehicle(VehicleId(999), out, &[]).is_err());
}

// ---- Market ----

#[test]
fn test_unit_value_tracks_scarcity() {
    let base = unit_value(ResourceId::Water, REFERENCE_STOCK_KG);
    assert!((base - 2.0).abs() < 1e-9, "Reference stock trades at base value");
    assert!((unit_value(ResourceId::Water, 0.0) - 4.0).abs() < 1e-9);
    assert!(unit_value(ResourceId::Water, 10_000.0) < base);
}

#[test]
fn test_best_deal_sells_surplus_where_scarce() {
    let home = market(1, 0.0, &[(ResourceId::Water, 5000.0), (ResourceId::Ore, 0.0)]);
    let buyer = market(2, 1.0, &[(ResourceId::Water, 0.0), (ResourceId::Ore, 3000.0)]);

    let deal = evaluate_best_deal(&home, &[home.clone(), buyer], 1000.0, 500.0).unwrap();
    assert_eq!(deal.buyer, Some(SettlementId(2)));
    assert_eq!(deal.sell_load.get(&ResourceId::Water), Some(&1000.0));
    assert_eq!(deal.buy_load.get(&ResourceId::Ore), Some(&1000.0));
    assert!(deal.profit > 0.0);
}

#[test]
fn test_best_deal_skips_buyers_out_of_range() {
    let home = market(1, 0.0, &[(ResourceId::Water, 5000.0)]);
    let far = market(2, 10.0, &[(ResourceId::Water, 0.0)]);
    // ~590 km away, so the round trip exceeds 1000 km.
    assert!(evaluate_best_deal(&home, &[far], 1000.0, 1000.0).is_none());
}

#[test]
fn test_best_deal_ties_go_to_lower_id() {
    let home = market(1, 0.0, &[(ResourceId::Water, 5000.0)]);
    let east = market(3, 1.0, &[(ResourceId::Water, 0.0)]);
    let west = market(2, -1.0, &[(ResourceId::Water, 0.0)]);
    let deal = evaluate_best_deal(&home, &[west, east], 500.0, 500.0).unwrap();
    assert_eq!(deal.buyer, Some(SettlementId(2)));
}

#[test]
fn test_deal_cache_reuses_until_stale() {
    let mut cache = DealCache::new(100.0);
    let computed = Cell::new(0);
    let compute = || {
        computed.set(computed.get() + 1);
        None
    };
    let key = (SettlementId(1), VehicleId(2));

    cache.get_or_compute(key.0, key.1, MarsTime::new(0.0), compute);
    cache.get_or_compute(key.0, key.1, MarsTime::new(100.0), compute);
    assert_eq!(computed.get(), 1, "Fresh entry is reused");
    cache.get_or_compute(key.0, key.1, MarsTime::new(150.0), compute);
    assert_eq!(computed.get(), 2, "Stale entry is recomputed");

    cache.get_or_compute(SettlementId(1), VehicleId(3), MarsTime::new(150.0), compute);
    assert_eq!(cache.len(), 2);
    cache.evict_stale(MarsTime::new(300.0));
    assert!(cache.is_empty());
}

#[test]
fn test_colony_best_deal_between_outposts() {
    let mut colony = ColonyWorld::new(1000.0);
    let home = world_setup::setup_outpost(
        &mut colony,
        "Home",
        Coordinates::from_degrees(0.0, 0.0),
        10,
        2,
        &[VehicleKind::Rover],
    );
    let buyer = colony.add_settlement("Market", Coordinates::from_degrees(0.0, 1.0), 10);
    colony.stock(buyer, ResourceId::Ore, 4000.0);

    let deal = colony
        .best_deal(home.settlement, home.vehicles[0], MarsTime::new(0.0))
        .unwrap();
    assert_eq!(deal.buyer, Some(buyer));
    assert!(!deal.sell_load.is_empty(), "Home has surplus the market lacks");
    assert_eq!(deal.buy_load.get(&ResourceId::Ore), Some(&2500.0), "Half the rover's cargo each way");

    // The cached answer stands even after stocks move.
    colony.stock(buyer, ResourceId::Food, 50_000.0);
    let cached = colony
        .best_deal(home.settlement, home.vehicles[0], MarsTime::new(10.0))
        .unwrap();
    assert_eq!(cached.profit, deal.profit);
}
