//! End-to-end runs of the mission engine through its public API.

use mission_sim::core::commands::MissionCommand;
use mission_sim::core::config::MissionConfig;
use mission_sim::core::enums::*;
use mission_sim::core::events::MissionEventKind;
use mission_sim::core::types::*;
use mission_sim::scenario::{Scenario, ScenarioError};
use mission_sim::world_setup;
use mission_sim::{ColonyWorld, MissionEngine, SimConfig};

use mission_orchestrator::context::{AgentDirectory, SettlementRegistry, VehicleFleet};

const MAX_TICKS: usize = 4000;

/// Run until `mission` closes. Returns the number of ticks taken.
fn run_until_done(engine: &mut MissionEngine, mission: MissionId) -> usize {
    for tick in 0..MAX_TICKS {
        let snap = engine.tick();
        let done = snap.missions.iter().find(|m| m.id == mission).map_or(true, |m| m.done);
        if done {
            return tick + 1;
        }
    }
    panic!("mission {mission} still open after {MAX_TICKS} ticks");
}

// ---- Engine ----

#[test]
fn test_collect_ice_through_engine() {
    let mut config = MissionConfig::default();
    config.sites.collection_site_time = 300.0;
    config.travel.max_trip_sols = 0.5;
    let mut engine = MissionEngine::new(SimConfig::default(), config);

    // Just after local sunrise, so the crew works in daylight.
    let colony: &mut ColonyWorld = engine.colony_mut();
    let base = world_setup::setup_outpost(
        colony,
        "Base",
        Coordinates::from_degrees(0.0, 100.0),
        30,
        6,
        &[VehicleKind::Rover],
    );
    for resource in [ResourceId::Oxygen, ResourceId::Water, ResourceId::Food, ResourceId::SpareParts] {
        colony.stock(base.settlement, resource, 10_000.0);
    }
    world_setup::befriend(colony, &base.crew, 100.0);
    let starter = base.crew[0];
    let rover = base.vehicles[0];

    engine.queue_command(MissionCommand::StartMission {
        kind: MissionKind::CollectIce,
        starter,
    });
    let first = engine.tick();
    let view = &first.missions[0];
    assert!(!view.done, "statuses: {:?}", view.statuses);
    assert_eq!(view.vehicle, Some(rover));
    assert_eq!(view.waypoints.last().and_then(|w| w.settlement), Some(base.settlement));

    run_until_done(&mut engine, view.id);
    let mission = engine.mission(view.id).unwrap();
    assert_eq!(mission.statuses(), &[MissionStatus::MissionAccomplished]);

    let colony = engine.colony();
    assert!(colony.settlement_amount(base.settlement, ResourceId::Ice) > 0.0);
    let info = colony.vehicle(rover).unwrap();
    assert!(!info.reserved);
    assert_eq!(info.parked_at, Some(base.settlement));
    assert!(colony.vehicle_occupants(rover).is_empty());
    assert_eq!(colony.agent_mission(starter), None);
    assert_eq!(colony.indoor_agents(base.settlement).len(), 6);
}

#[test]
fn test_event_log_matches_snapshots() {
    let mut loaded = Scenario::demo().build(SimConfig::default()).unwrap();
    let snapshots = loaded.run(300);

    let from_snapshots: Vec<_> = snapshots.iter().flat_map(|s| s.events.iter().cloned()).collect();
    assert_eq!(loaded.engine.event_log(), from_snapshots.as_slice());

    let started: Vec<MissionId> = loaded
        .engine
        .event_log()
        .iter()
        .filter(|e| matches!(e.kind, MissionEventKind::Started { .. }))
        .map(|e| e.mission)
        .collect();
    assert_eq!(started, vec![MissionId(1), MissionId(2)]);

    for pair in snapshots.windows(2) {
        assert_eq!(pair[1].tick, pair[0].tick + 1, "Ticks are strictly increasing");
    }
}

// ---- Scenarios ----

const RESCUE_SCENARIO: &str = r#"{
    "seed": 7,
    "opinion": 100.0,
    "settlements": [
        { "name": "Home", "lat": 0.0, "lon": 100.0, "colonists": 6, "qualification": 1.0,
          "vehicles": ["Rover"] }
    ],
    "stranded": [
        { "home": "Home", "lat": 0.0, "lon": 100.5, "crew": 1 }
    ],
    "commands": [
        { "tick": 0, "command": { "type": "StartMission", "kind": "Rescue", "settlement": "Home" } }
    ]
}"#;

#[test]
fn test_rescue_scenario_brings_vehicle_home() {
    let scenario = Scenario::from_json_str(RESCUE_SCENARIO).unwrap();
    assert_eq!(scenario.seed, Some(7));
    let mut loaded = scenario.build(SimConfig::default()).unwrap();

    let first = loaded.run(1);
    let view = &first[0].missions[0];
    assert_eq!(view.kind, MissionKind::Rescue);
    assert!(!view.done, "statuses: {:?}", view.statuses);

    let id = view.id;
    run_until_done(&mut loaded.engine, id);
    assert!(loaded
        .engine
        .event_log()
        .iter()
        .any(|e| e.mission == id && matches!(e.kind, MissionEventKind::Rendezvous { .. })));
}

#[test]
fn test_scenario_defaults_to_standard_supplies() {
    let json = r#"{ "settlements": [ { "name": "Lone", "lat": 10.0, "lon": 20.0, "colonists": 3 } ] }"#;
    let scenario = Scenario::from_json_str(json).unwrap();
    assert_eq!(scenario.settlements[0].capacity, 20);
    assert!(scenario.commands.is_empty());

    let loaded = scenario.build(SimConfig::default()).unwrap();
    let colony = loaded.engine.colony();
    let lone = colony.settlements()[0];
    assert_eq!(colony.settlement_amount(lone, ResourceId::Methane), 5000.0);
    assert_eq!(colony.indoor_agents(lone).len(), 3);
}

#[test]
fn test_scenario_rejects_bad_documents() {
    let unknown = r#"{ "settlements": [ { "name": "A", "lat": 0.0, "lon": 0.0, "colonists": 1 } ],
        "commands": [ { "tick": 0, "command": { "type": "StartMission", "kind": "Trade", "settlement": "B" } } ] }"#;
    let err = Scenario::from_json_str(unknown).unwrap().build(SimConfig::default()).err();
    assert!(matches!(err, Some(ScenarioError::UnknownSettlement(name)) if name == "B"));

    let no_colonist = r#"{ "settlements": [ { "name": "A", "lat": 0.0, "lon": 0.0, "colonists": 1 } ],
        "commands": [ { "tick": 0, "command": { "type": "StartMission", "kind": "Trade", "settlement": "A", "colonist": 4 } } ] }"#;
    let err = Scenario::from_json_str(no_colonist).unwrap().build(SimConfig::default()).err();
    assert!(matches!(err, Some(ScenarioError::UnknownColonist { index: 4, .. })));

    let duplicate = r#"{ "settlements": [
        { "name": "A", "lat": 0.0, "lon": 0.0, "colonists": 1 },
        { "name": "A", "lat": 1.0, "lon": 0.0, "colonists": 1 } ] }"#;
    assert!(matches!(
        Scenario::from_json_str(duplicate),
        Err(ScenarioError::DuplicateSettlement(_))
    ));

    let bad_config = r#"{ "config": { "life_support": { "safety_margin": 0.5 } },
        "settlements": [] }"#;
    assert!(matches!(Scenario::from_json_str(bad_config), Err(ScenarioError::Config(_))));

    assert!(matches!(Scenario::from_json_str("{"), Err(ScenarioError::Parse(_))));
}
