//! Scenario definitions: a colony layout plus a schedule of commands.
//!
//! Scenarios are JSON documents. Settlements are referred to by name and
//! colonists by their index within a settlement, so a file never has to
//! know the ids the world hands out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use mission_core::commands::MissionCommand;
use mission_core::config::{ConfigError, MissionConfig};
use mission_core::enums::{EquipmentKind, MissionKind, ResourceId, VehicleKind};
use mission_core::state::MissionSnapshot;
use mission_core::types::{AgentId, Coordinates, MissionId, SettlementId};
use mission_orchestrator::context::SurfaceSites;
use mission_orchestrator::ColonyError;

use crate::components::Skills;
use crate::engine::{MissionEngine, SimConfig};
use crate::world::ColonyWorld;
use crate::world_setup;

/// Errors raised while loading or building a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("duplicate settlement name {0:?}")]
    DuplicateSettlement(String),
    #[error("unknown settlement {0:?}")]
    UnknownSettlement(String),
    #[error("settlement {settlement:?} has no colonist #{index}")]
    UnknownColonist { settlement: String, index: usize },
    #[error("stranded vehicle crew exceeds its capacity of {capacity}")]
    CrewTooLarge { capacity: usize },
    #[error(transparent)]
    Colony(#[from] ColonyError),
}

fn default_capacity() -> usize {
    20
}

fn default_qualification() -> f64 {
    world_setup::DEFAULT_QUALIFICATION
}

fn default_opinion() -> f64 {
    world_setup::DEFAULT_CREW_OPINION
}

/// A settlement, its people, stores and vehicles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSpec {
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    pub colonists: usize,
    #[serde(default = "default_qualification")]
    pub qualification: f64,
    /// Per-kind qualification overrides applied to every colonist.
    #[serde(default)]
    pub skills: BTreeMap<MissionKind, f64>,
    /// Stores; the standard supplies when omitted.
    #[serde(default)]
    pub stock: Option<BTreeMap<ResourceId, f64>>,
    #[serde(default)]
    pub equipment: Option<BTreeMap<EquipmentKind, u32>>,
    #[serde(default)]
    pub vehicles: Vec<VehicleKind>,
}

/// A vehicle out on the surface with its beacon on, waiting for rescue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrandedSpec {
    /// Settlement that owns the vehicle.
    pub home: String,
    pub lat: f64,
    pub lon: f64,
    /// Colonists spawned aboard.
    #[serde(default)]
    pub crew: usize,
}

/// A previously explored site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSpec {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub settlement: Option<String>,
    /// Mineral concentration estimate (percent).
    pub estimate: f64,
}

/// A command in scenario terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScenarioCommand {
    StartMission {
        kind: MissionKind,
        settlement: String,
        #[serde(default)]
        colonist: usize,
    },
    ReviewPlan {
        mission: MissionId,
        approve: bool,
    },
    AbortMission {
        mission: MissionId,
    },
    MedicalEmergency {
        settlement: String,
        colonist: usize,
    },
    Pause,
    Resume,
}

/// A command applied just before the given tick runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub tick: u64,
    pub command: ScenarioCommand,
}

/// A full scenario document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub config: MissionConfig,
    pub settlements: Vec<SettlementSpec>,
    #[serde(default)]
    pub stranded: Vec<StrandedSpec>,
    #[serde(default)]
    pub sites: Vec<SiteSpec>,
    /// Opinion colonists of one settlement hold of each other.
    #[serde(default = "default_opinion")]
    pub opinion: f64,
    #[serde(default)]
    pub commands: Vec<ScheduledCommand>,
}

impl Scenario {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;
        let mut seen = Vec::with_capacity(self.settlements.len());
        for settlement in &self.settlements {
            if seen.contains(&settlement.name.as_str()) {
                return Err(ScenarioError::DuplicateSettlement(settlement.name.clone()));
            }
            seen.push(settlement.name.as_str());
        }
        Ok(())
    }

    /// Two outposts a short drive apart, with a rover, a drone and a light
    /// utility vehicle each, and an ice run started on the first tick.
    pub fn demo() -> Self {
        let outpost = |name: &str, lat: f64, lon: f64| SettlementSpec {
            name: name.to_string(),
            lat,
            lon,
            capacity: default_capacity(),
            colonists: 8,
            qualification: default_qualification(),
            skills: BTreeMap::new(),
            stock: None,
            equipment: None,
            vehicles: vec![VehicleKind::Rover, VehicleKind::Drone, VehicleKind::LightUtility],
        };
        Self {
            seed: None,
            config: MissionConfig::default(),
            settlements: vec![outpost("Schiaparelli Point", -2.0, 354.0), outpost("Gale Station", -1.0, 355.5)],
            stranded: Vec::new(),
            sites: Vec::new(),
            opinion: 90.0,
            commands: vec![
                ScheduledCommand {
                    tick: 0,
                    command: ScenarioCommand::StartMission {
                        kind: MissionKind::CollectIce,
                        settlement: "Schiaparelli Point".to_string(),
                        colonist: 0,
                    },
                },
                ScheduledCommand {
                    tick: 0,
                    command: ScenarioCommand::StartMission {
                        kind: MissionKind::Exploration,
                        settlement: "Gale Station".to_string(),
                        colonist: 0,
                    },
                },
            ],
        }
    }

    /// Populate a colony and an engine, and resolve the command schedule.
    pub fn build(&self, sim: SimConfig) -> Result<LoadedScenario, ScenarioError> {
        let sim = SimConfig {
            seed: self.seed.unwrap_or(sim.seed),
            ..sim
        };
        let mut colony = ColonyWorld::new(self.config.trade.deal_cache_ttl_millisols);
        let mut roster: BTreeMap<String, (SettlementId, Vec<AgentId>)> = BTreeMap::new();

        for spec in &self.settlements {
            let settlement = colony.add_settlement(
                &spec.name,
                Coordinates::from_degrees(spec.lat, spec.lon),
                spec.capacity,
            );
            match &spec.stock {
                Some(stock) => {
                    for (resource, amount) in stock {
                        colony.stock(settlement, *resource, *amount);
                    }
                }
                None => {
                    for (resource, amount) in world_setup::STANDARD_STOCK {
                        colony.stock(settlement, resource, amount);
                    }
                }
            }
            match &spec.equipment {
                Some(equipment) => {
                    for (kind, count) in equipment {
                        colony.stock_equipment(settlement, *kind, *count);
                    }
                }
                None => {
                    for (kind, count) in world_setup::STANDARD_EQUIPMENT {
                        colony.stock_equipment(settlement, kind, count);
                    }
                }
            }

            let crew: Vec<AgentId> = (1..=spec.colonists)
                .map(|i| {
                    let skills = Skills {
                        base: spec.qualification.clamp(0.0, 1.0),
                        by_kind: spec.skills.clone(),
                    };
                    colony.add_agent(&format!("{} Colonist {i}", spec.name), settlement, skills)
                })
                .collect();
            world_setup::befriend(&mut colony, &crew, self.opinion);

            for (i, kind) in spec.vehicles.iter().enumerate() {
                let name = format!("{} {kind:?} {}", spec.name, i + 1);
                colony.add_vehicle(world_setup::vehicle_spec(*kind, name), settlement);
            }
            roster.insert(spec.name.clone(), (settlement, crew));
        }

        for spec in &self.stranded {
            let (home, _) = lookup(&roster, &spec.home)?;
            let rover = world_setup::vehicle_spec(VehicleKind::Rover, format!("{} Stranded Rover", spec.home));
            if spec.crew > rover.crew_capacity {
                return Err(ScenarioError::CrewTooLarge {
                    capacity: rover.crew_capacity,
                });
            }
            let vehicle = colony
                .add_vehicle(rover, home)
                .ok_or_else(|| ScenarioError::UnknownSettlement(spec.home.clone()))?;
            let crew: Vec<AgentId> = (1..=spec.crew)
                .map(|i| {
                    let skills = Skills {
                        base: default_qualification(),
                        ..Skills::default()
                    };
                    colony.add_agent(&format!("{} Stranded Colonist {i}", spec.home), home, skills)
                })
                .collect();
            colony.strand_vehicle(vehicle, Coordinates::from_degrees(spec.lat, spec.lon), &crew)?;
        }

        for spec in &self.sites {
            let settlement = match &spec.settlement {
                Some(name) => Some(lookup(&roster, name)?.0),
                None => None,
            };
            let site = colony.register_site(Coordinates::from_degrees(spec.lat, spec.lon), settlement);
            colony.mark_explored(site, spec.estimate);
        }

        let mut schedule: BTreeMap<u64, Vec<Scheduled>> = BTreeMap::new();
        for entry in &self.commands {
            let scheduled = match &entry.command {
                ScenarioCommand::StartMission {
                    kind,
                    settlement,
                    colonist,
                } => Scheduled::Command(MissionCommand::StartMission {
                    kind: *kind,
                    starter: colonist_id(&roster, settlement, *colonist)?,
                }),
                ScenarioCommand::ReviewPlan { mission, approve } => Scheduled::Command(MissionCommand::ReviewPlan {
                    mission: *mission,
                    approve: *approve,
                }),
                ScenarioCommand::AbortMission { mission } => {
                    Scheduled::Command(MissionCommand::AbortMission { mission: *mission })
                }
                ScenarioCommand::MedicalEmergency { settlement, colonist } => {
                    Scheduled::MedicalEmergency(colonist_id(&roster, settlement, *colonist)?)
                }
                ScenarioCommand::Pause => Scheduled::Command(MissionCommand::Pause),
                ScenarioCommand::Resume => Scheduled::Command(MissionCommand::Resume),
            };
            schedule.entry(entry.tick).or_default().push(scheduled);
        }

        info!(
            settlements = self.settlements.len(),
            stranded = self.stranded.len(),
            commands = self.commands.len(),
            seed = sim.seed,
            "scenario built"
        );
        Ok(LoadedScenario {
            engine: MissionEngine::with_colony(sim, self.config.clone(), colony),
            schedule,
        })
    }
}

fn lookup<'a>(
    roster: &'a BTreeMap<String, (SettlementId, Vec<AgentId>)>,
    name: &str,
) -> Result<(SettlementId, &'a [AgentId]), ScenarioError> {
    roster
        .get(name)
        .map(|(id, crew)| (*id, crew.as_slice()))
        .ok_or_else(|| ScenarioError::UnknownSettlement(name.to_string()))
}

fn colonist_id(
    roster: &BTreeMap<String, (SettlementId, Vec<AgentId>)>,
    settlement: &str,
    index: usize,
) -> Result<AgentId, ScenarioError> {
    let (_, crew) = lookup(roster, settlement)?;
    crew.get(index).copied().ok_or_else(|| ScenarioError::UnknownColonist {
        settlement: settlement.to_string(),
        index,
    })
}

/// A resolved scheduled action.
#[derive(Debug, Clone)]
pub enum Scheduled {
    Command(MissionCommand),
    MedicalEmergency(AgentId),
}

/// A built scenario, ready to run.
pub struct LoadedScenario {
    pub engine: MissionEngine,
    pub schedule: BTreeMap<u64, Vec<Scheduled>>,
}

impl LoadedScenario {
    /// Run `ticks` ticks, applying scheduled actions as their tick comes up.
    /// Returns the snapshot of every tick.
    pub fn run(&mut self, ticks: u64) -> Vec<MissionSnapshot> {
        let mut snapshots = Vec::with_capacity(ticks as usize);
        for _ in 0..ticks {
            let tick = self.engine.pulse().tick;
            if let Some(actions) = self.schedule.remove(&tick) {
                for action in actions {
                    match action {
                        Scheduled::Command(command) => self.engine.queue_command(command),
                        Scheduled::MedicalEmergency(agent) => {
                            self.engine.colony_mut().set_medical_emergency(agent, true);
                        }
                    }
                }
            }
            snapshots.push(self.engine.tick());
        }
        snapshots
    }
}
