//! Enumeration types used throughout the mission engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::types::{SettlementId, SiteId, VehicleId};

/// Mission type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MissionKind {
    CollectIce,
    CollectRegolith,
    Exploration,
    Mining,
    Trade,
    Delivery,
    Construction,
    Rescue,
    TravelToSettlement,
}

impl MissionKind {
    pub const ALL: [MissionKind; 9] = [
        MissionKind::CollectIce,
        MissionKind::CollectRegolith,
        MissionKind::Exploration,
        MissionKind::Mining,
        MissionKind::Trade,
        MissionKind::Delivery,
        MissionKind::Construction,
        MissionKind::Rescue,
        MissionKind::TravelToSettlement,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MissionKind::CollectIce => "Ice Prospecting",
            MissionKind::CollectRegolith => "Regolith Prospecting",
            MissionKind::Exploration => "Exploration",
            MissionKind::Mining => "Mining",
            MissionKind::Trade => "Trade",
            MissionKind::Delivery => "Delivery",
            MissionKind::Construction => "Construction",
            MissionKind::Rescue => "Rescue & Salvage Vehicle",
            MissionKind::TravelToSettlement => "Travel to Settlement",
        }
    }

    /// Vehicle the mission travels in, if any.
    pub fn vehicle_kind(&self) -> Option<VehicleKind> {
        match self {
            MissionKind::Construction => None,
            MissionKind::Delivery => Some(VehicleKind::Drone),
            _ => Some(VehicleKind::Rover),
        }
    }

    /// Upper bound on members before vehicle crew capacity is applied.
    pub fn default_capacity(&self) -> usize {
        match self {
            MissionKind::Delivery => 1,
            MissionKind::Trade | MissionKind::Rescue => 4,
            MissionKind::Construction => 10,
            _ => 8,
        }
    }

    /// Minimum members for the mission to start.
    pub fn default_min_members(&self) -> usize {
        match self {
            MissionKind::Delivery | MissionKind::TravelToSettlement => 1,
            MissionKind::Construction => 3,
            _ => 2,
        }
    }

    /// Whether the mission works outside on EVA at remote sites.
    pub fn is_eva(&self) -> bool {
        matches!(
            self,
            MissionKind::CollectIce
                | MissionKind::CollectRegolith
                | MissionKind::Exploration
                | MissionKind::Mining
        )
    }
}

impl fmt::Display for MissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named stage within a mission's ordered activity sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionPhase {
    /// Plan awaiting approval.
    Reviewing,
    /// Loading the vehicle and boarding the crew.
    Embarking,
    /// Driving toward the next waypoint.
    Travelling,
    /// Unloading and leaving the vehicle at the final waypoint.
    Disembarking,
    /// Terminal phase of a successful travel mission.
    Completed,
    CollectResources,
    ExploreSite,
    MiningSite,
    TradeDisembarking,
    TradeNegotiating,
    UnloadGoods,
    LoadGoods,
    TradeEmbarking,
    DeliveryDisembarking,
    DeliveryEmbarking,
    Rendezvous,
    SelectSite,
    PrepareSite,
    Construction,
}

impl MissionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            MissionPhase::Reviewing => "Reviewing",
            MissionPhase::Embarking => "Embarking",
            MissionPhase::Travelling => "Travelling",
            MissionPhase::Disembarking => "Disembarking",
            MissionPhase::Completed => "Completed",
            MissionPhase::CollectResources => "Collecting Resources",
            MissionPhase::ExploreSite => "Exploring Site",
            MissionPhase::MiningSite => "Mining Site",
            MissionPhase::TradeDisembarking => "Disembarking at Trader",
            MissionPhase::TradeNegotiating => "Negotiating Trade",
            MissionPhase::UnloadGoods => "Unloading Goods",
            MissionPhase::LoadGoods => "Loading Goods",
            MissionPhase::TradeEmbarking => "Embarking at Trader",
            MissionPhase::DeliveryDisembarking => "Landing at Customer",
            MissionPhase::DeliveryEmbarking => "Launching from Customer",
            MissionPhase::Rendezvous => "Rendezvous",
            MissionPhase::SelectSite => "Selecting Site",
            MissionPhase::PrepareSite => "Preparing Site",
            MissionPhase::Construction => "Constructing",
        }
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Broad class of a status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    Capacity,
    Resource,
    Site,
    Execution,
    Emergency,
    Outcome,
}

/// Tag explaining how a mission degraded or concluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionStatus {
    // --- Capacity ---
    NotEnoughMembers,
    NoAvailableVehicles,
    LuvNotAvailable,
    // --- Resource ---
    CannotLoadResources,
    InsufficientSpareParts,
    NotEnoughResources,
    // --- Site ---
    CollectionSitesNotDetermined,
    ExplorationSitesNotDetermined,
    MiningSiteNotBeDetermined,
    ConstructionSiteNotFoundOrCreated,
    NoTradingSettlement,
    NoDestinationSettlement,
    TargetVehicleNotFound,
    // --- Execution ---
    NewConstructionStageNotDetermined,
    ConstructionStalled,
    MissionNotApproved,
    UserAbortedMission,
    // --- Emergency ---
    MedicalEmergency,
    NoEmergencySettlementDestinationFound,
    // --- Outcome ---
    MissionAccomplished,
    /// Extension point for tags not covered above.
    Custom(String),
}

impl MissionStatus {
    pub fn class(&self) -> StatusClass {
        match self {
            MissionStatus::NotEnoughMembers
            | MissionStatus::NoAvailableVehicles
            | MissionStatus::LuvNotAvailable => StatusClass::Capacity,
            MissionStatus::CannotLoadResources
            | MissionStatus::InsufficientSpareParts
            | MissionStatus::NotEnoughResources => StatusClass::Resource,
            MissionStatus::CollectionSitesNotDetermined
            | MissionStatus::ExplorationSitesNotDetermined
            | MissionStatus::MiningSiteNotBeDetermined
            | MissionStatus::ConstructionSiteNotFoundOrCreated
            | MissionStatus::NoTradingSettlement
            | MissionStatus::NoDestinationSettlement
            | MissionStatus::TargetVehicleNotFound => StatusClass::Site,
            MissionStatus::NewConstructionStageNotDetermined
            | MissionStatus::ConstructionStalled
            | MissionStatus::MissionNotApproved
            | MissionStatus::UserAbortedMission
            | MissionStatus::Custom(_) => StatusClass::Execution,
            MissionStatus::MedicalEmergency
            | MissionStatus::NoEmergencySettlementDestinationFound => StatusClass::Emergency,
            MissionStatus::MissionAccomplished => StatusClass::Outcome,
        }
    }

    /// Whether this tag denotes a successful conclusion.
    pub fn is_success(&self) -> bool {
        matches!(self, MissionStatus::MissionAccomplished)
    }

    pub fn name(&self) -> &str {
        match self {
            MissionStatus::NotEnoughMembers => "Not enough members",
            MissionStatus::NoAvailableVehicles => "No reservable vehicles",
            MissionStatus::LuvNotAvailable => "LUV not available",
            MissionStatus::CannotLoadResources => "Cannot load resources",
            MissionStatus::InsufficientSpareParts => "Insufficient spare parts",
            MissionStatus::NotEnoughResources => "Not enough resources",
            MissionStatus::CollectionSitesNotDetermined => "Collection sites not determined",
            MissionStatus::ExplorationSitesNotDetermined => "Exploration sites not determined",
            MissionStatus::MiningSiteNotBeDetermined => "Mining site cannot be determined",
            MissionStatus::ConstructionSiteNotFoundOrCreated => {
                "Construction site not found or created"
            }
            MissionStatus::NoTradingSettlement => "No trading settlement",
            MissionStatus::NoDestinationSettlement => "No destination settlement",
            MissionStatus::TargetVehicleNotFound => "Target vehicle not found",
            MissionStatus::NewConstructionStageNotDetermined => {
                "New construction stage not determined"
            }
            MissionStatus::ConstructionStalled => "Construction stalled",
            MissionStatus::MissionNotApproved => "Mission not approved",
            MissionStatus::UserAbortedMission => "Mission aborted by user",
            MissionStatus::MedicalEmergency => "Medical emergency",
            MissionStatus::NoEmergencySettlementDestinationFound => {
                "No emergency settlement destination found"
            }
            MissionStatus::MissionAccomplished => "Mission accomplished",
            MissionStatus::Custom(name) => name,
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role label of a mission member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    Lead,
    #[default]
    Crew,
    Pilot,
    Trader,
}

/// Approval state of a mission plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Kind of vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleKind {
    Rover,
    Drone,
    /// Light utility vehicle, towed to work sites.
    LightUtility,
}

impl VehicleKind {
    /// Whether the vehicle carries its crew on board.
    pub fn carries_crew(&self) -> bool {
        matches!(self, VehicleKind::Rover)
    }
}

/// Amount resource identifier. Quantities are kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceId {
    Oxygen,
    Water,
    Food,
    Methane,
    Ice,
    Regolith,
    Ore,
    RockSamples,
    SpareParts,
    ConstructionMaterials,
}

impl ResourceId {
    /// Consumables needed to keep a crew alive.
    pub const LIFE_SUPPORT: [ResourceId; 3] = [ResourceId::Oxygen, ResourceId::Water, ResourceId::Food];
}

/// Countable equipment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentKind {
    EvaSuit,
    SpecimenBox,
    LargeBag,
    Barrel,
}

impl EquipmentKind {
    /// Empty mass of one item (kg).
    pub fn mass(&self) -> f64 {
        match self {
            EquipmentKind::EvaSuit => EVA_SUIT_MASS,
            EquipmentKind::SpecimenBox => SPECIMEN_BOX_MASS,
            EquipmentKind::LargeBag => LARGE_BAG_MASS,
            EquipmentKind::Barrel => BARREL_MASS,
        }
    }
}

/// A concrete task pushed to an agent by a mission.
/// The agent collaborator clears it once finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Task {
    Board { vehicle: VehicleId },
    Disembark { vehicle: VehicleId },
    LoadVehicle { vehicle: VehicleId },
    UnloadVehicle { vehicle: VehicleId },
    Drive { vehicle: VehicleId },
    PilotDrone { vehicle: VehicleId },
    Eva { kind: MissionKind },
    Negotiate { settlement: SettlementId },
    Construct { site: SiteId },
}

/// Engine run state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    #[default]
    Running,
    Paused,
}
