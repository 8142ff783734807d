//! Runtime-tunable mission parameters.
//!
//! Every section has sensible defaults; a JSON document only needs to name
//! the fields it overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`MissionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse mission config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid mission config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level mission configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub life_support: LifeSupportConfig,
    pub eva: EvaConfig,
    pub travel: TravelConfig,
    pub approval: ApprovalConfig,
    pub sites: SiteConfig,
    pub trade: TradeConfig,
    pub construction: ConstructionConfig,
    pub recruitment: RecruitmentConfig,
}

/// Per-person consumption rates and the safety margin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeSupportConfig {
    /// kg of oxygen per person per sol.
    pub oxygen_per_sol: f64,
    /// kg of water per person per sol.
    pub water_per_sol: f64,
    /// kg of food per person per sol.
    pub food_per_sol: f64,
    /// Multiplier applied when a buffered estimate is requested.
    pub safety_margin: f64,
}

impl Default for LifeSupportConfig {
    fn default() -> Self {
        Self {
            oxygen_per_sol: 0.84,
            water_per_sol: 4.0,
            food_per_sol: 0.62,
            safety_margin: 1.5,
        }
    }
}

impl LifeSupportConfig {
    /// Total life support mass per person per sol.
    pub fn daily_mass(&self) -> f64 {
        self.oxygen_per_sol + self.water_per_sol + self.food_per_sol
    }
}

/// EVA accident model used for spare-parts provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaConfig {
    /// Accident probability per person per millisol of EVA.
    pub base_accident_chance: f64,
    /// Average malfunctions caused by one accident.
    pub malfunctions_per_accident: f64,
    /// Spare parts mass needed to repair one malfunction (kg).
    pub parts_mass_per_malfunction: f64,
}

impl Default for EvaConfig {
    fn default() -> Self {
        Self {
            base_accident_chance: 0.000_5,
            malfunctions_per_accident: 2.5,
            parts_mass_per_malfunction: 4.0,
        }
    }
}

/// Vehicle trip parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelConfig {
    /// Hard cap on any trip (sols).
    pub max_trip_sols: f64,
    /// Cargo moved between settlement and vehicle per millisol (kg).
    pub loading_rate_kg_per_millisol: f64,
    /// Time allowed for the crew to board before stragglers are dropped.
    pub embark_timeout_millisols: f64,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            max_trip_sols: 10.0,
            loading_rate_kg_per_millisol: 20.0,
            embark_timeout_millisols: 200.0,
        }
    }
}

/// Plan review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Approve plans without waiting for a review command.
    pub auto_approve: bool,
    /// Pending plans older than this are rejected.
    pub timeout_millisols: f64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            auto_approve: true,
            timeout_millisols: 500.0,
        }
    }
}

/// Site selection and on-site work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Confidence floor for site-distance sampling.
    pub confidence_base: u32,
    /// Sites requested by resource-collection missions.
    pub collection_sites: usize,
    /// Sites requested by exploration missions.
    pub exploration_sites: usize,
    /// Millisols spent at each collection site.
    pub collection_site_time: f64,
    /// Millisols spent at each exploration site.
    pub exploration_site_time: f64,
    /// Millisols spent at a mining site.
    pub mining_site_time: f64,
    /// Total ice/regolith a collection mission aims for (kg).
    pub collection_target_kg: f64,
    /// Lowest mineral estimate (percent) worth mining.
    pub min_mineral_estimate: f64,
    /// Specimen boxes an exploration mission must carry.
    pub specimen_boxes: u32,
    /// Minimum large bags for collection and mining missions.
    pub large_bags: u32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            confidence_base: 3,
            collection_sites: 2,
            exploration_sites: 3,
            collection_site_time: 250.0,
            exploration_site_time: 200.0,
            mining_site_time: 600.0,
            collection_target_kg: 800.0,
            min_mineral_estimate: 20.0,
            specimen_boxes: 4,
            large_bags: 4,
        }
    }
}

/// Trade and delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Deals below this profit are not worth the trip.
    pub min_profit: f64,
    /// Negotiation is abandoned after this long.
    pub negotiation_timeout_millisols: f64,
    /// Validity of a cached best deal.
    pub deal_cache_ttl_millisols: f64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            min_profit: 100.0,
            negotiation_timeout_millisols: 150.0,
            deal_cache_ttl_millisols: 1000.0,
        }
    }
}

/// Construction missions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    pub max_members: usize,
    pub min_members: usize,
    /// Light utility vehicles to reserve when available.
    pub luvs: usize,
    /// Whether the mission cannot start without a LUV.
    pub luv_required: bool,
    /// Construction without progress for this long is abandoned.
    pub stall_timeout_millisols: f64,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            max_members: 6,
            min_members: 3,
            luvs: 1,
            luv_required: false,
            stall_timeout_millisols: 1000.0,
        }
    }
}

/// Recruitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecruitmentConfig {
    /// Recruit only from the starter's own settlement.
    pub same_settlement_only: bool,
}

impl Default for RecruitmentConfig {
    fn default() -> Self {
        Self {
            same_settlement_only: true,
        }
    }
}

impl MissionConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MissionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("life_support.oxygen_per_sol", self.life_support.oxygen_per_sol),
            ("life_support.water_per_sol", self.life_support.water_per_sol),
            ("life_support.food_per_sol", self.life_support.food_per_sol),
            ("eva.base_accident_chance", self.eva.base_accident_chance),
            ("eva.malfunctions_per_accident", self.eva.malfunctions_per_accident),
            ("eva.parts_mass_per_malfunction", self.eva.parts_mass_per_malfunction),
            ("sites.collection_site_time", self.sites.collection_site_time),
            ("sites.exploration_site_time", self.sites.exploration_site_time),
            ("sites.mining_site_time", self.sites.mining_site_time),
        ];
        for (field, value) in non_negative {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a non-negative number, got {value}"),
                });
            }
        }
        if self.life_support.safety_margin < 1.0 {
            return Err(ConfigError::Invalid {
                field: "life_support.safety_margin",
                reason: format!("must be at least 1.0, got {}", self.life_support.safety_margin),
            });
        }
        if self.travel.max_trip_sols <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "travel.max_trip_sols",
                reason: "must be positive".to_string(),
            });
        }
        if self.travel.loading_rate_kg_per_millisol <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "travel.loading_rate_kg_per_millisol",
                reason: "must be positive".to_string(),
            });
        }
        if self.construction.min_members > self.construction.max_members {
            return Err(ConfigError::Invalid {
                field: "construction.min_members",
                reason: format!(
                    "{} exceeds max_members {}",
                    self.construction.min_members, self.construction.max_members
                ),
            });
        }
        Ok(())
    }
}
