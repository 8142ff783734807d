//! Simulation constants and tuning parameters.
//!
//! Values that a scenario may want to change live in
//! [`MissionConfig`](crate::config::MissionConfig) instead.

// --- Planet & time ---

/// Mean radius of Mars in kilometers.
pub const MARS_RADIUS_KM: f64 = 3389.5;

/// Millisols in one sol.
pub const MILLISOLS_PER_SOL: f64 = 1000.0;

/// Earth seconds in one millisol.
pub const SECONDS_PER_MILLISOL: f64 = 88.775_244;

/// Millisols in one Earth hour (~40.55).
pub const MILLISOLS_PER_HOUR: f64 = 3600.0 / SECONDS_PER_MILLISOL;

/// Default clock pulse length in millisols.
pub const DEFAULT_PULSE_MILLISOLS: f64 = 5.0;

// --- Recruitment ---

/// Opinion assumed when no relationship data exists between two agents.
pub const DEFAULT_OPINION: f64 = 50.0;

/// Population breakpoints for the recruitment ceiling.
/// A settlement with population below `POPULATION_CEILING_STEPS[i]` yields a
/// ceiling of `i + 1`; anything at or above the last step yields 8.
pub const POPULATION_CEILING_STEPS: [usize; 7] = [4, 7, 10, 14, 18, 23, 29];

/// Ceiling value at or above which the random -1 reduction may apply.
pub const CEILING_REDUCTION_THRESHOLD: usize = 5;

// --- Provisioning ---

/// Multiplier applied to the average crew when sizing buffered equipment.
pub const EQUIPMENT_BUFFER_FACTOR: f64 = 1.5;

/// Share of a vehicle's cargo capacity that may be devoted to life support
/// when computing the trip time limit.
pub const LIFE_SUPPORT_CARGO_SHARE: f64 = 0.5;

/// Empty mass of an EVA suit (kg).
pub const EVA_SUIT_MASS: f64 = 45.0;

/// Empty mass of a specimen box (kg).
pub const SPECIMEN_BOX_MASS: f64 = 1.0;

/// Empty mass of a large bag (kg).
pub const LARGE_BAG_MASS: f64 = 0.5;

/// Empty mass of a barrel (kg).
pub const BARREL_MASS: f64 = 5.0;

// --- Travel ---

/// Distance below which a vehicle counts as arrived at a waypoint (km).
pub const ARRIVAL_TOLERANCE_KM: f64 = 0.05;

// --- Sites ---

/// Solar irradiance (W/m²) at or below which the surface counts as dark.
pub const DARKNESS_IRRADIANCE: f64 = 0.0;

/// Attempts at generating a site set before giving up.
pub const SITE_SELECTION_ATTEMPTS: u32 = 3;

/// Confidence at which the first site may reach a quarter of the range.
pub const SITE_CONFIDENCE_SCALE: f64 = 10.0;

/// Ice or regolith collected per crew member per millisol of EVA (kg).
pub const COLLECTION_RATE: f64 = 0.6;

/// Ore mined per crew member per millisol at 100% concentration (kg).
pub const MINING_RATE: f64 = 0.4;

/// Rock samples gathered per crew member per millisol of exploration (kg).
pub const SAMPLE_RATE: f64 = 0.02;

/// Rock sample capacity of a single specimen box (kg).
pub const SPECIMEN_BOX_CAPACITY: f64 = 20.0;

// --- Engine ---

/// Ticks a closed mission is kept in the engine before being dropped.
pub const CLOSED_MISSION_RETENTION_TICKS: u64 = 200;
