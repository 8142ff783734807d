//! Fundamental identifiers, surface coordinates and Mars time.

use std::f64::consts::{PI, TAU};
use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{MARS_RADIUS_KM, MILLISOLS_PER_SOL};

/// Unique id of a simulated colonist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Unique id of a vehicle (rover, drone, LUV).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u32);

/// Unique id of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettlementId(pub u32);

/// Unique id of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MissionId(pub u32);

/// Unique id of a surface site (explored location or construction site).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle-{}", self.0)
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "settlement-{}", self.0)
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mission-{}", self.0)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site-{}", self.0)
    }
}

/// A point on the Mars surface.
/// Latitude is positive north, longitude positive east, both in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Build coordinates, clamping latitude and wrapping longitude into (-PI, PI].
    pub fn new(lat: f64, lon: f64) -> Self {
        let lat = lat.clamp(-PI / 2.0, PI / 2.0);
        let mut lon = lon.rem_euclid(TAU);
        if lon > PI {
            lon -= TAU;
        }
        Self { lat, lon }
    }

    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians())
    }

    /// Unit vector from the planet center through this point.
    fn to_unit(self) -> DVec3 {
        DVec3::new(
            self.lat.cos() * self.lon.cos(),
            self.lat.cos() * self.lon.sin(),
            self.lat.sin(),
        )
    }

    fn from_unit(v: DVec3) -> Self {
        let v = v.normalize();
        Self::new(v.z.clamp(-1.0, 1.0).asin(), v.y.atan2(v.x))
    }

    /// Great-circle distance to another point in kilometers.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let (a, b) = (self.to_unit(), other.to_unit());
        a.cross(b).length().atan2(a.dot(b)) * MARS_RADIUS_KM
    }

    /// Initial bearing toward another point in radians (0 = North, clockwise).
    pub fn bearing_to(&self, other: &Coordinates) -> f64 {
        let dlon = other.lon - self.lon;
        let y = dlon.sin() * other.lat.cos();
        let x = self.lat.cos() * other.lat.sin() - self.lat.sin() * other.lat.cos() * dlon.cos();
        y.atan2(x).rem_euclid(TAU)
    }

    /// The point reached by travelling `distance_km` along `bearing` (radians,
    /// 0 = North, clockwise) from here.
    pub fn destination(&self, bearing: f64, distance_km: f64) -> Coordinates {
        if distance_km <= 0.0 {
            return *self;
        }
        let p = self.to_unit();
        let east = DVec3::new(-self.lon.sin(), self.lon.cos(), 0.0);
        let north = DVec3::new(
            -self.lat.sin() * self.lon.cos(),
            -self.lat.sin() * self.lon.sin(),
            self.lat.cos(),
        );
        let dir = north * bearing.cos() + east * bearing.sin();
        let delta = distance_km / MARS_RADIUS_KM;
        Self::from_unit(p * delta.cos() + dir * delta.sin())
    }

    /// Move up to `distance_km` toward `target`, stopping on it.
    pub fn toward(&self, target: &Coordinates, distance_km: f64) -> Coordinates {
        if distance_km >= self.distance_to(target) {
            *target
        } else {
            self.destination(self.bearing_to(target), distance_km)
        }
    }
}

/// A navigation waypoint: a coordinate, optionally tied to a settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub location: Coordinates,
    pub settlement: Option<SettlementId>,
    pub description: String,
}

impl Waypoint {
    pub fn site(location: Coordinates, description: impl Into<String>) -> Self {
        Self {
            location,
            settlement: None,
            description: description.into(),
        }
    }

    pub fn settlement(location: Coordinates, settlement: SettlementId, description: impl Into<String>) -> Self {
        Self {
            location,
            settlement: Some(settlement),
            description: description.into(),
        }
    }
}

/// Simulation time on the Mars clock, counted in millisols since start.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MarsTime {
    pub millisols: f64,
}

impl MarsTime {
    pub fn new(millisols: f64) -> Self {
        Self { millisols }
    }

    /// Sols completed since the simulation started.
    pub fn sols(&self) -> u32 {
        (self.millisols / MILLISOLS_PER_SOL).floor() as u32
    }

    /// One-based sol counter used for mission-history scaling.
    pub fn mission_sol(&self) -> u32 {
        self.sols() + 1
    }

    /// Millisols elapsed within the current sol.
    pub fn millisol_of_sol(&self) -> f64 {
        self.millisols.rem_euclid(MILLISOLS_PER_SOL)
    }

    /// Millisols between an earlier time and this one.
    pub fn since(&self, earlier: MarsTime) -> f64 {
        (self.millisols - earlier.millisols).max(0.0)
    }

    pub fn advance(&mut self, millisols: f64) {
        self.millisols += millisols;
    }
}

/// One tick of the logical clock, delivered to every open mission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClockPulse {
    /// Tick number (strictly increasing).
    pub tick: u64,
    /// Current time after the pulse was applied.
    pub time: MarsTime,
    /// Millisols covered by this pulse.
    pub elapsed: f64,
}

impl ClockPulse {
    /// The pulse that follows this one after `elapsed` millisols.
    pub fn next(&self, elapsed: f64) -> ClockPulse {
        let mut time = self.time;
        time.advance(elapsed);
        ClockPulse {
            tick: self.tick + 1,
            time,
            elapsed,
        }
    }
}
