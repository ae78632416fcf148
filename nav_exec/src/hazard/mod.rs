//! # Hazard fields
//!
//! Interface to the fire simulation data the hazard sensor reads, and a preloaded implementation
//! of it. All meshes are loaded before the simulation starts, lookups never touch the
//! filesystem.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod mesh;
mod storage;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use mesh::HazardMesh;
pub use storage::{HazardKey, HazardMeshStorage};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use building_if::DoorUid;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use util::maths::finite_or;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of hazard intensities.
pub trait HazardField: Send + Sync {
    /// The intensity of the hazard for the query.
    ///
    /// Implementations must never return NaN, infinite or negative values. A hazard with no data
    /// for the query returns [`HazardError::NotFound`].
    fn lookup(&self, query: &HazardQuery) -> Result<f64, HazardError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardQuery {
    pub position: Point2<f64>,

    /// Elevation of the floor the agent stands on
    pub elevation_m: f64,

    pub time_s: f64,

    pub quantity: HazardQuantity,

    /// Door the agent is evaluating, if the data is door specific
    pub door: Option<DoorUid>,
}

/// Parameters of the hazard mesh storage, loaded from `hazard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardParams {
    /// Time between successive meshes of the fire simulation, in seconds.
    pub update_interval_s: f64,

    /// Time of the last mesh, later lookups read that mesh, in seconds.
    pub final_time_s: f64,

    /// Height above the floor at which agents sample the hazard, in meters.
    pub eye_height_m: f64,

    /// Resolution of the mesh elevations, in meters.
    pub elevation_bucket_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HazardQuantity {
    /// Smoke extinction coefficient
    SmokeDensity,
    Temperature,
    Toxicity,
}

#[derive(Debug, thiserror::Error)]
pub enum HazardError {
    #[error("No hazard mesh for {0}")]
    NotFound(HazardKey),

    #[error("Invalid hazard mesh: {0}")]
    BadMesh(String),

    #[error("Could not read hazard mesh: {0}")]
    Csv(csv::Error),

    #[error("Could not open hazard mesh: {0}")]
    Io(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for HazardParams {
    fn default() -> Self {
        Self {
            update_interval_s: 10.0,
            final_time_s: 600.0,
            eye_height_m: 1.8,
            elevation_bucket_m: 0.1,
        }
    }
}

impl fmt::Display for HazardQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HazardQuantity::SmokeDensity => "smoke density",
            HazardQuantity::Temperature => "temperature",
            HazardQuantity::Toxicity => "toxicity",
        };
        write!(f, "{}", s)
    }
}

impl From<csv::Error> for HazardError {
    fn from(e: csv::Error) -> Self {
        HazardError::Csv(e)
    }
}

impl From<std::io::Error> for HazardError {
    fn from(e: std::io::Error) -> Self {
        HazardError::Io(e)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Replace NaN, infinite and negative readings by zero.
pub fn sanitize(value: f64) -> f64 {
    finite_or(value, 0.0).max(0.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(0.5), 0.5);
        assert_eq!(sanitize(f64::NAN), 0.0);
        assert_eq!(sanitize(f64::INFINITY), 0.0);
        assert_eq!(sanitize(f64::NEG_INFINITY), 0.0);
        assert_eq!(sanitize(-2.0), 0.0);
    }
}
