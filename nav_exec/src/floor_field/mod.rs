//! # Floor fields
//!
//! A floor field is the pair of a cost-to-target field and a direction field, solved for one door
//! over one spatial domain (a room or a subroom). Domains are rasterised into a [`DomainGrid`] of
//! typed cells, the [`eikonal`] solver computes a field per door, and the [`FloorFieldRouter`]
//! answers nearest-cell point queries into the precomputed fields.
//!
//! [`DirectionStrategy`] puts a floor field router (or none at all) behind one steering interface
//! for the movement model.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod dump;
pub mod eikonal;
mod grid;
mod params;
mod raster;
mod router;
mod strategy;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use dump::DumpRow;
pub use eikonal::{EikonalSolver, FloorField};
pub use grid::{CellIdx, CellType, DomainGrid, RectGrid};
pub use params::{FloorFieldParams, Granularity, SpeedMode, TargetMode};
pub use raster::{bresenham, Domain, Rasterizer};
pub use router::{DomainFields, FloorFieldRouter};
pub use strategy::DirectionStrategy;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use building_if::{AgentId, BuildingError, DoorUid, RoomId, SubRoomUid};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identifies the spatial domain a floor field is solved over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainId {
    Room(RoomId),
    SubRoom(SubRoomUid),
}

#[derive(Debug, thiserror::Error)]
pub enum FloorFieldError {
    #[error("Grid cell size must be positive and finite, found {0}")]
    NonPositiveCellSize(f64),

    #[error("Domain {0} has no open doors to route to")]
    NoTargets(DomainId),

    #[error("Geometry of domain {0} does not rasterise into a bounded area")]
    Unbounded(DomainId),

    #[error("Domain {0} contains no walkable cells")]
    EmptyDomain(DomainId),

    #[error("Door {target} of domain {domain} covers no walkable cell")]
    TargetNotRasterised { domain: DomainId, target: DoorUid },

    #[error("No floor field for domain {0}")]
    UnknownDomain(DomainId),

    #[error("Position {position:?} is outside the grid of domain {domain}")]
    OutsideGrid {
        domain: DomainId,
        position: Point2<f64>,
    },

    #[error("No walkable cell near {position:?} in domain {domain}")]
    NoPassableCell {
        domain: DomainId,
        position: Point2<f64>,
    },

    #[error("No floor field towards door {target} in domain {domain}")]
    NotFound { domain: DomainId, target: DoorUid },

    #[error("Agent {0} has no destination to steer towards")]
    NoDestination(AgentId),

    #[error("Floor fields are disabled for this direction strategy")]
    NoFloorFields,

    #[error("A floor field solver thread for domain {0} panicked")]
    SolverPanicked(DomainId),

    #[error("Could not spawn a floor field solver thread: {0}")]
    SpawnFailed(std::io::Error),

    #[error("Could not write the grid dump: {0}")]
    DumpFailed(csv::Error),

    #[error("Building error: {0}")]
    Building(BuildingError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainId::Room(id) => write!(f, "room {}", id),
            DomainId::SubRoom(uid) => write!(f, "subroom {}", uid),
        }
    }
}

impl From<BuildingError> for FloorFieldError {
    fn from(e: BuildingError) -> Self {
        FloorFieldError::Building(e)
    }
}

impl From<csv::Error> for FloorFieldError {
    fn from(e: csv::Error) -> Self {
        FloorFieldError::DumpFailed(e)
    }
}
