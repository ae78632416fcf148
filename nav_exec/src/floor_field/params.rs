//! # Floor field parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for building floor fields, loaded from `floor_field.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorFieldParams {
    /// Side length of the square grid cells, in meters.
    pub cell_size_m: f64,

    /// Distance to the nearest wall below which the wall avoidance speed field slows the front
    /// down, in meters.
    pub wall_avoid_distance_m: f64,

    /// Speed field the fields are solved with
    pub speed_mode: SpeedMode,

    /// How doors seed the solver
    pub target_mode: TargetMode,

    /// Spatial extent of each floor field
    pub granularity: Granularity,

    /// Number of solver threads per domain, 0 uses one thread per available core.
    pub num_solver_threads: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedMode {
    /// Unit speed everywhere, the cost is the walking distance
    Homogeneous,

    /// Speed drops linearly towards walls, bending paths away from them
    WallAvoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMode {
    /// Seed the whole (shortened) door line
    LineSegment,

    /// Seed only the cell at the door centre
    CentrePoint,
}

/// Spatial extent of the floor fields used for steering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    /// No floor fields, agents steer straight at the nearest point of their door
    None,

    /// One set of floor fields per room
    Room,

    /// One set of floor fields per subroom
    SubRoom,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for FloorFieldParams {
    fn default() -> Self {
        Self {
            cell_size_m: 0.125,
            wall_avoid_distance_m: 0.8,
            speed_mode: SpeedMode::WallAvoid,
            target_mode: TargetMode::LineSegment,
            granularity: Granularity::SubRoom,
            num_solver_threads: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params() {
        let params: FloorFieldParams =
            util::params::from_str("cell_size_m = 0.25\ngranularity = \"Room\"").unwrap();

        assert_eq!(params.cell_size_m, 0.25);
        assert_eq!(params.granularity, Granularity::Room);
        assert_eq!(params.speed_mode, SpeedMode::WallAvoid);
    }
}
