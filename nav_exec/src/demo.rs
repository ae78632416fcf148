//! # Demonstration scenario
//!
//! The building, agents, smoke and movement used by the `nav_exec` executable. Movement is
//! deliberately naive: agents walk at a constant speed straight at the steering point they are
//! given.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use building_if::{
    AgentId, Building, BuildingError, DoorKind, DoorUid, Line, Pedestrian, Polygon, SubRoom,
    SubRoomType,
};
use nalgebra::{Point2, Vector2};
use nav_lib::hazard::{HazardError, HazardMesh, HazardMeshStorage, HazardParams, HazardQuantity};
use ndarray::Array2;
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Door leading out of the lobby, where the smoke comes from
const LOBBY_EXIT: DoorUid = 5;

/// Walking speed of every agent
pub const WALKING_SPEED_M_S: f64 = 1.2;

/// Distance from an exit door within which an agent leaving the building counts as evacuated
const EXIT_TOLERANCE_M: f64 = 0.5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Outcome of a run, saved as JSON in the session directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutingReport {
    pub num_steps: usize,
    pub final_time_s: f64,
    pub agents: Vec<AgentReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub agent: AgentId,

    /// Doors chosen by the router, oldest first
    pub doors: Vec<DoorUid>,

    pub status: AgentStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AgentStatus {
    Evacuated { time_s: f64 },
    Unroutable,
    StillInside,
}

/// Result of moving an agent for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Moved,
    Evacuated,
    Blocked,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// A small office floor with two ways out.
///
/// ```text
///    +--------+---+-----------+
///    |        |   | STAIR     |
///    |OFFICE B2   4      exit 6 (top)
///    |        |   +-----------+
///    +---7----+ C |           |
///    |        | O 3 LOBBY [] 5 exit
///    |OFFICE A1 R |           |
///    +--------+---+-----------+
/// ```
pub fn building() -> Result<Building, BuildingError> {
    let mut b = Building::new("office floor");

    let rooms = [
        (0, "office A", SubRoomType::Floor, (0.0, 0.0), (6.0, 6.0)),
        (1, "office B", SubRoomType::Floor, (0.0, 6.0), (6.0, 12.0)),
        (2, "corridor", SubRoomType::Corridor, (6.0, 0.0), (9.0, 12.0)),
        (3, "lobby", SubRoomType::Lobby, (9.0, 0.0), (17.0, 6.0)),
        (4, "stairwell", SubRoomType::Stair, (9.0, 6.0), (17.0, 12.0)),
    ];

    for (id, caption, kind, min, max) in rooms.iter() {
        b.add_room(*id, caption)?;
        let mut subroom = SubRoom::new(
            *id,
            *id,
            *kind,
            Polygon::rectangle(Point2::new(min.0, min.1), Point2::new(max.0, max.1)),
        );
        if *id == 3 {
            subroom = subroom.with_obstacle(Polygon::rectangle(
                Point2::new(12.0, 2.5),
                Point2::new(13.0, 3.5),
            ));
        }
        b.add_subroom(subroom)?;
    }

    let t = DoorKind::Transition;
    b.add_door(1, t, Line::from_coords(6.0, 2.5, 6.0, 3.5), 0, Some(2))?;
    b.add_door(2, t, Line::from_coords(6.0, 8.5, 6.0, 9.5), 1, Some(2))?;
    b.add_door(3, t, Line::from_coords(9.0, 1.0, 9.0, 3.0), 2, Some(3))?;
    b.add_door(4, t, Line::from_coords(9.0, 9.0, 9.0, 10.0), 2, Some(4))?;
    b.add_door(LOBBY_EXIT, t, Line::from_coords(17.0, 2.0, 17.0, 4.0), 3, None)?;
    b.add_door(6, t, Line::from_coords(14.0, 12.0, 16.0, 12.0), 4, None)?;
    b.add_door(7, t, Line::from_coords(1.0, 6.0, 2.0, 6.0), 0, Some(1))?;

    Ok(b)
}

/// Up to 32 agents on a regular grid across both offices.
pub fn agents(building: &Building, num_agents: usize) -> Vec<Pedestrian> {
    let mut agents = Vec::with_capacity(num_agents);

    for k in 0..num_agents.min(32) {
        let office = k % 2;
        let slot = k / 2;
        let position = Point2::new(
            0.8 + 1.2 * (slot % 4) as f64,
            0.8 + 1.2 * (slot / 4) as f64 + 6.0 * office as f64,
        );

        if let Some(subroom) = building.subroom_at(&position) {
            let mut p = Pedestrian::new(k as AgentId, subroom.room, subroom.uid, position);
            p.risk_tolerance = (k % 5) as f64 * 0.25;
            agents.push(p);
        }
    }

    agents
}

/// Smoke spreading from the lobby exit, one mesh per update interval.
pub fn smoke(params: HazardParams) -> Result<HazardMeshStorage, HazardError> {
    let mut storage = HazardMeshStorage::new(params.clone());
    let source = Point2::new(17.0, 3.0);
    let (num_rows, num_cols) = (13, 18);

    let mut time_s = 0.0;
    while time_s <= params.final_time_s {
        let growth = (time_s / params.final_time_s.max(1.0)).min(1.0);
        let values = Array2::from_shape_fn((num_rows, num_cols), |(row, col)| {
            let knot = Point2::new(col as f64, row as f64);
            3.0 * growth * (-(knot - source).norm() / 4.0).exp()
        });

        storage.insert(
            HazardQuantity::SmokeDensity,
            params.eye_height_m,
            None,
            time_s,
            HazardMesh::new(Point2::origin(), 1.0, values)?,
        );

        if !(params.update_interval_s > 0.0) {
            break;
        }
        time_s += params.update_interval_s;
    }

    Ok(storage)
}

/// Walk the agent towards `target` for `dt_s` seconds and update the subroom it is in.
///
/// Agents don't stop at the target, so one aiming at a door walks on through it.
pub fn step(building: &Building, agent: &mut Pedestrian, target: &Point2<f64>, dt_s: f64) -> Step {
    let delta = *target - agent.position_m;
    let distance = delta.norm();

    let heading = if distance > 1e-9 {
        delta / distance
    } else if agent.velocity_m_s.norm() > 0.0 {
        agent.velocity_m_s.normalize()
    } else {
        return Step::Blocked;
    };

    let velocity = heading * WALKING_SPEED_M_S;
    let next = agent.position_m + velocity * dt_s;

    if let Some(subroom) = building.subroom_at(&next) {
        agent.position_m = next;
        agent.velocity_m_s = velocity;
        agent.room = subroom.room;
        agent.subroom = subroom.uid;
        return Step::Moved;
    }

    let leaving = agent
        .destination
        .and_then(|d| building.door(d))
        .map(|d| d.is_exit() && d.line.dist_to(&next) < EXIT_TOLERANCE_M)
        .unwrap_or(false);

    if leaving {
        agent.position_m = next;
        Step::Evacuated
    } else {
        agent.velocity_m_s = Vector2::zeros();
        Step::Blocked
    }
}
