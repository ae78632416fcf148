//! # Agent interface
//!
//! The router never owns agents, it reads their state and hands back a destination through the
//! [`Agent`] trait. [`Pedestrian`] is a plain data implementation used by the executable and tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{
    building::{DoorUid, RoomId, SubRoomUid},
    geometry::Line,
};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

pub type AgentId = u32;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The state of a simulated agent as consumed by the router.
pub trait Agent {
    fn id(&self) -> AgentId;

    fn position(&self) -> Point2<f64>;

    /// Elevation of the floor the agent stands on, in meters
    fn elevation_m(&self) -> f64;

    fn room(&self) -> RoomId;

    fn subroom(&self) -> SubRoomUid;

    /// Magnitude of the agent's current velocity, in meters per second
    fn speed_m_s(&self) -> f64;

    /// How willing the agent is to walk through hazards, between 0 (not at all) and 1 (ignores
    /// them)
    fn risk_tolerance(&self) -> f64;

    /// The door the agent is currently heading for, if any
    fn destination(&self) -> Option<DoorUid>;

    /// Set the door the agent should head for, and the line it should aim at.
    fn set_destination(&mut self, door: DoorUid, line: Line);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pedestrian {
    pub id: AgentId,

    pub position_m: Point2<f64>,

    pub velocity_m_s: Vector2<f64>,

    pub elevation_m: f64,

    pub room: RoomId,

    pub subroom: SubRoomUid,

    pub risk_tolerance: f64,

    pub destination: Option<DoorUid>,

    pub exit_line: Option<Line>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pedestrian {
    /// A stationary pedestrian with no destination and no tolerance for hazards.
    pub fn new(id: AgentId, room: RoomId, subroom: SubRoomUid, position_m: Point2<f64>) -> Self {
        Self {
            id,
            position_m,
            velocity_m_s: Vector2::zeros(),
            elevation_m: 0.0,
            room,
            subroom,
            risk_tolerance: 0.0,
            destination: None,
            exit_line: None,
        }
    }
}

impl Agent for Pedestrian {
    fn id(&self) -> AgentId {
        self.id
    }

    fn position(&self) -> Point2<f64> {
        self.position_m
    }

    fn elevation_m(&self) -> f64 {
        self.elevation_m
    }

    fn room(&self) -> RoomId {
        self.room
    }

    fn subroom(&self) -> SubRoomUid {
        self.subroom
    }

    fn speed_m_s(&self) -> f64 {
        self.velocity_m_s.norm()
    }

    fn risk_tolerance(&self) -> f64 {
        self.risk_tolerance
    }

    fn destination(&self) -> Option<DoorUid> {
        self.destination
    }

    fn set_destination(&mut self, door: DoorUid, line: Line) {
        self.destination = Some(door);
        self.exit_line = Some(line);
    }
}
