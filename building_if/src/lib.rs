//! # Building interface crate.
//!
//! Provides the interfaces the navigation software consumes from its collaborators: the geometry
//! primitives, the building model (rooms, subrooms and the doors between them) and the view of a
//! simulated agent.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Points, line segments and polygons
pub mod geometry;

/// Rooms, subrooms and doors with stable integer IDs
pub mod building;

/// The agent (pedestrian) as seen by the router
pub mod agent;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use agent::{Agent, AgentId, Pedestrian};
pub use building::{
    Building, BuildingError, Door, DoorKind, DoorUid, Room, RoomId, SubRoom, SubRoomType,
    SubRoomUid,
};
pub use geometry::{Line, Polygon};
