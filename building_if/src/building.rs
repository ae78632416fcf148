//! # Building model
//!
//! A building is a set of rooms, each split into one or more subrooms. Subrooms are connected by
//! doors: crossings join two subrooms of the same room, transitions join subrooms of different
//! rooms or lead out of the building.
//!
//! Every room, subroom and door carries a stable integer ID which the navigation software uses as
//! its key, so these IDs must never be reused within one building.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::geometry::{Line, Polygon};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

pub type RoomId = u32;

/// Unique ID of a subroom across the whole building.
pub type SubRoomUid = u32;

/// Unique ID of a door (crossing or transition) across the whole building.
pub type DoorUid = u32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A door between two subrooms, or between a subroom and the outside of the building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Door {
    pub uid: DoorUid,

    pub kind: DoorKind,

    /// The door's segment, which lies on the boundary of the subrooms it connects.
    pub line: Line,

    /// The subroom on the first side of the door
    pub subroom_a: SubRoomUid,

    /// The subroom on the second side of the door, `None` if the door leads outside
    pub subroom_b: Option<SubRoomUid>,

    /// Closed doors are treated as walls
    pub open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubRoom {
    pub uid: SubRoomUid,

    /// The room this subroom belongs to
    pub room: RoomId,

    pub kind: SubRoomType,

    /// Boundary of the walkable area
    pub polygon: Polygon,

    /// Wall segments. Doors may overlap walls, the door wins.
    pub walls: Vec<Line>,

    /// Obstacles inside the subroom which cannot be walked through
    pub obstacles: Vec<Polygon>,

    /// Elevation of the subroom's floor in meters
    pub elevation_m: f64,

    /// Doors on the boundary of this subroom, kept up to date by [`Building::add_door`]
    pub doors: Vec<DoorUid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub caption: String,
    pub subrooms: Vec<SubRoomUid>,
}

/// The whole building.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Building {
    pub caption: String,

    rooms: BTreeMap<RoomId, Room>,
    subrooms: BTreeMap<SubRoomUid, SubRoom>,
    doors: BTreeMap<DoorUid, Door>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorKind {
    /// Door between two subrooms of the same room
    Crossing,

    /// Door between two rooms, or out of the building
    Transition,
}

/// The use of a subroom, which affects how attractive it is as an evacuation route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubRoomType {
    Floor,
    Corridor,
    Lobby,
    Entrance,
    Stair,
    EscalatorUp,
    EscalatorDown,
    /// Dedicated area, such as a waiting area
    DA,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildingError {
    #[error("Room {0} already exists")]
    DuplicateRoom(RoomId),

    #[error("Subroom {0} already exists")]
    DuplicateSubRoom(SubRoomUid),

    #[error("Door {0} already exists")]
    DuplicateDoor(DoorUid),

    #[error("Unknown room {0}")]
    UnknownRoom(RoomId),

    #[error("Unknown subroom {0}")]
    UnknownSubRoom(SubRoomUid),

    #[error("Unknown door {0}")]
    UnknownDoor(DoorUid),

    #[error("Crossing {0} must connect two subrooms of the same room")]
    InvalidCrossing(DoorUid),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SubRoomType {
    fn default() -> Self {
        SubRoomType::Unknown
    }
}

impl Door {
    /// Doors with nothing on their second side lead out of the building.
    pub fn is_exit(&self) -> bool {
        self.subroom_b.is_none()
    }

    /// Width of the door opening in meters.
    pub fn width(&self) -> f64 {
        self.line.length()
    }

    pub fn connects(&self, subroom: SubRoomUid) -> bool {
        self.subroom_a == subroom || self.subroom_b == Some(subroom)
    }

    /// The subroom reached by walking through this door from `from`.
    ///
    /// Returns `None` if the door isn't on the boundary of `from`, `Some(None)` if the door leads
    /// outside.
    pub fn other_side(&self, from: SubRoomUid) -> Option<Option<SubRoomUid>> {
        if self.subroom_a == from {
            Some(self.subroom_b)
        } else if self.subroom_b == Some(from) {
            Some(Some(self.subroom_a))
        } else {
            None
        }
    }
}

impl SubRoom {
    /// Create a new subroom whose walls are the edges of its boundary polygon.
    ///
    /// Door gaps need not be cut out of the walls, doors are laid over them.
    pub fn new(uid: SubRoomUid, room: RoomId, kind: SubRoomType, polygon: Polygon) -> Self {
        let walls = polygon.edges().collect();
        Self {
            uid,
            room,
            kind,
            polygon,
            walls,
            obstacles: Vec::new(),
            elevation_m: 0.0,
            doors: Vec::new(),
        }
    }

    pub fn with_obstacle(mut self, obstacle: Polygon) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn with_elevation(mut self, elevation_m: f64) -> Self {
        self.elevation_m = elevation_m;
        self
    }

    /// True if the point lies in the walkable area of the subroom.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        self.polygon.contains(point) && !self.obstacles.iter().any(|o| o.contains(point))
    }
}

impl Building {
    pub fn new(caption: &str) -> Self {
        Self {
            caption: caption.into(),
            ..Default::default()
        }
    }

    pub fn add_room(&mut self, id: RoomId, caption: &str) -> Result<(), BuildingError> {
        if self.rooms.contains_key(&id) {
            return Err(BuildingError::DuplicateRoom(id));
        }

        self.rooms.insert(
            id,
            Room {
                id,
                caption: caption.into(),
                subrooms: Vec::new(),
            },
        );

        Ok(())
    }

    pub fn add_subroom(&mut self, subroom: SubRoom) -> Result<(), BuildingError> {
        if self.subrooms.contains_key(&subroom.uid) {
            return Err(BuildingError::DuplicateSubRoom(subroom.uid));
        }

        let room = self
            .rooms
            .get_mut(&subroom.room)
            .ok_or(BuildingError::UnknownRoom(subroom.room))?;
        room.subrooms.push(subroom.uid);

        self.subrooms.insert(subroom.uid, subroom);

        Ok(())
    }

    /// Add a new open door between `subroom_a` and `subroom_b` (or the outside if `None`).
    pub fn add_door(
        &mut self,
        uid: DoorUid,
        kind: DoorKind,
        line: Line,
        subroom_a: SubRoomUid,
        subroom_b: Option<SubRoomUid>,
    ) -> Result<(), BuildingError> {
        if self.doors.contains_key(&uid) {
            return Err(BuildingError::DuplicateDoor(uid));
        }

        let room_a = self.subroom_checked(subroom_a)?.room;
        let room_b = match subroom_b {
            Some(b) => Some(self.subroom_checked(b)?.room),
            None => None,
        };

        if kind == DoorKind::Crossing && room_b != Some(room_a) {
            return Err(BuildingError::InvalidCrossing(uid));
        }

        for s in std::iter::once(subroom_a).chain(subroom_b) {
            if let Some(sub) = self.subrooms.get_mut(&s) {
                sub.doors.push(uid);
            }
        }

        self.doors.insert(
            uid,
            Door {
                uid,
                kind,
                line,
                subroom_a,
                subroom_b,
                open: true,
            },
        );

        Ok(())
    }

    pub fn set_door_open(&mut self, uid: DoorUid, open: bool) -> Result<(), BuildingError> {
        let door = self
            .doors
            .get_mut(&uid)
            .ok_or(BuildingError::UnknownDoor(uid))?;
        door.open = open;
        Ok(())
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn subroom(&self, uid: SubRoomUid) -> Option<&SubRoom> {
        self.subrooms.get(&uid)
    }

    pub fn door(&self, uid: DoorUid) -> Option<&Door> {
        self.doors.get(&uid)
    }

    /// Like [`Building::subroom`] but returns an error for unknown subrooms.
    pub fn subroom_checked(&self, uid: SubRoomUid) -> Result<&SubRoom, BuildingError> {
        self.subroom(uid).ok_or(BuildingError::UnknownSubRoom(uid))
    }

    /// Like [`Building::door`] but returns an error for unknown doors.
    pub fn door_checked(&self, uid: DoorUid) -> Result<&Door, BuildingError> {
        self.door(uid).ok_or(BuildingError::UnknownDoor(uid))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn subrooms(&self) -> impl Iterator<Item = &SubRoom> {
        self.subrooms.values()
    }

    pub fn doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.values()
    }

    /// All doors on the boundary of the given subroom, in ascending ID order.
    pub fn doors_of(&self, subroom: SubRoomUid) -> Vec<&Door> {
        self.doors
            .values()
            .filter(|d| d.connects(subroom))
            .collect()
    }

    /// All doors touching any subroom of the given room, in ascending ID order.
    pub fn doors_of_room(&self, room: RoomId) -> Vec<&Door> {
        let subrooms = match self.rooms.get(&room) {
            Some(r) => &r.subrooms,
            None => return Vec::new(),
        };

        self.doors
            .values()
            .filter(|d| subrooms.iter().any(|s| d.connects(*s)))
            .collect()
    }

    /// The first subroom (in ID order) whose walkable area contains the point.
    pub fn subroom_at(&self, point: &Point2<f64>) -> Option<&SubRoom> {
        self.subrooms.values().find(|s| s.contains(point))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn two_subrooms() -> Result<Building, BuildingError> {
        let mut b = Building::new("test");
        b.add_room(0, "hall")?;
        b.add_subroom(SubRoom::new(
            10,
            0,
            SubRoomType::Floor,
            Polygon::rectangle(Point2::new(0.0, 0.0), Point2::new(5.0, 5.0)),
        ))?;
        b.add_subroom(SubRoom::new(
            11,
            0,
            SubRoomType::Corridor,
            Polygon::rectangle(Point2::new(5.0, 0.0), Point2::new(10.0, 5.0)),
        ))?;
        b.add_door(
            1,
            DoorKind::Crossing,
            Line::from_coords(5.0, 2.0, 5.0, 3.0),
            10,
            Some(11),
        )?;
        b.add_door(
            2,
            DoorKind::Transition,
            Line::from_coords(10.0, 2.0, 10.0, 3.0),
            11,
            None,
        )?;
        Ok(b)
    }

    #[test]
    fn test_building() -> Result<(), BuildingError> {
        let b = two_subrooms()?;

        assert_eq!(b.subroom_checked(10)?.doors, vec![1]);
        assert_eq!(b.subroom_checked(11)?.doors, vec![1, 2]);
        assert_eq!(b.doors_of_room(0).len(), 2);

        let crossing = b.door_checked(1)?;
        assert_eq!(crossing.other_side(10), Some(Some(11)));
        assert_eq!(crossing.other_side(11), Some(Some(10)));
        assert_eq!(crossing.other_side(12), None);
        assert!(b.door_checked(2)?.is_exit());

        assert_eq!(b.subroom_at(&Point2::new(7.0, 1.0)).map(|s| s.uid), Some(11));
        assert!(b.subroom_at(&Point2::new(17.0, 1.0)).is_none());

        Ok(())
    }

    #[test]
    fn test_building_errors() -> Result<(), BuildingError> {
        let mut b = two_subrooms()?;

        assert!(matches!(b.add_room(0, "again"), Err(BuildingError::DuplicateRoom(0))));
        assert!(matches!(
            b.add_door(1, DoorKind::Transition, Line::from_coords(0.0, 0.0, 0.0, 1.0), 10, None),
            Err(BuildingError::DuplicateDoor(1))
        ));
        assert!(matches!(
            b.add_door(3, DoorKind::Crossing, Line::from_coords(0.0, 0.0, 0.0, 1.0), 10, None),
            Err(BuildingError::InvalidCrossing(3))
        ));
        assert!(matches!(
            b.add_door(4, DoorKind::Transition, Line::from_coords(0.0, 0.0, 0.0, 1.0), 99, None),
            Err(BuildingError::UnknownSubRoom(99))
        ));

        b.set_door_open(2, false)?;
        assert!(!b.door_checked(2)?.open);

        Ok(())
    }
}
