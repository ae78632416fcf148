//! # Test fixtures
//!
//! Small buildings shared by the unit tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use building_if::{
    AgentId, Building, DoorKind, DoorUid, Line, Pedestrian, Polygon, RoomId, SubRoom,
    SubRoomType, SubRoomUid,
};
use nalgebra::Point2;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

pub const SINGLE_ROOM: RoomId = 0;
pub const SINGLE_SUBROOM: SubRoomUid = 0;
pub const SINGLE_EXIT: DoorUid = 0;

pub const OFFICE: SubRoomUid = 0;
pub const CORRIDOR: SubRoomUid = 1;
pub const LOBBY: SubRoomUid = 2;
pub const OFFICE_CORRIDOR: DoorUid = 10;
pub const OFFICE_LOBBY: DoorUid = 11;
pub const CORRIDOR_EXIT: DoorUid = 20;
pub const LOBBY_EXIT: DoorUid = 21;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub fn rect_subroom(
    uid: SubRoomUid,
    room: RoomId,
    kind: SubRoomType,
    min: (f64, f64),
    max: (f64, f64),
) -> SubRoom {
    SubRoom::new(
        uid,
        room,
        kind,
        Polygon::rectangle(Point2::new(min.0, min.1), Point2::new(max.0, max.1)),
    )
}

/// A `width` by `height` room with one exit in its right hand wall, 0.5 m in from either corner.
pub fn single_room(width: f64, height: f64) -> Building {
    let mut b = Building::new("single room");
    b.add_room(SINGLE_ROOM, "room").unwrap();
    b.add_subroom(rect_subroom(
        SINGLE_SUBROOM,
        SINGLE_ROOM,
        SubRoomType::Floor,
        (0.0, 0.0),
        (width, height),
    ))
    .unwrap();
    b.add_door(
        SINGLE_EXIT,
        DoorKind::Transition,
        Line::from_coords(width, 0.5, width, height - 0.5),
        SINGLE_SUBROOM,
        None,
    )
    .unwrap();
    b
}

/// A 10 m square room with a 2 m square pillar in the middle.
pub fn room_with_pillar() -> Building {
    let mut b = Building::new("pillar");
    b.add_room(SINGLE_ROOM, "room").unwrap();
    b.add_subroom(
        rect_subroom(
            SINGLE_SUBROOM,
            SINGLE_ROOM,
            SubRoomType::Floor,
            (0.0, 0.0),
            (10.0, 10.0),
        )
        .with_obstacle(Polygon::rectangle(
            Point2::new(4.0, 4.0),
            Point2::new(6.0, 6.0),
        )),
    )
    .unwrap();
    b.add_door(
        SINGLE_EXIT,
        DoorKind::Transition,
        Line::from_coords(10.0, 0.5, 10.0, 9.5),
        SINGLE_SUBROOM,
        None,
    )
    .unwrap();
    b
}

/// One room split into two 5 m square subrooms by a crossing, with the exit on the far side.
///
/// Subroom 0 spans x 0 to 5 and subroom 1 x 5 to 10. Crossing 1 joins them, door 2 is the exit.
pub fn two_subroom_room() -> Building {
    let mut b = Building::new("split room");
    b.add_room(0, "hall").unwrap();
    b.add_subroom(rect_subroom(0, 0, SubRoomType::Floor, (0.0, 0.0), (5.0, 5.0)))
        .unwrap();
    b.add_subroom(rect_subroom(1, 0, SubRoomType::Floor, (5.0, 0.0), (10.0, 5.0)))
        .unwrap();
    b.add_door(1, DoorKind::Crossing, Line::from_coords(5.0, 2.0, 5.0, 3.0), 0, Some(1))
        .unwrap();
    b.add_door(2, DoorKind::Transition, Line::from_coords(10.0, 2.0, 10.0, 3.0), 1, None)
        .unwrap();
    b
}

/// An office with two ways out: east through a long corridor, or north through a lobby.
///
/// ```text
///   +-----+
///   |     |
///   |LOBBY|  exit 21 at the top
///   |     |
///   +-11--+--------------------+
///   |     |                    |
///   |OFF. 10     CORRIDOR      20  exit
///   |     |                    |
///   +-----+--------------------+
/// ```
///
/// The route through the lobby is the shorter one, 12.5 m against 17.5 m from the office centre.
pub fn two_exits() -> Building {
    let mut b = Building::new("two exits");
    b.add_room(0, "office").unwrap();
    b.add_room(1, "corridor").unwrap();
    b.add_room(2, "lobby").unwrap();

    b.add_subroom(rect_subroom(OFFICE, 0, SubRoomType::Floor, (0.0, 0.0), (5.0, 5.0)))
        .unwrap();
    b.add_subroom(rect_subroom(
        CORRIDOR,
        1,
        SubRoomType::Corridor,
        (5.0, 0.0),
        (20.0, 5.0),
    ))
    .unwrap();
    b.add_subroom(rect_subroom(LOBBY, 2, SubRoomType::Lobby, (0.0, 5.0), (5.0, 15.0)))
        .unwrap();

    b.add_door(
        OFFICE_CORRIDOR,
        DoorKind::Transition,
        Line::from_coords(5.0, 2.0, 5.0, 3.0),
        OFFICE,
        Some(CORRIDOR),
    )
    .unwrap();
    b.add_door(
        OFFICE_LOBBY,
        DoorKind::Transition,
        Line::from_coords(2.0, 5.0, 3.0, 5.0),
        OFFICE,
        Some(LOBBY),
    )
    .unwrap();
    b.add_door(
        CORRIDOR_EXIT,
        DoorKind::Transition,
        Line::from_coords(20.0, 2.0, 20.0, 3.0),
        CORRIDOR,
        None,
    )
    .unwrap();
    b.add_door(
        LOBBY_EXIT,
        DoorKind::Transition,
        Line::from_coords(2.0, 15.0, 3.0, 15.0),
        LOBBY,
        None,
    )
    .unwrap();

    b
}

/// A stationary pedestrian placed in whichever subroom contains the position.
pub fn pedestrian(building: &Building, id: AgentId, position: Point2<f64>) -> Pedestrian {
    let subroom = building
        .subroom_at(&position)
        .expect("Pedestrian placed outside the building");
    Pedestrian::new(id, subroom.room, subroom.uid, position)
}
