//! # Grid rasteriser
//!
//! Turns the geometry of a room or subroom into a [`DomainGrid`]. Cells whose centre lies in the
//! walkable area are marked inside, then obstacles and walls are drawn over them, and finally the
//! open doors, so a door cut into a wall is walkable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use building_if::{
    geometry::bounding_box, Building, DoorUid, Line, Polygon, RoomId, SubRoomUid,
};
use log::debug;
use ndarray::Array2;

use super::{CellIdx, CellType, DomainGrid, DomainId, FloorFieldError, RectGrid};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The geometry of one spatial domain, ready to rasterise.
#[derive(Debug, Clone)]
pub struct Domain {
    pub id: DomainId,

    /// Walkable areas, a room domain has one per subroom
    pub areas: Vec<Polygon>,

    pub walls: Vec<Line>,

    pub obstacles: Vec<Polygon>,

    /// Open doors of the domain, each of which gets a floor field
    pub targets: BTreeMap<DoorUid, Line>,
}

/// Rasterises domains onto grids of a fixed cell size.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    cell_size_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Domain {
    /// Domain covering a single subroom. Closed doors become walls.
    pub fn from_subroom(building: &Building, uid: SubRoomUid) -> Result<Self, FloorFieldError> {
        let subroom = building.subroom_checked(uid)?;

        let mut domain = Self {
            id: DomainId::SubRoom(uid),
            areas: vec![subroom.polygon.clone()],
            walls: subroom.walls.clone(),
            obstacles: subroom.obstacles.clone(),
            targets: BTreeMap::new(),
        };

        for door in building.doors_of(uid) {
            if door.open {
                domain.targets.insert(door.uid, door.line);
            } else {
                domain.walls.push(door.line);
            }
        }

        Ok(domain)
    }

    /// Domain covering all subrooms of a room. Every open door touching the room is a target,
    /// including the crossings between its subrooms.
    pub fn from_room(building: &Building, id: RoomId) -> Result<Self, FloorFieldError> {
        let room = building
            .room(id)
            .ok_or(FloorFieldError::UnknownDomain(DomainId::Room(id)))?;

        let mut domain = Self {
            id: DomainId::Room(id),
            areas: Vec::new(),
            walls: Vec::new(),
            obstacles: Vec::new(),
            targets: BTreeMap::new(),
        };

        for uid in &room.subrooms {
            let subroom = building.subroom_checked(*uid)?;
            domain.areas.push(subroom.polygon.clone());
            domain.walls.extend(subroom.walls.iter().copied());
            domain.obstacles.extend(subroom.obstacles.iter().cloned());
        }

        for door in building.doors_of_room(id) {
            if door.open {
                domain.targets.insert(door.uid, door.line);
            } else {
                domain.walls.push(door.line);
            }
        }

        Ok(domain)
    }
}

impl Rasterizer {
    pub fn new(cell_size_m: f64) -> Result<Self, FloorFieldError> {
        if !(cell_size_m > 0.0) || !cell_size_m.is_finite() {
            return Err(FloorFieldError::NonPositiveCellSize(cell_size_m));
        }

        Ok(Self { cell_size_m })
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    /// Rasterise the domain.
    ///
    /// A domain without targets cannot be routed through and is rejected here rather than at
    /// query time, as is a domain whose geometry leaves no walkable cell.
    pub fn rasterize(&self, domain: &Domain) -> Result<DomainGrid, FloorFieldError> {
        if domain.targets.is_empty() {
            return Err(FloorFieldError::NoTargets(domain.id));
        }

        let (min, max) = bounding_box(
            domain
                .areas
                .iter()
                .flat_map(|a| a.vertices.iter())
                .chain(domain.targets.values().flat_map(|l| vec![&l.p1, &l.p2])),
        )
        .ok_or(FloorFieldError::Unbounded(domain.id))?;

        let grid = RectGrid::covering(domain.id, min, max, self.cell_size_m)?;
        let mut cells = Array2::from_elem(grid.num_cells, CellType::Outside);

        // Walkable area
        for (cell, cell_type) in cells.indexed_iter_mut() {
            let position = grid.cell_position(cell);
            if domain.areas.iter().any(|a| a.contains(&position)) {
                *cell_type = CellType::Inside;
            }
        }

        // Obstacles are filled in as well as outlined
        for obstacle in &domain.obstacles {
            for (cell, cell_type) in cells.indexed_iter_mut() {
                if obstacle.contains(&grid.cell_position(cell)) {
                    *cell_type = CellType::Wall;
                }
            }
            for edge in obstacle.edges() {
                draw_line(&mut cells, &grid, &edge, CellType::Wall);
            }
        }

        for wall in &domain.walls {
            draw_line(&mut cells, &grid, wall, CellType::Wall);
        }

        for door in domain.targets.values() {
            draw_line(&mut cells, &grid, door, CellType::Door);
        }

        let domain_grid = DomainGrid {
            domain: domain.id,
            grid,
            cells,
            targets: domain.targets.clone(),
        };

        if domain_grid.count(CellType::Inside) == 0 {
            return Err(FloorFieldError::EmptyDomain(domain.id));
        }

        debug!(
            "Rasterised {} onto {}x{} cells ({} inside, {} wall, {} door)",
            domain.id,
            domain_grid.grid.num_cells.0,
            domain_grid.grid.num_cells.1,
            domain_grid.count(CellType::Inside),
            domain_grid.count(CellType::Wall),
            domain_grid.count(CellType::Door),
        );

        Ok(domain_grid)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Cells of the 8-connected Bresenham line from `from` to `to`, both ends included.
///
/// 8-connected lines are closed to the 4-neighbour propagation of the solver, so a wall drawn
/// this way cannot be leaked through diagonally.
pub fn bresenham(from: CellIdx, to: CellIdx) -> Vec<CellIdx> {
    let (mut x, mut y) = (from.0 as i64, from.1 as i64);
    let (x1, y1) = (to.0 as i64, to.1 as i64);

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        cells.push((x as usize, y as usize));
        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }

    cells
}

/// The cells a line covers on the grid.
pub(crate) fn line_cells(grid: &RectGrid, line: &Line) -> Vec<CellIdx> {
    bresenham(grid.cell_at_clamped(&line.p1), grid.cell_at_clamped(&line.p2))
}

fn draw_line(cells: &mut Array2<CellType>, grid: &RectGrid, line: &Line, value: CellType) {
    for cell in line_cells(grid, line) {
        cells[cell] = value;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_bresenham() {
        assert_eq!(bresenham((0, 0), (3, 0)), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(bresenham((2, 2), (2, 2)), vec![(2, 2)]);
        assert_eq!(bresenham((0, 0), (2, 2)), vec![(0, 0), (1, 1), (2, 2)]);

        // Reversed lines cover the same number of cells
        let fwd = bresenham((1, 5), (7, 2));
        let back = bresenham((7, 2), (1, 5));
        assert_eq!(fwd.len(), 7);
        assert_eq!(back.len(), 7);
        assert_eq!(fwd[0], (1, 5));
        assert_eq!(back[0], (7, 2));

        // Consecutive cells are 8-connected
        for w in fwd.windows(2) {
            let di = (w[0].0 as i64 - w[1].0 as i64).abs();
            let dj = (w[0].1 as i64 - w[1].1 as i64).abs();
            assert!(di <= 1 && dj <= 1);
        }
    }

    #[test]
    fn test_rasterize_subroom() -> Result<(), FloorFieldError> {
        let building = fixtures::single_room(10.0, 5.0);
        let domain = Domain::from_subroom(&building, fixtures::SINGLE_SUBROOM)?;
        let grid = Rasterizer::new(0.125)?.rasterize(&domain)?;

        // Corners and wall midpoints are walls
        let wall = |x, y| grid.cell_type(grid.grid.cell_at(&nalgebra::Point2::new(x, y)).unwrap());
        assert_eq!(wall(0.0, 0.0), CellType::Wall);
        assert_eq!(wall(5.0, 5.0), CellType::Wall);
        assert_eq!(wall(0.0, 2.5), CellType::Wall);

        // The door cuts through the wall on the right
        assert_eq!(wall(10.0, 2.5), CellType::Door);
        assert_eq!(wall(5.0, 2.5), CellType::Inside);

        // The ring around the room is outside
        assert_eq!(grid.cell_type((0, 0)), CellType::Outside);
        assert_eq!(grid.cell_type((0, 20)), CellType::Outside);

        // 79 x 39 interior cells
        assert_eq!(grid.count(CellType::Inside), 79 * 39);

        Ok(())
    }

    #[test]
    fn test_rasterize_errors() -> Result<(), FloorFieldError> {
        let mut building = fixtures::single_room(4.0, 4.0);
        building.set_door_open(fixtures::SINGLE_EXIT, false)?;

        let domain = Domain::from_subroom(&building, fixtures::SINGLE_SUBROOM)?;
        assert!(domain.targets.is_empty());
        assert!(matches!(
            Rasterizer::new(0.25)?.rasterize(&domain),
            Err(FloorFieldError::NoTargets(DomainId::SubRoom(fixtures::SINGLE_SUBROOM)))
        ));

        assert!(matches!(
            Rasterizer::new(0.0),
            Err(FloorFieldError::NonPositiveCellSize(_))
        ));

        Ok(())
    }

    #[test]
    fn test_rasterize_obstacle() -> Result<(), FloorFieldError> {
        let building = fixtures::room_with_pillar();
        let domain = Domain::from_subroom(&building, fixtures::SINGLE_SUBROOM)?;
        let grid = Rasterizer::new(0.25)?.rasterize(&domain)?;

        let pillar_centre = grid.grid.cell_at(&nalgebra::Point2::new(5.0, 5.0)).unwrap();
        assert_eq!(grid.cell_type(pillar_centre), CellType::Wall);

        Ok(())
    }
}
