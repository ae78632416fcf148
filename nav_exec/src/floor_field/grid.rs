//! # Rectangular grid
//!
//! Cells are square and addressed by `(i, j)`, `i` counting along x and `j` along y. Cell `(0, 0)`
//! is centred on the grid origin, so a position maps to its nearest cell by rounding.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use building_if::{DoorUid, Line};
use nalgebra::Point2;
use ndarray::Array2;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::{DomainId, FloorFieldError};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Index of a cell, `(i, j)`.
pub type CellIdx = (usize, usize);

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Offsets of the direct neighbours of a cell: right, up, left, down.
static NEIGHBOUR_OFFSETS: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Largest ring, in cells, searched for a walkable cell around a query landing on a wall.
const QUERY_SEARCH_RADIUS: isize = 3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Geometry of a rectangular grid of square cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectGrid {
    /// Position of the centre of cell (0, 0)
    pub origin_m: Point2<f64>,

    /// Side length of each cell
    pub cell_size_m: f64,

    /// Number of cells along x and y
    pub num_cells: (usize, usize),
}

/// A spatial domain rasterised onto a grid.
///
/// Built once by the [`super::Rasterizer`] and never modified afterwards.
#[derive(Debug, Clone)]
pub struct DomainGrid {
    pub domain: DomainId,

    pub grid: RectGrid,

    /// Type of each cell, indexed by [`CellIdx`]
    pub cells: Array2<CellType>,

    /// Door lines that fields can be solved towards
    pub targets: BTreeMap<DoorUid, Line>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// Not part of the domain
    Outside,

    /// Walkable floor
    Inside,

    /// Wall or obstacle
    Wall,

    /// Walkable cell on an open door
    Door,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CellType {
    /// True for cells a front may propagate through.
    pub fn is_passable(&self) -> bool {
        matches!(self, CellType::Inside | CellType::Door)
    }
}

impl RectGrid {
    /// Create a grid covering the box from `min` to `max`, with one spare cell on every side so
    /// that walls on the box boundary are surrounded by outside cells.
    pub fn covering(
        domain: DomainId,
        min: Point2<f64>,
        max: Point2<f64>,
        cell_size_m: f64,
    ) -> Result<Self, FloorFieldError> {
        if !(cell_size_m > 0.0) || !cell_size_m.is_finite() {
            return Err(FloorFieldError::NonPositiveCellSize(cell_size_m));
        }

        let extent = max - min;
        if !extent.x.is_finite() || !extent.y.is_finite() || extent.x < 0.0 || extent.y < 0.0 {
            return Err(FloorFieldError::Unbounded(domain));
        }

        let num_cells = (
            (extent.x / cell_size_m).ceil() as usize + 3,
            (extent.y / cell_size_m).ceil() as usize + 3,
        );

        Ok(Self {
            origin_m: Point2::new(min.x - cell_size_m, min.y - cell_size_m),
            cell_size_m,
            num_cells,
        })
    }

    pub fn num_points(&self) -> usize {
        self.num_cells.0 * self.num_cells.1
    }

    /// Linear key of the cell, `j * num_cells.0 + i`.
    pub fn key(&self, cell: CellIdx) -> usize {
        cell.1 * self.num_cells.0 + cell.0
    }

    /// Position of the centre of the cell.
    pub fn cell_position(&self, cell: CellIdx) -> Point2<f64> {
        Point2::new(
            self.origin_m.x + cell.0 as f64 * self.cell_size_m,
            self.origin_m.y + cell.1 as f64 * self.cell_size_m,
        )
    }

    /// The cell whose centre is nearest to the position, `None` if the position is more than half
    /// a cell outside the grid.
    pub fn cell_at(&self, position: &Point2<f64>) -> Option<CellIdx> {
        let i = ((position.x - self.origin_m.x) / self.cell_size_m).round();
        let j = ((position.y - self.origin_m.y) / self.cell_size_m).round();

        if i >= 0.0 && j >= 0.0 && (i as usize) < self.num_cells.0 && (j as usize) < self.num_cells.1
        {
            Some((i as usize, j as usize))
        } else {
            None
        }
    }

    /// Like [`RectGrid::cell_at`], but positions outside the grid are moved onto its border.
    pub fn cell_at_clamped(&self, position: &Point2<f64>) -> CellIdx {
        let clamp = |v: f64, n: usize| {
            if v.is_nan() {
                0
            } else {
                v.round().max(0.0).min((n - 1) as f64) as usize
            }
        };

        (
            clamp((position.x - self.origin_m.x) / self.cell_size_m, self.num_cells.0),
            clamp((position.y - self.origin_m.y) / self.cell_size_m, self.num_cells.1),
        )
    }

    /// The cell offset from `cell` by `(di, dj)`, `None` if that leaves the grid.
    pub fn offset(&self, cell: CellIdx, di: isize, dj: isize) -> Option<CellIdx> {
        let i = cell.0 as isize + di;
        let j = cell.1 as isize + dj;

        if i >= 0 && j >= 0 && (i as usize) < self.num_cells.0 && (j as usize) < self.num_cells.1 {
            Some((i as usize, j as usize))
        } else {
            None
        }
    }

    /// The direct neighbours of the cell which lie within the grid, in the order right, up, left,
    /// down.
    pub fn neighbours(&self, cell: CellIdx) -> impl Iterator<Item = CellIdx> + '_ {
        NEIGHBOUR_OFFSETS
            .iter()
            .filter_map(move |(di, dj)| self.offset(cell, *di, *dj))
    }
}

impl DomainGrid {
    pub fn cell_type(&self, cell: CellIdx) -> CellType {
        self.cells[cell]
    }

    /// Number of cells of the given type.
    pub fn count(&self, cell_type: CellType) -> usize {
        self.cells.iter().filter(|c| **c == cell_type).count()
    }

    /// The cell a point query at `position` should read.
    ///
    /// Positions that land on a wall or outside cell are moved to the nearest passable cell in
    /// successively larger rings around it, up to [`QUERY_SEARCH_RADIUS`] cells away. Ties go to
    /// the lower cell key.
    pub fn query_cell(&self, position: &Point2<f64>) -> Result<CellIdx, FloorFieldError> {
        let cell = self
            .grid
            .cell_at(position)
            .ok_or(FloorFieldError::OutsideGrid {
                domain: self.domain,
                position: *position,
            })?;

        if self.cells[cell].is_passable() {
            return Ok(cell);
        }

        for r in 1..=QUERY_SEARCH_RADIUS {
            let nearest = (-r..=r)
                .flat_map(|di| (-r..=r).map(move |dj| (di, dj)))
                .filter(|(di, dj)| di.abs() == r || dj.abs() == r)
                .filter_map(|(di, dj)| self.grid.offset(cell, di, dj))
                .filter(|c| self.cells[*c].is_passable())
                .map(|c| {
                    let dist = (self.grid.cell_position(c) - *position).norm();
                    (OrderedFloat(dist), self.grid.key(c), c)
                })
                .min();

            if let Some((_, _, c)) = nearest {
                return Ok(c);
            }
        }

        Err(FloorFieldError::NoPassableCell {
            domain: self.domain,
            position: *position,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rect_grid() -> Result<(), FloorFieldError> {
        let grid = RectGrid::covering(
            DomainId::SubRoom(0),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 5.0),
            0.5,
        )?;

        assert_eq!(grid.num_cells, (23, 13));
        assert_eq!(grid.origin_m, Point2::new(-0.5, -0.5));

        // Cell (1, 1) is centred on the box corner
        assert_eq!(grid.cell_at(&Point2::new(0.0, 0.0)), Some((1, 1)));
        assert_eq!(grid.cell_position((1, 1)), Point2::new(0.0, 0.0));
        assert_eq!(grid.cell_at(&Point2::new(10.0, 5.0)), Some((21, 11)));
        assert_eq!(grid.cell_at(&Point2::new(0.2, 0.3)), Some((1, 2)));

        // Half a cell of tolerance at the edge, and nothing beyond
        assert_eq!(grid.cell_at(&Point2::new(-0.7, 0.0)), Some((0, 1)));
        assert_eq!(grid.cell_at(&Point2::new(-1.0, 0.0)), None);
        assert_eq!(grid.cell_at(&Point2::new(50.0, 0.0)), None);
        assert_eq!(grid.cell_at_clamped(&Point2::new(50.0, -9.0)), (22, 0));

        assert_eq!(grid.key((2, 1)), 25);
        assert_eq!(grid.neighbours((0, 0)).collect::<Vec<_>>(), vec![(1, 0), (0, 1)]);
        assert_eq!(grid.neighbours((5, 5)).count(), 4);

        Ok(())
    }

    /// A 5x5 grid of unit cells, walls all around a 3x3 floor.
    fn walled_grid() -> DomainGrid {
        let mut cells = Array2::from_elem((5, 5), CellType::Wall);
        for i in 1..4 {
            for j in 1..4 {
                cells[(i, j)] = CellType::Inside;
            }
        }

        DomainGrid {
            domain: DomainId::SubRoom(0),
            grid: RectGrid {
                origin_m: Point2::new(0.0, 0.0),
                cell_size_m: 1.0,
                num_cells: (5, 5),
            },
            cells,
            targets: BTreeMap::new(),
        }
    }

    #[test]
    fn test_query_cell() -> Result<(), FloorFieldError> {
        let mut grid = walled_grid();

        assert_eq!(grid.query_cell(&Point2::new(2.2, 1.9))?, (2, 2));

        // Corners have walls on both direct neighbours
        assert_eq!(grid.query_cell(&Point2::new(0.1, 0.1))?, (1, 1));
        assert_eq!(grid.query_cell(&Point2::new(3.9, 4.1))?, (3, 3));
        assert_eq!(grid.query_cell(&Point2::new(4.2, -0.3))?, (3, 1));

        // Straight walls move to the cell across
        assert_eq!(grid.query_cell(&Point2::new(2.0, 0.2))?, (2, 1));

        assert!(matches!(
            grid.query_cell(&Point2::new(9.0, 2.0)),
            Err(FloorFieldError::OutsideGrid { .. })
        ));

        grid.cells = Array2::from_elem((5, 5), CellType::Wall);
        assert!(matches!(
            grid.query_cell(&Point2::new(2.0, 2.0)),
            Err(FloorFieldError::NoPassableCell { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_bad_cell_size() {
        for h in [0.0, -0.1, f64::NAN] {
            assert!(matches!(
                RectGrid::covering(
                    DomainId::Room(0),
                    Point2::new(0.0, 0.0),
                    Point2::new(1.0, 1.0),
                    h
                ),
                Err(FloorFieldError::NonPositiveCellSize(_))
            ));
        }
    }
}
