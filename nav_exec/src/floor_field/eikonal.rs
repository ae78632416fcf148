//! # Eikonal solver
//!
//! Solves `|grad T| * F = 1` on a [`DomainGrid`] with the fast marching method. Seeds start at
//! zero cost, and the front grows outwards in order of increasing cost over the passable cells
//! only, using the first order upwind update on the 4-neighbourhood of each cell.
//!
//! The same solver provides both the cost field towards a door and the distance to the nearest
//! wall, the latter being solved with unit speed from every wall cell.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BinaryHeap;

use building_if::{DoorUid, Line};
use log::{trace, warn};
use nalgebra::Vector2;
use ndarray::Array2;
use ordered_float::OrderedFloat;
use util::maths::lin_map;

use super::{
    raster::line_cells, CellIdx, CellType, DomainGrid, FloorFieldError, TargetMode,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Minimum distance either side of a door at which to probe for the inside of the domain.
const PASS_PROBE_MIN_M: f64 = 0.25;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The cost and direction fields towards one door.
#[derive(Debug, Clone)]
pub struct FloorField {
    pub target: DoorUid,

    /// Travel cost from each cell to the door, infinite where the door can't be reached
    pub cost: Array2<f64>,

    /// Unit direction of steepest descent of the cost, zero where there is none
    pub direction: Array2<Vector2<f64>>,
}

/// Fast marching solver over a grid with a fixed speed field.
pub struct EikonalSolver<'a> {
    grid: &'a DomainGrid,
    speed: &'a Array2<f64>,
}

/// A trial cell on the narrow band.
#[derive(Debug, Clone, Copy)]
struct TrialCell {
    cost: f64,
    key: usize,
    cell: CellIdx,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Far,
    Trial,
    Known,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<'a> EikonalSolver<'a> {
    /// Create a new solver. The speed field must have the same shape as the grid.
    pub fn new(grid: &'a DomainGrid, speed: &'a Array2<f64>) -> Self {
        Self { grid, speed }
    }

    /// Solve the cost field from the given seeds.
    ///
    /// Cells which cannot be reached from any seed, and all non-passable cells other than the
    /// seeds, are left at infinity.
    pub fn solve(&self, seeds: &[CellIdx]) -> Array2<f64> {
        let shape = self.grid.grid.num_cells;
        let mut cost = Array2::from_elem(shape, f64::INFINITY);
        let mut state = Array2::from_elem(shape, CellState::Far);
        let mut heap = BinaryHeap::new();

        for seed in seeds {
            cost[*seed] = 0.0;
            state[*seed] = CellState::Known;
        }

        for seed in seeds {
            self.update_neighbours(*seed, &mut cost, &mut state, &mut heap);
        }

        while let Some(trial) = heap.pop() {
            // Stale entries are left on the heap when a cell's estimate improves
            if state[trial.cell] == CellState::Known || trial.cost > cost[trial.cell] {
                continue;
            }

            state[trial.cell] = CellState::Known;
            self.update_neighbours(trial.cell, &mut cost, &mut state, &mut heap);
        }

        cost
    }

    /// Compute the direction field of a solved cost field.
    ///
    /// On each axis the gradient is taken one-sided towards the lower of the two neighbours, and
    /// only if that neighbour is lower than the cell itself. The direction is the normalised
    /// negative gradient, or zero if the gradient vanishes.
    pub fn direction_field(&self, cost: &Array2<f64>) -> Array2<Vector2<f64>> {
        let h = self.grid.grid.cell_size_m;
        let mut direction = Array2::from_elem(cost.dim(), Vector2::zeros());

        for (cell, c) in cost.indexed_iter() {
            if !self.grid.cells[cell].is_passable() || !c.is_finite() {
                continue;
            }

            let value = |di, dj| {
                self.grid
                    .grid
                    .offset(cell, di, dj)
                    .map(|n| cost[n])
                    .unwrap_or(f64::INFINITY)
            };

            let gradient = Vector2::new(
                one_sided_difference(*c, value(-1, 0), value(1, 0), h),
                one_sided_difference(*c, value(0, -1), value(0, 1), h),
            );

            let norm = gradient.norm();
            if norm > 0.0 {
                direction[cell] = -gradient / norm;
            }
        }

        direction
    }

    fn update_neighbours(
        &self,
        cell: CellIdx,
        cost: &mut Array2<f64>,
        state: &mut Array2<CellState>,
        heap: &mut BinaryHeap<TrialCell>,
    ) {
        let h = self.grid.grid.cell_size_m;

        for n in self.grid.grid.neighbours(cell) {
            if state[n] == CellState::Known || !self.grid.cells[n].is_passable() {
                continue;
            }

            let speed = self.speed[n];
            if !(speed > 0.0) {
                continue;
            }

            let estimate = self.estimate(n, cost, state, h / speed);
            if estimate < cost[n] {
                cost[n] = estimate;
                state[n] = CellState::Trial;
                heap.push(TrialCell {
                    cost: estimate,
                    key: self.grid.grid.key(n),
                    cell: n,
                });
            }
        }
    }

    /// First order upwind estimate for the cell from its known neighbours, `s` being the cell
    /// size divided by the speed.
    fn estimate(
        &self,
        cell: CellIdx,
        cost: &Array2<f64>,
        state: &Array2<CellState>,
        s: f64,
    ) -> f64 {
        let known_min = |offsets: [(isize, isize); 2]| {
            offsets
                .iter()
                .filter_map(|(di, dj)| self.grid.grid.offset(cell, *di, *dj))
                .filter(|n| state[*n] == CellState::Known)
                .map(|n| cost[n])
                .fold(f64::INFINITY, f64::min)
        };

        let x = known_min([(-1, 0), (1, 0)]);
        let y = known_min([(0, -1), (0, 1)]);
        let (a, b) = if x <= y { (x, y) } else { (y, x) };

        if b.is_finite() && b - a < s {
            (a + b + (2.0 * s * s - (b - a).powi(2)).sqrt()) / 2.0
        } else {
            a + s
        }
    }
}

impl PartialEq for TrialCell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for TrialCell {}

impl Ord for TrialCell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Note that we flip the order here so that the heap will be a min-heap, with ties broken
        // towards the lower cell key
        OrderedFloat(other.cost)
            .cmp(&OrderedFloat(self.cost))
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for TrialCell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Unit speed over the whole grid.
pub fn homogeneous_speed(grid: &DomainGrid) -> Array2<f64> {
    Array2::ones(grid.grid.num_cells)
}

/// Speed which drops linearly from 1 to 0 as a cell gets closer than `avoid_distance_m` to the
/// nearest wall.
pub fn wall_avoid_speed(wall_distance: &Array2<f64>, avoid_distance_m: f64) -> Array2<f64> {
    wall_distance.mapv(|d| {
        if d.is_finite() && d < avoid_distance_m {
            lin_map((0.0, avoid_distance_m), (0.0, 1.0), d)
        } else {
            1.0
        }
    })
}

/// Distance from every cell to the nearest wall, and the direction towards it.
pub fn wall_distance(grid: &DomainGrid) -> (Array2<f64>, Array2<Vector2<f64>>) {
    let speed = homogeneous_speed(grid);
    let solver = EikonalSolver::new(grid, &speed);

    let seeds: Vec<CellIdx> = grid
        .cells
        .indexed_iter()
        .filter(|(_, t)| **t == CellType::Wall)
        .map(|(c, _)| c)
        .collect();

    let distance = solver.solve(&seeds);
    let direction = solver.direction_field(&distance);

    (distance, direction)
}

/// Trim the ends off a door so that fields don't lead agents into the door frame.
pub fn shorten_target(line: &Line) -> Line {
    let length = line.length();

    if length > 0.6 {
        line.shortened(0.2)
    } else if length > 0.2 {
        line.shortened(0.05)
    } else {
        *line
    }
}

/// Solve the floor field towards one of the grid's targets.
pub fn solve_target(
    grid: &DomainGrid,
    speed: &Array2<f64>,
    target: DoorUid,
    mode: TargetMode,
) -> Result<FloorField, FloorFieldError> {
    let line = grid
        .targets
        .get(&target)
        .ok_or(FloorFieldError::NotFound {
            domain: grid.domain,
            target,
        })?;
    let short = shorten_target(line);

    let passable_cells = |l: &Line| -> Vec<CellIdx> {
        line_cells(&grid.grid, l)
            .into_iter()
            .filter(|c| grid.cells[*c].is_passable())
            .collect()
    };

    let mut line_seeds = passable_cells(&short);
    if line_seeds.is_empty() {
        line_seeds = passable_cells(line);
    }
    if line_seeds.is_empty() {
        return Err(FloorFieldError::TargetNotRasterised {
            domain: grid.domain,
            target,
        });
    }

    let seeds = match mode {
        TargetMode::LineSegment => line_seeds.clone(),
        TargetMode::CentrePoint => match grid.grid.cell_at(&line.centre()) {
            Some(c) if grid.cells[c].is_passable() => vec![c],
            _ => line_seeds.clone(),
        },
    };

    let solver = EikonalSolver::new(grid, speed);
    let mut cost = solver.solve(&seeds);

    if mode == TargetMode::CentrePoint {
        for c in &line_seeds {
            cost[*c] = 0.0;
        }
    }

    let mut direction = solver.direction_field(&cost);

    // Agents standing in the door are pushed through it
    match pass_vector(grid, line) {
        Some(pass) => {
            for c in passable_cells(line).iter().chain(line_seeds.iter()) {
                direction[*c] = pass;
            }
        }
        None => warn!(
            "Could not find the inside of {} at door {}, door cells keep their gradient",
            grid.domain, target
        ),
    }

    trace!("Solved field for door {} over {}", target, grid.domain);

    Ok(FloorField {
        target,
        cost,
        direction,
    })
}

/// Direction which crosses the door from the inside of the domain, `None` if neither side of the
/// door is inside.
fn pass_vector(grid: &DomainGrid, line: &Line) -> Option<Vector2<f64>> {
    let normal = line.normal();
    let probe = PASS_PROBE_MIN_M.max(1.5 * grid.grid.cell_size_m);
    let centre = line.centre();

    let is_inside = |p| {
        grid.grid
            .cell_at(&p)
            .map(|c| grid.cells[c] == CellType::Inside)
            .unwrap_or(false)
    };

    if is_inside(centre - normal * probe) {
        Some(normal)
    } else if is_inside(centre + normal * probe) {
        Some(-normal)
    } else {
        None
    }
}

fn one_sided_difference(centre: f64, lower: f64, upper: f64, h: f64) -> f64 {
    if lower <= upper && lower < centre {
        (centre - lower) / h
    } else if upper < centre {
        (upper - centre) / h
    } else {
        0.0
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
