//! # Floor field router
//!
//! Owns the solved floor fields of every domain in the building. Fields are built once, in
//! parallel over the doors of each domain, and are read-only afterwards. All queries are
//! nearest-cell lookups into the precomputed arrays.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, io, thread, time::Instant};

use building_if::{Building, DoorUid, RoomId, SubRoomUid};
use log::{debug, info};
use nalgebra::{Point2, Vector2};
use ndarray::Array2;

use super::{
    dump,
    eikonal::{self, FloorField},
    Domain, DomainGrid, DomainId, FloorFieldError, FloorFieldParams, Granularity, Rasterizer,
    SpeedMode,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The rasterised grid of one domain and every field solved over it.
#[derive(Debug, Clone)]
pub struct DomainFields {
    pub grid: DomainGrid,

    /// Speed field the door fields were solved with
    pub speed: Array2<f64>,

    /// Distance from each cell to the nearest wall, in meters
    pub wall_distance: Array2<f64>,

    /// Unit direction towards the nearest wall
    pub wall_direction: Array2<Vector2<f64>>,

    /// One field per door of the domain
    pub fields: BTreeMap<DoorUid, FloorField>,
}

/// Answers point queries into the precomputed floor fields of a building.
#[derive(Debug, Clone)]
pub struct FloorFieldRouter {
    params: FloorFieldParams,

    domains: BTreeMap<DomainId, DomainFields>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FloorFieldRouter {
    /// Build the floor fields of every domain in the building, at the granularity given in the
    /// parameters.
    pub fn new(building: &Building, params: FloorFieldParams) -> Result<Self, FloorFieldError> {
        let domains = match params.granularity {
            Granularity::None => return Err(FloorFieldError::NoFloorFields),
            Granularity::Room => building
                .rooms()
                .map(|r| Domain::from_room(building, r.id))
                .collect::<Result<Vec<_>, _>>()?,
            Granularity::SubRoom => building
                .subrooms()
                .map(|s| Domain::from_subroom(building, s.uid))
                .collect::<Result<Vec<_>, _>>()?,
        };

        Self::from_domains(domains, params)
    }

    /// Build the floor fields of the given domains.
    pub fn from_domains(
        domains: Vec<Domain>,
        params: FloorFieldParams,
    ) -> Result<Self, FloorFieldError> {
        let start = Instant::now();
        let rasterizer = Rasterizer::new(params.cell_size_m)?;

        let mut built = BTreeMap::new();
        for domain in &domains {
            let grid = rasterizer.rasterize(domain)?;
            let fields = build_domain(grid, &params)?;
            debug!("{}: {} fields solved", domain.id, fields.fields.len());
            built.insert(domain.id, fields);
        }

        info!(
            "Floor fields for {} domains built in {:.3} s",
            built.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            params,
            domains: built,
        })
    }

    pub fn params(&self) -> &FloorFieldParams {
        &self.params
    }

    /// The domain an agent in the given room and subroom is steered in.
    pub fn domain_for(&self, room: RoomId, subroom: SubRoomUid) -> DomainId {
        match self.params.granularity {
            Granularity::Room => DomainId::Room(room),
            _ => DomainId::SubRoom(subroom),
        }
    }

    pub fn domain(&self, id: DomainId) -> Option<&DomainFields> {
        self.domains.get(&id)
    }

    pub fn domain_ids(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.domains.keys().copied()
    }

    /// Doors with a solved field in the domain, in ascending ID order.
    pub fn known_targets(&self, domain: DomainId) -> Result<Vec<DoorUid>, FloorFieldError> {
        Ok(self.domain_checked(domain)?.fields.keys().copied().collect())
    }

    /// Unit direction to walk in from `position` towards the door.
    pub fn direction_to(
        &self,
        domain: DomainId,
        target: DoorUid,
        position: &Point2<f64>,
    ) -> Result<Vector2<f64>, FloorFieldError> {
        let (fields, field) = self.field_checked(domain, target)?;
        let cell = fields.grid.query_cell(position)?;
        Ok(field.direction[cell])
    }

    /// Travel cost from `position` to the door, infinite if the door can't be reached from there.
    pub fn cost_to(
        &self,
        domain: DomainId,
        target: DoorUid,
        position: &Point2<f64>,
    ) -> Result<f64, FloorFieldError> {
        let (fields, field) = self.field_checked(domain, target)?;
        let cell = fields.grid.query_cell(position)?;
        Ok(field.cost[cell])
    }

    pub fn direction_to_nearest_wall(
        &self,
        domain: DomainId,
        position: &Point2<f64>,
    ) -> Result<Vector2<f64>, FloorFieldError> {
        let fields = self.domain_checked(domain)?;
        let cell = fields.grid.query_cell(position)?;
        Ok(fields.wall_direction[cell])
    }

    pub fn distance_to_nearest_wall(
        &self,
        domain: DomainId,
        position: &Point2<f64>,
    ) -> Result<f64, FloorFieldError> {
        let fields = self.domain_checked(domain)?;
        let cell = fields.grid.query_cell(position)?;
        Ok(fields.wall_distance[cell])
    }

    /// Travel cost from the centre of door `from` to door `to`, both doors being targets of the
    /// domain.
    pub fn distance_between_doors(
        &self,
        domain: DomainId,
        from: DoorUid,
        to: DoorUid,
    ) -> Result<f64, FloorFieldError> {
        let fields = self.domain_checked(domain)?;
        let line = fields
            .grid
            .targets
            .get(&from)
            .ok_or(FloorFieldError::NotFound {
                domain,
                target: from,
            })?;

        self.cost_to(domain, to, &line.centre())
    }

    /// Write the grid of the domain as CSV, one row per cell and requested door.
    ///
    /// Returns the number of rows written.
    pub fn write_dump<W: io::Write>(
        &self,
        domain: DomainId,
        targets: &[DoorUid],
        writer: W,
    ) -> Result<usize, FloorFieldError> {
        dump::write_rows(self.domain_checked(domain)?, targets, writer)
    }

    fn domain_checked(&self, domain: DomainId) -> Result<&DomainFields, FloorFieldError> {
        self.domains
            .get(&domain)
            .ok_or(FloorFieldError::UnknownDomain(domain))
    }

    fn field_checked(
        &self,
        domain: DomainId,
        target: DoorUid,
    ) -> Result<(&DomainFields, &FloorField), FloorFieldError> {
        let fields = self.domain_checked(domain)?;
        let field = fields
            .fields
            .get(&target)
            .ok_or(FloorFieldError::NotFound { domain, target })?;

        Ok((fields, field))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Solve the wall distance, the speed field and every door field of a rasterised domain.
fn build_domain(
    grid: DomainGrid,
    params: &FloorFieldParams,
) -> Result<DomainFields, FloorFieldError> {
    let (wall_distance, wall_direction) = eikonal::wall_distance(&grid);

    let speed = match params.speed_mode {
        SpeedMode::Homogeneous => eikonal::homogeneous_speed(&grid),
        SpeedMode::WallAvoid => {
            eikonal::wall_avoid_speed(&wall_distance, params.wall_avoid_distance_m)
        }
    };

    let fields = solve_fields(&grid, &speed, params)?;

    Ok(DomainFields {
        grid,
        speed,
        wall_distance,
        wall_direction,
        fields,
    })
}

/// Solve the fields of all targets in the grid, spread round-robin over the solver threads.
fn solve_fields(
    grid: &DomainGrid,
    speed: &Array2<f64>,
    params: &FloorFieldParams,
) -> Result<BTreeMap<DoorUid, FloorField>, FloorFieldError> {
    let targets: Vec<DoorUid> = grid.targets.keys().copied().collect();
    let mode = params.target_mode;

    let num_threads = match params.num_solver_threads {
        0 => thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        n => n,
    }
    .min(targets.len())
    .max(1);

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_threads);

        for n in 0..num_threads {
            let batch: Vec<DoorUid> = targets
                .iter()
                .skip(n)
                .step_by(num_threads)
                .copied()
                .collect();

            let handle = thread::Builder::new()
                .name(format!("ff_solver_{}", n))
                .spawn_scoped(scope, move || {
                    batch
                        .into_iter()
                        .map(|t| eikonal::solve_target(grid, speed, t, mode))
                        .collect::<Result<Vec<_>, _>>()
                })
                .map_err(FloorFieldError::SpawnFailed)?;

            handles.push(handle);
        }

        let mut fields = BTreeMap::new();
        for handle in handles {
            let batch = handle
                .join()
                .map_err(|_| FloorFieldError::SolverPanicked(grid.domain))??;

            for field in batch {
                fields.insert(field.target, field);
            }
        }

        Ok(fields)
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
