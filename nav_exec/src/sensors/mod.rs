//! # Sensors
//!
//! Sensors update an agent's cognitive map when routing events fire for that agent. Each sensor
//! is registered with the [`SensorManager`] for a set of [`SensorEvents`], and writes into the
//! agent's own navigation graph, either adding edges or setting the factor named after itself on
//! existing ones.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod discover_doors;
mod hazard;
mod jam;
mod last_destinations;
mod room_to_floor;
mod traffic;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use discover_doors::DiscoverDoorsSensor;
pub use hazard::HazardSensor;
pub use jam::JamSensor;
pub use last_destinations::LastDestinationsSensor;
pub use room_to_floor::RoomToFloorSensor;
pub use traffic::{Approach, DoorTraffic};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt, ops};

use building_if::{Agent, Building, BuildingError};
use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    cog_map::CognitiveMap,
    hazard::{HazardError, HazardField, HazardQuantity},
    nav_graph::GraphError,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Sensor: Send + Sync {
    /// Name of the sensor, which is also the name of the factor it writes.
    fn name(&self) -> &'static str;

    /// Update the agent's cognitive map.
    fn execute(
        &self,
        agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        ctx: &SensorContext<'_>,
    ) -> Result<(), SensorError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Set of routing events.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SensorEvents(u8);

/// Everything a sensor may read besides the agent and its map.
#[derive(Clone, Copy)]
pub struct SensorContext<'a> {
    pub building: &'a Building,

    /// Current simulation time
    pub time_s: f64,

    /// Which agents are heading for which door
    pub traffic: &'a DoorTraffic,

    pub hazard: Option<&'a dyn HazardField>,
}

pub struct SensorManager {
    sensors: Vec<(Box<dyn Sensor>, SensorEvents)>,
}

/// Sensor configuration, the `sensors` table of `router.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorParams {
    pub discover_doors: bool,
    pub room_to_floor: bool,
    pub jam: bool,
    pub last_destinations: bool,
    pub hazard: bool,

    /// Congestion per meter of door width above which the jam factor is set.
    pub jam_threshold: f64,

    /// Weight of an agent which isn't moving, the cap on `1 / speed^2`.
    pub jam_stationary_weight: f64,

    /// Number of past destinations penalised.
    pub last_destinations_depth: usize,

    /// Penalty added to the factor of the most recent destination, older ones get less.
    pub last_destinations_penalty: f64,

    /// Quantity read by the hazard sensor.
    pub hazard_quantity: HazardQuantity,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Graph error: {0}")]
    Graph(GraphError),

    #[error("Hazard error: {0}")]
    Hazard(HazardError),

    #[error("Building error: {0}")]
    Building(BuildingError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SensorEvents {
    pub const NONE: SensorEvents = SensorEvents(0);
    pub const INIT: SensorEvents = SensorEvents(1);
    pub const PERIODIC: SensorEvents = SensorEvents(1 << 1);
    pub const NO_ROUTE_KNOWN: SensorEvents = SensorEvents(1 << 2);
    pub const CHANGED_SUBROOM: SensorEvents = SensorEvents(1 << 3);
    pub const NEW_DESTINATION: SensorEvents = SensorEvents(1 << 4);

    const NAMES: [(SensorEvents, &'static str); 5] = [
        (SensorEvents::INIT, "INIT"),
        (SensorEvents::PERIODIC, "PERIODIC"),
        (SensorEvents::NO_ROUTE_KNOWN, "NO_ROUTE_KNOWN"),
        (SensorEvents::CHANGED_SUBROOM, "CHANGED_SUBROOM"),
        (SensorEvents::NEW_DESTINATION, "NEW_DESTINATION"),
    ];

    /// All events in either set.
    pub const fn union(self, other: SensorEvents) -> SensorEvents {
        SensorEvents(self.0 | other.0)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if every event in `other` is in `self`.
    pub fn contains(&self, other: SensorEvents) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if `self` and `other` share any event.
    pub fn intersects(&self, other: SensorEvents) -> bool {
        self.0 & other.0 != 0
    }
}

impl ops::BitOr for SensorEvents {
    type Output = SensorEvents;

    fn bitor(self, rhs: Self) -> Self::Output {
        SensorEvents(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for SensorEvents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SensorEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }

        let mut first = true;
        for (event, name) in Self::NAMES.iter() {
            if self.contains(*event) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SensorEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensorEvents({})", self)
    }
}

impl SensorManager {
    /// Create a manager with no sensors.
    pub fn new() -> Self {
        Self {
            sensors: Vec::new(),
        }
    }

    /// Create a manager with every sensor enabled in the parameters, each registered for its
    /// usual events.
    pub fn from_params(params: &SensorParams) -> Self {
        let mut manager = Self::new();

        if params.discover_doors {
            manager.add_sensor(
                Box::new(DiscoverDoorsSensor),
                DiscoverDoorsSensor::EVENTS,
            );
        }
        if params.room_to_floor {
            manager.add_sensor(Box::new(RoomToFloorSensor), RoomToFloorSensor::EVENTS);
        }
        if params.jam {
            manager.add_sensor(
                Box::new(JamSensor::new(
                    params.jam_threshold,
                    params.jam_stationary_weight,
                )),
                JamSensor::EVENTS,
            );
        }
        if params.hazard {
            manager.add_sensor(
                Box::new(HazardSensor::new(params.hazard_quantity)),
                HazardSensor::EVENTS,
            );
        }
        if params.last_destinations {
            manager.add_sensor(
                Box::new(LastDestinationsSensor::new(
                    params.last_destinations_depth,
                    params.last_destinations_penalty,
                )),
                LastDestinationsSensor::EVENTS,
            );
        }

        manager
    }

    /// Register a sensor for a set of events. Sensors run in the order they were added.
    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>, events: SensorEvents) {
        trace!("Registered {} sensor for {}", sensor.name(), events);
        self.sensors.push((sensor, events));
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Names of the registered sensors.
    pub fn names(&self) -> Vec<&'static str> {
        self.sensors.iter().map(|(s, _)| s.name()).collect()
    }

    /// Run every sensor registered for any of the events. Returns the number of sensors run.
    pub fn execute(
        &self,
        events: SensorEvents,
        agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        ctx: &SensorContext<'_>,
    ) -> Result<usize, SensorError> {
        let mut num_run = 0;

        for (sensor, registered) in &self.sensors {
            if registered.intersects(events) {
                trace!(
                    "Running {} sensor for agent {} on {}",
                    sensor.name(),
                    agent.id(),
                    events
                );
                sensor.execute(agent, cog_map, ctx)?;
                num_run += 1;
            }
        }

        Ok(num_run)
    }
}

impl Default for SensorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            discover_doors: true,
            room_to_floor: true,
            jam: true,
            last_destinations: true,
            hazard: true,
            jam_threshold: 10.0,
            jam_stationary_weight: 100.0,
            last_destinations_depth: 3,
            last_destinations_penalty: 1.0,
            hazard_quantity: HazardQuantity::SmokeDensity,
        }
    }
}

impl From<GraphError> for SensorError {
    fn from(e: GraphError) -> Self {
        SensorError::Graph(e)
    }
}

impl From<HazardError> for SensorError {
    fn from(e: HazardError) -> Self {
        SensorError::Hazard(e)
    }
}

impl From<BuildingError> for SensorError {
    fn from(e: BuildingError) -> Self {
        SensorError::Building(e)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
