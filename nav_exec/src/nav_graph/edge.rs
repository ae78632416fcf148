//! # Graph edges and their weighting factors

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use building_if::{DoorUid, Line};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::{EdgeId, VertexId};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A factor contributed by one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub value: f64,

    /// Simulation time of the last write
    pub updated_s: f64,
}

/// Named weighting factors of an edge.
///
/// Each name holds the value most recently written to it. Values are never expired, a sensor
/// which wants its factor gone has to reset or remove it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactorBag {
    factors: BTreeMap<String, Factor>,
}

/// Directed edge through a door, out of the source subroom's vertex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,

    pub source: VertexId,

    /// `None` if the door leads out of the building
    pub destination: Option<VertexId>,

    pub door: DoorUid,

    pub door_line: Line,

    /// Mean distance from this door to the other doors of the source subroom
    pub approximate_distance_m: f64,

    pub factors: FactorBag,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FactorBag {
    /// Set the named factor, replacing any previous value.
    pub fn set(&mut self, name: &str, value: f64, time_s: f64) {
        self.factors.insert(
            name.to_string(),
            Factor {
                value,
                updated_s: time_s,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Factor> {
        self.factors.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Factor> {
        self.factors.remove(name)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Factor)> {
        self.factors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Combined multiplier, the deviations of all factors from 1 summed onto a baseline of 1.
    ///
    /// Clamped at zero so that no edge weight is ever negative.
    pub fn multiplier(&self) -> f64 {
        let deviation: f64 = self.factors.values().map(|f| f.value - 1.0).sum();
        (1.0 + deviation).max(0.0)
    }
}

impl GraphEdge {
    pub fn is_exit(&self) -> bool {
        self.destination.is_none()
    }

    pub fn door_centre(&self) -> Point2<f64> {
        self.door_line.centre()
    }

    /// Weight of the edge when entered from `position`.
    pub fn weight(&self, position: &Point2<f64>) -> f64 {
        (*position - self.door_centre()).norm() * self.factors.multiplier()
    }

    pub fn set_factor(&mut self, name: &str, value: f64, time_s: f64) {
        self.factors.set(name, value, time_s)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_factor_bag() {
        let mut bag = FactorBag::default();
        assert_eq!(bag.multiplier(), 1.0);

        bag.set("Jam", 3.0, 0.0);
        bag.set("Hazard", 1.5, 0.0);
        assert_eq!(bag.multiplier(), 3.5);

        // Last write wins
        bag.set("Jam", 1.0, 2.0);
        assert_eq!(bag.multiplier(), 1.5);
        assert_eq!(bag.get("Jam").map(|f| f.updated_s), Some(2.0));
        assert_eq!(bag.len(), 2);

        bag.remove("Hazard");
        assert_eq!(bag.multiplier(), 1.0);

        // Never negative
        bag.set("RoomToFloor", 0.1, 0.0);
        bag.set("Other", 0.1, 0.0);
        assert_eq!(bag.multiplier(), 0.0);
    }

    #[test]
    fn test_weight() {
        let mut edge = GraphEdge {
            id: EdgeId(0),
            source: VertexId(0),
            destination: None,
            door: 0,
            door_line: Line::from_coords(3.0, -1.0, 3.0, 1.0),
            approximate_distance_m: 0.0,
            factors: FactorBag::default(),
        };

        assert!(edge.is_exit());
        assert_eq!(edge.weight(&Point2::new(0.0, 4.0)), 5.0);

        edge.set_factor("RoomToFloor", 0.3, 0.0);
        assert!((edge.weight(&Point2::new(0.0, 4.0)) - 1.5).abs() < 1e-12);
    }
}
