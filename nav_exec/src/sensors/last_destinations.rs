//! # Last destinations sensor
//!
//! Penalises the doors an agent has recently headed for, so that it doesn't oscillate between
//! two of them. The most recent destination gets the full penalty and each older one a smaller
//! share of it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use building_if::{Agent, DoorUid};

use super::{Sensor, SensorContext, SensorError, SensorEvents};
use crate::cog_map::CognitiveMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct LastDestinationsSensor {
    /// Number of destinations penalised
    depth: usize,

    /// Penalty of the most recent destination
    penalty: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LastDestinationsSensor {
    pub const EVENTS: SensorEvents = SensorEvents::NEW_DESTINATION;

    pub fn new(depth: usize, penalty: f64) -> Self {
        Self { depth, penalty }
    }

    /// Factor of the destination `age` steps back in the history, 0 being the latest.
    pub fn factor(&self, age: usize) -> f64 {
        if age >= self.depth {
            return 1.0;
        }
        1.0 + self.penalty * (self.depth - age) as f64 / self.depth as f64
    }

    /// Factor of every door in the history. Doors older than the depth go back to neutral.
    fn door_factors(&self, history: &[DoorUid]) -> BTreeMap<DoorUid, f64> {
        let mut factors = BTreeMap::new();

        // Oldest first so that the most recent visit to a door decides its factor
        let num = history.len();
        for (i, door) in history.iter().enumerate() {
            factors.insert(*door, self.factor(num - 1 - i));
        }

        factors
    }
}

impl Sensor for LastDestinationsSensor {
    fn name(&self) -> &'static str {
        "LastDestinations"
    }

    fn execute(
        &self,
        _agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        ctx: &SensorContext<'_>,
    ) -> Result<(), SensorError> {
        let factors = self.door_factors(&cog_map.history_doors());

        let graph = cog_map.graph_mut();

        // Doors dropped from the history lose their penalty
        for edge in graph.edges_mut().iter_mut() {
            if !factors.contains_key(&edge.door) && edge.factors.get(self.name()).is_some() {
                edge.set_factor(self.name(), 1.0, ctx.time_s);
            }
        }

        for (door, factor) in factors {
            for id in graph.edges_through_door(door) {
                if let Some(edge) = graph.edge_mut(id) {
                    edge.set_factor(self.name(), factor, ctx.time_s);
                }
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cog_map::CognitiveMapMode, fixtures, nav_graph::NavigationGraph, sensors::DoorTraffic,
    };
    use nalgebra::Point2;

    #[test]
    fn test_factor() {
        let sensor = LastDestinationsSensor::new(3, 1.5);
        assert_eq!(sensor.factor(0), 2.5);
        assert_eq!(sensor.factor(1), 2.0);
        assert_eq!(sensor.factor(2), 1.5);
        assert_eq!(sensor.factor(3), 1.0);

        let sensor = LastDestinationsSensor::new(0, 1.0);
        assert_eq!(sensor.factor(0), 1.0);
    }

    #[test]
    fn test_history() -> Result<(), SensorError> {
        let building = fixtures::two_exits();
        let full = NavigationGraph::from_building(&building)?;
        let mut cog_map = CognitiveMap::new(1, CognitiveMapMode::Complete, &full);
        let traffic = DoorTraffic::default();
        let ctx = SensorContext {
            building: &building,
            time_s: 0.0,
            traffic: &traffic,
            hazard: None,
        };
        let agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));
        let sensor = LastDestinationsSensor::new(2, 1.0);

        let factor = |cog_map: &CognitiveMap, source, door| {
            let graph = cog_map.graph();
            graph
                .edge_through(source, door)
                .and_then(|e| graph.edge(e))
                .and_then(|e| e.factors.get("LastDestinations"))
                .map(|f| f.value)
        };

        let into_corridor = full
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_CORRIDOR)
            .unwrap();
        cog_map.add_destination(into_corridor);
        sensor.execute(&agent, &mut cog_map, &ctx)?;

        // Both directions through the door are penalised
        assert_eq!(factor(&cog_map, fixtures::OFFICE, fixtures::OFFICE_CORRIDOR), Some(2.0));
        assert_eq!(factor(&cog_map, fixtures::CORRIDOR, fixtures::OFFICE_CORRIDOR), Some(2.0));
        assert_eq!(factor(&cog_map, fixtures::OFFICE, fixtures::OFFICE_LOBBY), None);

        let back = full
            .edge_through(fixtures::CORRIDOR, fixtures::OFFICE_CORRIDOR)
            .unwrap();
        let into_lobby = full
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_LOBBY)
            .unwrap();
        cog_map.add_destination(back);
        cog_map.add_destination(into_lobby);
        sensor.execute(&agent, &mut cog_map, &ctx)?;

        // Door 10 appears twice in the history, the newer entry decides
        assert_eq!(factor(&cog_map, fixtures::OFFICE, fixtures::OFFICE_CORRIDOR), Some(1.5));
        assert_eq!(factor(&cog_map, fixtures::OFFICE, fixtures::OFFICE_LOBBY), Some(2.0));

        // Falls out of the window
        let exit = full
            .edge_through(fixtures::LOBBY, fixtures::LOBBY_EXIT)
            .unwrap();
        cog_map.add_destination(exit);
        sensor.execute(&agent, &mut cog_map, &ctx)?;
        assert_eq!(factor(&cog_map, fixtures::OFFICE, fixtures::OFFICE_CORRIDOR), Some(1.0));
        assert_eq!(factor(&cog_map, fixtures::OFFICE, fixtures::OFFICE_LOBBY), Some(1.5));
        assert_eq!(factor(&cog_map, fixtures::LOBBY, fixtures::LOBBY_EXIT), Some(2.0));

        Ok(())
    }

    #[test]
    fn test_bounded_history() -> Result<(), SensorError> {
        let building = fixtures::two_exits();
        let full = NavigationGraph::from_building(&building)?;
        let mut cog_map =
            CognitiveMap::new(1, CognitiveMapMode::Complete, &full).with_history_depth(1);
        let traffic = DoorTraffic::default();
        let ctx = SensorContext {
            building: &building,
            time_s: 0.0,
            traffic: &traffic,
            hazard: None,
        };
        let agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));
        let sensor = LastDestinationsSensor::new(1, 1.0);

        let into_corridor = full
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_CORRIDOR)
            .unwrap();
        let into_lobby = full
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_LOBBY)
            .unwrap();

        cog_map.add_destination(into_corridor);
        sensor.execute(&agent, &mut cog_map, &ctx)?;
        cog_map.add_destination(into_lobby);
        sensor.execute(&agent, &mut cog_map, &ctx)?;

        // The corridor door is no longer in the history but its penalty is lifted
        assert_eq!(cog_map.history_doors(), vec![fixtures::OFFICE_LOBBY]);
        let graph = cog_map.graph();
        let value = |id| {
            graph
                .edge(id)
                .and_then(|e| e.factors.get("LastDestinations"))
                .map(|f| f.value)
        };
        assert_eq!(value(into_corridor), Some(1.0));
        assert_eq!(value(into_lobby), Some(2.0));

        Ok(())
    }
}
