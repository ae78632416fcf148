//! # Door discovery sensor

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use building_if::Agent;
use log::debug;

use super::{Sensor, SensorContext, SensorError, SensorEvents};
use crate::cog_map::CognitiveMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Adds every open door of the agent's current subroom to its graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoverDoorsSensor;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DiscoverDoorsSensor {
    pub const EVENTS: SensorEvents = SensorEvents::NO_ROUTE_KNOWN;
}

impl Sensor for DiscoverDoorsSensor {
    fn name(&self) -> &'static str {
        "DiscoverDoors"
    }

    fn execute(
        &self,
        agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        ctx: &SensorContext<'_>,
    ) -> Result<(), SensorError> {
        let added = cog_map
            .graph_mut()
            .add_subroom_doors(ctx.building, agent.subroom())?;

        if added > 0 {
            debug!(
                "Agent {} discovered {} doors in subroom {}",
                agent.id(),
                added,
                agent.subroom()
            );
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
    fn test_idempotent() -> Result<(), SensorError> {
        let building = fixtures::two_exits();
        let full = NavigationGraph::from_building(&building)?;
        let mut cog_map = CognitiveMap::new(1, CognitiveMapMode::Progressive, &full);
        let traffic = DoorTraffic::default();
        let ctx = SensorContext {
            building: &building,
            time_s: 0.0,
            traffic: &traffic,
            hazard: None,
        };

        let agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));
        DiscoverDoorsSensor.execute(&agent, &mut cog_map, &ctx)?;
        let num_edges = cog_map.graph().num_edges();
        assert_eq!(num_edges, 2);

        DiscoverDoorsSensor.execute(&agent, &mut cog_map, &ctx)?;
        assert_eq!(cog_map.graph().num_edges(), num_edges);

        // Moving into the lobby reveals the exit
        let agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 10.0));
        DiscoverDoorsSensor.execute(&agent, &mut cog_map, &ctx)?;
        assert_eq!(cog_map.graph().num_edges(), 4);
        assert!(cog_map
            .get_destination(fixtures::OFFICE, &Point2::new(2.5, 2.5))
            .is_ok());

        Ok(())
    }
}
