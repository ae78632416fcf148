//! # Room to floor sensor
//!
//! Makes agents prefer doors leading into circulation areas (corridors, stairs, lobbies and
//! entrances) over doors leading into other kinds of subroom. Doors between subrooms of the same
//! type, and exits, are neutral.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use building_if::{Agent, SubRoomType};

use super::{Sensor, SensorContext, SensorError, SensorEvents};
use crate::{cog_map::CognitiveMap, nav_graph::EdgeId};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct RoomToFloorSensor;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoomToFloorSensor {
    pub const EVENTS: SensorEvents = SensorEvents::INIT
        .union(SensorEvents::PERIODIC)
        .union(SensorEvents::NO_ROUTE_KNOWN)
        .union(SensorEvents::CHANGED_SUBROOM);

    /// Factor of a door leading into a subroom of type `to`.
    pub fn factor(to: SubRoomType) -> f64 {
        match to {
            SubRoomType::Corridor | SubRoomType::Stair | SubRoomType::Floor => 0.3,
            SubRoomType::Lobby => 0.2,
            SubRoomType::Entrance => 0.1,
            SubRoomType::EscalatorUp
            | SubRoomType::EscalatorDown
            | SubRoomType::DA
            | SubRoomType::Unknown => 5.0,
        }
    }
}

impl Sensor for RoomToFloorSensor {
    fn name(&self) -> &'static str {
        "RoomToFloor"
    }

    fn execute(
        &self,
        _agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        ctx: &SensorContext<'_>,
    ) -> Result<(), SensorError> {
        let graph = cog_map.graph();

        let mut factors: Vec<(EdgeId, f64)> = Vec::with_capacity(graph.num_edges());
        for edge in graph.edges() {
            let to = match graph.destination_subroom(edge.id) {
                Some(s) => ctx.building.subroom_checked(s)?.kind,
                None => {
                    factors.push((edge.id, 1.0));
                    continue;
                }
            };

            let from = graph
                .vertex(edge.source)
                .map(|v| ctx.building.subroom_checked(v.subroom))
                .transpose()?
                .map(|s| s.kind);

            let factor = if from == Some(to) {
                1.0
            } else {
                Self::factor(to)
            };
            factors.push((edge.id, factor));
        }

        let graph = cog_map.graph_mut();
        for (id, factor) in factors {
            if let Some(edge) = graph.edge_mut(id) {
                edge.set_factor(self.name(), factor, ctx.time_s);
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
    fn test_factors() -> Result<(), SensorError> {
        let building = fixtures::two_exits();
        let full = NavigationGraph::from_building(&building)?;
        let mut cog_map = CognitiveMap::new(1, CognitiveMapMode::Complete, &full);
        let traffic = DoorTraffic::default();
        let ctx = SensorContext {
            building: &building,
            time_s: 4.0,
            traffic: &traffic,
            hazard: None,
        };

        let agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));
        RoomToFloorSensor.execute(&agent, &mut cog_map, &ctx)?;

        let graph = cog_map.graph();
        let factor = |source, door| {
            graph
                .edge_through(source, door)
                .and_then(|e| graph.edge(e))
                .and_then(|e| e.factors.get("RoomToFloor"))
                .map(|f| f.value)
        };

        assert_eq!(factor(fixtures::OFFICE, fixtures::OFFICE_CORRIDOR), Some(0.3));
        assert_eq!(factor(fixtures::OFFICE, fixtures::OFFICE_LOBBY), Some(0.2));
        assert_eq!(factor(fixtures::CORRIDOR, fixtures::OFFICE_CORRIDOR), Some(0.3));
        assert_eq!(factor(fixtures::LOBBY, fixtures::LOBBY_EXIT), Some(1.0));
        assert_eq!(factor(fixtures::CORRIDOR, fixtures::CORRIDOR_EXIT), Some(1.0));

        // Same type on both sides is neutral
        let building = fixtures::two_subroom_room();
        let full = NavigationGraph::from_building(&building)?;
        let mut cog_map = CognitiveMap::new(1, CognitiveMapMode::Complete, &full);
        let ctx = SensorContext {
            building: &building,
            ..ctx
        };
        RoomToFloorSensor.execute(&agent, &mut cog_map, &ctx)?;
        assert!(cog_map
            .graph()
            .edges()
            .iter()
            .all(|e| e.factors.get("RoomToFloor").map(|f| f.value) == Some(1.0)));

        Ok(())
    }
}
