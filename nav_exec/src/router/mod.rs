//! # Router
//!
//! Chooses the door each agent should head for. Every agent gets its own [`CognitiveMap`] on its
//! first query, and the router fires sensor events into that map as the agent moves:
//!
//! - `INIT` while the agent has never had a destination,
//! - `CHANGED_SUBROOM` whenever the agent is in a different subroom from the last query, which
//!   also triggers a new search,
//! - `NO_ROUTE_KNOWN` when the search finds no way out, before searching again,
//! - `NEW_DESTINATION` once a door has been chosen,
//! - `PERIODIC` from [`Router::periodic`].
//!
//! If no route out is known even after discovery the agent heads for the locally cheapest door.
//! An agent in a subroom with no usable door at all is flagged unroutable and refused from then
//! on, the rest of the simulation carries on.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::RouterParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use building_if::{Agent, AgentId, Building, BuildingError, DoorUid};
use log::{debug, error, warn};
use nalgebra::Point2;

use crate::{
    cog_map::CognitiveMap,
    hazard::HazardField,
    nav_graph::{Destination, GraphError, NavigationGraph},
    sensors::{DoorTraffic, SensorContext, SensorError, SensorEvents, SensorManager},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Router {
    building: Arc<Building>,

    params: RouterParams,

    sensor_manager: SensorManager,

    /// Complete graph of the building, copied into complete mode cognitive maps
    building_graph: NavigationGraph,

    maps: BTreeMap<AgentId, CognitiveMap>,

    hazard: Option<Arc<dyn HazardField>>,

    /// Snapshot of the agents' destinations from the last periodic update
    traffic: DoorTraffic,

    unroutable: BTreeSet<AgentId>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Agent {0} has no route out of the building")]
    Unroutable(AgentId),

    #[error("Graph error: {0}")]
    Graph(GraphError),

    #[error("Sensor error: {0}")]
    Sensor(SensorError),

    #[error("Building error: {0}")]
    Building(BuildingError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Router {
    /// Create a router with the sensors enabled in the parameters.
    pub fn new(building: Arc<Building>, params: RouterParams) -> Result<Self, RouterError> {
        let building_graph = NavigationGraph::from_building(&building)?;
        let sensor_manager = SensorManager::from_params(&params.sensors);

        debug!(
            "Router created with sensors {:?} and {:?} cognitive maps",
            sensor_manager.names(),
            params.cognitive_map_mode
        );

        Ok(Self {
            building,
            params,
            sensor_manager,
            building_graph,
            maps: BTreeMap::new(),
            hazard: None,
            traffic: DoorTraffic::default(),
            unroutable: BTreeSet::new(),
        })
    }

    /// Give the hazard sensor a field to read.
    pub fn with_hazard(mut self, hazard: Arc<dyn HazardField>) -> Self {
        self.hazard = Some(hazard);
        self
    }

    pub fn building(&self) -> &Building {
        &self.building
    }

    pub fn params(&self) -> &RouterParams {
        &self.params
    }

    pub fn building_graph(&self) -> &NavigationGraph {
        &self.building_graph
    }

    pub fn cognitive_map(&self, agent: AgentId) -> Option<&CognitiveMap> {
        self.maps.get(&agent)
    }

    pub fn cognitive_maps(&self) -> impl Iterator<Item = &CognitiveMap> {
        self.maps.values()
    }

    /// Agents which have been flagged unroutable, in ascending ID order.
    pub fn unroutable(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.unroutable.iter().copied()
    }

    pub fn is_unroutable(&self, agent: AgentId) -> bool {
        self.unroutable.contains(&agent)
    }

    /// Forget an agent, for example once it has left the building.
    pub fn remove_agent(&mut self, agent: AgentId) -> Option<CognitiveMap> {
        self.maps.remove(&agent)
    }

    /// Refresh the door traffic snapshot from all agents and run the periodic sensors of every
    /// agent which already has a cognitive map.
    ///
    /// A sensor failing for one agent is logged and leaves that agent's factors as they were, the
    /// other agents are still updated. Returns the number of agents updated.
    pub fn periodic<A: Agent>(&mut self, agents: &[A], time_s: f64) -> usize {
        self.traffic = DoorTraffic::from_agents(agents);

        let mut num_updated = 0;
        for agent in agents {
            let id = agent.id();
            if self.unroutable.contains(&id) {
                continue;
            }

            if let Some(mut cog_map) = self.maps.remove(&id) {
                match self.fire(SensorEvents::PERIODIC, agent, &mut cog_map, time_s) {
                    Ok(_) => num_updated += 1,
                    Err(e) => warn!("Periodic update of agent {} failed: {}", id, e),
                }
                self.maps.insert(id, cog_map);
            }
        }

        num_updated
    }

    /// Choose the door the agent should head for and set it as the agent's destination.
    ///
    /// An agent keeps its destination until it changes subroom. Returns
    /// [`RouterError::Unroutable`] for agents with no usable door, on this and every later call.
    pub fn find_exit(&mut self, agent: &mut dyn Agent, time_s: f64) -> Result<DoorUid, RouterError> {
        let id = agent.id();
        if self.unroutable.contains(&id) {
            return Err(RouterError::Unroutable(id));
        }

        let mode = self.params.cognitive_map_mode;
        let mut cog_map = match self.maps.remove(&id) {
            Some(m) => m,
            None => CognitiveMap::new(id, mode, &self.building_graph)
                .with_history_depth(self.params.sensors.last_destinations_depth),
        };

        let result = self.route(agent, &mut cog_map, time_s);
        self.maps.insert(id, cog_map);

        if let Err(RouterError::Unroutable(_)) = result {
            error!(
                "Agent {} in subroom {} has no usable door and will not be routed again",
                id,
                agent.subroom()
            );
            self.unroutable.insert(id);
        }

        result
    }

    fn route(
        &self,
        agent: &mut dyn Agent,
        cog_map: &mut CognitiveMap,
        time_s: f64,
    ) -> Result<DoorUid, RouterError> {
        let subroom = agent.subroom();
        let position = agent.position();

        if !cog_map.has_destination() {
            self.fire(SensorEvents::INIT, &*agent, cog_map, time_s)?;
        }

        if cog_map.last_subroom() == Some(subroom) {
            let current = cog_map
                .last_destination()
                .and_then(|e| cog_map.graph().edge(e))
                .map(|e| e.door);
            if let Some(door) = current {
                return Ok(door);
            }
        } else {
            self.fire(SensorEvents::CHANGED_SUBROOM, &*agent, cog_map, time_s)?;
        }

        let destination = match cog_map.get_destination(subroom, &position) {
            Ok(d) => d,
            Err(_) => {
                self.fire(SensorEvents::NO_ROUTE_KNOWN, &*agent, cog_map, time_s)?;
                match cog_map.get_destination(subroom, &position) {
                    Ok(d) => d,
                    Err(e) => self.local_destination(agent.id(), cog_map, &position, e)?,
                }
            }
        };

        let edge = cog_map
            .graph()
            .edge(destination.edge)
            .ok_or(GraphError::NoOutEdges(subroom))?;
        let (door, line) = (edge.door, edge.door_line);

        cog_map.add_destination(destination.edge);
        self.fire(SensorEvents::NEW_DESTINATION, &*agent, cog_map, time_s)?;

        agent.set_destination(door, line);
        cog_map.set_last_subroom(subroom);

        debug!(
            "Agent {} in subroom {} heads for door {} at cost {:.2}",
            agent.id(),
            subroom,
            door,
            destination.cost
        );

        Ok(door)
    }

    /// The locally cheapest door, for an agent which knows no way out.
    fn local_destination(
        &self,
        agent: AgentId,
        cog_map: &CognitiveMap,
        position: &Point2<f64>,
        cause: GraphError,
    ) -> Result<Destination, RouterError> {
        let subroom = match cause {
            GraphError::NoVertex(s) | GraphError::NoRouteKnown(s) => s,
            e => return Err(e.into()),
        };

        match cog_map.get_local_destination(subroom, position) {
            Ok(d) => {
                warn!(
                    "Agent {} knows no way out of subroom {}, heading for door {} instead",
                    agent, subroom, d.door
                );
                Ok(d)
            }
            Err(GraphError::NoVertex(_)) | Err(GraphError::NoOutEdges(_)) => {
                Err(RouterError::Unroutable(agent))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fire(
        &self,
        events: SensorEvents,
        agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        time_s: f64,
    ) -> Result<usize, RouterError> {
        let ctx = SensorContext {
            building: &self.building,
            time_s,
            traffic: &self.traffic,
            hazard: self.hazard.as_deref(),
        };

        Ok(self.sensor_manager.execute(events, agent, cog_map, &ctx)?)
    }
}

impl From<GraphError> for RouterError {
    fn from(e: GraphError) -> Self {
        RouterError::Graph(e)
    }
}

impl From<SensorError> for RouterError {
    fn from(e: SensorError) -> Self {
        RouterError::Sensor(e)
    }
}

impl From<BuildingError> for RouterError {
    fn from(e: BuildingError) -> Self {
        RouterError::Building(e)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cog_map::CognitiveMapMode,
        fixtures,
        hazard::{HazardError, HazardQuery},
    };
    use building_if::Pedestrian;

    fn router(building: Building, mode: CognitiveMapMode) -> Router {
        let params = RouterParams {
            cognitive_map_mode: mode,
            ..Default::default()
        };
        Router::new(Arc::new(building), params).unwrap()
    }

    /// Move a pedestrian to a new position, updating its room and subroom.
    fn walk_to(building: &Building, agent: &mut Pedestrian, position: Point2<f64>) {
        let moved = fixtures::pedestrian(building, agent.id, position);
        agent.position_m = moved.position_m;
        agent.room = moved.room;
        agent.subroom = moved.subroom;
    }

    #[test]
    fn test_complete_map() -> Result<(), RouterError> {
        let building = fixtures::two_exits();
        let mut router = router(building.clone(), CognitiveMapMode::Complete);
        let mut agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));

        assert_eq!(router.find_exit(&mut agent, 0.0)?, fixtures::OFFICE_LOBBY);
        assert_eq!(agent.destination, Some(fixtures::OFFICE_LOBBY));
        assert!(agent.exit_line.is_some());

        // Same subroom, same destination, no new search
        agent.position_m = Point2::new(2.5, 3.5);
        assert_eq!(router.find_exit(&mut agent, 0.5)?, fixtures::OFFICE_LOBBY);
        assert_eq!(router.cognitive_map(1).unwrap().history().len(), 1);

        walk_to(&building, &mut agent, Point2::new(2.5, 6.0));
        assert_eq!(router.find_exit(&mut agent, 1.0)?, fixtures::LOBBY_EXIT);

        let cog_map = router.cognitive_map(1).unwrap();
        assert_eq!(
            cog_map.history_doors(),
            vec![fixtures::OFFICE_LOBBY, fixtures::LOBBY_EXIT]
        );
        assert_eq!(cog_map.last_subroom(), Some(fixtures::LOBBY));

        // The agent's own map carries the factors, the building graph doesn't
        assert!(router
            .building_graph()
            .edges()
            .iter()
            .all(|e| e.factors.is_empty()));

        Ok(())
    }

    #[test]
    fn test_progressive_map() -> Result<(), RouterError> {
        let building = fixtures::two_exits();
        let mut router = router(building.clone(), CognitiveMapMode::Progressive);
        let mut agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));

        // Neither office door is known to lead out, the lobby looks most promising locally
        assert_eq!(router.find_exit(&mut agent, 0.0)?, fixtures::OFFICE_LOBBY);
        assert_eq!(router.cognitive_map(1).unwrap().graph().num_edges(), 2);

        walk_to(&building, &mut agent, Point2::new(2.5, 6.0));
        assert_eq!(router.find_exit(&mut agent, 1.0)?, fixtures::LOBBY_EXIT);
        assert_eq!(router.cognitive_map(1).unwrap().graph().num_edges(), 4);

        Ok(())
    }

    #[test]
    fn test_unroutable() -> Result<(), RouterError> {
        let mut building = fixtures::two_exits();
        building.set_door_open(fixtures::OFFICE_CORRIDOR, false)?;
        building.set_door_open(fixtures::OFFICE_LOBBY, false)?;
        let mut router = router(building.clone(), CognitiveMapMode::Complete);

        let mut trapped = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));
        assert!(matches!(
            router.find_exit(&mut trapped, 0.0),
            Err(RouterError::Unroutable(1))
        ));
        assert!(matches!(
            router.find_exit(&mut trapped, 1.0),
            Err(RouterError::Unroutable(1))
        ));
        assert_eq!(router.unroutable().collect::<Vec<_>>(), vec![1]);
        assert!(trapped.destination.is_none());

        // Everyone else is unaffected
        let mut free = fixtures::pedestrian(&building, 2, Point2::new(10.0, 2.5));
        assert_eq!(router.find_exit(&mut free, 0.0)?, fixtures::CORRIDOR_EXIT);
        assert!(!router.is_unroutable(2));

        Ok(())
    }

    #[test]
    fn test_jam_diverts() -> Result<(), RouterError> {
        let building = fixtures::two_exits();
        let mut router = router(building.clone(), CognitiveMapMode::Complete);

        // A stationary crowd in the lobby queueing for the office door
        let mut agents: Vec<Pedestrian> = (1..=5)
            .map(|i| fixtures::pedestrian(&building, i, Point2::new(0.5 * i as f64, 5.5)))
            .collect();
        for p in agents.iter_mut() {
            p.destination = Some(fixtures::OFFICE_LOBBY);
        }
        agents.push(fixtures::pedestrian(&building, 0, Point2::new(2.5, 2.5)));

        assert_eq!(router.periodic(&agents, 0.0), 0);
        assert!(router.cognitive_map(0).is_none());

        let me = agents.len() - 1;
        assert_eq!(router.find_exit(&mut agents[me], 0.0)?, fixtures::OFFICE_CORRIDOR);

        // Once the crowd is gone the next periodic update clears the jam
        for p in agents.iter_mut().take(5) {
            p.destination = None;
        }
        assert_eq!(router.periodic(&agents, 1.0), 1);

        let graph = router.cognitive_map(0).unwrap().graph();
        let jam = graph
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_LOBBY)
            .and_then(|e| graph.edge(e))
            .and_then(|e| e.factors.get("Jam"))
            .unwrap();
        assert_eq!(jam.value, 1.0);
        assert_eq!(jam.updated_s, 1.0);

        Ok(())
    }

    /// A hazard which can't be read above the ground floor.
    struct GroundFloorOnly;

    impl HazardField for GroundFloorOnly {
        fn lookup(&self, query: &HazardQuery) -> Result<f64, HazardError> {
            if query.elevation_m > 1.0 {
                Err(HazardError::BadMesh("no data upstairs".into()))
            } else {
                Ok(0.0)
            }
        }
    }

    #[test]
    fn test_periodic_continues() -> Result<(), RouterError> {
        let building = fixtures::two_exits();
        let mut router = router(building.clone(), CognitiveMapMode::Complete);

        let mut agents = vec![
            fixtures::pedestrian(&building, 1, Point2::new(1.0, 1.0)),
            fixtures::pedestrian(&building, 2, Point2::new(2.5, 2.5)),
        ];
        for agent in agents.iter_mut() {
            router.find_exit(agent, 0.0)?;
        }

        router = router.with_hazard(Arc::new(GroundFloorOnly));
        agents[0].elevation_m = 3.0;

        // The first agent's failure doesn't stop the second from being updated
        assert_eq!(router.periodic(&agents, 1.0), 1);

        let graph = router.cognitive_map(2).unwrap().graph();
        let hazard = graph
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_LOBBY)
            .and_then(|e| graph.edge(e))
            .and_then(|e| e.factors.get("Hazard"))
            .unwrap();
        assert_eq!(hazard.updated_s, 1.0);

        // The failing agent keeps the factor from its first query
        let graph = router.cognitive_map(1).unwrap().graph();
        let hazard = graph
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_LOBBY)
            .and_then(|e| graph.edge(e))
            .and_then(|e| e.factors.get("Hazard"))
            .unwrap();
        assert_eq!(hazard.updated_s, 0.0);

        Ok(())
    }
}
