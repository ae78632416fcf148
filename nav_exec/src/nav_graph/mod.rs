//! # Navigation graph
//!
//! Vertices are subrooms and edges are the doors leading out of them. The graph owns flat arrays
//! of both, and all references between them are [`VertexId`] and [`EdgeId`] indices into those
//! arrays. Vertices and edges are only ever added, so indices stay valid for the life of the
//! graph.
//!
//! Every edge carries a [`FactorBag`] which sensors write into, and the weight of an edge depends
//! on the position it is entered from. See [`NavigationGraph::cheapest_destination`] for the
//! search over such weights.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod edge;
mod search;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use edge::{Factor, FactorBag, GraphEdge};
pub use search::Destination;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, fmt};

use building_if::{Building, BuildingError, DoorUid, SubRoomUid};
use log::trace;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub subroom: SubRoomUid,

    /// Edges through the doors of the subroom, in the order they were added
    pub out_edges: Vec<EdgeId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationGraph {
    vertices: Vec<Vertex>,
    edges: Vec<GraphEdge>,
    vertex_by_subroom: BTreeMap<SubRoomUid, VertexId>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("The graph has no vertex for subroom {0}")]
    NoVertex(SubRoomUid),

    #[error("Door {door} is not on the boundary of subroom {subroom}")]
    DoorNotInSubRoom { door: DoorUid, subroom: SubRoomUid },

    #[error("Door {0} is closed and cannot be used as an edge")]
    DoorClosed(DoorUid),

    #[error("No known route out of the building from subroom {0}")]
    NoRouteKnown(SubRoomUid),

    #[error("Subroom {0} has no known doors")]
    NoOutEdges(SubRoomUid),

    #[error("Building error: {0}")]
    Building(BuildingError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl From<BuildingError> for GraphError {
    fn from(e: BuildingError) -> Self {
        GraphError::Building(e)
    }
}

impl NavigationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the complete graph of the building, with a vertex for every subroom and an edge for
    /// every open door out of each of them.
    pub fn from_building(building: &Building) -> Result<Self, GraphError> {
        let mut graph = Self::new();

        for subroom in building.subrooms() {
            graph.add_vertex(subroom.uid);
        }
        for subroom in building.subrooms() {
            graph.add_subroom_doors(building, subroom.uid)?;
        }

        trace!(
            "Navigation graph built with {} vertices and {} edges",
            graph.vertices.len(),
            graph.edges.len()
        );

        Ok(graph)
    }

    /// Add the vertex of a subroom, or return the existing one.
    pub fn add_vertex(&mut self, subroom: SubRoomUid) -> VertexId {
        if let Some(id) = self.vertex_by_subroom.get(&subroom) {
            return *id;
        }

        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex {
            subroom,
            out_edges: Vec::new(),
        });
        self.vertex_by_subroom.insert(subroom, id);

        id
    }

    /// Add the edge through `door` out of `source`, or return the existing one.
    ///
    /// The vertices at both ends are added if they aren't in the graph yet.
    pub fn add_edge(
        &mut self,
        building: &Building,
        source: SubRoomUid,
        door: DoorUid,
    ) -> Result<EdgeId, GraphError> {
        if let Some(existing) = self.edge_through(source, door) {
            return Ok(existing);
        }

        let door_data = building.door_checked(door)?;
        if !door_data.open {
            return Err(GraphError::DoorClosed(door));
        }

        let other_side = door_data
            .other_side(source)
            .ok_or(GraphError::DoorNotInSubRoom {
                door,
                subroom: source,
            })?;

        // Mean distance to the doors of the subroom that don't lead to the same place
        let centre = door_data.line.centre();
        let distances: Vec<f64> = building
            .doors_of(source)
            .into_iter()
            .filter(|d| d.uid != door && d.open && d.other_side(source) != Some(other_side))
            .map(|d| (d.line.centre() - centre).norm())
            .collect();
        let approximate_distance_m = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };

        let source_id = self.add_vertex(source);
        let destination = other_side.map(|s| self.add_vertex(s));

        let id = EdgeId(self.edges.len());
        self.edges.push(GraphEdge {
            id,
            source: source_id,
            destination,
            door,
            door_line: door_data.line,
            approximate_distance_m,
            factors: FactorBag::default(),
        });
        self.vertices[source_id.0].out_edges.push(id);

        Ok(id)
    }

    /// Add an edge for every open door of the subroom. Returns the number of edges which weren't
    /// already in the graph.
    pub fn add_subroom_doors(
        &mut self,
        building: &Building,
        subroom: SubRoomUid,
    ) -> Result<usize, GraphError> {
        building.subroom_checked(subroom)?;
        self.add_vertex(subroom);

        let before = self.edges.len();
        for door in building.doors_of(subroom) {
            if door.open {
                self.add_edge(building, subroom, door.uid)?;
            }
        }

        Ok(self.edges.len() - before)
    }

    pub fn vertex_of(&self, subroom: SubRoomUid) -> Option<VertexId> {
        self.vertex_by_subroom.get(&subroom).copied()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.edges.get(id.0)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut GraphEdge> {
        self.edges.get_mut(id.0)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [GraphEdge] {
        &mut self.edges
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Edges out of the subroom's vertex, empty if the subroom isn't in the graph.
    pub fn out_edges(&self, subroom: SubRoomUid) -> &[EdgeId] {
        match self.vertex_of(subroom) {
            Some(v) => self.vertices[v.0].out_edges.as_slice(),
            None => &[],
        }
    }

    /// The edge out of `source` through `door`, if known.
    pub fn edge_through(&self, source: SubRoomUid, door: DoorUid) -> Option<EdgeId> {
        self.out_edges(source)
            .iter()
            .copied()
            .find(|e| self.edges[e.0].door == door)
    }

    /// All edges through the door, in either direction.
    pub fn edges_through_door(&self, door: DoorUid) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.door == door)
            .map(|e| e.id)
            .collect()
    }

    /// The subroom an edge leads into, `None` for exits.
    pub fn destination_subroom(&self, edge: EdgeId) -> Option<SubRoomUid> {
        self.edges
            .get(edge.0)
            .and_then(|e| e.destination)
            .map(|v| self.vertices[v.0].subroom)
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
    fn test_from_building() -> Result<(), GraphError> {
        let building = fixtures::two_exits();
        let graph = NavigationGraph::from_building(&building)?;

        assert_eq!(graph.vertices().len(), 3);
        assert_eq!(graph.num_edges(), 6);
        assert_eq!(graph.out_edges(fixtures::OFFICE).len(), 2);
        assert_eq!(graph.edges_through_door(fixtures::OFFICE_CORRIDOR).len(), 2);

        let exit = graph
            .edge_through(fixtures::LOBBY, fixtures::LOBBY_EXIT)
            .and_then(|e| graph.edge(e))
            .unwrap();
        assert!(exit.is_exit());

        let to_corridor = graph
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_CORRIDOR)
            .unwrap();
        assert_eq!(graph.destination_subroom(to_corridor), Some(fixtures::CORRIDOR));

        // The only other door of the office is the one into the lobby
        let approx = graph.edge(to_corridor).unwrap().approximate_distance_m;
        assert!((approx - 2.5 * 2.0f64.sqrt()).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn test_add_edge() -> Result<(), GraphError> {
        let mut building = fixtures::two_exits();
        let mut graph = NavigationGraph::new();

        let e = graph.add_edge(&building, fixtures::OFFICE, fixtures::OFFICE_LOBBY)?;
        assert_eq!(graph.add_edge(&building, fixtures::OFFICE, fixtures::OFFICE_LOBBY)?, e);
        assert_eq!(graph.num_edges(), 1);

        // The destination vertex exists, but nothing leads out of it yet
        assert!(graph.vertex_of(fixtures::LOBBY).is_some());
        assert!(graph.out_edges(fixtures::LOBBY).is_empty());

        assert!(matches!(
            graph.add_edge(&building, fixtures::OFFICE, fixtures::LOBBY_EXIT),
            Err(GraphError::DoorNotInSubRoom { .. })
        ));

        building.set_door_open(fixtures::OFFICE_CORRIDOR, false)?;
        assert!(matches!(
            graph.add_edge(&building, fixtures::OFFICE, fixtures::OFFICE_CORRIDOR),
            Err(GraphError::DoorClosed(fixtures::OFFICE_CORRIDOR))
        ));
        assert_eq!(graph.add_subroom_doors(&building, fixtures::OFFICE)?, 0);

        Ok(())
    }
}
