//! # Cheapest destination search
//!
//! The weight of an edge depends on where it is entered from, which for every edge but the first
//! is the centre of the door of the edge before it. A vertex therefore has no single cost, and
//! the search runs Dijkstra over edges instead: the frontier holds edges, each costed by the
//! cheapest chain of edges reaching it from the agent.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BinaryHeap;

use building_if::{DoorUid, SubRoomUid};
use log::trace;
use nalgebra::Point2;
use ordered_float::OrderedFloat;
use serde::Serialize;

use super::{EdgeId, GraphError, NavigationGraph};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The result of a destination search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Destination {
    /// First edge to take, out of the agent's current subroom
    pub edge: EdgeId,

    /// The door of the first edge
    pub door: DoorUid,

    /// Summed weight of the edges along the path
    pub cost: f64,

    /// The full chain of edges, from `edge` to the exit
    pub path: Vec<EdgeId>,
}

/// An edge on the search frontier.
#[derive(Debug, Clone, Copy)]
struct FrontierEdge {
    cost: f64,
    edge: EdgeId,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavigationGraph {
    /// Find the cheapest known route out of the building for an agent at `position` in
    /// `subroom`.
    ///
    /// The first exit edge popped from the frontier ends the search. Ties between equally
    /// costed edges go to the lower edge index. Edges which lead straight back to where the
    /// popped edge came from are not expanded.
    pub fn cheapest_destination(
        &self,
        subroom: SubRoomUid,
        position: &Point2<f64>,
    ) -> Result<Destination, GraphError> {
        let start = self.vertex_of(subroom).ok_or(GraphError::NoVertex(subroom))?;

        let num_edges = self.edges.len();
        let mut cost = vec![f64::INFINITY; num_edges];
        let mut predecessor: Vec<Option<EdgeId>> = vec![None; num_edges];
        let mut finalized = vec![false; num_edges];
        let mut frontier = BinaryHeap::new();

        for e in &self.vertices[start.0].out_edges {
            let c = self.edges[e.0].weight(position);
            if c < cost[e.0] {
                cost[e.0] = c;
                frontier.push(FrontierEdge { cost: c, edge: *e });
            }
        }

        while let Some(FrontierEdge { cost: c, edge }) = frontier.pop() {
            if finalized[edge.0] || c > cost[edge.0] {
                continue;
            }
            finalized[edge.0] = true;

            let popped = &self.edges[edge.0];
            let next_vertex = match popped.destination {
                Some(v) => v,
                None => {
                    let destination = self.reconstruct(edge, c, &predecessor);
                    trace!(
                        "Cheapest exit from subroom {} is {} at cost {:.2}, via door {}",
                        subroom,
                        popped.door,
                        c,
                        destination.door
                    );
                    return Ok(destination);
                }
            };

            let entry = popped.door_centre();
            for next in &self.vertices[next_vertex.0].out_edges {
                let next_edge = &self.edges[next.0];
                if finalized[next.0] || next_edge.destination == Some(popped.source) {
                    continue;
                }

                let next_cost = c + next_edge.weight(&entry);
                if next_cost < cost[next.0] {
                    cost[next.0] = next_cost;
                    predecessor[next.0] = Some(edge);
                    frontier.push(FrontierEdge {
                        cost: next_cost,
                        edge: *next,
                    });
                }
            }
        }

        Err(GraphError::NoRouteKnown(subroom))
    }

    /// The single cheapest edge out of `subroom` from `position`, whether or not it leads to an
    /// exit. Ties go to the lower edge index.
    pub fn local_cheapest_destination(
        &self,
        subroom: SubRoomUid,
        position: &Point2<f64>,
    ) -> Result<Destination, GraphError> {
        let start = self.vertex_of(subroom).ok_or(GraphError::NoVertex(subroom))?;

        let (edge, cost) = self.vertices[start.0]
            .out_edges
            .iter()
            .map(|e| (*e, self.edges[e.0].weight(position)))
            .min_by(|a, b| {
                OrderedFloat(a.1)
                    .cmp(&OrderedFloat(b.1))
                    .then_with(|| a.0.cmp(&b.0))
            })
            .ok_or(GraphError::NoOutEdges(subroom))?;

        Ok(Destination {
            edge,
            door: self.edges[edge.0].door,
            cost,
            path: vec![edge],
        })
    }

    /// Walk the predecessors back from the exit edge.
    fn reconstruct(&self, exit: EdgeId, cost: f64, predecessor: &[Option<EdgeId>]) -> Destination {
        let mut path = vec![exit];
        let mut current = exit;
        while let Some(prev) = predecessor[current.0] {
            path.push(prev);
            current = prev;
        }
        path.reverse();

        Destination {
            edge: current,
            door: self.edges[current.0].door,
            cost,
            path,
        }
    }
}

impl PartialEq for FrontierEdge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for FrontierEdge {}

impl Ord for FrontierEdge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Note that we flip the order here so that the heap will be a min-heap, not a max-heap
        OrderedFloat(other.cost)
            .cmp(&OrderedFloat(self.cost))
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

impl PartialOrd for FrontierEdge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
