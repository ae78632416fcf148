//! # Cognitive map
//!
//! An agent's knowledge of the building: its own navigation graph, either a copy of the complete
//! graph or one grown as the agent discovers doors, and the destinations it has chosen so far.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use building_if::{AgentId, DoorUid, SubRoomUid};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::nav_graph::{Destination, EdgeId, GraphError, NavigationGraph};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// History depth of a map built without [`CognitiveMap::with_history_depth`].
pub const DEFAULT_HISTORY_DEPTH: usize = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CognitiveMap {
    agent: AgentId,

    mode: CognitiveMapMode,

    graph: NavigationGraph,

    /// Most recent destination edges, oldest first
    history: VecDeque<EdgeId>,

    /// Number of destinations kept in the history
    history_depth: usize,

    /// Subroom the agent was in when it last chose a destination
    last_subroom: Option<SubRoomUid>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CognitiveMapMode {
    /// The agent knows the whole building from the start
    Complete,

    /// The agent starts knowing nothing and discovers doors as it goes
    Progressive,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CognitiveMap {
    /// Create a new map. In complete mode the agent gets its own copy of `building_graph`.
    pub fn new(agent: AgentId, mode: CognitiveMapMode, building_graph: &NavigationGraph) -> Self {
        let graph = match mode {
            CognitiveMapMode::Complete => building_graph.clone(),
            CognitiveMapMode::Progressive => NavigationGraph::new(),
        };

        Self {
            agent,
            mode,
            graph,
            history: VecDeque::new(),
            history_depth: DEFAULT_HISTORY_DEPTH,
            last_subroom: None,
        }
    }

    /// Keep only the `depth` most recent destinations. The latest one is always kept.
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth.max(1);
        self.trim_history();
        self
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn mode(&self) -> CognitiveMapMode {
        self.mode
    }

    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut NavigationGraph {
        &mut self.graph
    }

    /// Cheapest known route out of the building.
    pub fn get_destination(
        &self,
        subroom: SubRoomUid,
        position: &Point2<f64>,
    ) -> Result<Destination, GraphError> {
        self.graph.cheapest_destination(subroom, position)
    }

    /// Cheapest door out of the current subroom, whether or not it leads anywhere known.
    pub fn get_local_destination(
        &self,
        subroom: SubRoomUid,
        position: &Point2<f64>,
    ) -> Result<Destination, GraphError> {
        self.graph.local_cheapest_destination(subroom, position)
    }

    /// Record a chosen destination, forgetting the oldest one once the history is full.
    pub fn add_destination(&mut self, edge: EdgeId) {
        self.history.push_back(edge);
        self.trim_history();
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = EdgeId> + '_ {
        self.history.iter().copied()
    }

    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    /// Doors of the chosen destinations, oldest first.
    pub fn history_doors(&self) -> Vec<DoorUid> {
        self.history
            .iter()
            .filter_map(|e| self.graph.edge(*e))
            .map(|e| e.door)
            .collect()
    }

    pub fn last_destination(&self) -> Option<EdgeId> {
        self.history.back().copied()
    }

    pub fn has_destination(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn last_subroom(&self) -> Option<SubRoomUid> {
        self.last_subroom
    }

    pub fn set_last_subroom(&mut self, subroom: SubRoomUid) {
        self.last_subroom = Some(subroom);
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.history_depth {
            self.history.pop_front();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
