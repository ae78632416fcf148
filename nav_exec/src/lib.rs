//! # Navigation library.
//!
//! This library provides the routing subsystem of the evacuation software. It answers, for every
//! agent at every control interval, which door the agent should head for and in which direction
//! it should step to get there.
//!
//! Two complementary layers are provided:
//! - [`floor_field`] - continuous steering within a room or subroom, from Eikonal floor fields
//!   solved once per door over a rasterised grid.
//! - [`router`] - the discrete choice of door, from a per-agent [`cog_map::CognitiveMap`] whose
//!   edge weights are adjusted at runtime by [`sensors`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Floor fields - grid rasterisation, the Eikonal solver and point queries into solved fields
pub mod floor_field;

/// Navigation graph - subrooms as vertices, doors as edges carrying sensor factors
pub mod nav_graph;

/// Sensors - event driven updates of an agent's navigation graph
pub mod sensors;

/// Hazard field - preloaded smoke and toxicity meshes queried by the hazard sensor
pub mod hazard;

/// Cognitive map - an agent's knowledge of the building
pub mod cog_map;

/// Router - per-agent destination selection
pub mod router;

#[cfg(test)]
pub(crate) mod fixtures;
