//! # Jam sensor
//!
//! Estimates congestion at every door the agent knows of from the agents heading for it. Slow
//! agents weigh `1 / speed^2`, capped at the stationary weight, and the sum is normalised by the
//! door width. Only agents in a subroom on either side of the door count.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use building_if::Agent;
use log::trace;

use super::{Sensor, SensorContext, SensorError, SensorEvents};
use crate::{cog_map::CognitiveMap, nav_graph::EdgeId};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct JamSensor {
    /// Congestion per meter of door width above which the factor is set
    threshold: f64,

    /// Weight of an agent which isn't moving
    stationary_weight: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JamSensor {
    pub const EVENTS: SensorEvents = SensorEvents::PERIODIC
        .union(SensorEvents::NO_ROUTE_KNOWN)
        .union(SensorEvents::CHANGED_SUBROOM);

    pub fn new(threshold: f64, stationary_weight: f64) -> Self {
        Self {
            threshold,
            stationary_weight,
        }
    }

    /// Weight of one agent moving at `speed_m_s`.
    fn agent_weight(&self, speed_m_s: f64) -> f64 {
        let weight = 1.0 / (speed_m_s * speed_m_s);
        if weight.is_nan() {
            self.stationary_weight
        } else {
            weight.min(self.stationary_weight)
        }
    }
}

impl Sensor for JamSensor {
    fn name(&self) -> &'static str {
        "Jam"
    }

    fn execute(
        &self,
        agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        ctx: &SensorContext<'_>,
    ) -> Result<(), SensorError> {
        let graph = cog_map.graph();

        let mut factors: Vec<(EdgeId, f64)> = Vec::with_capacity(graph.num_edges());
        for edge in graph.edges() {
            let width = ctx.building.door_checked(edge.door)?.width();
            if !(width > 0.0) {
                continue;
            }

            let source = graph.vertex(edge.source).map(|v| v.subroom);
            let destination = graph.destination_subroom(edge.id);

            let congestion: f64 = ctx
                .traffic
                .approaching(edge.door)
                .iter()
                .filter(|a| Some(a.subroom) == source || Some(a.subroom) == destination)
                .map(|a| self.agent_weight(a.speed_m_s))
                .sum::<f64>()
                / width;

            if congestion > self.threshold {
                trace!(
                    "Agent {} sees congestion {:.1} at door {}",
                    agent.id(),
                    congestion,
                    edge.door
                );
                factors.push((edge.id, congestion));
            } else {
                factors.push((edge.id, 1.0));
            }
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
