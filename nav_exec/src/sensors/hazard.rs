//! # Hazard sensor
//!
//! Reads the hazard field at the doors out of the agent's subroom and makes them less attractive
//! the worse the hazard, scaled by how little risk the agent is willing to take.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use building_if::Agent;
use log::{debug, trace};
use util::maths::{clamp, finite_or};

use super::{Sensor, SensorContext, SensorError, SensorEvents};
use crate::{
    cog_map::CognitiveMap,
    hazard::{sanitize, HazardError, HazardQuantity, HazardQuery},
    nav_graph::EdgeId,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct HazardSensor {
    quantity: HazardQuantity,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HazardSensor {
    pub const EVENTS: SensorEvents = SensorEvents::INIT
        .union(SensorEvents::PERIODIC)
        .union(SensorEvents::NO_ROUTE_KNOWN)
        .union(SensorEvents::CHANGED_SUBROOM);

    pub fn new(quantity: HazardQuantity) -> Self {
        Self { quantity }
    }

    /// Factor for an intensity seen by an agent with the given risk tolerance.
    pub fn factor(intensity: f64, risk_tolerance: f64) -> f64 {
        let tolerance = clamp(&finite_or(risk_tolerance, 0.0), &0.0, &1.0);
        1.0 + (1.0 - tolerance) * sanitize(intensity)
    }
}

impl Sensor for HazardSensor {
    fn name(&self) -> &'static str {
        "Hazard"
    }

    fn execute(
        &self,
        agent: &dyn Agent,
        cog_map: &mut CognitiveMap,
        ctx: &SensorContext<'_>,
    ) -> Result<(), SensorError> {
        let graph = cog_map.graph();

        let mut factors: Vec<(EdgeId, f64)> = Vec::new();
        for id in graph.out_edges(agent.subroom()) {
            let edge = match graph.edge(*id) {
                Some(e) => e,
                None => continue,
            };

            let intensity = match ctx.hazard {
                Some(field) => {
                    let query = HazardQuery {
                        position: edge.door_centre(),
                        elevation_m: agent.elevation_m(),
                        time_s: ctx.time_s,
                        quantity: self.quantity,
                        door: Some(edge.door),
                    };
                    match field.lookup(&query) {
                        Ok(v) => v,
                        Err(HazardError::NotFound(key)) => {
                            debug!("No hazard data for {}, assuming none", key);
                            0.0
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => 0.0,
            };

            factors.push((*id, Self::factor(intensity, agent.risk_tolerance())));
        }

        if !factors.is_empty() {
            trace!(
                "Agent {} updated hazard factors of {} doors",
                agent.id(),
                factors.len()
            );
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
        cog_map::CognitiveMapMode,
        fixtures,
        hazard::{HazardField, HazardMesh, HazardMeshStorage, HazardParams},
        nav_graph::NavigationGraph,
        sensors::DoorTraffic,
    };
    use nalgebra::Point2;
    use ndarray::Array2;

    /// A hazard reading the same raw value everywhere, unsanitised.
    struct Uniform(f64);

    impl HazardField for Uniform {
        fn lookup(&self, _query: &HazardQuery) -> Result<f64, HazardError> {
            Ok(self.0)
        }
    }

    fn weight_with(field: &dyn HazardField, risk_tolerance: f64) -> Result<f64, SensorError> {
        let building = fixtures::two_exits();
        let full = NavigationGraph::from_building(&building)?;
        let mut cog_map = CognitiveMap::new(1, CognitiveMapMode::Complete, &full);
        let traffic = DoorTraffic::default();
        let ctx = SensorContext {
            building: &building,
            time_s: 0.0,
            traffic: &traffic,
            hazard: Some(field),
        };

        let mut agent = fixtures::pedestrian(&building, 1, Point2::new(2.5, 2.5));
        agent.risk_tolerance = risk_tolerance;
        HazardSensor::new(HazardQuantity::SmokeDensity).execute(&agent, &mut cog_map, &ctx)?;

        let graph = cog_map.graph();
        let edge = graph
            .edge_through(fixtures::OFFICE, fixtures::OFFICE_LOBBY)
            .and_then(|e| graph.edge(e))
            .unwrap();

        // Edges out of other subrooms are left alone
        let other = graph
            .edge_through(fixtures::LOBBY, fixtures::LOBBY_EXIT)
            .and_then(|e| graph.edge(e))
            .unwrap();
        assert!(other.factors.get("Hazard").is_none());

        Ok(edge.weight(&agent.position_m))
    }

    #[test]
    fn test_nan_is_zero() -> Result<(), SensorError> {
        let clean = weight_with(&Uniform(0.0), 0.0)?;
        assert_eq!(weight_with(&Uniform(f64::NAN), 0.0)?, clean);
        assert_eq!(weight_with(&Uniform(f64::INFINITY), 0.0)?, clean);
        assert_eq!(weight_with(&Uniform(-3.0), 0.0)?, clean);

        // 2.5 m to the door, doubled by a unit hazard, unless the agent doesn't care
        assert!((clean - 2.5).abs() < 1e-12);
        assert!((weight_with(&Uniform(1.0), 0.0)? - 5.0).abs() < 1e-12);
        assert!((weight_with(&Uniform(1.0), 1.0)? - 2.5).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn test_missing_mesh() -> Result<(), SensorError> {
        // Storage with a toxicity mesh only, the sensor reads smoke
        let mut storage = HazardMeshStorage::new(HazardParams::default());
        let mesh = HazardMesh::new(Point2::new(0.0, 0.0), 1.0, Array2::from_elem((2, 2), 4.0))?;
        storage.insert(HazardQuantity::Toxicity, 1.8, None, 0.0, mesh);

        assert!((weight_with(&storage, 0.0)? - 2.5).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn test_factor() {
        assert_eq!(HazardSensor::factor(2.0, 0.5), 2.0);
        assert_eq!(HazardSensor::factor(2.0, 7.0), 1.0);
        assert_eq!(HazardSensor::factor(2.0, f64::NAN), 3.0);
    }
}
