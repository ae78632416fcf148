//! # Direction strategy
//!
//! Produces the point an agent should steer towards, along with the wall queries used by the
//! movement model. With floor fields the agent follows the field of its destination door, without
//! them it heads straight for the nearest point on the door.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use building_if::{Agent, Building, Line};
use log::debug;
use nalgebra::{Point2, Vector2};

use super::{
    eikonal::shorten_target, FloorFieldError, FloorFieldParams, FloorFieldRouter, Granularity,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Steering strategy selected by the floor field granularity.
#[derive(Debug, Clone)]
pub struct DirectionStrategy {
    granularity: Granularity,

    floor_fields: Option<FloorFieldRouter>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DirectionStrategy {
    /// Create the strategy, building the floor fields if the granularity asks for them.
    pub fn new(building: &Building, params: FloorFieldParams) -> Result<Self, FloorFieldError> {
        let granularity = params.granularity;

        let floor_fields = match granularity {
            Granularity::None => None,
            _ => Some(FloorFieldRouter::new(building, params)?),
        };

        Ok(Self {
            granularity,
            floor_fields,
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn floor_fields(&self) -> Option<&FloorFieldRouter> {
        self.floor_fields.as_ref()
    }

    /// The point the agent should currently steer towards.
    pub fn target(
        &self,
        building: &Building,
        agent: &dyn Agent,
    ) -> Result<Point2<f64>, FloorFieldError> {
        let door = agent
            .destination()
            .ok_or(FloorFieldError::NoDestination(agent.id()))?;
        let position = agent.position();

        if let Some(ff) = &self.floor_fields {
            let domain = ff.domain_for(agent.room(), agent.subroom());
            match ff.direction_to(domain, door, &position) {
                Ok(dir) => return Ok(position + dir),
                Err(FloorFieldError::NotFound { .. }) => debug!(
                    "No field towards door {} in {}, agent {} heads straight for it",
                    door,
                    domain,
                    agent.id()
                ),
                Err(e) => return Err(e),
            }
        }

        let line = building.door_checked(door)?.line;
        Ok(shorten_target(&line).nearest_point(&position))
    }

    /// Unit direction from the agent to the nearest wall.
    pub fn direction_to_wall(
        &self,
        building: &Building,
        agent: &dyn Agent,
    ) -> Result<Vector2<f64>, FloorFieldError> {
        let position = agent.position();

        match &self.floor_fields {
            Some(ff) => ff.direction_to_nearest_wall(
                ff.domain_for(agent.room(), agent.subroom()),
                &position,
            ),
            None => {
                let nearest = nearest_wall_point(building, agent)?;
                let delta = nearest.map(|p| p - position).unwrap_or_else(Vector2::zeros);
                let norm = delta.norm();
                Ok(if norm > 0.0 { delta / norm } else { delta })
            }
        }
    }

    /// Distance from the agent to the nearest wall, infinite if the subroom has no walls.
    pub fn distance_to_wall(
        &self,
        building: &Building,
        agent: &dyn Agent,
    ) -> Result<f64, FloorFieldError> {
        let position = agent.position();

        match &self.floor_fields {
            Some(ff) => ff.distance_to_nearest_wall(
                ff.domain_for(agent.room(), agent.subroom()),
                &position,
            ),
            None => Ok(nearest_wall_point(building, agent)?
                .map(|p| (p - position).norm())
                .unwrap_or(f64::INFINITY)),
        }
    }

    /// Remaining travel cost from the agent to its destination door.
    pub fn distance_to_target(
        &self,
        building: &Building,
        agent: &dyn Agent,
    ) -> Result<f64, FloorFieldError> {
        let door = agent
            .destination()
            .ok_or(FloorFieldError::NoDestination(agent.id()))?;
        let position = agent.position();

        if let Some(ff) = &self.floor_fields {
            let domain = ff.domain_for(agent.room(), agent.subroom());
            match ff.cost_to(domain, door, &position) {
                Err(FloorFieldError::NotFound { .. }) => (),
                other => return other,
            }
        }

        Ok(building.door_checked(door)?.line.dist_to(&position))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Nearest point on any wall or obstacle of the agent's subroom.
fn nearest_wall_point(
    building: &Building,
    agent: &dyn Agent,
) -> Result<Option<Point2<f64>>, FloorFieldError> {
    let subroom = building.subroom_checked(agent.subroom())?;
    let position = agent.position();

    let walls: Vec<Line> = subroom
        .walls
        .iter()
        .copied()
        .chain(subroom.obstacles.iter().flat_map(|o| o.edges()))
        .collect();

    Ok(walls
        .iter()
        .map(|w| w.nearest_point(&position))
        .min_by(|a, b| {
            (*a - position)
                .norm()
                .total_cmp(&(*b - position).norm())
        }))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures;
    use building_if::Pedestrian;

    fn agent_heading_out(building: &Building, position: Point2<f64>) -> Pedestrian {
        let mut agent = fixtures::pedestrian(building, 0, position);
        let line = building.door(fixtures::SINGLE_EXIT).unwrap().line;
        agent.set_destination(fixtures::SINGLE_EXIT, line);
        agent
    }

    #[test]
    fn test_straight_line() -> Result<(), FloorFieldError> {
        let building = fixtures::single_room(10.0, 5.0);
        let strategy = DirectionStrategy::new(
            &building,
            FloorFieldParams {
                granularity: Granularity::None,
                ..Default::default()
            },
        )?;
        assert!(strategy.floor_fields().is_none());

        // Aims for the nearest point of the door, less the trimmed jambs
        let agent = agent_heading_out(&building, Point2::new(2.0, 0.2));
        let target = strategy.target(&building, &agent)?;
        assert!((target - Point2::new(10.0, 0.7)).norm() < 1e-9);

        assert!((strategy.distance_to_wall(&building, &agent)? - 0.2).abs() < 1e-9);
        assert_eq!(
            strategy.direction_to_wall(&building, &agent)?,
            Vector2::new(0.0, -1.0)
        );
        let remaining = strategy.distance_to_target(&building, &agent)?;
        assert!((remaining - (64.0f64 + 0.09).sqrt()).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn test_floor_field_target() -> Result<(), FloorFieldError> {
        let building = fixtures::single_room(10.0, 5.0);
        let strategy = DirectionStrategy::new(
            &building,
            FloorFieldParams {
                cell_size_m: 0.25,
                ..Default::default()
            },
        )?;

        let agent = agent_heading_out(&building, Point2::new(5.0, 2.5));
        let target = strategy.target(&building, &agent)?;
        assert!((target - Point2::new(6.0, 2.5)).norm() < 1e-9);
        assert!(strategy.distance_to_target(&building, &agent)? > 4.5);

        // Without a destination there is nothing to steer towards
        let idle = fixtures::pedestrian(&building, 1, Point2::new(5.0, 2.5));
        assert!(matches!(
            strategy.target(&building, &idle),
            Err(FloorFieldError::NoDestination(1))
        ));

        Ok(())
    }
}
