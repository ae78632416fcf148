//! # Door traffic
//!
//! Snapshot of which agents are heading for which door, rebuilt once per control interval.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use building_if::{Agent, AgentId, DoorUid, SubRoomUid};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An agent heading for a door.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    pub agent: AgentId,

    /// Subroom the agent is in
    pub subroom: SubRoomUid,

    pub speed_m_s: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DoorTraffic {
    approaching: BTreeMap<DoorUid, Vec<Approach>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DoorTraffic {
    pub fn from_agents<'a, A, I>(agents: I) -> Self
    where
        A: Agent + ?Sized + 'a,
        I: IntoIterator<Item = &'a A>,
    {
        let mut traffic = Self::default();
        for agent in agents {
            traffic.record(agent);
        }
        traffic
    }

    /// Add an agent to the snapshot. Agents without a destination are ignored.
    pub fn record<A: Agent + ?Sized>(&mut self, agent: &A) {
        if let Some(door) = agent.destination() {
            self.approaching.entry(door).or_default().push(Approach {
                agent: agent.id(),
                subroom: agent.subroom(),
                speed_m_s: agent.speed_m_s(),
            });
        }
    }

    /// Agents heading for the door.
    pub fn approaching(&self, door: DoorUid) -> &[Approach] {
        self.approaching
            .get(&door)
            .map(|a| a.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of agents with a destination.
    pub fn len(&self) -> usize {
        self.approaching.values().map(|a| a.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.approaching.is_empty()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures;
    use nalgebra::{Point2, Vector2};

    #[test]
    fn test_from_agents() {
        let building = fixtures::two_exits();

        let mut walking = fixtures::pedestrian(&building, 1, Point2::new(1.0, 1.0));
        walking.velocity_m_s = Vector2::new(0.6, 0.8);
        walking.destination = Some(fixtures::OFFICE_CORRIDOR);

        let mut standing = fixtures::pedestrian(&building, 2, Point2::new(6.0, 1.0));
        standing.destination = Some(fixtures::OFFICE_CORRIDOR);

        let idle = fixtures::pedestrian(&building, 3, Point2::new(2.0, 2.0));

        let traffic = DoorTraffic::from_agents(&[walking, standing, idle]);
        assert_eq!(traffic.len(), 2);

        let approaching = traffic.approaching(fixtures::OFFICE_CORRIDOR);
        assert_eq!(approaching[0].subroom, fixtures::OFFICE);
        assert!((approaching[0].speed_m_s - 1.0).abs() < 1e-12);
        assert_eq!(approaching[1].subroom, fixtures::CORRIDOR);
        assert_eq!(approaching[1].speed_m_s, 0.0);

        assert!(traffic.approaching(fixtures::LOBBY_EXIT).is_empty());
    }
}
