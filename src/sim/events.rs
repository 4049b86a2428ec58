//! Simulation Events
//!
//! Events generated during a tick, for logging and tests. Entities are
//! referenced by position because arena indices do not survive a sweep.

use serde::{Serialize, Deserialize};
use crate::core::vec2::Vec2;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Player resets first
    PlayerReset = 0,
    /// Then kills
    Destruction = 1,
    /// Then spawns
    Spawn = 2,
    /// Lowest priority
    Other = 255,
}

/// Simulation event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventData {
    /// An enemy touched the player, who was moved to the world centre
    PlayerReset {
        /// Where the player was
        from: Vec2,
    },

    /// A bullet destroyed an enemy (and itself)
    EnemyDestroyed {
        /// Enemy position at impact
        at: Vec2,
    },

    /// Bullets removed by the boundary policy this tick
    BulletsExpired {
        /// How many
        count: usize,
    },

    /// New enemy entered the world
    EnemySpawned {
        /// Spawn position
        at: Vec2,
    },

    /// Player fired a bullet
    BulletFired {
        /// Muzzle position
        at: Vec2,
        /// Heading in radians
        heading: f32,
    },
}

/// A simulation event with timing and priority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Processing priority
    pub priority: EventPriority,

    /// Event data
    pub data: SimEventData,
}

impl SimEvent {
    /// Create a new event; priority follows from the data.
    pub fn new(tick: u64, data: SimEventData) -> Self {
        let priority = match &data {
            SimEventData::PlayerReset { .. } => EventPriority::PlayerReset,
            SimEventData::EnemyDestroyed { .. } | SimEventData::BulletsExpired { .. } => {
                EventPriority::Destruction
            }
            SimEventData::EnemySpawned { .. } => EventPriority::Spawn,
            SimEventData::BulletFired { .. } => EventPriority::Other,
        };

        Self { tick, priority, data }
    }

    /// Create player reset event.
    pub fn player_reset(tick: u64, from: Vec2) -> Self {
        Self::new(tick, SimEventData::PlayerReset { from })
    }

    /// Create enemy destroyed event.
    pub fn enemy_destroyed(tick: u64, at: Vec2) -> Self {
        Self::new(tick, SimEventData::EnemyDestroyed { at })
    }

    /// Create bullets expired event.
    pub fn bullets_expired(tick: u64, count: usize) -> Self {
        Self::new(tick, SimEventData::BulletsExpired { count })
    }

    /// Create enemy spawned event.
    pub fn enemy_spawned(tick: u64, at: Vec2) -> Self {
        Self::new(tick, SimEventData::EnemySpawned { at })
    }

    /// Create bullet fired event.
    pub fn bullet_fired(tick: u64, at: Vec2, heading: f32) -> Self {
        Self::new(tick, SimEventData::BulletFired { at, heading })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_data() {
        assert_eq!(SimEvent::player_reset(1, Vec2::ZERO).priority, EventPriority::PlayerReset);
        assert_eq!(SimEvent::bullets_expired(1, 2).priority, EventPriority::Destruction);
        assert_eq!(SimEvent::enemy_spawned(1, Vec2::ZERO).priority, EventPriority::Spawn);
        assert!(EventPriority::PlayerReset < EventPriority::Destruction);
    }
}
