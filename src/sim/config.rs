//! Simulation Configuration
//!
//! All tunables for the live simulation. `Default` carries the arena's
//! standard constants; JSON overrides may name any subset of fields.

use serde::{Serialize, Deserialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// World rectangle and edge policy extents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    /// World width
    pub width: f32,
    /// World height
    pub height: f32,
    /// Entity half-extent subtracted on the right/bottom edges
    pub half_extent: f32,
    /// Distance past the world edges after which stray bullets are culled
    pub bullet_margin: f32,
    /// Player sprite extent used when clamping player input movement
    pub player_extent: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            half_extent: 15.0,
            bullet_margin: 50.0,
            player_extent: 20.0,
        }
    }
}

impl WorldBounds {
    /// Right edge for reflecting entities.
    #[inline]
    pub fn max_x(&self) -> f32 {
        self.width - self.half_extent
    }

    /// Bottom edge for reflecting entities.
    #[inline]
    pub fn max_y(&self) -> f32 {
        self.height - self.half_extent
    }

    /// World centre.
    #[inline]
    pub fn center(&self) -> crate::core::Vec2 {
        crate::core::Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Separation steering among agents of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Neighbour radius
    pub radius: f32,
    /// Push constant (also caps the summed push)
    pub push: f32,
    /// Blend factor toward the target velocity
    pub blend: f32,
    /// Maximum resulting speed
    pub max_speed: f32,
    /// Pairs closer than this are ignored
    pub epsilon: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            radius: 80.0,
            push: 50.0,
            blend: 0.15,
            max_speed: 150.0,
            epsilon: 0.01,
        }
    }
}

/// Proximity thresholds for the collision pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Enemy within this distance resets the player
    pub player_enemy_radius: f32,
    /// Bullet within this distance destroys an enemy
    pub bullet_enemy_radius: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            player_enemy_radius: 25.0,
            bullet_enemy_radius: 18.0,
        }
    }
}

/// Physics batch dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum number of physics entities before batches go to workers
    pub parallel_threshold: usize,
    /// Worker count override; `None` uses available parallelism minus one
    pub worker_threads: Option<usize>,
    /// Grace period for worker shutdown before workers are abandoned
    pub shutdown_grace_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 10,
            worker_threads: None,
            shutdown_grace_ms: 1000,
        }
    }
}

/// Spawning and steering behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Seconds between enemy spawns
    pub enemy_interval_secs: f32,
    /// Per-tick chance that an enemy picks a new heading
    pub wander_chance: f32,
    /// Minimum wander speed
    pub wander_speed_min: f32,
    /// Maximum wander speed
    pub wander_speed_max: f32,
    /// Enemies created at start
    pub initial_enemies: usize,
    /// Decorations created at start
    pub initial_decorations: usize,
    /// Player movement speed
    pub player_speed: f32,
    /// Bullet muzzle speed
    pub bullet_speed: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            enemy_interval_secs: 2.0,
            wander_chance: 0.02,
            wander_speed_min: 80.0,
            wander_speed_max: 120.0,
            initial_enemies: 3,
            initial_decorations: 5,
            player_speed: 200.0,
            bullet_speed: 400.0,
        }
    }
}

/// Configuration for the whole simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World rectangle
    pub bounds: WorldBounds,
    /// Enemy separation steering
    pub avoidance: AvoidanceConfig,
    /// Collision thresholds
    pub collision: CollisionConfig,
    /// Physics dispatch
    pub dispatch: DispatchConfig,
    /// Spawning
    pub spawn: SpawnConfig,
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.bounds;
        if !(b.width > 0.0 && b.height > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "bounds.width/height",
                reason: "must be positive",
            });
        }
        if b.half_extent < 0.0 || b.half_extent >= b.width.min(b.height) {
            return Err(ConfigError::InvalidValue {
                field: "bounds.half_extent",
                reason: "must be non-negative and smaller than the world",
            });
        }
        if b.bullet_margin < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "bounds.bullet_margin",
                reason: "must be non-negative",
            });
        }

        let a = &self.avoidance;
        if a.radius < 0.0 || a.epsilon < 0.0 || a.max_speed < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "avoidance",
                reason: "radius, epsilon and max_speed must be non-negative",
            });
        }
        if !(0.0..=1.0).contains(&a.blend) {
            return Err(ConfigError::InvalidValue {
                field: "avoidance.blend",
                reason: "must be within [0, 1]",
            });
        }

        let c = &self.collision;
        if c.player_enemy_radius < 0.0 || c.bullet_enemy_radius < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "collision",
                reason: "radii must be non-negative",
            });
        }

        if self.dispatch.worker_threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.worker_threads",
                reason: "must be at least 1",
            });
        }

        let s = &self.spawn;
        if s.wander_speed_min > s.wander_speed_max {
            return Err(ConfigError::InvalidValue {
                field: "spawn.wander_speed_min",
                reason: "must not exceed wander_speed_max",
            });
        }

        Ok(())
    }
}
