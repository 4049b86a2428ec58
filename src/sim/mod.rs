//! Live Simulation
//!
//! ## Module Structure
//!
//! - `entity`: Tagged entities, capability records, dense arena
//! - `config`: Tunables with defaults and JSON overrides
//! - `avoidance`: Separation steering within one class
//! - `physics`: Kinematic step, boundary policy, batched dispatch
//! - `pool`: Fork-join worker pool with bounded shutdown
//! - `collision`: Player/enemy and bullet/enemy passes
//! - `spawn`: Entity factory
//! - `events`: Per-tick events
//! - `tick`: Simulation orchestration

pub mod entity;
pub mod config;
pub mod avoidance;
pub mod physics;
pub mod pool;
pub mod collision;
pub mod spawn;
pub mod events;
pub mod tick;

// Re-export key types
pub use entity::{Color, Entity, EntityId, EntityKind, Physics, Render, RenderShape, Transform, World};
pub use config::{ConfigError, SimConfig};
pub use physics::{PhysicsIntegrator, PhysicsReport};
pub use pool::{ShutdownStatus, WorkerPool};
pub use events::SimEvent;
pub use tick::{PlayerIntent, Simulation, TickContext, TickResult};
