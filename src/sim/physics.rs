//! Physics Integrator
//!
//! Kinematic per-entity step plus the boundary policy:
//!
//! - Non-bullets reflect their velocity on each axis that touches an edge
//!   of the world rectangle, then are clamped back inside it.
//! - Bullets are destroyed when they touch or cross an edge, and again if
//!   they stray past the wider margin rectangle.
//!
//! Large entity sets are split into contiguous batches and stepped on the
//! worker pool. Each entity is written by exactly one batch, so no locking
//! is needed and the parallel result equals the sequential one.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::vec2::Vec2;
use crate::sim::config::{DispatchConfig, WorldBounds};
use crate::sim::entity::{Entity, EntityKind, World};
use crate::sim::pool::{default_worker_count, ShutdownStatus, WorkerPool};

/// What happened to one entity during a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Entity lacked a transform or physics record, or was already destroyed
    Skipped,
    /// Moved freely
    Moved,
    /// Touched an edge and had its velocity reflected
    Reflected,
    /// Bullet touched or crossed an edge
    BulletLeftWorld,
    /// Bullet was found beyond the margin rectangle
    BulletStrayed,
}

/// Advance one entity by `dt` seconds and apply the boundary policy.
pub fn step_entity(entity: &mut Entity, dt: f32, bounds: &WorldBounds) -> StepOutcome {
    if entity.destroyed {
        return StepOutcome::Skipped;
    }
    let is_bullet = entity.kind == EntityKind::Bullet;
    let (Some(transform), Some(physics)) = (entity.transform.as_mut(), entity.physics.as_mut()) else {
        return StepOutcome::Skipped;
    };

    transform.position += physics.velocity.scale(dt);
    physics.velocity = physics.velocity.scale(physics.friction);

    let pos = transform.position;

    if is_bullet {
        let outcome = if touches_world_edge(pos, bounds) {
            StepOutcome::BulletLeftWorld
        } else if beyond_margin(pos, bounds) {
            StepOutcome::BulletStrayed
        } else {
            return StepOutcome::Moved;
        };
        entity.destroy();
        return outcome;
    }

    let mut velocity = physics.velocity;
    let mut reflected = false;
    if pos.x <= 0.0 || pos.x >= bounds.max_x() {
        velocity.x = -velocity.x;
        reflected = true;
    }
    if pos.y <= 0.0 || pos.y >= bounds.max_y() {
        velocity.y = -velocity.y;
        reflected = true;
    }

    transform.position = clamp_into(pos, bounds);
    physics.velocity = velocity;

    if reflected {
        StepOutcome::Reflected
    } else {
        StepOutcome::Moved
    }
}

/// True when a bullet at `pos` has reached the world edge.
#[inline]
fn touches_world_edge(pos: Vec2, bounds: &WorldBounds) -> bool {
    !pos.is_finite()
        || pos.x <= 0.0
        || pos.x >= bounds.width
        || pos.y <= 0.0
        || pos.y >= bounds.height
}

/// True when `pos` lies outside the world grown by the bullet margin.
#[inline]
fn beyond_margin(pos: Vec2, bounds: &WorldBounds) -> bool {
    let m = bounds.bullet_margin;
    pos.x < -m || pos.y < -m || pos.x > bounds.width + m || pos.y > bounds.height + m
}

/// Clamp a non-bullet position into `[0, max_x] x [0, max_y]`.
#[inline]
fn clamp_into(pos: Vec2, bounds: &WorldBounds) -> Vec2 {
    let x = if pos.x.is_nan() { 0.0 } else { pos.x.clamp(0.0, bounds.max_x()) };
    let y = if pos.y.is_nan() { 0.0 } else { pos.y.clamp(0.0, bounds.max_y()) };
    Vec2::new(x, y)
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Summary of one physics pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhysicsReport {
    /// Entities that had physics and were stepped
    pub stepped: usize,
    /// Bullets destroyed by the boundary policy
    pub destroyed: usize,
    /// Whether the pass ran on the worker pool
    pub parallel: bool,
    /// Batches that panicked
    pub failed_batches: usize,
}

/// Opt-in timing of the physics phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhysicsProfile {
    enabled: bool,
    total: Duration,
    ticks: u32,
}

impl PhysicsProfile {
    /// Average physics time per profiled tick in milliseconds.
    pub fn average_ms(&self) -> Option<f64> {
        if self.ticks == 0 {
            return None;
        }
        Some(self.total.as_secs_f64() * 1000.0 / self.ticks as f64)
    }

    /// Number of profiled ticks.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

/// Steps every physics-bearing entity, sequentially or on the worker pool.
pub struct PhysicsIntegrator {
    pool: Option<WorkerPool>,
    parallel_threshold: usize,
    profile: PhysicsProfile,
}

impl PhysicsIntegrator {
    /// Create an integrator and its worker pool.
    ///
    /// If the pool cannot be built the integrator runs sequentially.
    pub fn new(config: &DispatchConfig) -> Self {
        let threads = config.worker_threads.unwrap_or_else(default_worker_count);
        let grace = Duration::from_millis(config.shutdown_grace_ms);
        let pool = match WorkerPool::new(threads, grace) {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Failed to start physics workers, running sequentially: {}", e);
                None
            }
        };

        Self {
            pool,
            parallel_threshold: config.parallel_threshold,
            profile: PhysicsProfile::default(),
        }
    }

    /// Integrator that never uses worker threads.
    pub fn sequential() -> Self {
        Self {
            pool: None,
            parallel_threshold: usize::MAX,
            profile: PhysicsProfile::default(),
        }
    }

    /// Worker threads available, zero when sequential.
    pub fn worker_threads(&self) -> usize {
        self.pool.as_ref().filter(|p| p.is_running()).map_or(0, |p| p.threads())
    }

    /// Enable or disable timing; resets accumulated samples.
    pub fn set_profiling(&mut self, enabled: bool) {
        self.profile = PhysicsProfile { enabled, ..PhysicsProfile::default() };
    }

    /// Accumulated timing.
    pub fn profile(&self) -> &PhysicsProfile {
        &self.profile
    }

    /// Step all live physics-bearing entities by `dt` seconds.
    ///
    /// Returns once every batch has completed. Destroyed bullets stay in
    /// the world, marked, until the caller sweeps.
    pub fn step(&mut self, world: &mut World, dt: f32, bounds: &WorldBounds) -> PhysicsReport {
        let started = self.profile.enabled.then(Instant::now);

        let mut bodies: Vec<&mut Entity> = world
            .entities_mut()
            .iter_mut()
            .filter(|e| !e.destroyed && e.physics.is_some())
            .collect();

        let mut report = PhysicsReport {
            stepped: bodies.len(),
            ..PhysicsReport::default()
        };

        let pool = self
            .pool
            .as_ref()
            .filter(|p| p.is_running() && bodies.len() >= self.parallel_threshold);

        match pool {
            Some(pool) => {
                let batches = pool.run_batches(&mut bodies, |_, batch| {
                    for entity in batch.iter_mut() {
                        step_logged(entity, dt, bounds);
                    }
                });
                report.parallel = true;
                report.failed_batches = batches.failed;
            }
            None => {
                for entity in bodies.iter_mut() {
                    step_logged(entity, dt, bounds);
                }
            }
        }

        report.destroyed = bodies.iter().filter(|e| e.destroyed).count();

        if let Some(started) = started {
            self.profile.total += started.elapsed();
            self.profile.ticks += 1;
        }

        report
    }

    /// Stop the worker pool with its bounded grace period.
    pub fn shutdown(&mut self) -> ShutdownStatus {
        match self.pool.as_mut() {
            Some(pool) => {
                let status = pool.shutdown();
                debug!(?status, "physics integrator shut down");
                status
            }
            None => ShutdownStatus::AlreadyStopped,
        }
    }
}

#[inline]
fn step_logged(entity: &mut Entity, dt: f32, bounds: &WorldBounds) {
    let outcome = step_entity(entity, dt, bounds);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(kind = %entity.kind, ?outcome, "physics step");

    #[cfg(not(feature = "debug-tracing"))]
    let _ = outcome;
}
