//! Simulation Tick
//!
//! Per-tick order:
//!
//! 1. Player intent (movement, firing)
//! 2. Enemy wander
//! 3. Enemy separation steering
//! 4. Physics step (batched on the worker pool when large enough), sweep
//! 5. Collision passes, sweep
//! 6. Timed enemy spawning
//!
//! All inputs arrive through [`TickContext`]; the simulation reads no
//! global state.

use tracing::{debug, info};

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::sim::avoidance::apply_avoidance;
use crate::sim::collision::resolve_collisions;
use crate::sim::config::SimConfig;
use crate::sim::entity::{EntityKind, World};
use crate::sim::events::SimEvent;
use crate::sim::physics::{PhysicsIntegrator, PhysicsReport};
use crate::sim::pool::ShutdownStatus;
use crate::sim::spawn;

/// What the player wants to do this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerIntent {
    /// Desired direction; any non-zero length means "move at full speed"
    pub movement: Vec2,
    /// Fire a bullet along the current heading
    pub fire: bool,
}

/// Per-tick inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickContext {
    /// Seconds since the previous tick
    pub dt: f32,
    /// Player intent
    pub intent: PlayerIntent,
}

impl TickContext {
    /// Context with no player input.
    pub fn idle(dt: f32) -> Self {
        Self { dt, intent: PlayerIntent::default() }
    }
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<SimEvent>,
    /// Physics pass summary
    pub physics: PhysicsReport,
}

/// A running simulation instance. Owns the world and the worker pool.
pub struct Simulation {
    world: World,
    config: SimConfig,
    integrator: PhysicsIntegrator,
    rng: DeterministicRng,
    seed: u64,
    tick: u64,
    spawn_timer: f32,
}

impl Simulation {
    /// Create a simulation populated with the player, initial enemies and
    /// decorations.
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let integrator = PhysicsIntegrator::new(&config.dispatch);
        Self::populated(config, seed, integrator)
    }

    /// Like [`Simulation::new`], with a given integrator.
    pub fn populated(config: SimConfig, seed: u64, integrator: PhysicsIntegrator) -> Self {
        let mut sim = Self::with_integrator(config, seed, integrator);

        let bounds = sim.config.bounds.clone();
        sim.world.spawn(spawn::player(bounds.center()));
        for _ in 0..sim.config.spawn.initial_enemies {
            sim.world.spawn(spawn::enemy(&mut sim.rng, &bounds));
        }
        for _ in 0..sim.config.spawn.initial_decorations {
            sim.world.spawn(spawn::decoration(&mut sim.rng, &bounds));
        }

        info!(
            seed,
            entities = sim.world.len(),
            workers = sim.integrator.worker_threads(),
            "simulation started"
        );
        sim
    }

    /// Create a simulation with an empty world.
    pub fn empty(config: SimConfig, seed: u64) -> Self {
        let integrator = PhysicsIntegrator::new(&config.dispatch);
        Self::with_integrator(config, seed, integrator)
    }

    /// Create a simulation with an empty world and a given integrator.
    pub fn with_integrator(config: SimConfig, seed: u64, integrator: PhysicsIntegrator) -> Self {
        Self {
            world: World::new(),
            config,
            integrator,
            rng: DeterministicRng::new(seed),
            seed,
            tick: 0,
            spawn_timer: 0.0,
        }
    }

    /// The entity arena.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The entity arena, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Physics integrator.
    pub fn integrator(&self) -> &PhysicsIntegrator {
        &self.integrator
    }

    /// Physics integrator (profiling, worker count).
    pub fn integrator_mut(&mut self) -> &mut PhysicsIntegrator {
        &mut self.integrator
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self, ctx: &TickContext) -> TickResult {
        let mut result = TickResult::default();
        self.tick += 1;

        // 1. Player intent
        self.apply_intent(&ctx.intent, &mut result);

        // 2. Enemy wander
        self.wander_enemies();

        // 3. Separation among enemies
        apply_avoidance(&mut self.world, &EntityKind::Enemy, &self.config.avoidance);

        // 4. Physics
        result.physics = self.integrator.step(&mut self.world, ctx.dt, &self.config.bounds);
        if result.physics.failed_batches > 0 {
            debug!(tick = self.tick, failed = result.physics.failed_batches, "physics batches failed");
        }
        if result.physics.destroyed > 0 {
            result.events.push(SimEvent::bullets_expired(self.tick, result.physics.destroyed));
        }
        self.world.sweep_destroyed();

        // 5. Collisions
        let outcome = resolve_collisions(&mut self.world, &self.config.collision, &self.config.bounds);
        if let Some(hit) = outcome.player_hit {
            result.events.push(SimEvent::player_reset(self.tick, hit.previous_position));
        }
        for hit in &outcome.bullet_hits {
            if let Some(at) = self.world.get(hit.enemy).and_then(|e| e.transform).map(|t| t.position) {
                result.events.push(SimEvent::enemy_destroyed(self.tick, at));
            }
        }
        self.world.sweep_destroyed();

        // 6. Spawning
        self.spawn_timer += ctx.dt;
        if self.spawn_timer > self.config.spawn.enemy_interval_secs {
            self.spawn_timer = 0.0;
            let enemy = spawn::enemy(&mut self.rng, &self.config.bounds);
            if let Some(at) = enemy.position() {
                result.events.push(SimEvent::enemy_spawned(self.tick, at));
            }
            self.world.spawn(enemy);
        }

        result.events.sort_by_key(|e| e.priority);
        result
    }

    /// Steer and clamp the player, and fire if asked.
    fn apply_intent(&mut self, intent: &PlayerIntent, result: &mut TickResult) {
        let Some(id) = self.world.first_of(&EntityKind::Player) else {
            return;
        };
        let bounds = &self.config.bounds;
        let Some(player) = self.world.get_mut(id) else {
            return;
        };
        let (Some(transform), Some(physics)) = (player.transform.as_mut(), player.physics.as_mut()) else {
            return;
        };

        if intent.movement.length_squared() > 0.0 {
            transform.rotation = intent.movement.angle();
            physics.velocity = intent.movement.normalize().scale(self.config.spawn.player_speed);
        }

        let pos = transform.position;
        transform.position = Vec2::new(
            pos.x.clamp(0.0, bounds.width - bounds.player_extent),
            pos.y.clamp(0.0, bounds.height - bounds.player_extent),
        );

        if intent.fire {
            let bullet = spawn::bullet(transform, self.config.spawn.bullet_speed);
            let heading = transform.rotation;
            if let Some(at) = bullet.position() {
                result.events.push(SimEvent::bullet_fired(self.tick, at, heading));
            }
            self.world.spawn(bullet);
        }
    }

    /// Give some enemies a fresh random heading.
    fn wander_enemies(&mut self) {
        let cfg = &self.config.spawn;
        for entity in self.world.entities_mut() {
            if !entity.is(&EntityKind::Enemy) || entity.transform.is_none() {
                continue;
            }
            let Some(physics) = entity.physics.as_mut() else {
                continue;
            };
            if self.rng.next_bool(cfg.wander_chance) {
                let speed = self.rng.next_f32_range(cfg.wander_speed_min, cfg.wander_speed_max);
                physics.velocity = self.rng.random_direction().scale(speed);
            }
        }
    }

    /// Hash of the tick counter, seed and every entity.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.seed, |hasher| self.world.hash_into(hasher))
    }

    /// Stop the worker pool. Safe to call more than once.
    pub fn shutdown(&mut self) -> ShutdownStatus {
        self.integrator.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::DispatchConfig;
    use crate::sim::entity::{Entity, Physics, Transform};

    const DT: f32 = 1.0 / 60.0;

    fn parallel_config() -> SimConfig {
        SimConfig {
            dispatch: DispatchConfig {
                parallel_threshold: 1,
                worker_threads: Some(3),
                ..DispatchConfig::default()
            },
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_tick_determinism() {
        let mut sim1 = Simulation::new(SimConfig::default(), 12345);
        let mut sim2 = Simulation::new(SimConfig::default(), 12345);

        for t in 0..300 {
            let intent = PlayerIntent {
                movement: Vec2::new(((t % 7) as f32) - 3.0, 1.0),
                fire: t % 20 == 0,
            };
            let ctx = TickContext { dt: DT, intent };
            sim1.tick(&ctx);
            sim2.tick(&ctx);
        }

        assert_eq!(sim1.tick_count(), 300);
        assert_eq!(sim1.compute_hash(), sim2.compute_hash());
    }

    #[test]
    fn test_parallel_and_sequential_runs_agree() {
        let mut config = parallel_config();
        config.spawn.initial_enemies = 40;

        let mut parallel = Simulation::new(config.clone(), 777);
        let mut sequential = Simulation::populated(config.clone(), 777, PhysicsIntegrator::sequential());
        assert_eq!(parallel.world(), sequential.world());

        for _ in 0..120 {
            let p = parallel.tick(&TickContext::idle(DT));
            let s = sequential.tick(&TickContext::idle(DT));
            assert!(p.physics.parallel);
            assert!(!s.physics.parallel);
        }

        assert_eq!(parallel.world(), sequential.world());
        assert_eq!(parallel.shutdown(), ShutdownStatus::Graceful);
    }

    #[test]
    fn test_player_moves_and_faces_intent() {
        let mut sim = Simulation::empty(SimConfig::default(), 1);
        sim.world_mut().spawn(spawn::player(Vec2::new(400.0, 300.0)));

        let ctx = TickContext {
            dt: 0.1,
            intent: PlayerIntent { movement: Vec2::new(0.0, 1.0), fire: false },
        };
        sim.tick(&ctx);

        let player = &sim.world().entities()[0];
        let t = player.transform.unwrap();
        assert!((t.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((t.position.y - 320.0).abs() < 1e-3);
    }

    #[test]
    fn test_fire_spawns_bullet_and_event() {
        let mut sim = Simulation::empty(SimConfig::default(), 1);
        sim.world_mut().spawn(spawn::player(Vec2::new(400.0, 300.0)));

        let ctx = TickContext {
            dt: DT,
            intent: PlayerIntent { movement: Vec2::ZERO, fire: true },
        };
        let result = sim.tick(&ctx);

        assert_eq!(sim.world().count_of(&EntityKind::Bullet), 1);
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, crate::sim::events::SimEventData::BulletFired { .. })));
    }

    #[test]
    fn test_bullet_kills_enemy_in_tick() {
        let mut sim = Simulation::empty(SimConfig::default(), 1);
        sim.world_mut().spawn(
            Entity::new(EntityKind::Enemy)
                .with_transform(Transform::at(Vec2::new(200.0, 200.0)))
                .with_physics(Physics::default()),
        );
        sim.world_mut().spawn(
            Entity::new(EntityKind::Bullet)
                .with_transform(Transform::at(Vec2::new(190.0, 200.0)))
                .with_physics(Physics::new(Vec2::new(60.0, 0.0), 1.0)),
        );

        let result = sim.tick(&TickContext::idle(DT));

        assert!(sim.world().is_empty());
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, crate::sim::events::SimEventData::EnemyDestroyed { .. })));
    }

    #[test]
    fn test_enemy_spawns_on_interval() {
        let mut sim = Simulation::empty(SimConfig::default(), 9);
        for _ in 0..3 {
            sim.tick(&TickContext::idle(1.0));
        }
        // Timer passes 2 s on the third tick
        assert_eq!(sim.world().count_of(&EntityKind::Enemy), 1);
    }
}
