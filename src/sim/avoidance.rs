//! Separation Steering
//!
//! Agents of one class push away from neighbours inside a fixed radius.
//! Every agent's adjustment is computed from the same snapshot of the set,
//! so the result does not depend on the order writes are applied in.

use crate::core::vec2::Vec2;
use crate::sim::config::AvoidanceConfig;
use crate::sim::entity::{EntityId, EntityKind, World};

/// Snapshot of one agent taken before steering.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgentState {
    /// Position, if the agent has a transform
    pub position: Option<Vec2>,
    /// Velocity, if the agent has physics
    pub velocity: Option<Vec2>,
}

/// Summed repulsion acting on agent `index` from every other agent.
///
/// Each neighbour closer than `radius` (and farther than `epsilon`)
/// contributes `dir * (radius - d) / radius * push`.
pub fn repulsion(agents: &[AgentState], index: usize, config: &AvoidanceConfig) -> Vec2 {
    let Some(my_pos) = agents.get(index).and_then(|a| a.position) else {
        return Vec2::ZERO;
    };

    let mut total = Vec2::ZERO;
    for (j, other) in agents.iter().enumerate() {
        if j == index {
            continue;
        }
        let Some(other_pos) = other.position else {
            continue;
        };

        let dist = my_pos.distance(other_pos);
        if dist < config.radius && dist > config.epsilon {
            let dir = (my_pos - other_pos).normalize();
            let strength = (config.radius - dist) / config.radius;
            total += dir.scale(strength * config.push);
        }
    }
    total
}

/// Steered velocity for agent `index`, or `None` when nothing changes.
///
/// The push is capped at `config.push`, added to the current velocity to
/// form a target, blended toward by `config.blend` and clamped to
/// `config.max_speed`.
pub fn steer(agents: &[AgentState], index: usize, config: &AvoidanceConfig) -> Option<Vec2> {
    let current = agents.get(index)?.velocity?;
    let avoidance = repulsion(agents, index, config);

    let magnitude = avoidance.length();
    if magnitude <= 0.0 {
        return None;
    }

    let target = current + avoidance.normalize().scale(magnitude.min(config.push));
    let blended = current.lerp(target, config.blend);

    Some(blended.clamp_length(config.max_speed))
}

/// Steered velocities for every agent. `None` entries are left unchanged.
pub fn compute_avoidance(agents: &[AgentState], config: &AvoidanceConfig) -> Vec<Option<Vec2>> {
    (0..agents.len())
        .map(|i| steer(agents, i, config))
        .collect()
}

/// Apply separation steering to all live entities of `kind`.
///
/// Entities without a transform are invisible to their neighbours; those
/// without physics are not steered. Returns how many velocities changed.
pub fn apply_avoidance(world: &mut World, kind: &EntityKind, config: &AvoidanceConfig) -> usize {
    let ids: Vec<EntityId> = world.ids_of(kind);
    if ids.len() < 2 {
        return 0;
    }

    let agents: Vec<AgentState> = ids
        .iter()
        .map(|id| {
            let entity = world.get(*id);
            AgentState {
                position: entity.and_then(|e| e.transform).map(|t| t.position),
                velocity: entity.and_then(|e| e.physics).map(|p| p.velocity),
            }
        })
        .collect();

    let mut changed = 0;
    for (id, steered) in ids.iter().zip(compute_avoidance(&agents, config)) {
        let Some(velocity) = steered else {
            continue;
        };
        if let Some(physics) = world.get_mut(*id).and_then(|e| e.physics.as_mut()) {
            physics.velocity = velocity;
            changed += 1;
        }
    }

    tracing::trace!(kind = %kind, agents = ids.len(), changed, "avoidance applied");
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Entity, Physics, Transform};

    fn agent(x: f32, y: f32) -> AgentState {
        AgentState {
            position: Some(Vec2::new(x, y)),
            velocity: Some(Vec2::ZERO),
        }
    }

    #[test]
    fn test_close_agents_pushed_apart() {
        let config = AvoidanceConfig::default();
        let agents = [agent(100.0, 100.0), agent(140.0, 100.0)];

        let result = compute_avoidance(&agents, &config);
        let left = result[0].expect("left agent steered");
        let right = result[1].expect("right agent steered");

        assert!(left.x < 0.0, "left agent should move left: {left:?}");
        assert!(right.x > 0.0, "right agent should move right: {right:?}");

        // strength 0.5 * push 50 = 25, blended by 0.15
        assert!((right.x - 3.75).abs() < 1e-4);
        assert!(left.y.abs() < 1e-6);
    }

    #[test]
    fn test_distant_agents_unchanged() {
        let config = AvoidanceConfig::default();
        let agents = [agent(0.0, 0.0), agent(80.0, 0.0), agent(300.0, 300.0)];

        assert!(compute_avoidance(&agents, &config).iter().all(Option::is_none));
        assert_eq!(repulsion(&agents, 0, &config), Vec2::ZERO);
    }

    #[test]
    fn test_coincident_agents_ignored() {
        let config = AvoidanceConfig::default();
        let agents = [agent(50.0, 50.0), agent(50.0, 50.005)];

        assert!(compute_avoidance(&agents, &config).iter().all(Option::is_none));
    }

    #[test]
    fn test_speed_clamped() {
        let config = AvoidanceConfig::default();
        let mut agents = [agent(0.0, 0.0), agent(10.0, 0.0)];
        agents[0].velocity = Some(Vec2::new(-200.0, 0.0));

        let steered = steer(&agents, 0, &config).unwrap();
        assert!((steered.length() - config.max_speed).abs() < 1e-3);
    }

    #[test]
    fn test_missing_state_skipped() {
        let config = AvoidanceConfig::default();
        let agents = [
            agent(0.0, 0.0),
            AgentState { position: Some(Vec2::new(20.0, 0.0)), velocity: None },
            AgentState { position: None, velocity: Some(Vec2::ZERO) },
        ];

        let result = compute_avoidance(&agents, &config);
        assert!(result[0].is_some());
        assert!(result[1].is_none(), "no physics, nothing to steer");
        assert!(result[2].is_none(), "no transform, no neighbours");
    }

    #[test]
    fn test_apply_avoidance_on_world() {
        let mut world = World::new();
        for x in [100.0, 140.0] {
            world.spawn(
                Entity::new(EntityKind::Enemy)
                    .with_transform(Transform::at(Vec2::new(x, 100.0)))
                    .with_physics(Physics::default()),
            );
        }
        world.spawn(
            Entity::new(EntityKind::Decoration)
                .with_transform(Transform::at(Vec2::new(120.0, 100.0))),
        );

        let changed = apply_avoidance(&mut world, &EntityKind::Enemy, &AvoidanceConfig::default());
        assert_eq!(changed, 2);

        let v0 = world.entities()[0].physics.unwrap().velocity;
        let v1 = world.entities()[1].physics.unwrap().velocity;
        assert!(v0.x < 0.0 && v1.x > 0.0);
    }
}
