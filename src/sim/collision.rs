//! Collision Resolution
//!
//! Two proximity passes per tick, both brute force over list order:
//!
//! 1. Player vs enemy: an enemy near the first player resets the player
//!    to the world centre.
//! 2. Bullet vs enemy: each bullet destroys at most the first enemy in
//!    range, and is destroyed with it.
//!
//! Candidate enemies are gathered once per pass into a flat list, which is
//! where a spatial index would slot in.

use crate::core::vec2::Vec2;
use crate::sim::config::{CollisionConfig, WorldBounds};
use crate::sim::entity::{EntityId, EntityKind, World};

/// Check if two points are strictly closer than `radius`.
#[inline]
pub fn within(a: Vec2, b: Vec2, radius: f32) -> bool {
    a.distance_squared(b) < radius * radius
}

/// Result of the player-vs-enemy pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerHit {
    /// The player that was reset
    pub player: EntityId,
    /// The first enemy found in range
    pub enemy: EntityId,
    /// Player position before the reset
    pub previous_position: Vec2,
}

/// Result of a bullet-vs-enemy hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletHit {
    /// The bullet (destroyed)
    pub bullet: EntityId,
    /// The enemy (destroyed)
    pub enemy: EntityId,
}

/// Everything the collision pass did this tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CollisionOutcome {
    /// Player reset, if any
    pub player_hit: Option<PlayerHit>,
    /// Bullet kills in resolution order
    pub bullet_hits: Vec<BulletHit>,
}

/// Live enemies with a position, in container order.
fn enemy_positions(world: &World) -> Vec<(EntityId, Vec2)> {
    world
        .iter_live()
        .filter(|(_, e)| e.kind == EntityKind::Enemy)
        .filter_map(|(id, e)| e.position().map(|p| (id, p)))
        .collect()
}

/// Reset the first player to the world centre if any enemy is in range.
pub fn resolve_player_enemy(
    world: &mut World,
    config: &CollisionConfig,
    bounds: &WorldBounds,
) -> Option<PlayerHit> {
    let player_id = world.first_of(&EntityKind::Player)?;
    let player_pos = world.get(player_id)?.position()?;

    let (enemy, _) = enemy_positions(world)
        .into_iter()
        .find(|(_, pos)| within(player_pos, *pos, config.player_enemy_radius))?;

    let transform = world.get_mut(player_id)?.transform.as_mut()?;
    transform.position = bounds.center();

    Some(PlayerHit {
        player: player_id,
        enemy,
        previous_position: player_pos,
    })
}

/// Destroy bullet/enemy pairs. Each bullet kills at most one enemy.
pub fn resolve_bullet_enemy(world: &mut World, config: &CollisionConfig) -> Vec<BulletHit> {
    let bullets: Vec<(EntityId, Vec2)> = world
        .iter_live()
        .filter(|(_, e)| e.kind == EntityKind::Bullet)
        .filter_map(|(id, e)| e.position().map(|p| (id, p)))
        .collect();
    let mut enemies = enemy_positions(world);

    let mut hits = Vec::new();
    for (bullet, bullet_pos) in bullets {
        let Some(slot) = enemies
            .iter()
            .position(|(_, enemy_pos)| within(bullet_pos, *enemy_pos, config.bullet_enemy_radius))
        else {
            continue;
        };

        let (enemy, _) = enemies.remove(slot);
        world.destroy(enemy);
        world.destroy(bullet);
        hits.push(BulletHit { bullet, enemy });
    }

    hits
}

/// Run both passes.
pub fn resolve_collisions(
    world: &mut World,
    config: &CollisionConfig,
    bounds: &WorldBounds,
) -> CollisionOutcome {
    let player_hit = resolve_player_enemy(world, config, bounds);
    let bullet_hits = resolve_bullet_enemy(world, config);

    CollisionOutcome { player_hit, bullet_hits }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Entity, Transform};

    fn at(kind: EntityKind, x: f32, y: f32) -> Entity {
        Entity::new(kind).with_transform(Transform::at(Vec2::new(x, y)))
    }

    #[test]
    fn test_player_reset_on_enemy_contact() {
        let mut world = World::new();
        world.spawn(at(EntityKind::Enemy, 500.0, 500.0));
        let player = world.spawn(at(EntityKind::Player, 100.0, 100.0));
        let near = world.spawn(at(EntityKind::Enemy, 110.0, 110.0));

        let outcome = resolve_collisions(&mut world, &CollisionConfig::default(), &WorldBounds::default());

        let hit = outcome.player_hit.expect("player hit");
        assert_eq!(hit.player, player);
        assert_eq!(hit.enemy, near);
        assert_eq!(world.get(player).unwrap().position(), Some(Vec2::new(400.0, 300.0)));

        // Resetting is not destroying
        assert_eq!(world.count_of(&EntityKind::Enemy), 2);
        assert_eq!(world.count_of(&EntityKind::Player), 1);
    }

    #[test]
    fn test_player_outside_radius_untouched() {
        let mut world = World::new();
        let player = world.spawn(at(EntityKind::Player, 100.0, 100.0));
        world.spawn(at(EntityKind::Enemy, 125.0, 100.0));

        assert!(resolve_player_enemy(&mut world, &CollisionConfig::default(), &WorldBounds::default()).is_none());
        assert_eq!(world.get(player).unwrap().position(), Some(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_bullet_kills_first_enemy_only() {
        let mut world = World::new();
        let first = world.spawn(at(EntityKind::Enemy, 10.0, 0.0));
        let second = world.spawn(at(EntityKind::Enemy, -10.0, 0.0));
        let bullet = world.spawn(at(EntityKind::Bullet, 0.0, 0.0));

        let hits = resolve_bullet_enemy(&mut world, &CollisionConfig::default());

        assert_eq!(hits, vec![BulletHit { bullet, enemy: first }]);
        assert!(world.get(first).unwrap().destroyed);
        assert!(world.get(bullet).unwrap().destroyed);
        assert!(!world.get(second).unwrap().destroyed);
    }

    #[test]
    fn test_two_bullets_two_enemies() {
        let mut world = World::new();
        world.spawn(at(EntityKind::Enemy, 0.0, 0.0));
        world.spawn(at(EntityKind::Enemy, 5.0, 0.0));
        world.spawn(at(EntityKind::Bullet, 2.0, 0.0));
        world.spawn(at(EntityKind::Bullet, 3.0, 0.0));

        let hits = resolve_bullet_enemy(&mut world, &CollisionConfig::default());
        assert_eq!(hits.len(), 2);
        assert_ne!(hits[0].enemy, hits[1].enemy);
        assert_eq!(world.sweep_destroyed(), 4);
    }

    #[test]
    fn test_entities_without_transform_ignored() {
        let mut world = World::new();
        world.spawn(Entity::new(EntityKind::Enemy));
        world.spawn(at(EntityKind::Bullet, 0.0, 0.0));

        assert!(resolve_bullet_enemy(&mut world, &CollisionConfig::default()).is_empty());
        assert!(resolve_player_enemy(&mut world, &CollisionConfig::default(), &WorldBounds::default()).is_none());
    }
}
