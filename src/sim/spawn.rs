//! Entity Factory
//!
//! Builders for each entity class with its standard components.

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::sim::config::WorldBounds;
use crate::sim::entity::{Color, Entity, EntityKind, Physics, Render, RenderShape, Transform};

/// Player friction per tick.
pub const PLAYER_FRICTION: f32 = 0.95;
/// Enemy friction per tick.
pub const ENEMY_FRICTION: f32 = 0.98;
/// Bullet friction per tick.
pub const BULLET_FRICTION: f32 = 0.999;
/// Bullets leave from the player's head, this far above its centre.
pub const MUZZLE_OFFSET: f32 = 16.0;

/// Enemy fill colour.
pub const ENEMY_COLOR: Color = Color::new(1.0, 0.5, 0.0, 1.0);
/// Decoration fill colour.
pub const DECORATION_COLOR: Color = Color::new(0.5, 0.5, 1.0, 0.8);

/// Player at `position`, at rest.
pub fn player(position: Vec2) -> Entity {
    Entity::new(EntityKind::Player)
        .with_transform(Transform::at(position))
        .with_physics(Physics::new(Vec2::ZERO, PLAYER_FRICTION))
}

/// Enemy at a random position with a random drift of up to 50 per axis.
pub fn enemy(rng: &mut DeterministicRng, bounds: &WorldBounds) -> Entity {
    let position = rng.random_position(bounds.width, bounds.height);
    let velocity = Vec2::new(
        (rng.next_f32() - 0.5) * 100.0,
        (rng.next_f32() - 0.5) * 100.0,
    );

    Entity::new(EntityKind::Enemy)
        .with_transform(Transform::at(position))
        .with_physics(Physics::new(velocity, ENEMY_FRICTION))
        .with_render(Render::new(RenderShape::Rectangle, Vec2::new(20.0, 20.0), ENEMY_COLOR))
}

/// Static decoration at a random position.
pub fn decoration(rng: &mut DeterministicRng, bounds: &WorldBounds) -> Entity {
    let position = rng.random_position(bounds.width, bounds.height);

    Entity::new(EntityKind::Decoration)
        .with_transform(Transform::at(position))
        .with_render(Render::new(RenderShape::Circle, Vec2::new(5.0, 5.0), DECORATION_COLOR))
}

/// Bullet fired from a shooter's transform along its heading.
pub fn bullet(shooter: &Transform, speed: f32) -> Entity {
    let origin = shooter.position - Vec2::new(0.0, MUZZLE_OFFSET);
    let velocity = Vec2::from_angle(shooter.rotation).scale(speed);

    Entity::new(EntityKind::Bullet)
        .with_transform(Transform { position: origin, rotation: shooter.rotation })
        .with_physics(Physics::new(velocity, BULLET_FRICTION))
        .with_render(Render::new(RenderShape::Circle, Vec2::new(10.0, 10.0), Color::WHITE))
}
