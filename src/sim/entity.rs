//! Entity Arena
//!
//! Entities are tagged descriptors with optional capability records
//! (transform, physics, render). They live in a dense `Vec` and are
//! addressed by position; there is no stable per-entity identifier.
//!
//! Destruction is two-phase: passes mark entities destroyed, and the
//! owner sweeps them out between passes so indices stay valid within one.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::core::vec2::Vec2;

// =============================================================================
// ENTITY KIND
// =============================================================================

/// Semantic class tag of an entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// The controllable player
    Player,
    /// Wandering hostile agent
    Enemy,
    /// Short-lived projectile
    Bullet,
    /// Static scenery
    Decoration,
    /// Anything else, by name
    Other(String),
}

impl EntityKind {
    /// Name used on the wire and in logs.
    pub fn name(&self) -> &str {
        match self {
            EntityKind::Player => "Player",
            EntityKind::Enemy => "Enemy",
            EntityKind::Bullet => "Bullet",
            EntityKind::Decoration => "Decoration",
            EntityKind::Other(name) => name,
        }
    }

    /// Parse a class name; unknown names become `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Player" => EntityKind::Player,
            "Enemy" => EntityKind::Enemy,
            "Bullet" => EntityKind::Bullet,
            "Decoration" => EntityKind::Decoration,
            other => EntityKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// COMPONENTS
// =============================================================================

/// Position and rotation (radians).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World position
    pub position: Vec2,
    /// Heading in radians
    pub rotation: f32,
}

impl Transform {
    /// Transform at a position with zero rotation.
    pub fn at(position: Vec2) -> Self {
        Self { position, rotation: 0.0 }
    }
}

/// Velocity (units per second) and per-tick friction multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    /// Current velocity
    pub velocity: Vec2,
    /// Velocity multiplier applied after each step (1.0 = no friction)
    pub friction: f32,
}

impl Physics {
    /// Physics record with the given velocity and friction.
    pub fn new(velocity: Vec2, friction: f32) -> Self {
        Self { velocity, friction }
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 1.0)
    }
}

/// Primitive shape used to draw an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderShape {
    /// Axis-aligned rectangle
    Rectangle,
    /// Circle inscribed in the size box
    Circle,
}

impl RenderShape {
    /// Upper-case tag written into keyframes.
    pub fn tag(self) -> &'static str {
        match self {
            RenderShape::Rectangle => "RECTANGLE",
            RenderShape::Circle => "CIRCLE",
        }
    }
}

/// RGBA colour, each channel in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a colour.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Visual description of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Render {
    /// Shape
    pub shape: RenderShape,
    /// Width and height
    pub size: Vec2,
    /// Fill colour
    pub color: Color,
}

impl Render {
    /// Create a render record.
    pub fn new(shape: RenderShape, size: Vec2, color: Color) -> Self {
        Self { shape, size, color }
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Index of an entity inside a [`World`]. Valid until the next sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub usize);

/// A live simulation entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Class tag
    pub kind: EntityKind,
    /// Optional position record
    pub transform: Option<Transform>,
    /// Optional velocity record
    pub physics: Option<Physics>,
    /// Optional visual record
    pub render: Option<Render>,
    /// Marked for removal at the next sweep
    pub destroyed: bool,
}

impl Entity {
    /// Bare entity of a kind, without components.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            transform: None,
            physics: None,
            render: None,
            destroyed: false,
        }
    }

    /// Attach a transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach a physics record.
    pub fn with_physics(mut self, physics: Physics) -> Self {
        self.physics = Some(physics);
        self
    }

    /// Attach a render record.
    pub fn with_render(mut self, render: Render) -> Self {
        self.render = Some(render);
        self
    }

    /// True for live entities of `kind`.
    #[inline]
    pub fn is(&self, kind: &EntityKind) -> bool {
        !self.destroyed && &self.kind == kind
    }

    /// Position if the entity is live and has a transform.
    #[inline]
    pub fn position(&self) -> Option<Vec2> {
        if self.destroyed {
            return None;
        }
        self.transform.map(|t| t.position)
    }

    /// Mark for removal.
    #[inline]
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }
}

// =============================================================================
// WORLD
// =============================================================================

/// Dense entity container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    entities: Vec<Entity>,
}

impl World {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, returning its current index.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        EntityId(self.entities.len() - 1)
    }

    /// Number of entities, including ones pending removal.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if the world holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity by index.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    /// Mutable entity by index.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0)
    }

    /// All entities in container order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// All entities, mutably.
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Live entities in container order.
    pub fn iter_live(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.destroyed)
            .map(|(i, e)| (EntityId(i), e))
    }

    /// Indices of live entities of `kind`, in container order.
    pub fn ids_of(&self, kind: &EntityKind) -> Vec<EntityId> {
        self.iter_live()
            .filter(|(_, e)| &e.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// First live entity of `kind`.
    pub fn first_of(&self, kind: &EntityKind) -> Option<EntityId> {
        self.iter_live()
            .find(|(_, e)| &e.kind == kind)
            .map(|(id, _)| id)
    }

    /// Indices of live entities carrying a transform.
    pub fn with_transform(&self) -> Vec<EntityId> {
        self.iter_live()
            .filter(|(_, e)| e.transform.is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Indices of live entities carrying a physics record.
    pub fn with_physics(&self) -> Vec<EntityId> {
        self.iter_live()
            .filter(|(_, e)| e.physics.is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Indices of live entities carrying a render record.
    pub fn with_render(&self) -> Vec<EntityId> {
        self.iter_live()
            .filter(|(_, e)| e.render.is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Live entity count of `kind`.
    pub fn count_of(&self, kind: &EntityKind) -> usize {
        self.iter_live().filter(|(_, e)| &e.kind == kind).count()
    }

    /// Mark an entity destroyed. Returns false for an unknown index.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(id.0) {
            Some(entity) => {
                entity.destroy();
                true
            }
            None => false,
        }
    }

    /// Remove every destroyed entity, preserving order of the rest.
    ///
    /// Returns the number removed. Invalidates outstanding [`EntityId`]s.
    pub fn sweep_destroyed(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| !e.destroyed);
        before - self.entities.len()
    }

    /// Feed every entity into a state hasher in container order.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.entities.len() as u64);
        for entity in &self.entities {
            hasher.update_str(entity.kind.name());
            hasher.update_bool(entity.destroyed);
            hasher.update_option(entity.transform, |h, t| {
                h.update_vec2(t.position);
                h.update_f32(t.rotation);
            });
            hasher.update_option(entity.physics, |h, p| {
                h.update_vec2(p.velocity);
                h.update_f32(p.friction);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy_at(x: f32, y: f32) -> Entity {
        Entity::new(EntityKind::Enemy)
            .with_transform(Transform::at(Vec2::new(x, y)))
            .with_physics(Physics::default())
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            EntityKind::Player,
            EntityKind::Enemy,
            EntityKind::Bullet,
            EntityKind::Decoration,
            EntityKind::Other("Crate".into()),
        ] {
            assert_eq!(EntityKind::from_name(kind.name()), kind);
        }
    }

    #[test]
    fn test_capability_queries() {
        let mut world = World::new();
        world.spawn(enemy_at(0.0, 0.0));
        world.spawn(Entity::new(EntityKind::Decoration).with_transform(Transform::default()));
        world.spawn(Entity::new(EntityKind::Other("Marker".into())));

        assert_eq!(world.with_transform().len(), 2);
        assert_eq!(world.with_physics(), vec![EntityId(0)]);
        assert!(world.with_render().is_empty());
        assert_eq!(world.first_of(&EntityKind::Decoration), Some(EntityId(1)));
    }

    #[test]
    fn test_destroy_then_sweep_keeps_order() {
        let mut world = World::new();
        for i in 0..4 {
            world.spawn(enemy_at(i as f32, 0.0));
        }

        assert!(world.destroy(EntityId(1)));
        assert!(!world.destroy(EntityId(99)));

        // Destroyed entities vanish from queries before the sweep
        assert_eq!(world.count_of(&EntityKind::Enemy), 3);
        assert_eq!(world.len(), 4);

        assert_eq!(world.sweep_destroyed(), 1);
        let xs: Vec<f32> = world.entities().iter().map(|e| e.position().unwrap().x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 3.0]);
    }
}
