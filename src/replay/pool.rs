//! Replay Object Pool
//!
//! Objects released by the timeline are parked per [`ObjectClass`] and
//! handed out again before anything new is constructed. A reacquired
//! object is reset to its class defaults; nothing from its previous life
//! carries over except its serial.

use std::collections::BTreeMap;

use crate::core::vec2::Vec2;
use crate::replay::codec::EntitySnapshot;
use crate::replay::identity::ObjectClass;
use crate::sim::entity::Color;

/// Serial number of a constructed replay object. Survives pooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectSerial(pub u64);

/// Size and colour a class starts with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassDefaults {
    /// Width and height
    pub size: Vec2,
    /// Fill colour
    pub color: Color,
}

impl ClassDefaults {
    /// Defaults for a class.
    pub fn of(class: ObjectClass) -> Self {
        let (w, h, color) = match class {
            ObjectClass::Player => (20.0, 20.0, Color::new(1.0, 0.0, 0.0, 1.0)),
            ObjectClass::Bullet => (10.0, 10.0, Color::WHITE),
            ObjectClass::Enemy => (20.0, 20.0, Color::new(1.0, 0.5, 0.0, 1.0)),
            ObjectClass::Decoration => (6.0, 6.0, Color::new(0.5, 0.5, 1.0, 0.8)),
            ObjectClass::Generic => (12.0, 12.0, Color::new(0.6, 0.6, 0.6, 1.0)),
        };
        Self { size: Vec2::new(w, h), color }
    }
}

/// A render-ready object reconstructed from recorded samples.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayObject {
    serial: ObjectSerial,
    class: ObjectClass,
    /// Recorded class name
    pub name: String,
    /// Recorded type tag
    pub type_tag: String,
    /// Position
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Width and height
    pub size: Vec2,
    /// Fill colour
    pub color: Color,
    active: bool,
}

impl ReplayObject {
    fn new(serial: ObjectSerial, class: ObjectClass) -> Self {
        let mut object = Self {
            serial,
            class,
            name: String::new(),
            type_tag: String::new(),
            position: Vec2::ZERO,
            rotation: 0.0,
            size: Vec2::ZERO,
            color: Color::WHITE,
            active: false,
        };
        object.reset();
        object
    }

    /// Serial assigned at construction.
    pub fn serial(&self) -> ObjectSerial {
        self.serial
    }

    /// Pooling class.
    pub fn class(&self) -> ObjectClass {
        self.class
    }

    /// Whether the object is currently handed out.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Restore class defaults and mark active.
    fn reset(&mut self) {
        let defaults = ClassDefaults::of(self.class);
        self.name.clear();
        self.type_tag.clear();
        self.position = Vec2::ZERO;
        self.rotation = 0.0;
        self.size = defaults.size;
        self.color = defaults.color;
        self.active = true;
    }

    /// Copy a recorded snapshot onto this object. A non-positive recorded
    /// size leaves the current size alone.
    pub fn apply(&mut self, snapshot: &EntitySnapshot) {
        if self.name != snapshot.name {
            self.name.clone_from(&snapshot.name);
        }
        if self.type_tag != snapshot.type_tag {
            self.type_tag.clone_from(&snapshot.type_tag);
        }
        self.position = snapshot.position;
        self.rotation = snapshot.rotation;
        if snapshot.size.x > 0.0 && snapshot.size.y > 0.0 {
            self.size = snapshot.size;
        }
        self.color = snapshot.color;
    }
}

/// Per-class free lists of inactive objects.
#[derive(Debug, Default)]
pub struct ObjectPool {
    free: BTreeMap<ObjectClass, Vec<ReplayObject>>,
    constructed: u64,
}

impl ObjectPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an object of `class`, reusing a parked one when available.
    pub fn acquire(&mut self, class: ObjectClass) -> ReplayObject {
        match self.free.get_mut(&class).and_then(Vec::pop) {
            Some(mut object) => {
                object.reset();
                object
            }
            None => {
                let serial = ObjectSerial(self.constructed);
                self.constructed += 1;
                ReplayObject::new(serial, class)
            }
        }
    }

    /// Deactivate an object and park it under its class.
    pub fn release(&mut self, mut object: ReplayObject) {
        object.active = false;
        self.free.entry(object.class).or_default().push(object);
    }

    /// Parked objects of one class.
    pub fn pooled(&self, class: ObjectClass) -> usize {
        self.free.get(&class).map_or(0, Vec::len)
    }

    /// Parked objects across all classes.
    pub fn total_pooled(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    /// Objects ever constructed (not reused).
    pub fn constructed(&self) -> u64 {
        self.constructed
    }
}
