//! Replay Identity
//!
//! Samples carry no entity ids, so objects are matched across frames by a
//! coarse key: name, type tag and the 10-unit grid cell of the position.
//! Sub-cell drift between samples keeps the key stable. Two same-class
//! objects in one cell share a key (last write wins), and an object that
//! crosses a cell edge between samples becomes a new key.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::replay::codec::EntitySnapshot;

/// Grid cell size used to quantize positions into keys.
pub const IDENTITY_CELL: f32 = 10.0;

/// Derived identity of a recorded object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    /// Class name
    pub name: String,
    /// Type tag
    pub type_tag: String,
    /// floor(x / 10)
    pub cell_x: i32,
    /// floor(y / 10)
    pub cell_y: i32,
}

impl IdentityKey {
    /// Key of a snapshot.
    pub fn of(snapshot: &EntitySnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            type_tag: snapshot.type_tag.clone(),
            cell_x: cell(snapshot.position.x),
            cell_y: cell(snapshot.position.y),
        }
    }
}

/// Saturating; NaN lands in cell 0.
fn cell(coordinate: f32) -> i32 {
    (coordinate / IDENTITY_CELL).floor() as i32
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_{}", self.name, self.type_tag, self.cell_x, self.cell_y)
    }
}

/// Pooling class of a replay object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    /// Player avatar
    Player,
    /// Projectile
    Bullet,
    /// Hostile
    Enemy,
    /// Scenery
    Decoration,
    /// Anything else
    Generic,
}

impl ObjectClass {
    /// All classes, in classification order.
    pub const ALL: [ObjectClass; 5] = [
        ObjectClass::Player,
        ObjectClass::Bullet,
        ObjectClass::Enemy,
        ObjectClass::Decoration,
        ObjectClass::Generic,
    ];

    /// Classify by name or type tag; the first class matching either wins.
    pub fn classify(name: &str, type_tag: &str) -> Self {
        let matches = |class_name: &str, tag: &str| name == class_name || type_tag == tag;

        if matches("Player", "PLAYER") {
            ObjectClass::Player
        } else if matches("Bullet", "BULLET") {
            ObjectClass::Bullet
        } else if matches("Enemy", "ENEMY") {
            ObjectClass::Enemy
        } else if matches("Decoration", "DECORATION") {
            ObjectClass::Decoration
        } else {
            ObjectClass::Generic
        }
    }

    /// Class of a snapshot.
    pub fn of(snapshot: &EntitySnapshot) -> Self {
        Self::classify(&snapshot.name, &snapshot.type_tag)
    }
}
