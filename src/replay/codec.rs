//! Keyframe Codec
//!
//! A recording is newline-delimited text. Control lines are JSON objects
//! tagged by `type`; samples are compact pipe-delimited lines:
//!
//! ```text
//! {"type":"header","time":1700000000000,"w":800,"h":600}
//! KF|33|name=Player,type=PLAYER,x=400.00,y=300.00,rot=0.00,w=20.00,h=20.00,c=1.00,1.00,1.00,1.00;...
//! {"type":"input","time":40,"key":32}
//! {"type":"end"}
//! ```
//!
//! Parsing is tolerant. Unknown keys are ignored, malformed numbers keep
//! their defaults, and a line that is not a sample yields `None`.

use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::core::vec2::Vec2;
use crate::sim::entity::{Color, Entity, EntityKind, World};

/// Marker opening every sample line.
pub const KEYFRAME_MARKER: &str = "KF";

/// Size written when an entity has no render record.
pub const DEFAULT_SIZE: Vec2 = Vec2 { x: 20.0, y: 20.0 };

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// One entity inside a keyframe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Class name (`Player`, `Enemy`, ...)
    pub name: String,
    /// Upper-case type tag (`PLAYER`, `RECTANGLE`, `CUSTOM`, ...)
    pub type_tag: String,
    /// Position
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Width and height
    pub size: Vec2,
    /// RGBA colour
    pub color: Color,
}

impl Default for EntitySnapshot {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            type_tag: "UNKNOWN".to_string(),
            position: Vec2::ZERO,
            rotation: 0.0,
            size: DEFAULT_SIZE,
            color: Color::WHITE,
        }
    }
}

impl EntitySnapshot {
    /// Snapshot a live entity. Entities without a transform are not recorded.
    pub fn of_entity(entity: &Entity) -> Option<Self> {
        let transform = entity.transform?;
        let (size, color) = entity
            .render
            .map(|r| (r.size, r.color))
            .unwrap_or((DEFAULT_SIZE, Color::WHITE));

        Some(Self {
            name: entity.kind.name().to_string(),
            type_tag: type_tag(entity),
            position: transform.position,
            rotation: transform.rotation,
            size,
            color,
        })
    }

    fn encode_into(&self, out: &mut String) {
        let c = &self.color;
        out.push_str(&format!(
            "name={},type={},x={:.2},y={:.2},rot={:.2},w={:.2},h={:.2},c={:.2},{:.2},{:.2},{:.2}",
            sanitize(&self.name),
            sanitize(&self.type_tag),
            self.position.x,
            self.position.y,
            self.rotation,
            self.size.x,
            self.size.y,
            c.r,
            c.g,
            c.b,
            c.a,
        ));
    }
}

/// Type tag for an entity: its class for the known classes, otherwise its
/// render shape, otherwise `CUSTOM`.
pub fn type_tag(entity: &Entity) -> String {
    match &entity.kind {
        EntityKind::Player => "PLAYER".to_string(),
        EntityKind::Bullet => "BULLET".to_string(),
        EntityKind::Enemy => "ENEMY".to_string(),
        EntityKind::Decoration => "DECORATION".to_string(),
        EntityKind::Other(_) => entity
            .render
            .map(|r| r.shape.tag())
            .unwrap_or("CUSTOM")
            .to_string(),
    }
}

/// Field separators cannot appear inside a value.
fn sanitize(value: &str) -> String {
    value.replace([',', ';', '|', '='], "_")
}

/// One recorded sample: a timestamp and the entities at that moment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframeSample {
    /// Milliseconds since the recording started
    pub time_ms: i64,
    /// Entities in container order
    pub entities: Vec<EntitySnapshot>,
}

impl KeyframeSample {
    /// Create a sample.
    pub fn new(time_ms: i64, entities: Vec<EntitySnapshot>) -> Self {
        Self { time_ms, entities }
    }
}

/// Snapshot every live entity that has a transform.
pub fn snapshot_world(world: &World, time_ms: i64) -> KeyframeSample {
    let entities = world
        .iter_live()
        .filter_map(|(_, e)| EntitySnapshot::of_entity(e))
        .collect();
    KeyframeSample::new(time_ms, entities)
}

// =============================================================================
// SAMPLE LINES
// =============================================================================

/// Encode a sample as a `KF|` line (no trailing newline).
pub fn encode_line(sample: &KeyframeSample) -> String {
    let mut line = format!("{}|{}|", KEYFRAME_MARKER, sample.time_ms);
    for (i, snapshot) in sample.entities.iter().enumerate() {
        if i > 0 {
            line.push(';');
        }
        snapshot.encode_into(&mut line);
    }
    line
}

/// Parse a `KF|` line.
///
/// Returns `None` when the marker or the timestamp is missing or invalid,
/// or when the line has fewer than three `|` segments.
pub fn parse_line(line: &str) -> Option<KeyframeSample> {
    let mut parts = line.trim_end_matches(['\r', '\n']).splitn(3, '|');
    let (marker, time, body) = (parts.next()?, parts.next()?, parts.next()?);
    if marker != KEYFRAME_MARKER {
        return None;
    }

    let Ok(time_ms) = time.trim().parse::<i64>() else {
        trace!(time, "keyframe with unparsable timestamp skipped");
        return None;
    };

    let entities = body
        .split(';')
        .filter(|segment| !segment.trim().is_empty())
        .map(parse_entity)
        .collect();

    Some(KeyframeSample::new(time_ms, entities))
}

/// Parse one `key=value,...` segment, keeping defaults for anything missing.
///
/// The colour value spans four comma-separated numbers, so the three
/// tokens after `c=` that carry no `=` belong to it.
fn parse_entity(segment: &str) -> EntitySnapshot {
    let mut snapshot = EntitySnapshot::default();
    let mut tokens = segment.split(',').peekable();

    while let Some(token) = tokens.next() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "name" => snapshot.name = value.to_string(),
            "type" => snapshot.type_tag = value.to_string(),
            "x" => set_f32(&mut snapshot.position.x, value),
            "y" => set_f32(&mut snapshot.position.y, value),
            "rot" => set_f32(&mut snapshot.rotation, value),
            "w" => set_f32(&mut snapshot.size.x, value),
            "h" => set_f32(&mut snapshot.size.y, value),
            "c" => {
                let mut channels = vec![value];
                while channels.len() < 4 {
                    match tokens.peek() {
                        Some(next) if !next.contains('=') => {
                            channels.push(next.trim());
                            tokens.next();
                        }
                        _ => break,
                    }
                }
                if let Some(color) = parse_color(&channels) {
                    snapshot.color = color;
                }
            }
            _ => {}
        }
    }

    snapshot
}

fn set_f32(field: &mut f32, value: &str) {
    if let Ok(parsed) = value.parse::<f32>() {
        *field = parsed;
    }
}

fn parse_color(channels: &[&str]) -> Option<Color> {
    if channels.len() < 4 {
        return None;
    }
    let mut rgba = [0.0f32; 4];
    for (slot, raw) in rgba.iter_mut().zip(channels) {
        *slot = raw.parse().ok()?;
    }
    Some(Color::new(rgba[0], rgba[1], rgba[2], rgba[3]))
}

// =============================================================================
// CONTROL LINES
// =============================================================================

/// JSON control records framing a recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRecord {
    /// First line: wall-clock start and viewport
    Header {
        /// Epoch milliseconds at recording start
        time: i64,
        /// Viewport width
        w: u32,
        /// Viewport height
        h: u32,
    },
    /// A key press, relative to recording start
    Input {
        /// Milliseconds since start
        time: i64,
        /// Key code
        key: u32,
    },
    /// Last line
    End,
}

impl StreamRecord {
    /// Encode as a single JSON line.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a control line. Sample lines and garbage yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}
