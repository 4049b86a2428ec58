//! Replay Timeline
//!
//! Rebuilds a visually continuous scene from recorded keyframes.
//!
//! ## Playback
//!
//! ```text
//! Idle     - no frames were loaded; every call is a no-op
//! Loaded   - frames are ready, playback has not started
//! Playing  - each update seeks, synchronizes and interpolates
//! ```
//!
//! Each update finds the frame pair bracketing the elapsed time, brings
//! the live object set in line with the earlier frame, then blends every
//! object that also appears in the later frame. Past the last frame plus
//! a grace window, playback restarts from frame 0.
//!
//! The frame list is immutable once loaded. Timestamps are not assumed to
//! be ordered; pairs with equal or inverted times snap to the earlier frame.

use std::collections::{BTreeMap, BTreeSet};
use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::replay::codec::{parse_line, KeyframeSample, StreamRecord, KEYFRAME_MARKER};
use crate::replay::identity::{IdentityKey, ObjectClass};
use crate::replay::interp::{blend_factor, interpolate_rotation, smoothstep};
use crate::replay::pool::{ObjectPool, ReplayObject};

/// Time past the last frame before playback loops.
pub const LOOP_GRACE_MS: i64 = 1000;

/// Viewport and start time from a recording header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    /// Epoch milliseconds when recording started
    pub started_at: i64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Playback state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing to play
    Idle,
    /// Frames loaded, not started
    Loaded,
    /// Playing since the given clock reading
    Playing {
        /// Clock reading at which elapsed time is zero
        started_ms: u64,
    },
}

/// One playback session over a recorded frame list.
#[derive(Debug)]
pub struct ReplayTimeline {
    frames: Vec<KeyframeSample>,
    viewport: Option<Viewport>,
    state: PlaybackState,
    current: usize,
    active: BTreeMap<IdentityKey, ReplayObject>,
    pool: ObjectPool,
    loops: u32,
}

impl ReplayTimeline {
    /// Timeline over an already parsed frame list.
    pub fn from_frames(frames: Vec<KeyframeSample>, viewport: Option<Viewport>) -> Self {
        let state = if frames.is_empty() {
            PlaybackState::Idle
        } else {
            PlaybackState::Loaded
        };

        Self {
            frames,
            viewport,
            state,
            current: 0,
            active: BTreeMap::new(),
            pool: ObjectPool::new(),
            loops: 0,
        }
    }

    /// Read a recording. Only `KF|` lines become frames; a header line, if
    /// present, sets the viewport. A read error ends loading with whatever
    /// was read so far.
    pub fn load<R: BufRead>(reader: R) -> Self {
        let mut frames = Vec::new();
        let mut viewport = None;
        let mut skipped = 0usize;
        let prefix = format!("{}|", KEYFRAME_MARKER);

        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, frames = frames.len(), "recording read failed, keeping frames read so far");
                    break;
                }
            };

            if line.starts_with(&prefix) {
                match parse_line(&line) {
                    Some(frame) => frames.push(frame),
                    None => skipped += 1,
                }
            } else if let Some(StreamRecord::Header { time, w, h }) = StreamRecord::parse(&line) {
                viewport = Some(Viewport { started_at: time, width: w, height: h });
            }
        }

        debug!(frames = frames.len(), skipped, "recording loaded");
        Self::from_frames(frames, viewport)
    }

    /// Read a recording file. A missing or unreadable file gives an idle
    /// timeline.
    pub fn load_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::load(BufReader::new(file)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "recording not readable, replay is idle");
                Self::from_frames(Vec::new(), None)
            }
        }
    }

    // =========================================================================
    // PLAYBACK
    // =========================================================================

    /// Begin playback at clock reading `now_ms`, showing frame 0.
    pub fn start(&mut self, now_ms: u64) {
        if self.state == PlaybackState::Idle {
            return;
        }
        self.state = PlaybackState::Playing { started_ms: now_ms };
        self.current = 0;
        self.sync_to(0);
        info!(frames = self.frames.len(), "replay started");
    }

    /// Advance playback to clock reading `now_ms`.
    pub fn update(&mut self, now_ms: u64) {
        let PlaybackState::Playing { started_ms } = self.state else {
            return;
        };
        let elapsed = i64::try_from(now_ms.saturating_sub(started_ms)).unwrap_or(i64::MAX);

        let index = self.seek(elapsed);
        self.present(index, elapsed);

        let last = self.frames.len() - 1;
        if index >= last && elapsed > self.frames[last].time_ms.saturating_add(LOOP_GRACE_MS) {
            self.loops += 1;
            debug!(loops = self.loops, "replay looped");
            self.state = PlaybackState::Playing { started_ms: now_ms };
            self.current = 0;
            self.sync_to(0);
        }
    }

    /// Locate the frame whose interval contains `t` and remember it.
    ///
    /// At or past the last frame's time, the last frame. Otherwise scan
    /// forward from the previous index, then backward from it, then fall
    /// back to frame 0.
    pub fn seek(&mut self, t: i64) -> usize {
        let Some(last) = self.frames.len().checked_sub(1) else {
            return 0;
        };
        if t >= self.frames[last].time_ms {
            self.current = last;
            return last;
        }

        let frames = &self.frames;
        let brackets = |i: &usize| t >= frames[*i].time_ms && t < frames[*i + 1].time_ms;

        let forward = (self.current.min(last)..last).find(brackets);
        let found = forward.or_else(|| {
            if last == 0 {
                return None;
            }
            (0..=self.current.min(last - 1)).rev().find(brackets)
        });

        self.current = found.unwrap_or(0);
        self.current
    }

    /// Show frame `index` at elapsed time `t`, blending toward the next
    /// frame when there is one.
    fn present(&mut self, index: usize, t: i64) {
        let Some(next) = self.frames.get(index + 1) else {
            self.sync_to(index);
            return;
        };
        let earlier = &self.frames[index];

        let eased = match blend_factor(t, earlier.time_ms, next.time_ms) {
            Some(u) if !earlier.entities.is_empty() => smoothstep(u),
            _ => {
                self.sync_to(index);
                return;
            }
        };

        self.sync_to(index);

        let earlier = &self.frames[index];
        let mut targets = BTreeMap::new();
        for snapshot in &self.frames[index + 1].entities {
            targets.entry(IdentityKey::of(snapshot)).or_insert(snapshot);
        }

        for from in &earlier.entities {
            let key = IdentityKey::of(from);
            let (Some(object), Some(to)) = (self.active.get_mut(&key), targets.get(&key)) else {
                continue;
            };
            object.position = from.position.lerp(to.position, eased);
            object.rotation = interpolate_rotation(from.rotation, to.rotation, eased);
        }
    }

    /// Bring the live object set in line with frame `index`.
    ///
    /// Objects whose key is absent go back to the pool; present keys reuse
    /// their object or take one from the pool. Duplicate keys within the
    /// frame resolve to the last snapshot.
    fn sync_to(&mut self, index: usize) {
        let Some(frame) = self.frames.get(index) else {
            return;
        };
        if frame.entities.is_empty() {
            self.release_all();
            return;
        }

        let keys: Vec<IdentityKey> = frame.entities.iter().map(IdentityKey::of).collect();
        let stale: Vec<IdentityKey> = {
            let wanted: BTreeSet<&IdentityKey> = keys.iter().collect();
            self.active.keys().filter(|k| !wanted.contains(k)).cloned().collect()
        };
        for key in stale {
            if let Some(object) = self.active.remove(&key) {
                self.pool.release(object);
            }
        }

        for (key, snapshot) in keys.into_iter().zip(&frame.entities) {
            let object = match self.active.entry(key) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => slot.insert(self.pool.acquire(ObjectClass::of(snapshot))),
            };
            object.apply(snapshot);
        }
    }

    /// Return every active object to the pool.
    fn release_all(&mut self) {
        for (_, object) in std::mem::take(&mut self.active) {
            self.pool.release(object);
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Objects to draw this pass. Borrowed; nothing may keep them past the
    /// render call.
    pub fn visible(&self) -> impl Iterator<Item = &ReplayObject> + '_ {
        self.active.values()
    }

    /// Live object for a key.
    pub fn object(&self, key: &IdentityKey) -> Option<&ReplayObject> {
        self.active.get(key)
    }

    /// Playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// True when nothing was loaded.
    pub fn is_idle(&self) -> bool {
        self.state == PlaybackState::Idle
    }

    /// Loaded frames.
    pub fn frames(&self) -> &[KeyframeSample] {
        &self.frames
    }

    /// Header viewport, if the recording had one.
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Index of the frame last resolved by a seek.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of live objects.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Parked objects of one class.
    pub fn pooled(&self, class: ObjectClass) -> usize {
        self.pool.pooled(class)
    }

    /// Objects ever constructed by this session.
    pub fn constructed(&self) -> u64 {
        self.pool.constructed()
    }

    /// Completed loops.
    pub fn loops(&self) -> u32 {
        self.loops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::replay::codec::{encode_line, EntitySnapshot};
    use crate::sim::entity::Color;
    use std::io::Cursor;

    fn snap(name: &str, x: f32, y: f32, rot: f32) -> EntitySnapshot {
        EntitySnapshot {
            name: name.to_string(),
            type_tag: name.to_uppercase(),
            position: Vec2::new(x, y),
            rotation: rot,
            ..EntitySnapshot::default()
        }
    }

    fn frame(time_ms: i64, entities: Vec<EntitySnapshot>) -> KeyframeSample {
        KeyframeSample::new(time_ms, entities)
    }

    fn only_object(timeline: &ReplayTimeline) -> &ReplayObject {
        let objects: Vec<_> = timeline.visible().collect();
        assert_eq!(objects.len(), 1);
        objects[0]
    }

    #[test]
    fn test_empty_timeline_is_idle() {
        let mut timeline = ReplayTimeline::from_frames(Vec::new(), None);
        timeline.start(0);
        timeline.update(500);
        assert!(timeline.is_idle());
        assert_eq!(timeline.visible().count(), 0);
    }

    #[test]
    fn test_missing_file_is_idle() {
        let timeline = ReplayTimeline::load_path("/nonexistent/recording.jsonl");
        assert!(timeline.is_idle());
    }

    #[test]
    fn test_load_reads_keyframes_and_header() {
        let text = [
            r#"{"type":"header","time":1000,"w":800,"h":600}"#.to_string(),
            encode_line(&frame(0, vec![snap("Player", 1.0, 2.0, 0.0)])),
            r#"{"type":"input","time":5,"key":32}"#.to_string(),
            "KF|bad|name=Player".to_string(),
            "garbage".to_string(),
            encode_line(&frame(33, vec![snap("Player", 3.0, 2.0, 0.0)])),
            r#"{"type":"end"}"#.to_string(),
        ]
        .join("\n");

        let timeline = ReplayTimeline::load(Cursor::new(text));
        assert_eq!(timeline.frames().len(), 2);
        assert_eq!(timeline.state(), PlaybackState::Loaded);
        assert_eq!(
            timeline.viewport(),
            Some(Viewport { started_at: 1000, width: 800, height: 600 })
        );
    }

    #[test]
    fn test_interpolates_with_smoothstep() {
        let frames = vec![
            frame(0, vec![snap("Enemy", 0.0, 0.0, 0.0)]),
            frame(100, vec![snap("Enemy", 5.0, 0.0, 1.0)]),
        ];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(1_000);

        timeline.update(1_050);
        let object = only_object(&timeline);
        assert!((object.position.x - 2.5).abs() < 1e-4);
        assert!((object.rotation - 0.5).abs() < 1e-4);

        // Eased: a quarter of the way in time is less than a quarter of the distance
        timeline.update(1_025);
        let object = only_object(&timeline);
        assert!(object.position.x < 5.0 * 0.25);
        assert!((object.position.x - 5.0 * smoothstep(0.25)).abs() < 1e-4);
    }

    #[test]
    fn test_motion_within_one_cell_is_blended() {
        // x=0 and x=9 share cell 0, so the halfway point lands halfway
        let frames = vec![
            frame(0, vec![snap("Enemy", 0.0, 0.0, 0.0)]),
            frame(100, vec![snap("Enemy", 9.0, 0.0, 0.0)]),
        ];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(0);
        timeline.update(50);
        assert!((only_object(&timeline).position.x - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_keys_not_in_later_frame_snap() {
        // x=0 and x=100 fall in different cells, so the object is not blended
        let frames = vec![
            frame(0, vec![snap("Enemy", 0.0, 0.0, 0.0)]),
            frame(100, vec![snap("Enemy", 100.0, 0.0, 0.0)]),
        ];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(0);
        timeline.update(50);
        assert_eq!(only_object(&timeline).position.x, 0.0);
    }

    #[test]
    fn test_seek_brackets_and_clamps() {
        let frames = (0..5).map(|i| frame(i * 100, vec![snap("Player", 0.0, 0.0, 0.0)])).collect();
        let mut timeline = ReplayTimeline::from_frames(frames, None);

        assert_eq!(timeline.seek(250), 2);
        assert_eq!(timeline.seek(399), 3);
        // Backward scan from the previous index
        assert_eq!(timeline.seek(120), 1);
        assert_eq!(timeline.seek(400), 4);
        assert_eq!(timeline.seek(10_000), 4);
        // Before the first frame nothing brackets; default to 0
        assert_eq!(timeline.seek(-5), 0);
    }

    #[test]
    fn test_out_of_order_frames_are_tolerated() {
        let frames = vec![
            frame(0, vec![snap("Player", 0.0, 0.0, 0.0)]),
            frame(200, vec![snap("Player", 1.0, 0.0, 0.0)]),
            frame(100, vec![snap("Player", 2.0, 0.0, 0.0)]),
            frame(300, vec![snap("Player", 3.0, 0.0, 0.0)]),
        ];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(0);

        // 150 lies in [0, 200) only
        assert_eq!(timeline.seek(150), 0);
        // 250 lies in [100, 300)
        assert_eq!(timeline.seek(250), 2);

        // Inverted pair (200 -> 100) snaps to the earlier frame
        timeline.current = 1;
        timeline.present(1, 150);
        assert_eq!(only_object(&timeline).position.x, 1.0);
    }

    #[test]
    fn test_reappearing_key_served_from_pool() {
        let enemy = || snap("Enemy", 40.0, 40.0, 0.0);
        let player = || snap("Player", 300.0, 300.0, 0.0);
        let frames = vec![
            frame(0, vec![player(), enemy()]),
            frame(100, vec![player()]),
            frame(200, vec![player(), enemy()]),
        ];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(0);
        assert_eq!(timeline.constructed(), 2);
        let enemy_key = IdentityKey::of(&enemy());
        let serial = timeline.object(&enemy_key).unwrap().serial();

        timeline.update(100);
        assert!(timeline.object(&enemy_key).is_none());
        assert_eq!(timeline.pooled(ObjectClass::Enemy), 1);

        timeline.update(200);
        let back = timeline.object(&enemy_key).unwrap();
        assert_eq!(back.serial(), serial);
        assert!(back.is_active());
        assert_eq!(timeline.pooled(ObjectClass::Enemy), 0);
        assert_eq!(timeline.constructed(), 2);
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let mut second = snap("Enemy", 3.0, 3.0, 0.0);
        second.color = Color::new(0.0, 1.0, 0.0, 1.0);
        let frames = vec![frame(0, vec![snap("Enemy", 1.0, 1.0, 0.0), second])];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(0);

        let object = only_object(&timeline);
        assert_eq!(object.position, Vec2::new(3.0, 3.0));
        assert_eq!(object.color, Color::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(timeline.constructed(), 1);
    }

    #[test]
    fn test_empty_frame_releases_everything() {
        let frames = vec![
            frame(0, vec![snap("Enemy", 0.0, 0.0, 0.0), snap("Bullet", 50.0, 0.0, 0.0)]),
            frame(100, Vec::new()),
        ];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(0);
        assert_eq!(timeline.active_count(), 2);

        timeline.update(100);
        assert_eq!(timeline.active_count(), 0);
        assert_eq!(timeline.pooled(ObjectClass::Enemy), 1);
        assert_eq!(timeline.pooled(ObjectClass::Bullet), 1);
    }

    #[test]
    fn test_loops_after_grace_window() {
        let frames = vec![
            frame(0, vec![snap("Player", 0.0, 0.0, 0.0)]),
            frame(100, vec![snap("Player", 5.0, 0.0, 0.0)]),
        ];
        let mut timeline = ReplayTimeline::from_frames(frames, None);
        timeline.start(0);

        timeline.update(1_100);
        assert_eq!(timeline.loops(), 0);
        assert_eq!(timeline.current_index(), 1);

        timeline.update(1_101);
        assert_eq!(timeline.loops(), 1);
        assert_eq!(timeline.current_index(), 0);
        assert_eq!(timeline.state(), PlaybackState::Playing { started_ms: 1_101 });
        assert_eq!(only_object(&timeline).position.x, 0.0);

        // Elapsed time restarts from the loop point
        timeline.update(1_151);
        assert!((only_object(&timeline).position.x - 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_recorded_size_and_color_applied() {
        let mut decoration = snap("Decoration", 10.0, 10.0, 0.0);
        decoration.size = Vec2::new(5.0, 5.0);
        decoration.color = Color::new(0.5, 0.5, 1.0, 0.8);
        let mut timeline = ReplayTimeline::from_frames(vec![frame(0, vec![decoration])], None);
        timeline.start(0);

        let object = only_object(&timeline);
        assert_eq!(object.class(), ObjectClass::Decoration);
        assert_eq!(object.size, Vec2::new(5.0, 5.0));
        assert_eq!(object.color, Color::new(0.5, 0.5, 1.0, 0.8));
    }
}
