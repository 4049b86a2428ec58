//! Recording and Playback
//!
//! ## Module Structure
//!
//! - `codec`: Keyframe lines and JSON control records
//! - `identity`: Quantized identity keys and object classes
//! - `interp`: Easing and shortest-arc rotation blending
//! - `pool`: Class-keyed pool of replay objects
//! - `timeline`: Seek, synchronize, interpolate, loop
//! - `recorder`: Recording service and storage backends

pub mod codec;
pub mod identity;
pub mod interp;
pub mod pool;
pub mod timeline;
pub mod recorder;

// Re-export key types
pub use codec::{EntitySnapshot, KeyframeSample, StreamRecord};
pub use identity::{IdentityKey, ObjectClass};
pub use pool::{ObjectPool, ReplayObject};
pub use timeline::{PlaybackState, ReplayTimeline, Viewport};
pub use recorder::{
    FileRecordingStorage, MemoryRecordingStorage, RecordStatus, RecordingError,
    RecordingService, RecordingStorage,
};
