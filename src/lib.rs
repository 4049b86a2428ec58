//! # Arena Replay
//!
//! Batched 2D arena simulation with keyframe recording and smooth replay.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ARENA REPLAY                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Shared primitives                        │
//! │  ├── vec2.rs      - f32 2D vector                            │
//! │  ├── rng.rs       - Deterministic Xorshift128+ PRNG          │
//! │  ├── hash.rs      - SHA-256 state hashing                    │
//! │  └── clock.rs     - Millisecond clocks (system, manual)      │
//! │                                                              │
//! │  sim/             - Live simulation                          │
//! │  ├── entity.rs    - Tagged entities in a dense arena         │
//! │  ├── avoidance.rs - Same-class separation steering           │
//! │  ├── physics.rs   - Kinematic step + batched dispatch        │
//! │  ├── pool.rs      - Fork-join worker pool                    │
//! │  ├── collision.rs - Player/enemy, bullet/enemy passes        │
//! │  └── tick.rs      - Per-tick orchestration                   │
//! │                                                              │
//! │  replay/          - Recording and playback                   │
//! │  ├── codec.rs     - KF| sample lines, JSON control lines     │
//! │  ├── identity.rs  - Quantized identity keys                  │
//! │  ├── pool.rs      - Class-keyed replay object pool           │
//! │  ├── timeline.rs  - Seek, sync, interpolate, loop            │
//! │  └── recorder.rs  - Recording service + storage backends     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! Avoidance adjusts enemy velocities, physics integrates every body
//! (split into contiguous batches across workers when the body count is
//! large enough), then collisions reset the player or destroy bullet and
//! enemy pairs. A recorder samples the world once per tick; playback
//! reconstructs the scene by interpolating between bracketing samples.
//!
//! ## Determinism
//!
//! Given the same seed and inputs, the simulation produces the same state
//! hash whether physics runs sequentially or on the worker pool. Replay is
//! not bit-exact: it depends on sampling phase and 2-decimal encoding.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod sim;
pub mod replay;

// Re-export commonly used types
pub use core::{Clock, DeterministicRng, ManualClock, SystemClock, Vec2};
pub use sim::{PlayerIntent, SimConfig, Simulation, TickContext, World};
pub use replay::{KeyframeSample, RecordingService, ReplayTimeline};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Fixed tick length in seconds
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

/// Key code recorded when the player fires
pub const FIRE_KEY: u32 = 32;
