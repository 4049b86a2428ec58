//! Core primitives.
//!
//! Vector math, seeded randomness, state hashing and clocks shared by
//! the simulation and the replay engine.

pub mod vec2;
pub mod rng;
pub mod hash;
pub mod clock;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use clock::{Clock, ManualClock, SystemClock};
