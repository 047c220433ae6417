//! Experience Memory
//!
//! Replay buffers for storing and sampling experiences.

pub mod replay_buffer;

pub use replay_buffer::{EpisodeBuffer, ReplayBuffer, Transition, TransitionBatch};
