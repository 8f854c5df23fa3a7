//! Replay buffer over a pluggable storage backend.
//!
//! - `ReplayBuffer<InMemoryBackend>`: transitions held as signals
//! - `ReplayBuffer<DiskBackend>`: transitions persisted as `.wav` + JSON

pub mod replay_buffer;

pub use replay_buffer::{
    BufferStats, DiskReplayBuffer, EvictionPolicy, MemoryReplayBuffer, ReplayBuffer,
    ReplayBufferConfig, SharedReplayBuffer,
};

#[cfg(test)]
mod tests;
