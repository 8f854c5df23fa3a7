//! # Audition RL: Replay Storage for Audio Agents
//!
//! Fixed-capacity replay buffer of `(prev_state, action, reward, new_state)`
//! transitions whose states are audio signals, plus a dataset view that
//! turns stored transitions into model-ready tensors.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Agent / environment loop                                        │
//! │      │ write_buffer_data(prev, action, reward, new, ep, step)    │
//! │      ▼                                                           │
//! │  ┌───────────────────────────┐     ┌──────────────────────────┐  │
//! │  │ ReplayBuffer<S>           │     │ StorageBackend S         │  │
//! │  │  CircularBuffer<Handle>   │────>│  InMemoryBackend         │  │
//! │  │  episode metadata         │     │  DiskBackend (.wav+JSON) │  │
//! │  └─────────────┬─────────────┘     └──────────────────────────┘  │
//! │                │ get(i)                                          │
//! │                ▼                                                 │
//! │  ┌───────────────────────────┐     ┌──────────────────────────┐  │
//! │  │ BufferDataset<S>          │────>│ SeparationBatcher        │  │
//! │  │  Compose transforms       │     │  Tensor<B, 3> mixes      │  │
//! │  └───────────────────────────┘     └──────────────────────────┘  │
//! │        ▲ indices from EpisodeWeightedSampler                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! `ReplayBuffer` is `Send + Sync`. Writers hold the write lock across append
//! and eviction cleanup; readers hold the read lock while decoding, so a
//! reader never sees a slot whose files are being deleted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use audition_rl::{BufferDataset, ReplayBuffer, ReplayBufferConfig, StorageLayout};
//! use audition_rl::dataset::separation_pipeline;
//!
//! let buffer = ReplayBuffer::on_disk(
//!     StorageLayout::under("data"),
//!     ReplayBufferConfig::default().with_capacity(1000),
//! )?
//! .shared();
//!
//! buffer.write_buffer_data(prev, action, reward, new, episode, step)?;
//!
//! let dataset = BufferDataset::new(
//!     buffer.clone(),
//!     separation_pipeline(["prev_state", "new_state"], 32000)?,
//! );
//! ```

pub mod buffers;
pub mod core;
pub mod dataset;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use buffers::{
    BufferStats, DiskReplayBuffer, EvictionPolicy, MemoryReplayBuffer, ReplayBuffer,
    ReplayBufferConfig, SharedReplayBuffer,
};
pub use crate::core::{AudioSignal, AudioTransition, CircularBuffer, PathTransition, Transition};
pub use dataset::{
    BufferDataset, DatasetItem, EpisodeWeightedSampler, SamplerConfig, SeparationBatch,
    SeparationBatcher, TransitionDataset,
};
pub use error::{ReplayError, ReplayResult};
pub use storage::{DiskBackend, InMemoryBackend, StorageBackend, StorageLayout, StorageMode};
