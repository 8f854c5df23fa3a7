//! Storage strategies for transition audio states.
//!
//! A replay buffer is parameterized by one [`StorageBackend`], chosen at
//! construction:
//!
//! - [`InMemoryBackend`]: states stay as `AudioSignal`s, handles are the
//!   transitions themselves, nothing touches the filesystem
//! - [`DiskBackend`]: states are written as `.wav` files next to a JSON index
//!   record, handles are index-record paths
//!
//! ```text
//! write(prev, action, reward, new, ep, step)
//!     │
//!     ├─ persist(prev, new, ep, step) ──> StatePair<StateRef>
//!     └─ encode(transition, ep, step) ──> Handle ──> CircularBuffer
//!
//! read(handle) ──> decode(handle) ──> Transition<AudioSignal>
//! evict(handle) ──> discard(handle)
//! ```

pub mod codec;
pub mod disk;
pub mod memory;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::core::audio_state::AudioSignal;
use crate::core::transition::{AudioTransition, StatePair, Transition};
use crate::error::ReplayResult;

pub use codec::TransitionRecord;
pub use disk::{DiskBackend, StorageLayout};
pub use memory::InMemoryBackend;

/// Where a backend keeps audio states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageMode {
    /// States held as in-memory signals.
    Memory,
    /// States written to `.wav` files with JSON index records.
    Disk,
}

/// Capability interface shared by the storage strategies.
pub trait StorageBackend: Send + Sync {
    /// How a single audio state is referenced after `persist`.
    type StateRef: Clone + Debug + Send + Sync;

    /// What the circular buffer stores for one transition.
    type Handle: Clone + Debug + PartialEq + Send + Sync;

    /// Storage mode of this backend.
    fn mode(&self) -> StorageMode;

    /// Create whatever the backend needs before the first write.
    ///
    /// Must be idempotent.
    fn prepare(&self) -> ReplayResult<()>;

    /// Persist both audio states of a transition.
    fn persist(
        &self,
        prev_state: AudioSignal,
        new_state: AudioSignal,
        episode: u64,
        step: u64,
    ) -> ReplayResult<StatePair<Self::StateRef>>;

    /// Remove the backing storage of a persisted state pair.
    fn delete(&self, states: &StatePair<Self::StateRef>) -> ReplayResult<()>;

    /// Turn a transition into a buffer handle.
    fn encode(
        &self,
        transition: Transition<Self::StateRef>,
        episode: u64,
        step: u64,
    ) -> ReplayResult<Self::Handle>;

    /// Materialize the transition behind a handle.
    ///
    /// The returned transition never aliases buffer contents.
    fn decode(&self, handle: &Self::Handle) -> ReplayResult<AudioTransition>;

    /// Release everything backing a handle that left the buffer.
    fn discard(&self, handle: Self::Handle) -> ReplayResult<()>;

    /// Remove every stored transition, including ones left by earlier runs.
    ///
    /// Returns how many files were removed. Only meaningful for disk storage.
    fn clear(&self) -> ReplayResult<usize> {
        Ok(0)
    }

    /// Delete the lexicographically first file of every storage directory.
    ///
    /// Returns how many files were removed. Only meaningful for disk storage.
    fn sweep_oldest(&self) -> ReplayResult<usize> {
        Ok(0)
    }

    /// Persist and encode one transition.
    fn write(
        &self,
        prev_state: AudioSignal,
        action: i64,
        reward: f64,
        new_state: AudioSignal,
        episode: u64,
        step: u64,
    ) -> ReplayResult<Self::Handle> {
        let states = self.persist(prev_state, new_state, episode, step)?;
        self.encode(Transition::from_pair(states, action, reward), episode, step)
    }
}
