//! In-memory storage: states are kept as signals, no I/O.

use super::{StorageBackend, StorageMode};
use crate::core::audio_state::AudioSignal;
use crate::core::transition::{AudioTransition, StatePair, Transition};
use crate::error::ReplayResult;

/// Keeps transitions directly in the buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryBackend;

impl InMemoryBackend {
    /// Create a new in-memory backend.
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for InMemoryBackend {
    type StateRef = AudioSignal;
    type Handle = AudioTransition;

    fn mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    fn prepare(&self) -> ReplayResult<()> {
        Ok(())
    }

    fn persist(
        &self,
        prev_state: AudioSignal,
        new_state: AudioSignal,
        _episode: u64,
        _step: u64,
    ) -> ReplayResult<StatePair<AudioSignal>> {
        Ok(StatePair {
            prev: prev_state,
            new: new_state,
        })
    }

    fn delete(&self, _states: &StatePair<AudioSignal>) -> ReplayResult<()> {
        Ok(())
    }

    fn encode(
        &self,
        transition: Transition<AudioSignal>,
        _episode: u64,
        _step: u64,
    ) -> ReplayResult<AudioTransition> {
        Ok(transition)
    }

    fn decode(&self, handle: &AudioTransition) -> ReplayResult<AudioTransition> {
        Ok(handle.clone())
    }

    fn discard(&self, _handle: AudioTransition) -> ReplayResult<()> {
        Ok(())
    }
}
