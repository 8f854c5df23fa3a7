//! Replay buffer exposed as an indexable dataset.

use std::collections::BTreeMap;

use burn::data::dataset::Dataset;

use super::item::DatasetItem;
use super::transforms::Compose;
use crate::buffers::SharedReplayBuffer;
use crate::core::audio_state::AudioSignal;
use crate::error::ReplayResult;
use crate::storage::StorageBackend;

/// Indexable collection of transformed transitions.
pub trait TransitionDataset: Send + Sync {
    /// Number of readable items.
    fn item_count(&self) -> usize;

    /// Read and transform the item at `index`.
    fn get_item(&self, index: usize) -> ReplayResult<DatasetItem>;

    /// Check if there is nothing to read.
    fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}

/// Dataset view over a shared replay buffer.
///
/// Writers and readers may share the same buffer across threads; the view
/// only holds an `Arc`.
pub struct BufferDataset<S: StorageBackend> {
    buffer: SharedReplayBuffer<S>,
    transform: Compose,
}

impl<S: StorageBackend> BufferDataset<S> {
    /// View `buffer` through `transform`.
    pub fn new(buffer: SharedReplayBuffer<S>, transform: Compose) -> Self {
        Self { buffer, transform }
    }

    /// View `buffer` without transforms.
    pub fn raw(buffer: SharedReplayBuffer<S>) -> Self {
        Self::new(buffer, Compose::identity())
    }

    /// Underlying buffer.
    pub fn buffer(&self) -> &SharedReplayBuffer<S> {
        &self.buffer
    }

    /// Transform pipeline.
    pub fn transform(&self) -> &Compose {
        &self.transform
    }

    /// Untransformed item at `index`.
    pub fn raw_item(&self, index: usize) -> ReplayResult<DatasetItem> {
        Ok(DatasetItem::from_transition(self.buffer.get(index)?))
    }

    /// Record one transition in the underlying buffer.
    pub fn write_buffer_data(
        &self,
        prev_state: AudioSignal,
        action: i64,
        reward: f64,
        new_state: AudioSignal,
        episode: u64,
        step: u64,
    ) -> ReplayResult<()> {
        self.buffer
            .write_buffer_data(prev_state, action, reward, new_state, episode, step)
    }

    /// Held transitions per episode.
    pub fn metadata(&self) -> BTreeMap<u64, usize> {
        self.buffer.metadata()
    }
}

impl<S: StorageBackend> TransitionDataset for BufferDataset<S> {
    fn item_count(&self) -> usize {
        self.buffer.count()
    }

    fn get_item(&self, index: usize) -> ReplayResult<DatasetItem> {
        self.transform.apply(self.raw_item(index)?)
    }
}

impl<S: StorageBackend> Dataset<DatasetItem> for BufferDataset<S> {
    fn get(&self, index: usize) -> Option<DatasetItem> {
        match self.get_item(index) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Failed to load dataset item {}: {}", index, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.item_count()
    }
}
