//! Collate transformed items into burn tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use super::item::{DatasetItem, ACTION_KEY, REWARD_KEY};
use super::transforms::MIX_AUDIO_KEY;

/// Batched model input.
#[derive(Debug, Clone)]
pub struct SeparationBatch<B: Backend> {
    /// Mix audio `[batch, frames, channels]`.
    pub mix: Tensor<B, 3>,
    /// Second mix (e.g. the next state) with the same shape, if configured.
    pub next_mix: Option<Tensor<B, 3>>,
    /// Actions `[batch]`.
    pub actions: Tensor<B, 1, Int>,
    /// Rewards `[batch]`.
    pub rewards: Tensor<B, 1>,
}

/// Stacks `[frames, channels]` arrays into a [`SeparationBatch`].
///
/// Items missing a key, or whose array shape differs from the first
/// accepted item, are skipped with a warning.
#[derive(Debug, Clone)]
pub struct SeparationBatcher {
    mix_key: String,
    next_mix_key: Option<String>,
}

impl Default for SeparationBatcher {
    fn default() -> Self {
        Self::new(MIX_AUDIO_KEY)
    }
}

impl SeparationBatcher {
    /// Batch the array stored under `mix_key`.
    pub fn new(mix_key: impl Into<String>) -> Self {
        Self {
            mix_key: mix_key.into(),
            next_mix_key: None,
        }
    }

    /// Also batch the array stored under `key` as `next_mix`.
    pub fn with_next_mix_key(mut self, key: impl Into<String>) -> Self {
        self.next_mix_key = Some(key.into());
        self
    }
}

struct Columns {
    shape: Option<[usize; 2]>,
    mix: Vec<f32>,
    next_mix: Vec<f32>,
    actions: Vec<i32>,
    rewards: Vec<f32>,
}

impl SeparationBatcher {
    fn accept(&self, item: &DatasetItem, cols: &mut Columns) -> Result<(), String> {
        let mix = item
            .array(&self.mix_key)
            .ok_or_else(|| format!("missing array '{}'", self.mix_key))?;
        let next = match &self.next_mix_key {
            Some(key) => Some(item.array(key).ok_or_else(|| format!("missing array '{}'", key))?),
            None => None,
        };
        let action = item
            .int(ACTION_KEY)
            .ok_or_else(|| format!("missing '{}'", ACTION_KEY))?;
        let reward = item
            .float(REWARD_KEY)
            .ok_or_else(|| format!("missing '{}'", REWARD_KEY))?;

        let shape = *cols.shape.get_or_insert(mix.shape());
        if mix.shape() != shape || next.is_some_and(|n| n.shape() != shape) {
            return Err(format!("shape {:?} differs from batch shape {:?}", mix.shape(), shape));
        }

        cols.mix.extend_from_slice(mix.data());
        if let Some(next) = next {
            cols.next_mix.extend_from_slice(next.data());
        }
        cols.actions.push(action as i32);
        cols.rewards.push(reward as f32);
        Ok(())
    }
}

impl<B: Backend> Batcher<B, DatasetItem, SeparationBatch<B>> for SeparationBatcher {
    fn batch(&self, items: Vec<DatasetItem>, device: &B::Device) -> SeparationBatch<B> {
        let mut cols = Columns {
            shape: None,
            mix: Vec::new(),
            next_mix: Vec::new(),
            actions: Vec::with_capacity(items.len()),
            rewards: Vec::with_capacity(items.len()),
        };

        for (i, item) in items.iter().enumerate() {
            let first = cols.shape.is_none();
            if let Err(reason) = self.accept(item, &mut cols) {
                log::warn!("Skipping batch item {}: {}", i, reason);
                // A rejected first item must not fix the batch shape.
                if first {
                    cols.shape = None;
                }
            }
        }

        let batch = cols.actions.len();
        let [frames, channels] = cols.shape.unwrap_or([0, 0]);

        let mix = Tensor::<B, 1>::from_floats(cols.mix.as_slice(), device).reshape([batch, frames, channels]);
        let next_mix = self.next_mix_key.as_ref().map(|_| {
            Tensor::<B, 1>::from_floats(cols.next_mix.as_slice(), device).reshape([batch, frames, channels])
        });
        let actions = Tensor::<B, 1, Int>::from_ints(cols.actions.as_slice(), device);
        let rewards = Tensor::<B, 1>::from_floats(cols.rewards.as_slice(), device);

        SeparationBatch {
            mix,
            next_mix,
            actions,
            rewards,
        }
    }
}
