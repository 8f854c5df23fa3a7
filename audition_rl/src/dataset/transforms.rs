//! Item transforms applied after a transition is read from the buffer.
//!
//! A [`Compose`] pipeline checks at construction that every stage finds the
//! keys it needs, so a misconfigured pipeline fails before the first read.

use std::collections::BTreeSet;
use std::fmt;

use super::item::{AudioArray, DatasetItem, ItemValue, ACTION_KEY, OBSERVATIONS_KEY, REWARD_KEY};
use crate::error::{ReplayError, ReplayResult};

/// Prefix of arrays produced by [`GetAudio`].
pub const MIX_AUDIO_KEY: &str = "mix_audio";

/// One pipeline stage.
pub trait Transform: Send + Sync {
    /// Stage name used in errors.
    fn name(&self) -> &str;

    /// Top-level keys the stage reads.
    fn required_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Top-level keys the stage adds.
    fn produced_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Top-level keys the stage removes.
    fn removed_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Apply the stage to one item.
    fn apply(&self, item: DatasetItem) -> ReplayResult<DatasetItem>;
}

// ============================================================================
// Compose
// ============================================================================

/// Ordered, validated sequence of transforms.
#[derive(Default)]
pub struct Compose {
    stages: Vec<Box<dyn Transform>>,
}

impl Compose {
    /// Pipeline over items produced from transitions.
    pub fn new(stages: Vec<Box<dyn Transform>>) -> ReplayResult<Self> {
        Self::with_input_keys([ACTION_KEY, REWARD_KEY, OBSERVATIONS_KEY], stages)
    }

    /// Pipeline over items that start with `input_keys`.
    ///
    /// Fails with [`ReplayError::InvalidConfig`] if a stage requires a key
    /// no earlier stage provides.
    pub fn with_input_keys<I, K>(input_keys: I, stages: Vec<Box<dyn Transform>>) -> ReplayResult<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut available: BTreeSet<String> = input_keys.into_iter().map(Into::into).collect();
        for stage in &stages {
            for key in stage.required_keys() {
                if !available.contains(&key) {
                    return Err(ReplayError::InvalidConfig(format!(
                        "transform '{}' requires key '{}', available: {:?}",
                        stage.name(),
                        key,
                        available
                    )));
                }
            }
            for key in stage.removed_keys() {
                available.remove(&key);
            }
            available.extend(stage.produced_keys());
        }
        Ok(Self { stages })
    }

    /// Pipeline that returns items unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if there are no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order.
    pub fn apply(&self, item: DatasetItem) -> ReplayResult<DatasetItem> {
        self.stages.iter().try_fold(item, |item, stage| stage.apply(item))
    }
}

impl fmt::Debug for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compose")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Standard separation-model pipeline: [`GetAudio`], [`ToSeparationModel`],
/// then a [`GetExcerpt`] of `excerpt_length` frames on every mix array.
pub fn separation_pipeline<K: Into<String>>(
    mix_keys: impl IntoIterator<Item = K>,
    excerpt_length: usize,
) -> ReplayResult<Compose> {
    let get_audio = GetAudio::new(mix_keys);
    let tf_keys = get_audio.output_keys();
    let excerpt = GetExcerpt::new(excerpt_length, tf_keys, 0)?;
    Compose::new(vec![
        Box::new(get_audio),
        Box::new(ToSeparationModel::new()),
        Box::new(excerpt),
    ])
}

// ============================================================================
// Closure stage
// ============================================================================

type StageFn = dyn Fn(DatasetItem) -> ReplayResult<DatasetItem> + Send + Sync;

/// Stage built from a closure and declared keys.
pub struct FnTransform {
    name: String,
    required: Vec<String>,
    produced: Vec<String>,
    removed: Vec<String>,
    f: Box<StageFn>,
}

impl FnTransform {
    /// Wrap `f` as a stage with no declared keys.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(DatasetItem) -> ReplayResult<DatasetItem> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            required: Vec::new(),
            produced: Vec::new(),
            removed: Vec::new(),
            f: Box::new(f),
        }
    }

    /// Declare a key the closure reads.
    pub fn requires(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    /// Declare a key the closure adds.
    pub fn produces(mut self, key: impl Into<String>) -> Self {
        self.produced.push(key.into());
        self
    }

    /// Declare a key the closure removes.
    pub fn removes(mut self, key: impl Into<String>) -> Self {
        self.removed.push(key.into());
        self
    }
}

impl Transform for FnTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_keys(&self) -> Vec<String> {
        self.required.clone()
    }

    fn produced_keys(&self) -> Vec<String> {
        self.produced.clone()
    }

    fn removed_keys(&self) -> Vec<String> {
        self.removed.clone()
    }

    fn apply(&self, item: DatasetItem) -> ReplayResult<DatasetItem> {
        (self.f)(item)
    }
}

// ============================================================================
// GetAudio
// ============================================================================

/// Pull observation audio into `[channels, frames]` arrays.
///
/// With one key the array is stored as `mix_audio`; with several, each goes
/// to `mix_audio_<key>`. The `observations` group is removed.
#[derive(Debug, Clone)]
pub struct GetAudio {
    mix_keys: Vec<String>,
}

impl GetAudio {
    /// Extract the observation entries named by `mix_keys`.
    pub fn new<K: Into<String>>(mix_keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            mix_keys: mix_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Keys this stage writes, in `mix_keys` order.
    pub fn output_keys(&self) -> Vec<String> {
        match self.mix_keys.as_slice() {
            [_] => vec![MIX_AUDIO_KEY.to_string()],
            keys => keys
                .iter()
                .map(|k| format!("{}_{}", MIX_AUDIO_KEY, k))
                .collect(),
        }
    }
}

impl Transform for GetAudio {
    fn name(&self) -> &str {
        "GetAudio"
    }

    fn required_keys(&self) -> Vec<String> {
        vec![OBSERVATIONS_KEY.to_string()]
    }

    fn produced_keys(&self) -> Vec<String> {
        self.output_keys()
    }

    fn removed_keys(&self) -> Vec<String> {
        vec![OBSERVATIONS_KEY.to_string()]
    }

    fn apply(&self, mut item: DatasetItem) -> ReplayResult<DatasetItem> {
        let observations = match item.remove(OBSERVATIONS_KEY) {
            Some(ItemValue::Group(g)) => g,
            Some(other) => {
                return Err(ReplayError::transform(
                    self.name(),
                    format!("'{}' is {}, expected group", OBSERVATIONS_KEY, other.kind()),
                ))
            }
            None => {
                return Err(ReplayError::transform(
                    self.name(),
                    format!("missing '{}'", OBSERVATIONS_KEY),
                ))
            }
        };

        for (key, out) in self.mix_keys.iter().zip(self.output_keys()) {
            let signal = observations.audio(key).ok_or_else(|| {
                ReplayError::transform(self.name(), format!("no audio under observations.{}", key))
            })?;
            item.insert(out, ItemValue::Array(AudioArray::from_signal(signal)));
        }
        Ok(item)
    }
}

// ============================================================================
// ToSeparationModel
// ============================================================================

/// Transpose every `mix_audio*` array to `[frames, channels]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToSeparationModel;

impl ToSeparationModel {
    /// Create the stage.
    pub fn new() -> Self {
        Self
    }
}

impl Transform for ToSeparationModel {
    fn name(&self) -> &str {
        "ToSeparationModel"
    }

    fn apply(&self, mut item: DatasetItem) -> ReplayResult<DatasetItem> {
        let keys: Vec<String> = item
            .keys()
            .filter(|k| k.starts_with(MIX_AUDIO_KEY))
            .map(str::to_string)
            .collect();
        for key in keys {
            if let Some(ItemValue::Array(array)) = item.get(&key) {
                let transposed = array.transpose();
                item.insert(key, ItemValue::Array(transposed));
            }
        }
        Ok(item)
    }
}

// ============================================================================
// GetExcerpt
// ============================================================================

/// Fixed-length excerpt from the start of each named array.
///
/// Arrays shorter than `excerpt_length` along `time_dim` are zero-padded.
#[derive(Debug, Clone)]
pub struct GetExcerpt {
    excerpt_length: usize,
    tf_keys: Vec<String>,
    time_dim: usize,
}

impl GetExcerpt {
    /// Excerpt `tf_keys` to `excerpt_length` along `time_dim` (0 or 1).
    pub fn new<K: Into<String>>(
        excerpt_length: usize,
        tf_keys: impl IntoIterator<Item = K>,
        time_dim: usize,
    ) -> ReplayResult<Self> {
        if time_dim > 1 {
            return Err(ReplayError::InvalidConfig(format!(
                "time_dim must be 0 or 1, got {}",
                time_dim
            )));
        }
        if excerpt_length == 0 {
            return Err(ReplayError::InvalidConfig(
                "excerpt_length must be > 0".to_string(),
            ));
        }
        Ok(Self {
            excerpt_length,
            tf_keys: tf_keys.into_iter().map(Into::into).collect(),
            time_dim,
        })
    }

    /// Excerpt length in frames.
    pub fn excerpt_length(&self) -> usize {
        self.excerpt_length
    }
}

impl Transform for GetExcerpt {
    fn name(&self) -> &str {
        "GetExcerpt"
    }

    fn required_keys(&self) -> Vec<String> {
        self.tf_keys.clone()
    }

    fn apply(&self, mut item: DatasetItem) -> ReplayResult<DatasetItem> {
        for key in &self.tf_keys {
            let excerpt = match item.get(key) {
                Some(ItemValue::Array(array)) => array.excerpt(self.time_dim, self.excerpt_length),
                Some(other) => {
                    return Err(ReplayError::transform(
                        self.name(),
                        format!("'{}' is {}, expected array", key, other.kind()),
                    ))
                }
                None => return Err(ReplayError::transform(self.name(), format!("missing '{}'", key))),
            };
            item.insert(key.clone(), ItemValue::Array(excerpt));
        }
        Ok(item)
    }
}
