//! Keyed items exchanged between dataset transforms.
//!
//! A freshly read transition becomes:
//!
//! ```text
//! {
//!   "action":       Int,
//!   "reward":       Float,
//!   "observations": Group { "prev_state": Audio, "new_state": Audio },
//! }
//! ```
//!
//! Transforms then pull audio out of `observations` into named arrays.

use std::collections::BTreeMap;

use crate::core::audio_state::AudioSignal;
use crate::core::transition::AudioTransition;
use crate::error::{ReplayError, ReplayResult};

/// Key of the action entry.
pub const ACTION_KEY: &str = "action";
/// Key of the reward entry.
pub const REWARD_KEY: &str = "reward";
/// Key of the observation group.
pub const OBSERVATIONS_KEY: &str = "observations";
/// Key of the previous state inside `observations`.
pub const PREV_STATE_KEY: &str = "prev_state";
/// Key of the new state inside `observations`.
pub const NEW_STATE_KEY: &str = "new_state";

/// Row-major 2-D `f32` array.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArray {
    shape: [usize; 2],
    data: Vec<f32>,
}

impl AudioArray {
    /// Create an array from row-major data.
    pub fn new(shape: [usize; 2], data: Vec<f32>) -> ReplayResult<Self> {
        if shape[0] * shape[1] != data.len() {
            return Err(ReplayError::InvalidConfig(format!(
                "shape {:?} does not match {} elements",
                shape,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Array of zeros.
    pub fn zeros(shape: [usize; 2]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape[0] * shape[1]],
        }
    }

    /// `[channels, frames]` view of a signal's samples.
    pub fn from_signal(signal: &AudioSignal) -> Self {
        Self {
            shape: [signal.num_channels(), signal.num_frames()],
            data: signal.data().to_vec(),
        }
    }

    /// Shape as `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Row-major data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume into row-major data.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.shape[0] && col < self.shape[1] {
            Some(self.data[row * self.shape[1] + col])
        } else {
            None
        }
    }

    /// Swap rows and columns.
    pub fn transpose(&self) -> Self {
        let [rows, cols] = self.shape;
        let mut data = vec![0.0; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                data[c * rows + r] = self.data[r * cols + c];
            }
        }
        Self {
            shape: [cols, rows],
            data,
        }
    }

    /// Fixed-length excerpt along `axis`, keeping the start.
    ///
    /// Longer arrays are truncated on the right, shorter ones zero-padded.
    ///
    /// # Panics
    ///
    /// Panics if `axis > 1`.
    pub fn excerpt(&self, axis: usize, length: usize) -> Self {
        assert!(axis < 2, "axis {} out of range for a 2-D array", axis);
        let [rows, cols] = self.shape;
        let shape = if axis == 0 { [length, cols] } else { [rows, length] };
        let mut out = Self::zeros(shape);
        let keep_rows = if axis == 0 { rows.min(length) } else { rows };
        let keep_cols = if axis == 1 { cols.min(length) } else { cols };
        for r in 0..keep_rows {
            let src = &self.data[r * cols..r * cols + keep_cols];
            out.data[r * shape[1]..r * shape[1] + keep_cols].copy_from_slice(src);
        }
        out
    }
}

/// Value stored under one item key.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    /// Audio signal
    Audio(AudioSignal),
    /// Numeric array (model input)
    Array(AudioArray),
    /// Integer scalar
    Int(i64),
    /// Real scalar
    Float(f64),
    /// Nested item
    Group(DatasetItem),
}

impl ItemValue {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemValue::Audio(_) => "audio",
            ItemValue::Array(_) => "array",
            ItemValue::Int(_) => "int",
            ItemValue::Float(_) => "float",
            ItemValue::Group(_) => "group",
        }
    }
}

/// Ordered string-keyed map of item values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetItem {
    entries: BTreeMap<String, ItemValue>,
}

impl DatasetItem {
    /// Create an empty item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Item for a decoded transition, states grouped under `observations`.
    pub fn from_transition(transition: AudioTransition) -> Self {
        let (observations, action, reward) = transition.into_observations();

        let mut group = DatasetItem::new();
        group.insert(PREV_STATE_KEY, ItemValue::Audio(observations.prev_state));
        group.insert(NEW_STATE_KEY, ItemValue::Audio(observations.new_state));

        let mut item = DatasetItem::new();
        item.insert(ACTION_KEY, ItemValue::Int(action));
        item.insert(REWARD_KEY, ItemValue::Float(reward));
        item.insert(OBSERVATIONS_KEY, ItemValue::Group(group));
        item
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: ItemValue) -> Option<ItemValue> {
        self.entries.insert(key.into(), value)
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<ItemValue> {
        self.entries.remove(key)
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&ItemValue> {
        self.entries.get(key)
    }

    /// Check if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Audio value under `key`.
    pub fn audio(&self, key: &str) -> Option<&AudioSignal> {
        match self.get(key)? {
            ItemValue::Audio(a) => Some(a),
            _ => None,
        }
    }

    /// Array value under `key`.
    pub fn array(&self, key: &str) -> Option<&AudioArray> {
        match self.get(key)? {
            ItemValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Integer value under `key`.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            ItemValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Real value under `key`. Integers are widened.
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            ItemValue::Float(v) => Some(*v),
            ItemValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Nested item under `key`.
    pub fn group(&self, key: &str) -> Option<&DatasetItem> {
        match self.get(key)? {
            ItemValue::Group(g) => Some(g),
            _ => None,
        }
    }
}
