//! Dataset view over the replay buffer for model training.
//!
//! ```text
//! ReplayBuffer ──get(i)──> DatasetItem { action, reward, observations }
//!                              │
//!                              ▼  Compose [GetAudio, ToSeparationModel, GetExcerpt]
//!                          DatasetItem { action, reward, mix_audio* }
//!                              │
//!                              ▼  SeparationBatcher
//!                          SeparationBatch<B>
//! ```
//!
//! [`EpisodeWeightedSampler`] draws indices so that every episode is sampled
//! equally often; [`SampledDataset`] feeds those draws to a burn dataloader.

pub mod adapter;
pub mod batcher;
pub mod item;
pub mod sampler;
pub mod transforms;

pub use adapter::{BufferDataset, TransitionDataset};
pub use batcher::{SeparationBatch, SeparationBatcher};
pub use item::{AudioArray, DatasetItem, ItemValue};
pub use sampler::{EpisodeWeightedSampler, SampledDataset, SamplerConfig};
pub use transforms::{
    separation_pipeline, Compose, FnTransform, GetAudio, GetExcerpt, ToSeparationModel, Transform,
};
