//! Episode-balanced sampling.
//!
//! Each held transition is weighted by `1 / n`, where `n` is the number of
//! held transitions from its episode, so every episode contributes equally
//! regardless of length.

use std::collections::BTreeMap;

use burn::data::dataset::Dataset;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::buffers::ReplayBuffer;
use crate::error::{ReplayError, ReplayResult};
use crate::storage::StorageBackend;

/// Sampler settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Draws per call; `None` draws as many as there are items.
    pub num_samples: Option<usize>,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl SamplerConfig {
    /// Set the number of draws.
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = Some(num_samples);
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Draws buffer indices with replacement, weighted by inverse episode size.
#[derive(Debug)]
pub struct EpisodeWeightedSampler {
    num_samples: Option<usize>,
    rng: StdRng,
}

impl EpisodeWeightedSampler {
    /// Create a sampler.
    pub fn new(config: SamplerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            num_samples: config.num_samples,
            rng,
        }
    }

    /// Weight of each item given its episode.
    pub fn weights(episodes: &[u64]) -> Vec<f64> {
        let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
        for ep in episodes {
            *counts.entry(*ep).or_insert(0) += 1;
        }
        episodes
            .iter()
            .map(|ep| 1.0 / counts[ep] as f64)
            .collect()
    }

    /// Draw indices into `episodes`.
    pub fn sample_episodes(&mut self, episodes: &[u64]) -> ReplayResult<Vec<usize>> {
        if episodes.is_empty() {
            return Ok(Vec::new());
        }
        let n = self.num_samples.unwrap_or(episodes.len());
        let dist = WeightedIndex::new(Self::weights(episodes))
            .map_err(|e| ReplayError::InvalidConfig(format!("sample weights: {}", e)))?;
        Ok((0..n).map(|_| dist.sample(&mut self.rng)).collect())
    }

    /// Draw logical indices into `buffer`.
    ///
    /// Weights come from a single snapshot of the buffer's episodes.
    pub fn sample<S: StorageBackend>(&mut self, buffer: &ReplayBuffer<S>) -> ReplayResult<Vec<usize>> {
        self.sample_episodes(&buffer.episodes())
    }
}

/// Dataset that reads `inner` at pre-drawn indices.
pub struct SampledDataset<D> {
    inner: D,
    indices: Vec<usize>,
}

impl<D> SampledDataset<D> {
    /// Read `inner` at `indices`, in order.
    pub fn new(inner: D, indices: Vec<usize>) -> Self {
        Self { inner, indices }
    }

    /// Drawn indices.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl<D, I> Dataset<I> for SampledDataset<D>
where
    D: Dataset<I>,
{
    fn get(&self, index: usize) -> Option<I> {
        self.inner.get(*self.indices.get(index)?)
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::ReplayBufferConfig;
    use crate::core::audio_state::AudioSignal;
    use burn::data::dataset::InMemDataset;

    fn signal() -> AudioSignal {
        AudioSignal::mono(vec![0.0; 4], 8000).unwrap()
    }

    #[test]
    fn test_weights_are_inverse_episode_size() {
        let w = EpisodeWeightedSampler::weights(&[0, 0, 0, 1]);
        assert_eq!(w.len(), 4);
        assert!((w[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(w[3], 1.0);
        let total: f64 = w.iter().sum();
        assert!((total - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_buffer_gives_empty_sample() {
        let buffer = ReplayBuffer::in_memory(ReplayBufferConfig::new(4)).unwrap();
        let mut sampler = EpisodeWeightedSampler::new(SamplerConfig::default().with_num_samples(10));
        assert!(sampler.sample(&buffer).unwrap().is_empty());
    }

    #[test]
    fn test_sample_size_and_range() {
        let buffer = ReplayBuffer::in_memory(ReplayBufferConfig::new(8)).unwrap();
        for step in 0..5 {
            buffer.write_buffer_data(signal(), 0, 0.0, signal(), step % 2, step).unwrap();
        }

        let mut sampler = EpisodeWeightedSampler::new(SamplerConfig::default().with_seed(7));
        let drawn = sampler.sample(&buffer).unwrap();
        assert_eq!(drawn.len(), 5);
        assert!(drawn.iter().all(|&i| i < 5));

        let mut sampler = EpisodeWeightedSampler::new(SamplerConfig::default().with_num_samples(12));
        assert_eq!(sampler.sample(&buffer).unwrap().len(), 12);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let episodes = [0, 0, 1, 2, 2, 2];
        let config = SamplerConfig::default().with_num_samples(32).with_seed(42);
        let a = EpisodeWeightedSampler::new(config.clone()).sample_episodes(&episodes).unwrap();
        let b = EpisodeWeightedSampler::new(config).sample_episodes(&episodes).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_episodes_drawn_evenly() {
        // Episode 0 holds 9 items, episode 1 holds one.
        let mut episodes = vec![0u64; 9];
        episodes.push(1);
        let mut sampler =
            EpisodeWeightedSampler::new(SamplerConfig::default().with_num_samples(20_000).with_seed(3));

        let drawn = sampler.sample_episodes(&episodes).unwrap();
        let from_one = drawn.iter().filter(|&&i| i == 9).count() as f64 / drawn.len() as f64;
        assert!((from_one - 0.5).abs() < 0.03, "episode 1 share was {}", from_one);
    }

    #[test]
    fn test_sampled_dataset_reads_drawn_indices() {
        let inner = InMemDataset::new(vec!["a", "b", "c"]);
        let sampled = SampledDataset::new(inner, vec![2, 2, 0]);

        assert_eq!(sampled.len(), 3);
        assert_eq!(sampled.get(0), Some("c"));
        assert_eq!(sampled.get(2), Some("a"));
        assert_eq!(sampled.get(3), None);
    }
}
