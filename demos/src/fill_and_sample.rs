//! Fill and Sample Example
//!
//! A random agent moves around a toy room and records what it hears into a
//! disk-backed replay buffer. The buffer is then sampled episode-balanced and
//! collated into tensors for a separation model.
//!
//! # Pipeline
//!
//! ```text
//! random agent ──write_buffer_data──> ReplayBuffer<DiskBackend>
//!                                          │
//!        EpisodeWeightedSampler ──indices──┤
//!                                          ▼
//!        BufferDataset (GetAudio → ToSeparationModel → GetExcerpt)
//!                                          │
//!                                          ▼
//!        DataLoader + SeparationBatcher ──> SeparationBatch<NdArray>
//! ```

use std::f32::consts::TAU;
use std::sync::Arc;

use burn::backend::NdArray;
use burn::data::dataloader::DataLoaderBuilder;
use rand::Rng;

use audition_rl::dataset::item::{NEW_STATE_KEY, PREV_STATE_KEY};
use audition_rl::dataset::{separation_pipeline, SampledDataset};
use audition_rl::{
    AudioSignal, BufferDataset, EpisodeWeightedSampler, ReplayBuffer, ReplayBufferConfig,
    ReplayResult, SamplerConfig, SeparationBatcher, StorageLayout,
};

// ============================================================================
// Settings
// ============================================================================

type B = NdArray;

const SAMPLE_RATE: u32 = 8000;
const FRAMES_PER_STEP: usize = 4000;
const EXCERPT_FRAMES: usize = 3200;
const NUM_ACTIONS: i64 = 4;
const NUM_EPISODES: u64 = 6;
const MAX_STEPS: u64 = 40;
const BUFFER_CAPACITY: usize = 100;
const BATCH_SIZE: usize = 16;

// ============================================================================
// Toy environment
// ============================================================================

/// Stereo tone whose left/right balance follows the agent's position.
fn listen(position: f32, rng: &mut impl Rng) -> ReplayResult<AudioSignal> {
    let pan = (position.clamp(-1.0, 1.0) + 1.0) / 2.0;
    let mut left = Vec::with_capacity(FRAMES_PER_STEP);
    let mut right = Vec::with_capacity(FRAMES_PER_STEP);
    for i in 0..FRAMES_PER_STEP {
        let tone = (TAU * 440.0 * i as f32 / SAMPLE_RATE as f32).sin() * 0.5;
        let noise: f32 = rng.gen_range(-0.01..0.01);
        left.push(tone * (1.0 - pan) + noise);
        right.push(tone * pan + noise);
    }
    AudioSignal::from_channels(vec![left, right], SAMPLE_RATE)
}

/// Fill a disk buffer with a random agent, then sample and batch it.
pub fn run() -> ReplayResult<()> {
    let root = std::env::temp_dir().join("audition_rl_fill_and_sample");
    let buffer = ReplayBuffer::on_disk(
        StorageLayout::under(&root),
        ReplayBufferConfig::default().with_capacity(BUFFER_CAPACITY),
    )?
    .shared();

    // ========================================================================
    // Fill
    // ========================================================================

    let mut rng = rand::thread_rng();
    for episode in 0..NUM_EPISODES {
        let mut position: f32 = rng.gen_range(-1.0..1.0);
        let mut prev = listen(position, &mut rng)?;
        // Episodes end early when the agent reaches the source.
        let steps = rng.gen_range(5..=MAX_STEPS);

        for step in 0..steps {
            let action = rng.gen_range(0..NUM_ACTIONS);
            position += match action {
                0 => -0.1,
                1 => 0.1,
                _ => 0.0,
            };
            let new = listen(position, &mut rng)?;
            let done = step + 1 == steps;
            let reward = if done { 10.0 } else { -0.1 };

            buffer.write_buffer_data(prev, action, reward, new.clone(), episode, step)?;
            prev = new;
        }
        println!("episode {:>2}: {:>3} steps, buffer {:>3}/{}", episode, steps, buffer.count(), buffer.capacity());
    }

    let stats = buffer.stats();
    println!(
        "writes={} evictions={} eviction_failures={}",
        stats.writes, stats.evictions, stats.eviction_failures
    );
    println!("per-episode counts: {:?}", buffer.metadata());

    // ========================================================================
    // Sample
    // ========================================================================

    let mut sampler = EpisodeWeightedSampler::new(SamplerConfig::default().with_num_samples(64).with_seed(0));
    let indices = sampler.sample(&buffer)?;

    let dataset = BufferDataset::new(
        Arc::clone(&buffer),
        separation_pipeline([PREV_STATE_KEY, NEW_STATE_KEY], EXCERPT_FRAMES)?,
    );
    let sampled = SampledDataset::new(dataset, indices);

    let batcher = SeparationBatcher::new("mix_audio_prev_state").with_next_mix_key("mix_audio_new_state");
    let loader = DataLoaderBuilder::<B, _, _>::new(batcher)
        .batch_size(BATCH_SIZE)
        .build(sampled);

    for (i, batch) in loader.iter().enumerate() {
        let mean_reward = batch.rewards.clone().mean().into_scalar();
        println!("batch {}: mix {:?}, mean reward {:.3}", i, batch.mix.dims(), mean_reward);
    }

    Ok(())
}
