//! Fixed-capacity replay buffer of audio transitions.
//!
//! Key characteristics:
//! - Circular storage, oldest transition overwritten once full
//! - Storage strategy chosen at construction (memory or disk)
//! - Per-episode population tracked for weighted sampling
//! - Reads and writes are serialized by a `parking_lot::RwLock`, so a reader
//!   never sees a half-replaced slot or a slot whose files were just deleted
//!
//! # Data Flow
//!
//! ```text
//! agent loop ──> write_buffer_data ──> StorageBackend::write ──> handle
//!                                                                  │
//!                               ┌──────── write lock ──────────────┤
//!                               │  CircularBuffer::append(slot)    │
//!                               │  evicted slot ──> discard files  │
//!                               └──────────────────────────────────┘
//!
//! training loop ──> get(index) ──> read lock ──> StorageBackend::decode
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::audio_state::AudioSignal;
use crate::core::ring_buffer::CircularBuffer;
use crate::core::transition::AudioTransition;
use crate::error::ReplayResult;
use crate::storage::{DiskBackend, InMemoryBackend, StorageBackend, StorageLayout, StorageMode};

// ============================================================================
// Configuration
// ============================================================================

/// How files of evicted transitions are removed in disk mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Delete exactly the files of the slot being overwritten.
    #[default]
    DirectSlot,
    /// After every write once full, delete the lexicographically first file
    /// of each storage directory.
    ///
    /// Kept for compatibility with buffers written by older tooling. File
    /// names are not zero-padded, so `10-0.json` sorts before `9-0.json` and
    /// the deleted files are not necessarily the oldest ones. The sweep also
    /// runs on the write that fills the buffer, leaving `capacity - 1`
    /// records on disk.
    LexicographicOldest,
}

/// Configuration for the replay buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions held.
    pub capacity: usize,
    /// Disk-mode eviction housekeeping.
    pub eviction: EvictionPolicy,
    /// Remove transitions left in storage by earlier runs at construction.
    ///
    /// A new buffer only evicts what it wrote itself, so leftover records
    /// would otherwise stay on disk beyond `capacity`.
    pub clear_on_start: bool,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            eviction: EvictionPolicy::DirectSlot,
            clear_on_start: true,
        }
    }
}

impl ReplayBufferConfig {
    /// Create a config with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Builder pattern: set capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder pattern: set eviction policy.
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Builder pattern: keep or remove leftover storage at construction.
    pub fn with_clear_on_start(mut self, clear_on_start: bool) -> Self {
        self.clear_on_start = clear_on_start;
        self
    }
}

// ============================================================================
// Buffer
// ============================================================================

/// One ring slot: the backend handle plus where it came from.
#[derive(Debug, Clone, PartialEq)]
struct Slot<H> {
    handle: H,
    episode: u64,
    step: u64,
}

struct BufferState<H> {
    ring: CircularBuffer<Slot<H>>,
    /// Transitions currently held, per episode.
    metadata: BTreeMap<u64, usize>,
    /// Slots currently held, per `(episode, step)`. Equal keys share files.
    live: BTreeMap<(u64, u64), usize>,
}

/// Decrement `map[key]`, dropping the entry at zero. Returns what is left.
fn release<K: Ord>(map: &mut BTreeMap<K, usize>, key: &K) -> usize {
    let remaining = map.get_mut(key).map(|n| {
        *n -= 1;
        *n
    });
    if remaining == Some(0) {
        map.remove(key);
    }
    remaining.unwrap_or(0)
}

/// Counters describing buffer activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Transitions currently held.
    pub len: usize,
    /// Maximum number of transitions.
    pub capacity: usize,
    /// Transitions written since construction.
    pub writes: usize,
    /// Transitions overwritten since construction.
    pub evictions: usize,
    /// Eviction cleanups that failed (logged, not propagated).
    pub eviction_failures: usize,
}

/// Circular replay buffer over a storage backend.
pub struct ReplayBuffer<S: StorageBackend> {
    config: ReplayBufferConfig,
    backend: S,
    state: RwLock<BufferState<S::Handle>>,
    writes: AtomicUsize,
    evictions: AtomicUsize,
    eviction_failures: AtomicUsize,
}

/// Replay buffer keeping transitions in memory.
pub type MemoryReplayBuffer = ReplayBuffer<InMemoryBackend>;

/// Replay buffer persisting transitions to disk.
pub type DiskReplayBuffer = ReplayBuffer<DiskBackend>;

/// Thread-safe shared replay buffer.
pub type SharedReplayBuffer<S> = Arc<ReplayBuffer<S>>;

impl ReplayBuffer<InMemoryBackend> {
    /// Create an in-memory replay buffer.
    pub fn in_memory(config: ReplayBufferConfig) -> ReplayResult<Self> {
        Self::new(InMemoryBackend::new(), config)
    }
}

impl ReplayBuffer<DiskBackend> {
    /// Create a disk-backed replay buffer, creating the storage directories.
    pub fn on_disk(layout: StorageLayout, config: ReplayBufferConfig) -> ReplayResult<Self> {
        Self::new(DiskBackend::new(layout), config)
    }
}

impl<S: StorageBackend> ReplayBuffer<S> {
    /// Create a replay buffer over `backend`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a zero capacity, `DirectoryInit` if the backend
    /// cannot prepare its storage.
    pub fn new(backend: S, config: ReplayBufferConfig) -> ReplayResult<Self> {
        let ring = CircularBuffer::new(config.capacity)?;
        backend.prepare()?;
        if config.clear_on_start {
            let removed = backend.clear()?;
            if removed > 0 {
                log::debug!("Removed {} leftover storage files", removed);
            }
        }
        log::debug!(
            "Replay buffer ready: capacity {}, {:?} storage, {:?} eviction",
            config.capacity,
            backend.mode(),
            config.eviction
        );

        Ok(Self {
            config,
            backend,
            state: RwLock::new(BufferState {
                ring,
                metadata: BTreeMap::new(),
                live: BTreeMap::new(),
            }),
            writes: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
            eviction_failures: AtomicUsize::new(0),
        })
    }

    /// Wrap in an `Arc` for sharing between the agent and training loops.
    pub fn shared(self) -> SharedReplayBuffer<S> {
        Arc::new(self)
    }

    /// Record one transition.
    ///
    /// Persists both states through the backend, appends the handle to the
    /// ring and, when the ring overwrites a slot, removes what backed it.
    /// Cleanup failures are logged and counted, never returned.
    pub fn write_buffer_data(
        &self,
        prev_state: AudioSignal,
        action: i64,
        reward: f64,
        new_state: AudioSignal,
        episode: u64,
        step: u64,
    ) -> ReplayResult<()> {
        let handle = self
            .backend
            .write(prev_state, action, reward, new_state, episode, step)?;

        let mut state = self.state.write();
        let evicted = state.ring.append(Slot {
            handle,
            episode,
            step,
        });
        *state.metadata.entry(episode).or_insert(0) += 1;
        *state.live.entry((episode, step)).or_insert(0) += 1;
        self.writes.fetch_add(1, Ordering::Relaxed);

        if let Some(old) = evicted {
            release(&mut state.metadata, &old.episode);
            let still_held = release(&mut state.live, &(old.episode, old.step));
            self.evictions.fetch_add(1, Ordering::Relaxed);

            if self.config.eviction == EvictionPolicy::DirectSlot {
                if still_held > 0 {
                    // The same (episode, step) was rewritten; its files back a newer slot.
                    log::debug!(
                        "Episode {} step {} evicted but still buffered; keeping its files",
                        old.episode,
                        old.step
                    );
                } else {
                    self.discard_slot(old);
                }
            }
        }

        if self.config.eviction == EvictionPolicy::LexicographicOldest && state.ring.is_full() {
            if let Err(e) = self.backend.sweep_oldest() {
                log::warn!("Eviction sweep failed: {}", e);
                self.eviction_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    fn discard_slot(&self, old: Slot<S::Handle>) {
        log::debug!("Evicting episode {} step {}", old.episode, old.step);
        if let Err(e) = self.backend.discard(old.handle) {
            log::warn!(
                "Could not remove evicted episode {} step {}: {}",
                old.episode,
                old.step,
                e
            );
            self.eviction_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read the transition at logical `index` (0 = oldest).
    ///
    /// The returned transition is a copy; mutating it never affects the buffer.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `index >= count()`, plus any decode error of the backend.
    pub fn get(&self, index: usize) -> ReplayResult<AudioTransition> {
        let state = self.state.read();
        let slot = state.ring.get(index)?;
        self.backend.decode(&slot.handle)
    }

    /// Backend handle stored at logical `index`.
    pub fn handle(&self, index: usize) -> ReplayResult<S::Handle> {
        Ok(self.state.read().ring.get(index)?.handle.clone())
    }

    /// Episode of the transition at logical `index`.
    pub fn episode_of(&self, index: usize) -> ReplayResult<u64> {
        Ok(self.state.read().ring.get(index)?.episode)
    }

    /// Episode of every held transition, oldest first.
    pub fn episodes(&self) -> Vec<u64> {
        self.state.read().ring.iter().map(|s| s.episode).collect()
    }

    /// Number of held transitions per episode.
    pub fn metadata(&self) -> BTreeMap<u64, usize> {
        self.state.read().metadata.clone()
    }

    /// Current number of transitions.
    pub fn count(&self) -> usize {
        self.state.read().ring.count()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the buffer has wrapped into overwrite mode.
    pub fn is_full(&self) -> bool {
        self.state.read().ring.is_full()
    }

    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Get buffer utilization (0.0 to 1.0).
    pub fn utilization(&self) -> f32 {
        self.count() as f32 / self.config.capacity as f32
    }

    /// Storage mode of the backend.
    pub fn mode(&self) -> StorageMode {
        self.backend.mode()
    }

    /// Get the backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReplayBufferConfig {
        &self.config
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            len: self.count(),
            capacity: self.config.capacity,
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            eviction_failures: self.eviction_failures.load(Ordering::Relaxed),
        }
    }
}
