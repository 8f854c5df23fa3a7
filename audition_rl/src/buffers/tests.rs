//! Behavioral test suite for the replay buffer.
//!
//! Test categories:
//! 1. Insertion order and wrap-around (both storage modes)
//! 2. Range errors and copy semantics
//! 3. Disk persistence, round trips and eviction housekeeping
//! 4. Legacy lexicographic sweep
//! 5. Concurrency (writer and reader threads sharing one buffer)

use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::tempdir;

use super::*;
use crate::core::audio_state::AudioSignal;
use crate::error::ReplayError;
use crate::storage::{DiskBackend, StorageBackend, StorageLayout};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Stereo signal whose samples encode `tag`, so states are distinguishable.
fn tagged_signal(tag: usize) -> AudioSignal {
    let left: Vec<f32> = (0..32).map(|i| tag as f32 + i as f32 * 1e-3).collect();
    let right: Vec<f32> = (0..32).map(|i| -(tag as f32) - i as f32 * 1e-3).collect();
    AudioSignal::from_channels(vec![left, right], 8000).unwrap()
}

/// Write transition `i` (action = i, reward = i / 10, episode 0, step i).
fn write_tagged<S: StorageBackend>(buffer: &ReplayBuffer<S>, i: usize) {
    buffer
        .write_buffer_data(
            tagged_signal(2 * i),
            i as i64,
            i as f64 / 10.0,
            tagged_signal(2 * i + 1),
            0,
            i as u64,
        )
        .unwrap();
}

fn memory_buffer(capacity: usize) -> MemoryReplayBuffer {
    ReplayBuffer::in_memory(ReplayBufferConfig::new(capacity)).unwrap()
}

fn disk_buffer(root: &std::path::Path, config: ReplayBufferConfig) -> DiskReplayBuffer {
    ReplayBuffer::on_disk(StorageLayout::under(root), config).unwrap()
}

fn count_files(dir: &std::path::Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

// =============================================================================
// ORDER AND WRAP-AROUND
// =============================================================================

mod order_tests {
    use super::*;

    #[test]
    fn under_capacity_keeps_insertion_order() {
        let buffer = memory_buffer(10);
        for i in 0..7 {
            write_tagged(&buffer, i);
        }

        assert_eq!(buffer.count(), 7);
        assert!(!buffer.is_full());
        for i in 0..7 {
            assert_eq!(buffer.get(i).unwrap().action, i as i64);
        }
    }

    #[test]
    fn over_capacity_keeps_most_recent() {
        let buffer = memory_buffer(4);
        for i in 0..11 {
            write_tagged(&buffer, i);
            assert!(buffer.count() <= 4);
        }

        assert_eq!(buffer.count(), 4);
        assert!(buffer.is_full());
        // Oldest survivor is the (N - capacity)-th insert
        assert_eq!(buffer.get(0).unwrap().action, 7);
        assert_eq!(buffer.get(3).unwrap().action, 10);
    }

    #[test]
    fn capacity_three_five_writes_memory() {
        let buffer = memory_buffer(3);
        for i in 0..5 {
            write_tagged(&buffer, i);
        }

        assert_eq!(buffer.count(), 3);
        assert_eq!(buffer.get(0).unwrap().action, 2);
        assert_eq!(buffer.get(1).unwrap().action, 3);
        assert_eq!(buffer.get(2).unwrap().action, 4);
        assert_eq!(buffer.get(2).unwrap().new_state, tagged_signal(9));
    }

    #[test]
    fn capacity_three_five_writes_disk() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(3));
        for i in 0..5 {
            write_tagged(&buffer, i);
        }

        assert_eq!(buffer.count(), 3);
        for (index, expected) in [(0, 2), (1, 3), (2, 4)] {
            let t = buffer.get(index).unwrap();
            assert_eq!(t.action, expected);
            assert_eq!(t.prev_state, tagged_signal(2 * expected as usize));
        }
    }
}

// =============================================================================
// RANGE ERRORS AND COPY SEMANTICS
// =============================================================================

mod access_tests {
    use super::*;

    #[test]
    fn get_past_count_is_out_of_range() {
        let buffer = memory_buffer(5);
        write_tagged(&buffer, 0);
        write_tagged(&buffer, 1);

        match buffer.get(3) {
            Err(ReplayError::OutOfRange { index: 3, count: 2 }) => {}
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        assert!(buffer.get(2).is_err());
        assert!(buffer.handle(2).is_err());
    }

    #[test]
    fn empty_buffer_has_nothing_to_get() {
        let buffer = memory_buffer(5);
        assert!(buffer.is_empty());
        assert!(matches!(buffer.get(0), Err(ReplayError::OutOfRange { .. })));
    }

    #[test]
    fn returned_transition_does_not_alias_buffer() {
        let buffer = memory_buffer(3);
        write_tagged(&buffer, 1);

        let mut first = buffer.get(0).unwrap();
        first.reward = 1234.0;
        first.action = -1;

        let second = buffer.get(0).unwrap();
        assert_eq!(second.reward, 0.1);
        assert_eq!(second.action, 1);
    }
}

// =============================================================================
// DISK PERSISTENCE
// =============================================================================

mod disk_tests {
    use super::*;

    #[test]
    fn round_trip_is_bit_exact() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(8));

        let prev = tagged_signal(11);
        let new = tagged_signal(12);
        buffer
            .write_buffer_data(prev.clone(), 3, -0.25, new.clone(), 4, 17)
            .unwrap();

        let t = buffer.get(0).unwrap();
        assert_eq!(t.prev_state, prev);
        assert_eq!(t.new_state, new);
        assert_eq!(t.action, 3);
        assert_eq!(t.reward, -0.25);
        assert_eq!(buffer.handle(0).unwrap(), dir.path().join("dataset_items/4-17.json"));
    }

    #[test]
    fn directory_initialization_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("data");

        let first = disk_buffer(&root, ReplayBufferConfig::new(2));
        let second = disk_buffer(&root, ReplayBufferConfig::new(2));
        second.backend().prepare().unwrap();

        assert_eq!(count_files(&root), 3);
        assert_eq!(first.backend().layout(), second.backend().layout());
    }

    #[test]
    fn eviction_never_exceeds_capacity() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(4));
        let layout = buffer.backend().layout().clone();

        for i in 0..13 {
            write_tagged(&buffer, i);
            assert!(count_files(&layout.items_dir) <= 4);
            assert!(count_files(&layout.prev_states_dir) <= 4);
            assert!(count_files(&layout.new_states_dir) <= 4);
        }

        assert_eq!(buffer.backend().record_count().unwrap(), 4);
        assert_eq!(buffer.stats().evictions, 9);
        assert_eq!(buffer.stats().eviction_failures, 0);
        // Every held transition is still readable
        for i in 0..4 {
            assert_eq!(buffer.get(i).unwrap().action, 9 + i as i64);
        }
    }

    #[test]
    fn eviction_follows_slots_not_file_names() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(2));

        // Episode 10 sorts before episode 9 by name, but 9 is older
        for (episode, step) in [(9, 0), (10, 0), (11, 0)] {
            buffer
                .write_buffer_data(tagged_signal(0), 0, 0.0, tagged_signal(1), episode, step)
                .unwrap();
        }

        assert!(!dir.path().join("dataset_items/9-0.json").exists());
        assert!(dir.path().join("dataset_items/10-0.json").exists());
        assert!(dir.path().join("dataset_items/11-0.json").exists());
        assert!(buffer.get(0).is_ok());
        assert!(buffer.get(1).is_ok());
    }

    #[test]
    fn missing_files_on_eviction_are_not_fatal() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(2));
        write_tagged(&buffer, 0);
        write_tagged(&buffer, 1);

        fs::remove_file(dir.path().join("prev_states/prev0-0.wav")).unwrap();
        write_tagged(&buffer, 2);

        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.stats().eviction_failures, 1);
        // The record itself was still removed
        assert!(!dir.path().join("dataset_items/0-0.json").exists());
    }

    #[test]
    fn reading_an_externally_deleted_state_fails() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(2));
        write_tagged(&buffer, 0);

        fs::remove_file(dir.path().join("new_states/new0-0.wav")).unwrap();
        assert!(matches!(buffer.get(0), Err(ReplayError::MissingFile(_))));
    }

    #[test]
    fn malformed_record_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(2));
        write_tagged(&buffer, 0);

        fs::write(dir.path().join("dataset_items/0-0.json"), "not json").unwrap();
        assert!(matches!(buffer.get(0), Err(ReplayError::Serialization { .. })));
    }

    #[test]
    fn rewriting_a_buffered_step_keeps_its_files() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(1));

        write_tagged(&buffer, 0);
        write_tagged(&buffer, 0);

        assert_eq!(buffer.count(), 1);
        assert!(buffer.get(0).is_ok());
    }

    #[test]
    fn evicting_an_older_copy_of_a_rewritten_step_keeps_its_files() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), ReplayBufferConfig::new(3));

        // (0, 0) is written twice; the fourth write evicts the older copy
        for i in [0, 1, 0, 2] {
            write_tagged(&buffer, i);
        }

        assert_eq!(buffer.count(), 3);
        for i in 0..3 {
            assert!(buffer.get(i).is_ok(), "slot {} unreadable", i);
        }
        assert_eq!(buffer.get(1).unwrap().action, 0);
        assert!(dir.path().join("dataset_items/0-0.json").exists());
        assert_eq!(buffer.stats().eviction_failures, 0);

        // Once the last copy leaves the ring its files go too
        write_tagged(&buffer, 3);
        write_tagged(&buffer, 4);
        assert!(!dir.path().join("dataset_items/0-0.json").exists());
        assert!(!dir.path().join("prev_states/prev0-0.wav").exists());
        assert_eq!(buffer.backend().record_count().unwrap(), 3);
        for i in 0..3 {
            assert!(buffer.get(i).is_ok());
        }
    }

    #[test]
    fn reopened_storage_never_exceeds_new_capacity() {
        let dir = tempdir().unwrap();
        {
            let first = disk_buffer(dir.path(), ReplayBufferConfig::new(8));
            for i in 0..4 {
                write_tagged(&first, i);
            }
        }

        let second = disk_buffer(dir.path(), ReplayBufferConfig::new(2));
        assert_eq!(second.backend().record_count().unwrap(), 0);
        for i in 10..20 {
            write_tagged(&second, i);
            assert!(second.backend().record_count().unwrap() <= 2);
        }
        assert_eq!(second.backend().record_count().unwrap(), 2);
        assert_eq!(count_files(&dir.path().join("prev_states")), 2);
    }

    #[test]
    fn reopened_storage_can_keep_leftovers() {
        let dir = tempdir().unwrap();
        {
            let first = disk_buffer(dir.path(), ReplayBufferConfig::new(8));
            for i in 0..4 {
                write_tagged(&first, i);
            }
        }

        let config = ReplayBufferConfig::new(2).with_clear_on_start(false);
        let second = disk_buffer(dir.path(), config);
        assert_eq!(second.backend().record_count().unwrap(), 4);
        assert!(second.is_empty());
    }

    #[test]
    fn unwritable_storage_root_fails_at_construction() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let result = ReplayBuffer::new(
            DiskBackend::new(StorageLayout::under(&blocker)),
            ReplayBufferConfig::new(2),
        );
        assert!(matches!(result, Err(ReplayError::DirectoryInit { .. })));
    }
}

// =============================================================================
// LEGACY LEXICOGRAPHIC SWEEP
// =============================================================================

mod legacy_sweep_tests {
    use super::*;

    fn legacy_config(capacity: usize) -> ReplayBufferConfig {
        ReplayBufferConfig::new(capacity).with_eviction(EvictionPolicy::LexicographicOldest)
    }

    #[test]
    fn sweep_starts_on_the_filling_write() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), legacy_config(3));

        write_tagged(&buffer, 0);
        write_tagged(&buffer, 1);
        assert_eq!(buffer.backend().record_count().unwrap(), 2);

        write_tagged(&buffer, 2);
        assert_eq!(buffer.backend().record_count().unwrap(), 2);

        for i in 3..8 {
            write_tagged(&buffer, i);
            assert_eq!(buffer.backend().record_count().unwrap(), 2);
        }
        assert_eq!(buffer.count(), 3);
    }

    #[test]
    fn sweep_can_remove_live_records() {
        let dir = tempdir().unwrap();
        let buffer = disk_buffer(dir.path(), legacy_config(2));

        for episode in [9, 10] {
            buffer
                .write_buffer_data(tagged_signal(0), 0, 0.0, tagged_signal(1), episode, 0)
                .unwrap();
        }

        // "10-0.json" < "9-0.json": the newest record was swept
        assert!(dir.path().join("dataset_items/9-0.json").exists());
        assert!(buffer.get(0).is_ok());
        assert!(matches!(buffer.get(1), Err(ReplayError::MissingFile(_))));
    }

    #[test]
    fn memory_mode_ignores_sweep() {
        let buffer = ReplayBuffer::in_memory(legacy_config(2)).unwrap();
        for i in 0..5 {
            write_tagged(&buffer, i);
        }
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.get(1).unwrap().action, 4);
    }
}

// =============================================================================
// CONCURRENCY
// =============================================================================

mod concurrency_tests {
    use super::*;

    #[test]
    fn replay_buffers_should_be_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryReplayBuffer>();
        assert_send_sync::<DiskReplayBuffer>();
    }

    #[test]
    fn reader_never_sees_evicted_files() {
        let dir = tempdir().unwrap();
        let buffer = Arc::new(disk_buffer(dir.path(), ReplayBufferConfig::new(3)));

        let writer_buffer = Arc::clone(&buffer);
        let writer = thread::spawn(move || {
            for i in 0..60 {
                write_tagged(&writer_buffer, i);
                thread::yield_now();
            }
        });

        let reader_buffer = Arc::clone(&buffer);
        let reader = thread::spawn(move || {
            let mut reads = 0;
            for _ in 0..300 {
                let count = reader_buffer.count();
                for i in 0..count {
                    match reader_buffer.get(i) {
                        Ok(_) => reads += 1,
                        // Only possible if count was stale, never a missing file
                        Err(ReplayError::OutOfRange { .. }) => {}
                        Err(e) => panic!("reader saw {}", e),
                    }
                }
                thread::yield_now();
            }
            reads
        });

        writer.join().unwrap();
        reader.join().unwrap();

        assert_eq!(buffer.count(), 3);
        assert_eq!(buffer.backend().record_count().unwrap(), 3);
        assert_eq!(buffer.stats().eviction_failures, 0);
    }

    #[test]
    fn concurrent_writers_respect_capacity() {
        let buffer = Arc::new(memory_buffer(16));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..25 {
                        write_tagged(&buffer, t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = buffer.stats();
        assert_eq!(stats.len, 16);
        assert_eq!(stats.writes, 100);
        assert_eq!(stats.evictions, 84);
        assert_eq!(buffer.metadata().values().sum::<usize>(), 16);
    }
}
