//! Disk storage: `.wav` states plus JSON index records.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::codec::{self, TransitionRecord};
use super::{StorageBackend, StorageMode};
use crate::core::audio_state::AudioSignal;
use crate::core::transition::{AudioTransition, StatePair, Transition};
use crate::error::{ReplayError, ReplayResult};

/// Directories used by disk storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageLayout {
    /// Previous-state `.wav` files.
    pub prev_states_dir: PathBuf,
    /// New-state `.wav` files.
    pub new_states_dir: PathBuf,
    /// JSON index records.
    pub items_dir: PathBuf,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::under("../data")
    }
}

impl StorageLayout {
    /// Standard layout below `root`: `prev_states/`, `new_states/`, `dataset_items/`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            prev_states_dir: root.join("prev_states"),
            new_states_dir: root.join("new_states"),
            items_dir: root.join("dataset_items"),
        }
    }

    /// Set the previous-state directory.
    pub fn with_prev_states_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prev_states_dir = dir.into();
        self
    }

    /// Set the new-state directory.
    pub fn with_new_states_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.new_states_dir = dir.into();
        self
    }

    /// Set the index-record directory.
    pub fn with_items_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.items_dir = dir.into();
        self
    }

    /// All three directories, in `prev`, `new`, `items` order.
    pub fn dirs(&self) -> [&Path; 3] {
        [&self.prev_states_dir, &self.new_states_dir, &self.items_dir]
    }

    /// Path of the previous-state file for `(episode, step)`.
    pub fn prev_state_path(&self, episode: u64, step: u64) -> PathBuf {
        self.prev_states_dir.join(codec::prev_state_file_name(episode, step))
    }

    /// Path of the new-state file for `(episode, step)`.
    pub fn new_state_path(&self, episode: u64, step: u64) -> PathBuf {
        self.new_states_dir.join(codec::new_state_file_name(episode, step))
    }

    /// Path of the index record for `(episode, step)`.
    pub fn record_path(&self, episode: u64, step: u64) -> PathBuf {
        self.items_dir.join(codec::record_file_name(episode, step))
    }
}

/// Writes states as `.wav` files and transitions as JSON index records.
///
/// Directories are created on first use.
#[derive(Debug)]
pub struct DiskBackend {
    layout: StorageLayout,
    prepared: AtomicBool,
}

impl DiskBackend {
    /// Create a disk backend over `layout`. No directories are touched yet.
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            prepared: AtomicBool::new(false),
        }
    }

    /// Get the directory layout.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Number of index records currently on disk.
    pub fn record_count(&self) -> ReplayResult<usize> {
        Ok(sorted_file_names(&self.layout.items_dir)?.len())
    }

    fn ensure_prepared(&self) -> ReplayResult<()> {
        if self.prepared.load(Ordering::Acquire) {
            return Ok(());
        }
        self.prepare()
    }
}

impl StorageBackend for DiskBackend {
    type StateRef = PathBuf;
    type Handle = PathBuf;

    fn mode(&self) -> StorageMode {
        StorageMode::Disk
    }

    fn prepare(&self) -> ReplayResult<()> {
        for dir in self.layout.dirs() {
            if !dir.is_dir() {
                log::debug!("Creating storage directory {:?}", dir);
            }
            fs::create_dir_all(dir).map_err(|source| ReplayError::DirectoryInit {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        self.prepared.store(true, Ordering::Release);
        Ok(())
    }

    fn persist(
        &self,
        prev_state: AudioSignal,
        new_state: AudioSignal,
        episode: u64,
        step: u64,
    ) -> ReplayResult<StatePair<PathBuf>> {
        self.ensure_prepared()?;

        let prev = self.layout.prev_state_path(episode, step);
        let new = self.layout.new_state_path(episode, step);
        prev_state.write(&prev)?;
        new_state.write(&new)?;

        Ok(StatePair { prev, new })
    }

    fn delete(&self, states: &StatePair<PathBuf>) -> ReplayResult<()> {
        let first = remove_file(&states.prev).err();
        let second = remove_file(&states.new).err();
        first.or(second).map_or(Ok(()), Err)
    }

    fn encode(
        &self,
        transition: Transition<PathBuf>,
        episode: u64,
        step: u64,
    ) -> ReplayResult<PathBuf> {
        self.ensure_prepared()?;

        let path = self.layout.record_path(episode, step);
        codec::write_record(&path, &TransitionRecord::from(transition))?;
        Ok(path)
    }

    fn decode(&self, handle: &PathBuf) -> ReplayResult<AudioTransition> {
        let record = codec::read_record(handle)?;
        Transition::from(record).map_states(AudioSignal::load)
    }

    /// Delete the index record and both audio files it points at.
    ///
    /// Every file is attempted; the first failure is returned.
    fn discard(&self, handle: PathBuf) -> ReplayResult<()> {
        let states_result = match codec::read_record(&handle) {
            Ok(record) => self.delete(&StatePair {
                prev: record.prev_state,
                new: record.new_state,
            }),
            Err(e) => Err(e),
        };
        let record_result = remove_file(&handle);
        states_result.and(record_result)
    }

    /// Remove `.wav` states and `.json` records. Other files are left alone.
    fn clear(&self) -> ReplayResult<usize> {
        self.ensure_prepared()?;
        let targets = [
            (&self.layout.prev_states_dir, "wav"),
            (&self.layout.new_states_dir, "wav"),
            (&self.layout.items_dir, "json"),
        ];
        let mut removed = 0;
        for (dir, extension) in targets {
            for name in sorted_file_names(dir)? {
                let path = dir.join(&name);
                if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                    remove_file(&path)?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn sweep_oldest(&self) -> ReplayResult<usize> {
        let mut removed = 0;
        for dir in self.layout.dirs() {
            let Some(oldest) = sorted_file_names(dir)?.into_iter().next() else {
                continue;
            };
            match remove_file(&dir.join(&oldest)) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Could not sweep {:?} from {:?}: {}", oldest, dir, e),
            }
        }
        Ok(removed)
    }
}

fn remove_file(path: &Path) -> ReplayResult<()> {
    fs::remove_file(path).map_err(|e| ReplayError::from_io_at(e, path))
}

/// File names in `dir`, sorted lexicographically.
fn sorted_file_names(dir: &Path) -> ReplayResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}
