//! JSON index records and file naming for on-disk transitions.
//!
//! Each transition written in disk mode produces three files:
//!
//! ```text
//! <prev_states_dir>/prev<episode>-<step>.wav
//! <new_states_dir>/new<episode>-<step>.wav
//! <items_dir>/<episode>-<step>.json
//! ```
//!
//! The JSON record points at the two audio files:
//!
//! ```json
//! {"prev_state": "../data/prev_states/prev8-224.wav",
//!  "action": 0,
//!  "reward": -0.1,
//!  "new_state": "../data/new_states/new8-224.wav"}
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::transition::PathTransition;
use crate::error::{ReplayError, ReplayResult};

/// On-disk index record of one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Path of the previous-state `.wav` file
    pub prev_state: PathBuf,
    /// Action index
    pub action: i64,
    /// Reward
    pub reward: f64,
    /// Path of the new-state `.wav` file
    pub new_state: PathBuf,
}

impl From<PathTransition> for TransitionRecord {
    fn from(t: PathTransition) -> Self {
        Self {
            prev_state: t.prev_state,
            action: t.action,
            reward: t.reward,
            new_state: t.new_state,
        }
    }
}

impl From<TransitionRecord> for PathTransition {
    fn from(r: TransitionRecord) -> Self {
        PathTransition::new(r.prev_state, r.action, r.reward, r.new_state)
    }
}

/// File name of the previous-state audio for `(episode, step)`.
pub fn prev_state_file_name(episode: u64, step: u64) -> String {
    format!("prev{}-{}.wav", episode, step)
}

/// File name of the new-state audio for `(episode, step)`.
pub fn new_state_file_name(episode: u64, step: u64) -> String {
    format!("new{}-{}.wav", episode, step)
}

/// File name of the index record for `(episode, step)`.
pub fn record_file_name(episode: u64, step: u64) -> String {
    format!("{}-{}.json", episode, step)
}

/// Serialize a record to `path`, replacing any existing file.
pub fn write_record(path: &Path, record: &TransitionRecord) -> ReplayResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, record).map_err(|e| ReplayError::Serialization {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush()?;
    Ok(())
}

/// Load a record from `path`.
///
/// # Errors
///
/// `MissingFile` if the record does not exist, `Serialization` if it is not a
/// valid record.
pub fn read_record(path: &Path) -> ReplayResult<TransitionRecord> {
    let file = File::open(path).map_err(|e| ReplayError::from_io_at(e, path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ReplayError::Serialization {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
