//! Replay buffer error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors that can occur while recording or reading transitions.
#[derive(Debug)]
pub enum ReplayError {
    /// Index is not below the current number of stored transitions
    OutOfRange {
        /// Requested index
        index: usize,
        /// Number of transitions held when the request was made
        count: usize,
    },
    /// A referenced `.wav` or index record no longer exists
    MissingFile(PathBuf),
    /// A storage directory could not be created
    DirectoryInit {
        /// Directory that failed
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// Malformed or unwritable JSON index record
    Serialization {
        /// Record path
        path: PathBuf,
        /// Parser / writer message
        message: String,
    },
    /// WAV encoding or decoding error
    Audio(String),
    /// Invalid configuration
    InvalidConfig(String),
    /// A transform stage rejected an item
    Transform {
        /// Stage name
        stage: String,
        /// What went wrong
        message: String,
    },
    /// Other I/O error
    Io(io::Error),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::OutOfRange { index, count } => {
                write!(f, "Index {} out of range for buffer holding {} items", index, count)
            }
            ReplayError::MissingFile(path) => write!(f, "Missing file: {:?}", path),
            ReplayError::DirectoryInit { path, source } => {
                write!(f, "Cannot create directory {:?}: {}", path, source)
            }
            ReplayError::Serialization { path, message } => {
                write!(f, "Serialization error in {:?}: {}", path, message)
            }
            ReplayError::Audio(msg) => write!(f, "Audio error: {}", msg),
            ReplayError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ReplayError::Transform { stage, message } => {
                write!(f, "Transform '{}' failed: {}", stage, message)
            }
            ReplayError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::DirectoryInit { source, .. } => Some(source),
            ReplayError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(err: io::Error) -> Self {
        ReplayError::Io(err)
    }
}

impl From<hound::Error> for ReplayError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => ReplayError::Io(e),
            other => ReplayError::Audio(other.to_string()),
        }
    }
}

impl ReplayError {
    /// Map an I/O error on `path` to `MissingFile` when the file is absent.
    pub(crate) fn from_io_at(err: io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            ReplayError::MissingFile(path.into())
        } else {
            ReplayError::Io(err)
        }
    }

    /// Shorthand for transform stage failures.
    pub(crate) fn transform(stage: &str, message: impl Into<String>) -> Self {
        ReplayError::Transform {
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for replay buffer operations.
pub type ReplayResult<T> = Result<T, ReplayError>;
