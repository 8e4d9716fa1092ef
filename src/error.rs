//! Error types for the WOOT engine
//!
//! Every failure the engine reports to its caller is a [`WootError`].
//! Operations whose causal preconditions are missing are *not* errors:
//! they surface as [`ApplyOutcome::NotYetApplicable`](crate::crdt::woot::ApplyOutcome)
//! and get parked in the waiting pool.

use crate::crdt::woot::ContentId;
use std::path::PathBuf;
use thiserror::Error;

/// Which local edit a position check belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditKind::Insert => write!(f, "insert"),
            EditKind::Delete => write!(f, "delete"),
        }
    }
}

/// Errors raised by the logical clock
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("clock I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt clock file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// Engine-level error
#[derive(Debug, Error)]
pub enum WootError {
    /// Local edit outside the visible range of the content
    #[error("invalid {op} position {position} for content {content_id} (visible size {visible_size})")]
    InvalidPosition {
        op: EditKind,
        position: usize,
        visible_size: usize,
        content_id: ContentId,
    },

    /// Page or object name missing from a content id
    #[error("invalid content id: {0}")]
    InvalidContentId(String),

    /// Engines need a non-empty site id to stamp operations
    #[error("site id must not be empty")]
    InvalidSiteId,

    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    /// State archive could not be decoded or unpacked
    #[error("corrupt state archive: {0}")]
    Archive(String),
}

impl WootError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WootError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, WootError>;
