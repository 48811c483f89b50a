//! Error types for the timeline

use palimpsest_history::{EventIndex, HistoryError};
use thiserror::Error;

use crate::backend::{LayerId, TileLink};

/// Boxed failure from a content handler
pub type ContentError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Event not found: {0}")]
    EventNotFound(EventIndex),

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(EventIndex),

    #[error("Tile not found: {0}")]
    TileNotFound(TileLink),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("Unknown layer: {0}")]
    UnknownLayer(LayerId),

    #[error("Tile fetch failed: {0}")]
    Tile(#[from] StorageError),

    #[error("Draw backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Draw error: {0}")]
    Draw(#[from] DrawError),

    #[error("Content handler failed at event {index}: {source}")]
    Content {
        index: EventIndex,
        #[source]
        source: ContentError,
    },

    #[error("Storage assigned index {actual}, expected {expected}")]
    IndexMismatch {
        expected: EventIndex,
        actual: EventIndex,
    },

    #[error("Seek target {target} is past the end of the log ({len} events)")]
    OutOfRange { target: EventIndex, len: EventIndex },

    #[error("Timeline is shut down")]
    Shutdown,
}

pub type TimelineResult<T> = Result<T, TimelineError>;
