use thiserror::Error;

use crate::event::EventIndex;

/// Errors raised by the history indices.
///
/// Everything except `MalformedGoto` means the recorded log is corrupt or a
/// caller broke a contract; those are not recoverable at runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("keyframe {index} recorded after keyframe {last}")]
    KeyframeOrder { index: EventIndex, last: EventIndex },

    #[error("mode change at {index} recorded after mode change at {last}")]
    ModeOrder { index: EventIndex, last: EventIndex },

    #[error("malformed goto from {from} to {to}")]
    MalformedGoto { from: EventIndex, to: EventIndex },

    #[error("invalid start/end for replay plan: {start} -> {end}")]
    InvalidPlanEndpoints { start: EventIndex, end: EventIndex },

    #[error("redo requested from {cursor} but last goto landed on {expected}")]
    CursorDesync {
        cursor: EventIndex,
        expected: EventIndex,
    },
}

impl HistoryError {
    /// Whether this error only rejects a single navigation event rather than
    /// signalling a corrupt log.
    pub fn is_soft(&self) -> bool {
        matches!(self, HistoryError::MalformedGoto { .. })
    }
}
