//! # Palimpsest History
//!
//! Index structures over a linear, append-only event log that make the log
//! seekable and undoable without ever deleting anything.
//!
//! ```text
//! ┌──────────────┐  skips   ┌────────────────┐
//! │  GotoIndex   │ ───────▶ │ SnapshotIndex  │
//! │ gotos, skips │          │ checkpoints    │
//! │ keyframes    │          └────────────────┘
//! └──────────────┘
//! ┌──────────────┐
//! │ ModeTimeline │  settings in force per event
//! └──────────────┘
//! ```
//!
//! Undo appends a goto; drawing after an undo marks the undone events as a
//! skip interval. Replay between any two positions is planned from these
//! indices alone.

pub mod error;
pub mod event;
pub mod goto_index;
pub mod index;
pub mod mode_timeline;
pub mod result;
pub mod snapshot_index;

pub use error::HistoryError;
pub use event::{Event, EventIndex, EventKind, Mode, ModePatch};
pub use goto_index::{find_skip, skips_contain, GotoIndex, ReplayPlan, SkipInterval};
pub use index::{GotoOutcome, GotoPolicy, HistoryIndex, HistoryMetadata};
pub use mode_timeline::ModeTimeline;
pub use result::HistoryResult;
pub use snapshot_index::SnapshotIndex;
