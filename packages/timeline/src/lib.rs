//! # Palimpsest Timeline
//!
//! Event-sourced drawing timeline: every action is appended to a log that
//! is never rewritten, and the visible document is whatever replaying that
//! log up to a cursor produces.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ TimelineHandle: FIFO of commands            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ DrawingModel: append / seek / undo / redo   │
//! │  - history: gotos, skips, keyframes, modes  │
//! │  - checkpoints bound replay cost            │
//! └─────────────────────────────────────────────┘
//!          ↓                ↓               ↓
//! ┌────────────────┐ ┌─────────────┐ ┌────────────────┐
//! │ StorageBackend │ │ DrawBackend │ │ ContentHandler │
//! └────────────────┘ └─────────────┘ └────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The log is the source of truth**: document and raster are derived
//! 2. **Undo is an event**: it appends a goto, nothing is deleted
//! 3. **Drawing after undo branches**: the undone events become a skip interval
//! 4. **One lane per document**: commands run strictly in submission order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use palimpsest_timeline::{DrawingModel, Event, MemoryStorage, TimelineConfig, TimelineHandle};
//!
//! let config = TimelineConfig::load_from_dir(".")?;
//! let model = DrawingModel::open(MemoryStorage::new(), canvas, brush, Scene::default(), config).await?;
//! let (timeline, _task) = TimelineHandle::spawn(model);
//!
//! timeline.append(Event::gesture_start(0.0, dab)).await?;
//! timeline.append(Event::gesture_end(16.0, lift)).await?;
//! timeline.undo(32.0).await?;
//! ```

mod backend;
mod config;
mod errors;
mod handle;
mod memory;
mod model;

pub use backend::{
    CanvasShape, Checkpoint, ContentHandler, DrawBackend, LayerId, Region, Rgba, StorageBackend,
    TileLink, TileSource, Transform,
};
pub use config::{TimelineConfig, DEFAULT_CONFIG_NAME};
pub use errors::{ConfigError, ContentError, DrawError, StorageError, TimelineError, TimelineResult};
pub use handle::{SeekOutcome, TimelineHandle};
pub use memory::MemoryStorage;
pub use model::{AppendOutcome, DrawingModel, TimelineStatus};

// Re-export history types for convenience
pub use palimpsest_history::{
    Event, EventIndex, EventKind, GotoPolicy, HistoryError, HistoryIndex, HistoryMetadata, Mode,
    ModePatch,
};
