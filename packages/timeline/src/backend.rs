//! # Backends
//!
//! The timeline never touches pixels or disk itself. It talks to three
//! collaborators:
//!
//! - [`StorageBackend`]: the event log, checkpoints, raster tiles and the
//!   persisted history metadata
//! - [`DrawBackend`]: the raster surface
//! - [`ContentHandler`]: interprets content events against the document and
//!   the raster
//!
//! All three may be asynchronous. The timeline awaits every call in order,
//! so implementations never see overlapping calls from one timeline.

use std::fmt;

use async_trait::async_trait;
use palimpsest_history::{Event, EventIndex, EventKind, HistoryMetadata, Mode};
use serde::{Deserialize, Serialize};

use crate::errors::{ContentError, DrawError, StorageError};

/// Drawing layer identifier
pub type LayerId = u32;

/// Address of a stored raster tile
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileLink(pub String);

impl TileLink {
    pub fn new(link: impl Into<String>) -> Self {
        Self(link.into())
    }
}

impl fmt::Display for TileLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
}

/// Area to fill on a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Region {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Polygon {
        points: Vec<[f32; 2]>,
    },
}

/// 2D affine transform `[a c e; b d f]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Dimensions and layer count the raster is rebuilt with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasShape {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

/// Full state at a cursor position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<D, R> {
    pub document: D,
    pub raster: R,
}

/// Anything raster tiles can be fetched from
#[async_trait]
pub trait TileSource: Send {
    async fn fetch_tile(&mut self, link: &TileLink) -> Result<Vec<u8>, StorageError>;
}

/// Persistent home of the event log
#[async_trait]
pub trait StorageBackend: TileSource {
    /// Opaque content payload
    type Payload: Clone + fmt::Debug + Send + Sync + 'static;

    /// Structured document state saved in checkpoints
    type Document: Clone + fmt::Debug + Send + Sync + 'static;

    /// Raster snapshot saved in checkpoints
    type Raster: Clone + fmt::Debug + Send + Sync + 'static;

    /// Append an event and return the index it was stored at
    async fn append_event(&mut self, event: Event<Self::Payload>) -> Result<EventIndex, StorageError>;

    async fn get_event(&mut self, index: EventIndex) -> Result<Event<Self::Payload>, StorageError>;

    async fn add_checkpoint(
        &mut self,
        index: EventIndex,
        checkpoint: Checkpoint<Self::Document, Self::Raster>,
    ) -> Result<(), StorageError>;

    async fn get_checkpoint(
        &mut self,
        index: EventIndex,
    ) -> Result<Checkpoint<Self::Document, Self::Raster>, StorageError>;

    /// Index metadata persisted by the last flush, if any
    async fn load_metadata(&mut self) -> Result<Option<HistoryMetadata>, StorageError>;

    async fn save_metadata(&mut self, metadata: &HistoryMetadata) -> Result<(), StorageError>;

    async fn flush(&mut self) -> Result<(), StorageError>;
}

/// Raster surface
#[async_trait]
pub trait DrawBackend: Send {
    type Snapshot: Clone + fmt::Debug + Send + Sync + 'static;

    fn fill(&mut self, layer: LayerId, region: &Region, color: Rgba) -> Result<(), DrawError>;

    fn set_transform(&mut self, transform: Transform);

    /// Push pending changes to the screen
    fn repaint(&mut self);

    /// Replace the raster with a snapshot, fetching its tiles from `tiles`
    async fn load_snapshot(
        &mut self,
        snapshot: &Self::Snapshot,
        tiles: &mut dyn TileSource,
    ) -> Result<(), DrawError>;

    fn get_snapshot(&mut self) -> Self::Snapshot;

    /// Clear everything and resize to `shape`
    fn reset(&mut self, shape: &CanvasShape);
}

/// Interprets content events
#[async_trait]
pub trait ContentHandler<D: DrawBackend>: Send {
    type Payload: Send + Sync;
    type Document: Send + Sync;

    /// Canvas shape for a document, used when the raster is rebuilt
    fn shape(&self, document: &Self::Document) -> CanvasShape;

    /// Apply one content event. `event` is never a goto or a mode patch.
    async fn apply(
        &mut self,
        mode: &Mode,
        document: &mut Self::Document,
        draw: &mut D,
        event: &EventKind<Self::Payload>,
    ) -> Result<(), ContentError>;
}
