//! Test backends shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use palimpsest_timeline::{
    CanvasShape, ContentError, ContentHandler, DrawBackend, DrawError, DrawingModel, EventKind,
    LayerId, MemoryStorage, Mode, Region, Rgba, TileLink, TileSource, TimelineConfig, Transform,
};

/// One dab of paint; `id` identifies it in logs
#[derive(Debug, Clone, PartialEq)]
pub struct Dab {
    pub id: u32,
    pub layer: LayerId,
}

pub fn dab(id: u32) -> Dab {
    Dab { id, layer: 0 }
}

/// Structured document: the dabs that are currently visible
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sketch {
    pub dabs: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterSnapshot {
    pub fills: Vec<(LayerId, Rgba)>,
    pub tiles: Vec<TileLink>,
}

/// Draw backend that records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub shape: Option<CanvasShape>,
    pub fills: Vec<(LayerId, Rgba)>,
    pub transform: Transform,
    pub repaints: usize,
    pub resets: usize,
    pub snapshot_loads: usize,
}

#[async_trait]
impl DrawBackend for RecordingCanvas {
    type Snapshot = RasterSnapshot;

    fn fill(&mut self, layer: LayerId, _region: &Region, color: Rgba) -> Result<(), DrawError> {
        let layers = self.shape.map(|shape| shape.layers).unwrap_or(0);
        if layer >= layers {
            return Err(DrawError::UnknownLayer(layer));
        }
        self.fills.push((layer, color));
        Ok(())
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn repaint(&mut self) {
        self.repaints += 1;
    }

    async fn load_snapshot(
        &mut self,
        snapshot: &RasterSnapshot,
        tiles: &mut dyn TileSource,
    ) -> Result<(), DrawError> {
        for link in &snapshot.tiles {
            tiles.fetch_tile(link).await?;
        }
        self.fills = snapshot.fills.clone();
        self.snapshot_loads += 1;
        Ok(())
    }

    fn get_snapshot(&mut self) -> RasterSnapshot {
        RasterSnapshot {
            fills: self.fills.clone(),
            tiles: Vec::new(),
        }
    }

    fn reset(&mut self, shape: &CanvasShape) {
        self.shape = Some(*shape);
        self.fills.clear();
        self.transform = Transform::IDENTITY;
        self.resets += 1;
    }
}

/// Content handler that paints every dab as a small square and logs it
#[derive(Debug, Default)]
pub struct DabHandler {
    /// Every dab id passed to `apply`, in call order
    pub applied: Vec<u32>,
    /// Fail when this dab id is applied
    pub fail_on: Option<u32>,
}

#[async_trait]
impl ContentHandler<RecordingCanvas> for DabHandler {
    type Payload = Dab;
    type Document = Sketch;

    fn shape(&self, _document: &Sketch) -> CanvasShape {
        CanvasShape {
            width: 64,
            height: 64,
            layers: 2,
        }
    }

    async fn apply(
        &mut self,
        mode: &Mode,
        document: &mut Sketch,
        draw: &mut RecordingCanvas,
        event: &EventKind<Dab>,
    ) -> Result<(), ContentError> {
        let Some(dab) = event.content() else {
            return Ok(());
        };
        if self.fail_on == Some(dab.id) {
            return Err(format!("dab {} rejected", dab.id).into());
        }

        let color = match mode.get("color").and_then(|value| value.as_str()) {
            Some("red") => Rgba::new(255, 0, 0, 255),
            _ => Rgba::BLACK,
        };
        let region = Region::Rect {
            x: dab.id as f32,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        };
        draw.fill(dab.layer, &region, color)?;

        document.dabs.push(dab.id);
        self.applied.push(dab.id);
        Ok(())
    }
}

pub type Storage = MemoryStorage<Dab, Sketch, RasterSnapshot>;
pub type Model = DrawingModel<Storage, RecordingCanvas, DabHandler>;

pub async fn open(config: TimelineConfig) -> Model {
    open_with(Storage::new(), config).await
}

pub async fn open_with(storage: Storage, config: TimelineConfig) -> Model {
    DrawingModel::open(
        storage,
        RecordingCanvas::default(),
        DabHandler::default(),
        Sketch::default(),
        config,
    )
    .await
    .expect("timeline should open")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
