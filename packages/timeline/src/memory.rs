//! # In-memory storage
//!
//! A [`StorageBackend`] that keeps everything in process. Used for tests,
//! benchmarks and documents that are never persisted.
//!
//! Every `get_event` is counted per index, so callers can check how much
//! replay a seek actually cost. Writes can be switched to fail to exercise
//! error paths.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use palimpsest_history::{Event, EventIndex, HistoryMetadata};

use crate::backend::{Checkpoint, StorageBackend, TileLink, TileSource};
use crate::errors::StorageError;

pub struct MemoryStorage<P, D, R> {
    events: Vec<Event<P>>,
    checkpoints: BTreeMap<EventIndex, Checkpoint<D, R>>,
    tiles: HashMap<TileLink, Vec<u8>>,
    metadata: Option<HistoryMetadata>,
    fetches: HashMap<EventIndex, usize>,
    flushes: usize,
    fail_writes: bool,
    fail_checkpoints: bool,
}

impl<P, D, R> MemoryStorage<P, D, R> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            checkpoints: BTreeMap::new(),
            tiles: HashMap::new(),
            metadata: None,
            fetches: HashMap::new(),
            flushes: 0,
            fail_writes: false,
            fail_checkpoints: false,
        }
    }

    pub fn insert_tile(&mut self, link: TileLink, bytes: Vec<u8>) {
        self.tiles.insert(link, bytes);
    }

    pub fn events(&self) -> &[Event<P>] {
        &self.events
    }

    pub fn checkpoint_indices(&self) -> Vec<EventIndex> {
        self.checkpoints.keys().copied().collect()
    }

    pub fn metadata(&self) -> Option<&HistoryMetadata> {
        self.metadata.as_ref()
    }

    /// How many times `get_event(index)` has been called
    pub fn fetch_count(&self, index: EventIndex) -> usize {
        self.fetches.get(&index).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.values().sum()
    }

    pub fn reset_fetch_counts(&mut self) {
        self.fetches.clear();
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Make `append_event` and `save_metadata` fail until switched back
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn set_fail_checkpoints(&mut self, fail: bool) {
        self.fail_checkpoints = fail;
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Backend("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl<P, D, R> Default for MemoryStorage<P, D, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, D, R> fmt::Debug for MemoryStorage<P, D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("events", &self.events.len())
            .field("checkpoints", &self.checkpoints.len())
            .field("tiles", &self.tiles.len())
            .finish()
    }
}

#[async_trait]
impl<P, D, R> TileSource for MemoryStorage<P, D, R>
where
    P: Send,
    D: Send,
    R: Send,
{
    async fn fetch_tile(&mut self, link: &TileLink) -> Result<Vec<u8>, StorageError> {
        self.tiles
            .get(link)
            .cloned()
            .ok_or_else(|| StorageError::TileNotFound(link.clone()))
    }
}

#[async_trait]
impl<P, D, R> StorageBackend for MemoryStorage<P, D, R>
where
    P: Clone + fmt::Debug + Send + Sync + 'static,
    D: Clone + fmt::Debug + Send + Sync + 'static,
    R: Clone + fmt::Debug + Send + Sync + 'static,
{
    type Payload = P;
    type Document = D;
    type Raster = R;

    async fn append_event(&mut self, event: Event<P>) -> Result<EventIndex, StorageError> {
        self.check_writable()?;
        self.events.push(event);
        Ok(self.events.len() - 1)
    }

    async fn get_event(&mut self, index: EventIndex) -> Result<Event<P>, StorageError> {
        *self.fetches.entry(index).or_insert(0) += 1;
        self.events
            .get(index)
            .cloned()
            .ok_or(StorageError::EventNotFound(index))
    }

    async fn add_checkpoint(
        &mut self,
        index: EventIndex,
        checkpoint: Checkpoint<D, R>,
    ) -> Result<(), StorageError> {
        if self.fail_checkpoints {
            return Err(StorageError::Backend(format!("checkpoint {} rejected", index)));
        }
        self.checkpoints.insert(index, checkpoint);
        Ok(())
    }

    async fn get_checkpoint(&mut self, index: EventIndex) -> Result<Checkpoint<D, R>, StorageError> {
        self.checkpoints
            .get(&index)
            .cloned()
            .ok_or(StorageError::CheckpointNotFound(index))
    }

    async fn load_metadata(&mut self) -> Result<Option<HistoryMetadata>, StorageError> {
        Ok(self.metadata.clone())
    }

    async fn save_metadata(&mut self, metadata: &HistoryMetadata) -> Result<(), StorageError> {
        self.check_writable()?;
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), StorageError> {
        self.flushes += 1;
        Ok(())
    }
}
