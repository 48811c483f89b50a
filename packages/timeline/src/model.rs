//! # Drawing Model
//!
//! Owns the materialized document and moves it around the event log.
//!
//! ## Cursors
//!
//! - **cursor**: the document and raster reflect every event before this
//!   index, minus skipped ones
//! - **tip**: canonical position of the end of the log
//!
//! They differ after a plain [`DrawingModel::seek`] backwards. Appending
//! content in that state first records a goto from the end of the log to
//! the cursor, so the events in between become a skip interval instead of
//! being replayed or deleted.
//!
//! ## Seek
//!
//! ```text
//! plan = history.plan(cursor, target)
//! revert?  → restore nearest usable checkpoint (or reset to initial)
//! else     → maybe warm-start from a checkpoint far ahead
//! replay cursor..target, stepping over plan.skips
//! repaint
//! ```

use palimpsest_history::{
    skips_contain, Event, EventIndex, EventKind, GotoOutcome, GotoPolicy, HistoryError,
    HistoryIndex, Mode, SkipInterval,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::backend::{Checkpoint, ContentHandler, DrawBackend, StorageBackend};
use crate::config::TimelineConfig;
use crate::errors::{TimelineError, TimelineResult};

/// What an append did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A content or mode event was stored at `index`
    Applied {
        index: EventIndex,
        /// A goto was recorded first to branch off an undone future
        branched: bool,
        /// A checkpoint was written after the event
        checkpointed: bool,
    },

    /// A goto was stored at `index` and the cursor moved
    Navigated { index: EventIndex, cursor: EventIndex },

    /// A malformed goto was dropped
    Ignored,
}

/// Snapshot of where a timeline stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStatus {
    pub cursor: EventIndex,
    pub tip: EventIndex,
    pub event_count: EventIndex,
    pub can_undo: bool,
    pub can_redo: bool,
    pub checkpoints: usize,
}

/// Event-sourced document with undo, redo and arbitrary seeking
pub struct DrawingModel<S, D, H>
where
    S: StorageBackend,
{
    storage: S,
    draw: D,
    handler: H,
    config: TimelineConfig,
    history: HistoryIndex,
    initial_document: S::Document,
    document: S::Document,
    cursor: EventIndex,
    since_checkpoint: usize,
}

impl<S, D, H> DrawingModel<S, D, H>
where
    S: StorageBackend,
    D: DrawBackend<Snapshot = S::Raster>,
    H: ContentHandler<D, Payload = S::Payload, Document = S::Document>,
{
    /// Open a timeline over `storage` and materialize it at its tip.
    ///
    /// The history index is rebuilt from the metadata the storage backend
    /// persisted on its last flush.
    pub async fn open(
        mut storage: S,
        mut draw: D,
        handler: H,
        initial_document: S::Document,
        config: TimelineConfig,
    ) -> TimelineResult<Self> {
        let history = match storage.load_metadata().await? {
            Some(metadata) => HistoryIndex::from_metadata(config.initial_mode.clone(), &metadata)?,
            None => HistoryIndex::new(config.initial_mode.clone()),
        };

        draw.reset(&handler.shape(&initial_document));

        let mut model = Self {
            storage,
            draw,
            handler,
            config,
            history,
            document: initial_document.clone(),
            initial_document,
            cursor: 0,
            since_checkpoint: 0,
        };

        info!(
            events = model.history.event_count(),
            checkpoints = model.history.snapshot_index().len(),
            "opened timeline"
        );

        let tip = model.history.tip();
        if tip != 0 {
            model.seek(tip).await?;
        }
        Ok(model)
    }

    // ── Appending ────────────────────────────────────────────────────────

    /// Record a new event and apply it to the materialized document.
    ///
    /// Nothing is indexed until storage has taken the event. If the write
    /// fails after content was drawn, the document is rebuilt at the cursor.
    #[instrument(skip(self, event), fields(tag = event.kind.tag()))]
    pub async fn append(&mut self, event: Event<S::Payload>) -> TimelineResult<AppendOutcome> {
        if let EventKind::Goto(target) = event.kind {
            return self.navigate(event.time, target).await;
        }

        let tip = self.history.tip();
        let branched = self.cursor != tip;
        if branched {
            debug!(cursor = self.cursor, tip, "branching off undone events");
            self.navigate(event.time, self.cursor).await?;
        }

        let index = self.history.event_count();
        let closes_gesture = event.kind.closes_gesture();
        let keyframe = event.kind.is_keyframe();
        let patch = match &event.kind {
            EventKind::ModePatch(patch) => Some(patch.clone()),
            _ => None,
        };
        let drawn = event.kind.content().is_some();
        if drawn {
            self.apply_content(index, &event.kind).await?;
        }

        if let Err(err) = self.store(event).await {
            if drawn {
                if let Err(rebuild) = self.rematerialize().await {
                    warn!(%rebuild, cursor = self.cursor, "could not rebuild after failed write");
                }
            }
            return Err(err);
        }

        if keyframe {
            self.history.record_keyframe(index)?;
        }
        if let Some(patch) = patch {
            self.history.record_mode_patch(index, &patch)?;
        }
        self.cursor = index + 1;
        self.since_checkpoint += 1;

        let mut checkpointed = false;
        if closes_gesture && self.since_checkpoint >= self.config.checkpoint_interval {
            match self.checkpoint().await {
                Ok(()) => checkpointed = true,
                // The event is stored; the next gesture end tries again
                Err(err) => warn!(%err, index, "checkpoint failed"),
            }
        }

        Ok(AppendOutcome::Applied {
            index,
            branched,
            checkpointed,
        })
    }

    /// Step back to the previous keyframe by appending a goto
    pub async fn undo(&mut self, time: f64) -> TimelineResult<Option<EventIndex>> {
        let Some(target) = self.history.compute_undo(self.cursor) else {
            return Ok(None);
        };
        self.jump(time, target).await
    }

    /// Step forward through the last run of undos by appending a goto.
    ///
    /// After a plain seek away from the last undo there is nothing to redo.
    pub async fn redo(&mut self, time: f64) -> TimelineResult<Option<EventIndex>> {
        let target = match self.history.compute_redo(self.cursor) {
            Ok(Some(target)) => target,
            Ok(None) => return Ok(None),
            Err(err @ HistoryError::CursorDesync { .. }) => {
                debug!(%err, "redo unavailable");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        self.jump(time, target).await
    }

    async fn jump(&mut self, time: f64, target: EventIndex) -> TimelineResult<Option<EventIndex>> {
        match self.append(Event::goto(time, target)).await? {
            AppendOutcome::Navigated { cursor, .. } => Ok(Some(cursor)),
            _ => Ok(None),
        }
    }

    async fn navigate(&mut self, time: f64, target: EventIndex) -> TimelineResult<AppendOutcome> {
        let index = self.history.event_count();
        let canonical = match self.history.check_goto(index, target, self.config.goto_policy)? {
            GotoOutcome::Recorded(canonical) => canonical,
            GotoOutcome::Rejected(_) => return Ok(AppendOutcome::Ignored),
        };

        self.store(Event::goto(time, canonical)).await?;
        self.history.record_goto(index, canonical, GotoPolicy::Strict)?;
        self.seek(canonical).await?;

        Ok(AppendOutcome::Navigated {
            index,
            cursor: self.cursor,
        })
    }

    async fn store(&mut self, event: Event<S::Payload>) -> TimelineResult<()> {
        let actual = self.storage.append_event(event).await?;
        let expected = self.history.advance();
        if actual != expected {
            return Err(TimelineError::IndexMismatch { expected, actual });
        }
        Ok(())
    }

    async fn apply_content(&mut self, index: EventIndex, kind: &EventKind<S::Payload>) -> TimelineResult<()> {
        let mode = self.history.mode_at(index);
        self.handler
            .apply(mode, &mut self.document, &mut self.draw, kind)
            .await
            .map_err(|source| TimelineError::Content { index, source })
    }

    async fn checkpoint(&mut self) -> TimelineResult<()> {
        let index = self.cursor;
        let checkpoint = Checkpoint {
            document: self.document.clone(),
            raster: self.draw.get_snapshot(),
        };
        self.storage.add_checkpoint(index, checkpoint).await?;
        self.history.record_snapshot(index);
        self.since_checkpoint = 0;
        debug!(index, "checkpoint written");
        Ok(())
    }

    // ── Seeking ──────────────────────────────────────────────────────────

    /// Move the materialized document to `target` without recording
    /// anything.
    ///
    /// On failure the cursor stays wherever replay got to.
    #[instrument(skip(self), fields(cursor = self.cursor))]
    pub async fn seek(&mut self, target: EventIndex) -> TimelineResult<()> {
        let len = self.history.event_count();
        if target > len {
            return Err(TimelineError::OutOfRange { target, len });
        }

        let target = self.history.dereference(target);
        if target == self.cursor {
            return Ok(());
        }

        let plan = self.history.plan(self.cursor, target)?;
        match plan.revert {
            Some(revert) => {
                let checkpoint = self.history.nearest_snapshot(revert, &plan.skips);
                debug!(revert, checkpoint, "reverting");
                self.restore(checkpoint).await?;
            }
            None => self.warm_start(target, &plan.skips).await?,
        }

        self.replay(target, &plan.skips).await?;
        self.draw.repaint();
        Ok(())
    }

    async fn warm_start(&mut self, target: EventIndex, skips: &[SkipInterval]) -> TimelineResult<()> {
        let checkpoint = self.history.nearest_snapshot(target, skips);
        if checkpoint > self.cursor && checkpoint - self.cursor >= self.config.warm_start_threshold {
            debug!(from = self.cursor, checkpoint, "warm start");
            self.restore(checkpoint).await?;
        }
        Ok(())
    }

    async fn restore(&mut self, index: EventIndex) -> TimelineResult<()> {
        if index == 0 {
            self.document = self.initial_document.clone();
            self.draw.reset(&self.handler.shape(&self.document));
            self.cursor = 0;
            return Ok(());
        }

        let checkpoint = self.storage.get_checkpoint(index).await?;
        self.draw.load_snapshot(&checkpoint.raster, &mut self.storage).await?;
        self.document = checkpoint.document;
        self.cursor = index;
        Ok(())
    }

    /// Rebuild the document at the cursor from the nearest checkpoint
    async fn rematerialize(&mut self) -> TimelineResult<()> {
        let target = self.cursor;
        let skips = self.history.skips_before(target).to_vec();
        let checkpoint = self.history.nearest_snapshot(target, &skips);
        self.restore(checkpoint).await?;
        self.replay(target, &skips).await?;
        self.draw.repaint();
        Ok(())
    }

    async fn replay(&mut self, target: EventIndex, skips: &[SkipInterval]) -> TimelineResult<()> {
        while self.cursor < target {
            let index = self.cursor;
            if !skips_contain(skips, index) {
                let event = self.storage.get_event(index).await?;
                if event.kind.content().is_some() {
                    self.apply_content(index, &event.kind).await?;
                }
            }
            self.cursor = index + 1;
        }
        Ok(())
    }

    /// Persist the history metadata and flush storage
    pub async fn flush(&mut self) -> TimelineResult<()> {
        self.storage.save_metadata(&self.history.metadata()).await?;
        self.storage.flush().await?;
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn cursor(&self) -> EventIndex {
        self.cursor
    }

    pub fn tip(&self) -> EventIndex {
        self.history.tip()
    }

    pub fn next_index(&self) -> EventIndex {
        self.history.event_count()
    }

    pub fn document(&self) -> &S::Document {
        &self.document
    }

    /// Settings the next content event will be drawn with
    pub fn mode(&self) -> &Mode {
        self.history.mode_at(self.history.event_count())
    }

    pub fn history(&self) -> &HistoryIndex {
        &self.history
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn draw(&self) -> &D {
        &self.draw
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn status(&self) -> TimelineStatus {
        TimelineStatus {
            cursor: self.cursor,
            tip: self.history.tip(),
            event_count: self.history.event_count(),
            can_undo: self.history.compute_undo(self.cursor).is_some(),
            can_redo: matches!(self.history.compute_redo(self.cursor), Ok(Some(_))),
            checkpoints: self.history.snapshot_index().len(),
        }
    }

    /// Take the collaborators back, e.g. to reopen the same storage
    pub fn into_parts(self) -> (S, D, H) {
        (self.storage, self.draw, self.handler)
    }
}
