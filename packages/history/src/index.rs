//! # History Index
//!
//! The three indices a timeline needs, kept in step with the event log.
//!
//! The index is rebuilt at load time from [`HistoryMetadata`], a compact
//! blob persisted next to the events. Loading replays the blob through the
//! same `record_*` calls used while events are appended live, so both paths
//! produce the same structures.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::event::{EventIndex, Mode, ModePatch};
use crate::goto_index::{GotoIndex, ReplayPlan, SkipInterval};
use crate::mode_timeline::ModeTimeline;
use crate::result::HistoryResult;
use crate::snapshot_index::SnapshotIndex;

/// What to do with a goto that does not jump backwards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GotoPolicy {
    /// Log it and carry on without recording it
    #[default]
    Lenient,

    /// Fail the append
    Strict,
}

/// Result of recording a goto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GotoOutcome {
    /// Recorded; holds the canonical target
    Recorded(EventIndex),

    /// Rejected under [`GotoPolicy::Lenient`]; holds the target unchanged
    Rejected(EventIndex),
}

impl GotoOutcome {
    pub fn target(&self) -> EventIndex {
        match self {
            GotoOutcome::Recorded(target) | GotoOutcome::Rejected(target) => *target,
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, GotoOutcome::Recorded(_))
    }
}

/// Persisted form of a [`HistoryIndex`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMetadata {
    /// Number of events in the log
    pub event_count: EventIndex,

    /// `(source, canonical target)` per goto
    pub gotos: Vec<(EventIndex, EventIndex)>,

    pub keyframes: Vec<EventIndex>,

    /// `(index, value)` per mode change
    pub modes: Vec<(EventIndex, Mode)>,

    /// Cursor positions with a checkpoint
    pub snapshots: Vec<EventIndex>,
}

#[derive(Debug, Clone)]
pub struct HistoryIndex {
    gotos: GotoIndex,
    snapshots: SnapshotIndex,
    modes: ModeTimeline<Mode>,
    event_count: EventIndex,
}

impl HistoryIndex {
    pub fn new(initial_mode: Mode) -> Self {
        Self {
            gotos: GotoIndex::new(),
            snapshots: SnapshotIndex::new(),
            modes: ModeTimeline::new(initial_mode),
            event_count: 0,
        }
    }

    /// Rebuild an index from its persisted form
    pub fn from_metadata(initial_mode: Mode, metadata: &HistoryMetadata) -> HistoryResult<Self> {
        let mut index = Self::new(initial_mode);

        for &(source, target) in &metadata.gotos {
            index.record_goto(source, target, GotoPolicy::Strict)?;
        }
        for &keyframe in &metadata.keyframes {
            index.record_keyframe(keyframe)?;
        }
        for (at, mode) in &metadata.modes {
            index.record_mode(*at, mode.clone())?;
        }
        for &snapshot in &metadata.snapshots {
            index.record_snapshot(snapshot);
        }
        index.event_count = metadata.event_count;

        Ok(index)
    }

    pub fn metadata(&self) -> HistoryMetadata {
        HistoryMetadata {
            event_count: self.event_count,
            gotos: self.gotos.gotos().collect(),
            keyframes: self.gotos.keyframes().to_vec(),
            modes: self.modes.entries().to_vec(),
            snapshots: self.snapshots.indices().to_vec(),
        }
    }

    // ── Recording ─────────────────────────────────────────────────────────

    /// Index the next event will get
    pub fn event_count(&self) -> EventIndex {
        self.event_count
    }

    /// Count one more event in the log
    pub fn advance(&mut self) -> EventIndex {
        let index = self.event_count;
        self.event_count += 1;
        index
    }

    pub fn record_goto(
        &mut self,
        source: EventIndex,
        target: EventIndex,
        policy: GotoPolicy,
    ) -> HistoryResult<GotoOutcome> {
        let outcome = self.check_goto(source, target, policy)?;
        if outcome.is_recorded() {
            self.gotos.add_goto(source, target)?;
        }
        Ok(outcome)
    }

    /// What [`HistoryIndex::record_goto`] would do, without recording
    pub fn check_goto(
        &self,
        source: EventIndex,
        target: EventIndex,
        policy: GotoPolicy,
    ) -> HistoryResult<GotoOutcome> {
        match self.gotos.check_goto(source, target) {
            Ok(canonical) => Ok(GotoOutcome::Recorded(canonical)),
            Err(err) if err.is_soft() && policy == GotoPolicy::Lenient => {
                warn!(source, target, "ignoring malformed goto");
                Ok(GotoOutcome::Rejected(target))
            }
            Err(err) => Err(err),
        }
    }

    pub fn record_keyframe(&mut self, index: EventIndex) -> HistoryResult<()> {
        self.gotos.add_keyframe(index)
    }

    pub fn record_mode(&mut self, index: EventIndex, mode: Mode) -> HistoryResult<()> {
        self.modes.add_mode(index, mode)
    }

    /// Merge `patch` into the latest mode and record the result at `index`
    pub fn record_mode_patch(&mut self, index: EventIndex, patch: &ModePatch) -> HistoryResult<()> {
        let next = self.modes.latest().patched(patch);
        self.modes.add_mode(index, next)
    }

    pub fn record_snapshot(&mut self, index: EventIndex) {
        self.snapshots.add_snapshot(index);
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn dereference(&self, index: EventIndex) -> EventIndex {
        self.gotos.dereference(index)
    }

    /// Canonical position of the end of the log
    pub fn tip(&self) -> EventIndex {
        self.gotos.dereference(self.event_count)
    }

    pub fn skips_at(&self, index: EventIndex) -> &[SkipInterval] {
        self.gotos.get_skips(index)
    }

    /// Skip set the materialized document obeys with its cursor at `cursor`
    pub fn skips_before(&self, cursor: EventIndex) -> &[SkipInterval] {
        self.gotos.skips_before(cursor)
    }

    pub fn plan(&self, start: EventIndex, end: EventIndex) -> HistoryResult<ReplayPlan> {
        self.gotos.plan_goto(start, end)
    }

    pub fn compute_undo(&self, from: EventIndex) -> Option<EventIndex> {
        self.gotos.compute_undo(from)
    }

    pub fn compute_redo(&self, from: EventIndex) -> HistoryResult<Option<EventIndex>> {
        self.gotos.compute_redo(from)
    }

    pub fn nearest_snapshot(&self, target: EventIndex, skips: &[SkipInterval]) -> EventIndex {
        self.snapshots.get_nearest_snapshot_index(target, skips)
    }

    /// Mode in force for the event at `index`
    pub fn mode_at(&self, index: EventIndex) -> &Mode {
        self.modes.get_mode(index)
    }

    pub fn goto_index(&self) -> &GotoIndex {
        &self.gotos
    }

    pub fn snapshot_index(&self) -> &SnapshotIndex {
        &self.snapshots
    }

    pub fn mode_timeline(&self) -> &ModeTimeline<Mode> {
        &self.modes
    }
}

impl Default for HistoryIndex {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}
