//! Sequences of draws, undos and redos driven through the history index
//!
//! This tests:
//! - Branch-on-edit after undo
//! - Undo/redo chains
//! - Rebuilding the index from persisted metadata

use palimpsest_history::{
    GotoOutcome, GotoPolicy, HistoryIndex, HistoryMetadata, Mode, SkipInterval,
};

/// Minimal stand-in for the orchestrator: tracks the cursor and records the
/// same index entries a live timeline would.
struct Recorder {
    index: HistoryIndex,
    cursor: usize,
}

impl Recorder {
    fn new() -> Self {
        Self {
            index: HistoryIndex::default(),
            cursor: 0,
        }
    }

    fn goto(&mut self, target: usize) {
        let source = self.index.advance();
        let outcome = self
            .index
            .record_goto(source, target, GotoPolicy::Strict)
            .unwrap();
        self.cursor = outcome.target();
    }

    /// One single-event gesture
    fn draw(&mut self) {
        if self.cursor != self.index.tip() {
            let cursor = self.cursor;
            self.goto(cursor);
        }
        let at = self.index.advance();
        self.index.record_keyframe(at).unwrap();
        self.cursor = at + 1;
    }

    fn undo(&mut self) -> Option<usize> {
        let target = self.index.compute_undo(self.cursor)?;
        self.goto(target);
        Some(target)
    }

    fn redo(&mut self) -> Option<usize> {
        let target = self.index.compute_redo(self.cursor).unwrap()?;
        self.goto(target);
        Some(target)
    }
}

#[test]
fn test_draw_undo_draw_discards_redo() {
    let mut rec = Recorder::new();
    rec.draw();
    rec.draw();
    rec.goto(0);
    assert_eq!(rec.index.compute_redo(rec.cursor), Ok(Some(2)));

    rec.draw();
    rec.draw();

    assert_eq!(rec.cursor, 5);
    assert_eq!(rec.index.compute_redo(rec.cursor), Ok(None));
    assert_eq!(rec.index.skips_at(4), &[SkipInterval::new(0, 1)]);

    // Undo peels the two new gestures off and stops at the branch point.
    // A "back to 2" step never shows up: the keyframe at 3 sits right after
    // the goto at 2, so it dereferences straight to 0.
    assert_eq!(rec.undo(), Some(4));
    assert_eq!(rec.undo(), Some(0));
    assert_eq!(rec.undo(), None);
}

#[test]
fn test_undo_then_redo_round_trip() {
    let mut rec = Recorder::new();
    for _ in 0..4 {
        rec.draw();
    }
    assert_eq!(rec.cursor, 4);

    assert_eq!(rec.undo(), Some(3));
    assert_eq!(rec.undo(), Some(2));
    assert_eq!(rec.cursor, 2);

    assert_eq!(rec.redo(), Some(3));
    assert_eq!(rec.redo(), Some(4));
    assert_eq!(rec.redo(), None);
    assert_eq!(rec.cursor, 4);
}

#[test]
fn test_redo_gone_after_new_draw() {
    let mut rec = Recorder::new();
    for _ in 0..3 {
        rec.draw();
    }
    rec.undo();
    rec.draw();
    assert_eq!(rec.redo(), None);
}

#[test]
fn test_metadata_round_trip_matches_live_index() {
    let mut rec = Recorder::new();
    rec.draw();
    rec.draw();
    rec.undo();
    rec.draw();
    rec.draw();
    rec.undo();
    rec.undo();
    rec.redo();
    rec.index.record_snapshot(3);

    let json = serde_json::to_string(&rec.index.metadata()).unwrap();
    let metadata: HistoryMetadata = serde_json::from_str(&json).unwrap();
    let rebuilt = HistoryIndex::from_metadata(Mode::default(), &metadata).unwrap();

    let end = rec.index.event_count() + 2;
    for i in 0..end {
        assert_eq!(rebuilt.dereference(i), rec.index.dereference(i), "dereference({})", i);
        assert_eq!(rebuilt.compute_undo(i), rec.index.compute_undo(i), "compute_undo({})", i);
        assert_eq!(rebuilt.compute_redo(i), rec.index.compute_redo(i), "compute_redo({})", i);
        assert_eq!(rebuilt.skips_at(i), rec.index.skips_at(i));
    }
    assert_eq!(rebuilt.tip(), rec.index.tip());
    assert_eq!(rebuilt.metadata(), rec.index.metadata());
}

#[test]
fn test_corrupt_metadata_is_rejected() {
    let metadata = HistoryMetadata {
        event_count: 6,
        keyframes: vec![0, 4, 2],
        ..Default::default()
    };
    assert!(HistoryIndex::from_metadata(Mode::default(), &metadata).is_err());
}

#[test]
fn test_lenient_goto_leaves_index_intact() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut index = HistoryIndex::default();
    for _ in 0..3 {
        index.advance();
    }

    let outcome = index.record_goto(3, 5, GotoPolicy::Lenient).unwrap();
    assert_eq!(outcome, GotoOutcome::Rejected(5));
    assert!(index.goto_index().is_empty());
    assert_eq!(index.tip(), 3);

    assert!(index.record_goto(3, 5, GotoPolicy::Strict).is_err());
}
