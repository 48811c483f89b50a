//! # Goto Index
//!
//! Records navigation events and derives everything undo/redo needs from
//! them.
//!
//! ## Model
//!
//! A goto at `source` jumping to `target` means the cursor position right
//! after `source` is the same document as the cursor position `target`.
//! The events `target..source` are not deleted; they become a *skip
//! interval* that replay steps over. Each goto stores the full set of skip
//! intervals active once it has been recorded, so looking up the set that
//! applies at any index is a binary search.
//!
//! ```text
//! index:   0   1   2   3   4
//! events:  d   d   g→0 d   d
//! skips after 2: [0,1]
//! dereference(3) == 0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::event::EventIndex;
use crate::result::HistoryResult;

/// Closed range of event indices that replay must step over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipInterval {
    pub start: EventIndex,
    pub end: EventIndex,
}

impl SkipInterval {
    pub fn new(start: EventIndex, end: EventIndex) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn contains(&self, index: EventIndex) -> bool {
        self.start <= index && index <= self.end
    }
}

/// Find the interval of a sorted, non-overlapping set that holds `index`
pub fn find_skip(skips: &[SkipInterval], index: EventIndex) -> Option<&SkipInterval> {
    let after = skips.partition_point(|interval| interval.end < index);
    skips.get(after).filter(|interval| interval.contains(index))
}

pub fn skips_contain(skips: &[SkipInterval], index: EventIndex) -> bool {
    find_skip(skips, index).is_some()
}

/// How to move the materialized cursor between two canonical positions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayPlan {
    /// Rebuild from at or before this index before replaying forward
    pub revert: Option<EventIndex>,

    /// Indices that must not be replayed
    pub skips: Vec<SkipInterval>,
}

/// Navigation events, skip intervals and keyframes
#[derive(Debug, Clone, Default)]
pub struct GotoIndex {
    /// Goto source indices (strictly increasing)
    sources: Vec<EventIndex>,

    /// Canonical target of each goto, parallel to `sources`
    targets: Vec<EventIndex>,

    /// Skip set active once each goto is recorded, parallel to `sources`
    skips: Vec<Vec<SkipInterval>>,

    /// Undo stop-points (strictly increasing)
    keyframes: Vec<EventIndex>,
}

impl GotoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a cursor through the goto recorded just before it.
    ///
    /// Stored targets are already canonical, so one lookup is enough and
    /// `dereference(dereference(x)) == dereference(x)`.
    pub fn dereference(&self, index: EventIndex) -> EventIndex {
        if index == 0 {
            return 0;
        }
        match self.sources.binary_search(&(index - 1)) {
            Ok(pos) => self.targets[pos],
            Err(_) => index,
        }
    }

    pub fn add_keyframe(&mut self, index: EventIndex) -> HistoryResult<()> {
        if let Some(&last) = self.keyframes.last() {
            if index <= last {
                return Err(HistoryError::KeyframeOrder { index, last });
            }
        }
        self.keyframes.push(index);
        Ok(())
    }

    /// Record a goto and return its canonical target.
    ///
    /// A goto that does not jump backwards, or whose source is not past the
    /// previous goto, is rejected with `MalformedGoto` and nothing changes.
    ///
    /// The new skip set is the one in force at the target plus
    /// `[target, source - 1]`. For a backwards jump that equals the current
    /// set trimmed to the intervals ending before the target; for a redo it
    /// also drops the interval the undo added.
    pub fn add_goto(&mut self, source: EventIndex, target: EventIndex) -> HistoryResult<EventIndex> {
        let canonical = self.check_goto(source, target)?;
        let mut skips: Vec<SkipInterval> = self
            .skips_before(canonical)
            .iter()
            .copied()
            .filter(|interval| interval.end < canonical)
            .collect();
        skips.push(SkipInterval::new(canonical, source - 1));

        self.sources.push(source);
        self.targets.push(canonical);
        self.skips.push(skips);
        Ok(canonical)
    }

    /// Validate a goto without recording it and return its canonical target
    pub fn check_goto(&self, source: EventIndex, target: EventIndex) -> HistoryResult<EventIndex> {
        let out_of_order = self.sources.last().is_some_and(|&last| source <= last);
        if target >= source || out_of_order {
            return Err(HistoryError::MalformedGoto {
                from: source,
                to: target,
            });
        }
        Ok(self.dereference(target))
    }

    /// Skip set in force at `index`: the one recorded by the latest goto at
    /// or before it.
    pub fn get_skips(&self, index: EventIndex) -> &[SkipInterval] {
        let count = self.sources.partition_point(|&source| source <= index);
        match count {
            0 => &[],
            n => &self.skips[n - 1],
        }
    }

    /// Skip set the materialized document obeys with its cursor at `cursor`
    pub fn skips_before(&self, cursor: EventIndex) -> &[SkipInterval] {
        match cursor {
            0 => &[],
            _ => self.get_skips(cursor - 1),
        }
    }

    /// Work out how to get the materialized document from `start` to `end`.
    ///
    /// Both ends must already be canonical and must differ.
    pub fn plan_goto(&self, start: EventIndex, end: EventIndex) -> HistoryResult<ReplayPlan> {
        if start == end || self.dereference(start) != start || self.dereference(end) != end {
            return Err(HistoryError::InvalidPlanEndpoints { start, end });
        }

        let skips = self.skips_before(end).to_vec();

        // Sitting inside a region that is skipped once we reach `end`. When
        // `end` is a goto source, `get_skips(end)` is that goto's set rather
        // than the one replayed, so check the replayed set first.
        let leaving = start.checked_sub(1).and_then(|last| {
            find_skip(&skips, last)
                .or_else(|| find_skip(self.get_skips(end), last))
                .filter(|interval| interval.start != start)
                .map(|interval| interval.start)
        });

        let revert = leaving
            // Heading into a region that is skipped right now
            .or_else(|| find_skip(self.get_skips(start), end).map(|interval| interval.start))
            .or_else(|| (end < start).then_some(end));

        Ok(ReplayPlan { revert, skips })
    }

    /// Where an undo from `from` should land, if anywhere
    pub fn compute_undo(&self, from: EventIndex) -> Option<EventIndex> {
        let from = self.dereference(from);
        let skips = self.skips_before(from);
        self.keyframes
            .iter()
            .rev()
            .copied()
            .find(|&keyframe| keyframe < from && !skips_contain(skips, keyframe))
            .map(|keyframe| self.dereference(keyframe))
    }

    /// Where a redo from `from` should land, if anywhere.
    ///
    /// Redo only exists while the cursor still sits on the target of the last
    /// goto. Drawing anything after it moves the cursor past the source and
    /// the undone future is gone.
    pub fn compute_redo(&self, from: EventIndex) -> HistoryResult<Option<EventIndex>> {
        let Some(&last_source) = self.sources.last() else {
            return Ok(None);
        };
        if from > last_source {
            return Ok(None);
        }

        let last = self.sources.len() - 1;
        let expected = self.targets[last];
        if from != expected {
            return Err(HistoryError::CursorDesync {
                cursor: from,
                expected,
            });
        }

        // Walk the run of back-to-back gotos ending at the last one
        let mut earliest = last;
        let mut pos = last;
        while pos > 0 && self.sources[pos - 1] + 1 == self.sources[pos] {
            pos -= 1;
            if self.targets[pos] == from {
                earliest = pos;
            }
        }

        let source = self.sources[earliest];
        let landing = if earliest > 0 && self.sources[earliest - 1] + 1 == source {
            self.targets[earliest - 1]
        } else {
            source
        };

        Ok((landing > from).then_some(landing))
    }

    pub fn is_goto_source(&self, index: EventIndex) -> bool {
        self.sources.binary_search(&index).is_ok()
    }

    /// Most recent goto as `(source, canonical target)`
    pub fn last_goto(&self) -> Option<(EventIndex, EventIndex)> {
        self.sources.last().copied().zip(self.targets.last().copied())
    }

    /// All recorded gotos as `(source, canonical target)`
    pub fn gotos(&self) -> impl Iterator<Item = (EventIndex, EventIndex)> + '_ {
        self.sources.iter().copied().zip(self.targets.iter().copied())
    }

    pub fn keyframes(&self) -> &[EventIndex] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rewinds() -> GotoIndex {
        let mut index = GotoIndex::new();
        index.add_goto(2, 0).unwrap();
        index.add_goto(4, 0).unwrap();
        index
    }

    #[test]
    fn test_dereference_passes_through_plain_indices() {
        let index = two_rewinds();
        for i in [0, 1, 2, 4, 6] {
            assert_eq!(index.dereference(i), i);
        }
        assert_eq!(index.dereference(3), 0);
        assert_eq!(index.dereference(5), 0);
    }

    #[test]
    fn test_dereference_is_idempotent() {
        let mut index = GotoIndex::new();
        index.add_goto(3, 1).unwrap();
        index.add_goto(5, 4).unwrap();
        for i in 0..8 {
            let once = index.dereference(i);
            assert_eq!(index.dereference(once), once, "index {}", i);
        }
        // target 4 == position after goto at 3, stored canonical
        assert_eq!(index.dereference(6), 1);
    }

    #[test]
    fn test_skip_intervals_replace_overlapping_regions() {
        let index = two_rewinds();
        assert!(index.get_skips(1).is_empty());
        assert_eq!(index.get_skips(2), &[SkipInterval::new(0, 1)]);
        assert_eq!(index.get_skips(3), &[SkipInterval::new(0, 1)]);
        assert_eq!(index.get_skips(4), &[SkipInterval::new(0, 3)]);
        assert_eq!(index.get_skips(100), &[SkipInterval::new(0, 3)]);
    }

    #[test]
    fn test_skip_intervals_keep_earlier_regions() {
        let mut index = GotoIndex::new();
        index.add_goto(3, 1).unwrap();
        index.add_goto(7, 5).unwrap();
        assert_eq!(
            index.get_skips(7),
            &[SkipInterval::new(1, 2), SkipInterval::new(5, 6)]
        );
    }

    #[test]
    fn test_malformed_goto_is_not_recorded() {
        let mut index = two_rewinds();

        let forward = index.add_goto(6, 6);
        assert_eq!(forward, Err(HistoryError::MalformedGoto { from: 6, to: 6 }));

        let stale = index.add_goto(3, 1);
        assert!(matches!(stale, Err(HistoryError::MalformedGoto { .. })));

        assert_eq!(index.len(), 2);
        assert_eq!(index.dereference(7), 7);
    }

    #[test]
    fn test_keyframes_must_increase() {
        let mut index = GotoIndex::new();
        index.add_keyframe(0).unwrap();
        index.add_keyframe(5).unwrap();
        assert_eq!(
            index.add_keyframe(5),
            Err(HistoryError::KeyframeOrder { index: 5, last: 5 })
        );
        assert_eq!(index.keyframes(), &[0, 5]);
    }

    #[test]
    fn test_plan_goto_same_position_fails() {
        let index = two_rewinds();
        for i in [0, 2, 4] {
            assert!(index.plan_goto(i, i).is_err());
        }
    }

    #[test]
    fn test_plan_goto_rejects_non_canonical_endpoints() {
        let index = two_rewinds();
        assert_eq!(
            index.plan_goto(3, 0),
            Err(HistoryError::InvalidPlanEndpoints { start: 3, end: 0 })
        );
    }

    #[test]
    fn test_plan_goto_after_two_rewinds() {
        let index = two_rewinds();

        assert_eq!(
            index.plan_goto(4, 2).unwrap(),
            ReplayPlan { revert: Some(0), skips: vec![] }
        );
        assert_eq!(
            index.plan_goto(0, 4).unwrap(),
            ReplayPlan { revert: None, skips: vec![SkipInterval::new(0, 1)] }
        );
        assert_eq!(
            index.plan_goto(6, 4).unwrap(),
            ReplayPlan { revert: Some(4), skips: vec![SkipInterval::new(0, 1)] }
        );
    }

    #[test]
    fn test_plan_goto_leaving_skipped_region() {
        let mut index = GotoIndex::new();
        index.add_goto(5, 2).unwrap();

        // Cursor at 4 has replayed 2 and 3, which are skipped once we reach 7
        let plan = index.plan_goto(4, 7).unwrap();
        assert_eq!(plan.revert, Some(2));
        assert_eq!(plan.skips, vec![SkipInterval::new(2, 4)]);
    }

    #[test]
    fn test_plan_goto_onto_goto_source() {
        // Draw 0..3, undo to 2, rewind to 0 and branch, then undo to 2 again
        let mut index = GotoIndex::new();
        index.add_goto(3, 2).unwrap();
        index.add_goto(4, 0).unwrap();
        index.add_goto(6, 2).unwrap();

        // 0 and 1 are on screen at 2 but skipped on the way to 6
        assert_eq!(index.get_skips(6), &[SkipInterval::new(2, 5)]);
        assert_eq!(
            index.plan_goto(2, 6).unwrap(),
            ReplayPlan { revert: Some(0), skips: vec![SkipInterval::new(0, 3)] }
        );
    }

    #[test]
    fn test_check_goto_records_nothing() {
        let index = two_rewinds();
        assert_eq!(index.check_goto(6, 5), Ok(0));
        assert_eq!(
            index.check_goto(4, 1),
            Err(HistoryError::MalformedGoto { from: 4, to: 1 })
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_compute_undo_walks_keyframes() {
        let mut index = GotoIndex::new();
        for k in [0, 5, 10] {
            index.add_keyframe(k).unwrap();
        }
        assert_eq!(index.compute_undo(6), Some(5));
        assert_eq!(index.compute_undo(11), Some(10));
        assert_eq!(index.compute_undo(5), Some(0));
        assert_eq!(index.compute_undo(0), None);
    }

    #[test]
    fn test_compute_undo_ignores_skipped_keyframes() {
        let mut index = GotoIndex::new();
        index.add_keyframe(0).unwrap();
        index.add_keyframe(2).unwrap();
        index.add_goto(4, 2).unwrap();
        index.add_keyframe(5).unwrap();

        // Undoing the gesture at 5 lands where the goto left the cursor
        assert_eq!(index.compute_undo(7), Some(2));
        assert_eq!(index.compute_undo(5), Some(0));
    }

    #[test]
    fn test_compute_redo_without_gotos() {
        let index = GotoIndex::new();
        assert_eq!(index.compute_redo(3), Ok(None));
    }

    #[test]
    fn test_compute_redo_walks_undo_chain() {
        let mut index = GotoIndex::new();
        for k in 0..5 {
            index.add_keyframe(k).unwrap();
        }

        // Two undos in a row
        assert_eq!(index.add_goto(5, 4), Ok(4));
        assert_eq!(index.add_goto(6, 3), Ok(3));
        assert_eq!(index.compute_redo(3), Ok(Some(4)));

        // Redo, then redo again lands before the first undo
        assert_eq!(index.add_goto(7, 4), Ok(4));
        assert_eq!(index.compute_redo(4), Ok(Some(5)));
    }

    #[test]
    fn test_redo_clears_undone_gesture() {
        let mut index = GotoIndex::new();
        index.add_keyframe(0).unwrap();
        index.add_keyframe(2).unwrap();

        // Undo the two-event gesture at 2..3, then redo it
        assert_eq!(index.add_goto(4, 2), Ok(2));
        assert_eq!(index.compute_redo(2), Ok(Some(4)));
        assert_eq!(index.add_goto(5, 4), Ok(4));

        assert_eq!(index.get_skips(5), &[SkipInterval::new(4, 4)]);
        assert_eq!(index.compute_undo(4), Some(2));

        index.add_keyframe(6).unwrap();
        let plan = index.plan_goto(0, 7).unwrap();
        assert_eq!(plan.skips, vec![SkipInterval::new(4, 4)]);
    }

    #[test]
    fn test_compute_redo_detects_desync() {
        let mut index = GotoIndex::new();
        index.add_goto(5, 2).unwrap();
        assert_eq!(
            index.compute_redo(3),
            Err(HistoryError::CursorDesync { cursor: 3, expected: 2 })
        );
        assert_eq!(index.compute_redo(6), Ok(None));
    }
}
