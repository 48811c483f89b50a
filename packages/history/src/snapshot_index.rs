//! # Snapshot Index
//!
//! Remembers which cursor positions have a persisted checkpoint. The
//! checkpoint itself lives in storage; only the index is kept here.

use crate::event::EventIndex;
use crate::goto_index::{skips_contain, SkipInterval};

#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    indices: Vec<EventIndex>,
}

impl SnapshotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_snapshot(&mut self, index: EventIndex) {
        let Some(&last) = self.indices.last() else {
            self.indices.push(index);
            return;
        };
        if last == index {
            return;
        }
        self.indices.push(index);
        if index < last {
            self.indices.sort_unstable();
            self.indices.dedup();
        }
    }

    /// Greatest usable checkpoint at or before `target`.
    ///
    /// Checkpoints are keyed by cursor, so the one at `i` holds every event
    /// before `i`. It is unusable once event `i - 1` falls inside `skips`:
    /// it was taken inside a region that has since been undone. `0` means
    /// start from the initial document.
    pub fn get_nearest_snapshot_index(&self, target: EventIndex, skips: &[SkipInterval]) -> EventIndex {
        let mut target = target;
        loop {
            let count = self.indices.partition_point(|&index| index <= target);
            let Some(&index) = count.checked_sub(1).and_then(|pos| self.indices.get(pos)) else {
                return 0;
            };
            if index == 0 || !skips_contain(skips, index - 1) {
                return index;
            }
            target = index - 1;
        }
    }

    pub fn contains(&self, index: EventIndex) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    pub fn indices(&self) -> &[EventIndex] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
