//! # Mode Timeline
//!
//! The settings value in force at each event index. An entry recorded at
//! `i` applies to every event after `i`.

use crate::error::HistoryError;
use crate::event::EventIndex;
use crate::result::HistoryResult;

#[derive(Debug, Clone)]
pub struct ModeTimeline<M> {
    initial: M,
    entries: Vec<(EventIndex, M)>,
}

impl<M: Clone + PartialEq> ModeTimeline<M> {
    pub fn new(initial: M) -> Self {
        Self {
            initial,
            entries: Vec::new(),
        }
    }

    /// Record `value` as of `index`.
    ///
    /// Re-recording the value already in force is a no-op wherever it
    /// happens; any other value must come after the last entry.
    pub fn add_mode(&mut self, index: EventIndex, value: M) -> HistoryResult<()> {
        if *self.latest() == value {
            return Ok(());
        }
        if let Some(&(last, _)) = self.entries.last() {
            if index <= last {
                return Err(HistoryError::ModeOrder { index, last });
            }
        }
        self.entries.push((index, value));
        Ok(())
    }

    /// Value in force for the event at `index`
    pub fn get_mode(&self, index: EventIndex) -> &M {
        let count = self.entries.partition_point(|(at, _)| *at < index);
        match count {
            0 => &self.initial,
            n => &self.entries[n - 1].1,
        }
    }

    /// Most recently recorded value
    pub fn latest(&self) -> &M {
        self.entries
            .last()
            .map(|(_, value)| value)
            .unwrap_or(&self.initial)
    }

    pub fn initial(&self) -> &M {
        &self.initial
    }

    pub fn entries(&self) -> &[(EventIndex, M)] {
        &self.entries
    }
}
