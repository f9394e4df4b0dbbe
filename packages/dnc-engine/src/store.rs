//! Append-only result store.
//!
//! Records are only ever appended by the controller's loop body, one per
//! processed number, in processing order. The only mutation besides append
//! is a full clear, and the engine refuses that while a run is active.

use crate::record::{CheckRecord, RunTotals};

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    records: Vec<CheckRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: CheckRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[CheckRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute counters from scratch.
    pub fn totals(&self, queued: usize) -> RunTotals {
        RunTotals::tally(queued, &self.records)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Replace the whole sequence, used when restoring a snapshot.
    pub fn replace(&mut self, records: Vec<CheckRecord>) {
        self.records = records;
    }
}
