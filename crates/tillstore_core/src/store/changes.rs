//! Pending-change bookkeeping for the store.
//!
//! # Invariants
//! - A record id appears in at most one of the two sets.
//! - `new` keeps insertion order; commit writes rows in that order.
//! - A dirty entry keeps the committed snapshot taken when the record first
//!   became dirty, until commit or rollback.

use crate::model::record::{Record, RecordId};
use crate::model::value::Value;

/// Record queued for insert, with its conformed row.
#[derive(Debug, Clone)]
pub(crate) struct PendingNew {
    pub record: Record,
    pub row: Vec<Value>,
}

/// Persisted record with uncommitted changes.
#[derive(Debug, Clone)]
pub(crate) struct PendingDirty {
    pub record: Record,
    pub row: Vec<Value>,
    pub committed: Record,
    pub committed_row: Vec<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    new: Vec<PendingNew>,
    dirty: Vec<PendingDirty>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.dirty.is_empty()
    }

    pub fn new_entries(&self) -> &[PendingNew] {
        &self.new
    }

    pub fn dirty_entries(&self) -> &[PendingDirty] {
        &self.dirty
    }

    /// Whether `id` is pending in either set.
    pub fn contains(&self, id: RecordId) -> bool {
        self.new.iter().any(|entry| entry.record.id() == Some(id)) || self.find_dirty(id).is_some()
    }

    pub fn queue_new(&mut self, record: Record, row: Vec<Value>) {
        self.new.push(PendingNew { record, row });
    }

    /// Replaces a queued insert in place. Returns `false` when `id` is not
    /// pending as new.
    pub fn replace_new(&mut self, id: RecordId, record: &Record, row: Vec<Value>) -> bool {
        match self.new.iter_mut().find(|entry| entry.record.id() == Some(id)) {
            Some(entry) => {
                entry.record = record.clone();
                entry.row = row;
                true
            }
            None => false,
        }
    }

    /// Committed snapshot of an already-dirty record.
    pub fn dirty_snapshot(&self, id: RecordId) -> Option<(Record, Vec<Value>)> {
        self.find_dirty(id).map(|position| {
            let entry = &self.dirty[position];
            (entry.committed.clone(), entry.committed_row.clone())
        })
    }

    /// Records new values for a persisted record.
    ///
    /// Values equal to the committed snapshot clear the dirty entry instead.
    pub fn mark_dirty(
        &mut self,
        id: RecordId,
        record: &Record,
        row: Vec<Value>,
        committed: Record,
        committed_row: Vec<Value>,
    ) {
        let existing = self.find_dirty(id);
        if row == committed_row {
            if let Some(position) = existing {
                self.dirty.remove(position);
            }
            return;
        }

        match existing {
            Some(position) => {
                let entry = &mut self.dirty[position];
                entry.record = record.clone();
                entry.row = row;
            }
            None => self.dirty.push(PendingDirty {
                record: record.clone(),
                row,
                committed,
                committed_row,
            }),
        }
    }

    /// Empties both sets and hands back what they held.
    pub fn take(&mut self) -> (Vec<PendingNew>, Vec<PendingDirty>) {
        (
            std::mem::take(&mut self.new),
            std::mem::take(&mut self.dirty),
        )
    }

    fn find_dirty(&self, id: RecordId) -> Option<usize> {
        self.dirty
            .iter()
            .position(|entry| entry.record.id() == Some(id))
    }
}
