//! Undo/Redo system for label corrections.
//!
//! Each batch correction stores the confirmed labels the affected records had
//! before the change. Undoing restores them and records the values it
//! overwrote as a redo entry, so redo is simply the inverse operation.
//!
//! Both histories are fixed-capacity rings: once full, recording a new entry
//! silently drops the oldest one.

use std::collections::HashSet;

use uuid::Uuid;

use crate::constants::DEFAULT_UNDO_CAPACITY;
use crate::model::Stage;
use crate::store::RecordSet;

// ============================================================================
// Ring Buffer
// ============================================================================

/// Fixed-capacity LIFO history that overwrites its oldest entry when full.
#[derive(Debug, Clone)]
pub struct HistoryRing<T> {
    slots: Vec<Option<T>>,
    /// Slot the next entry is written to
    head: usize,
    /// Number of live entries behind `head`
    len: usize,
}

impl<T> HistoryRing<T> {
    /// Create an empty ring holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            head: 0,
            len: 0,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the ring holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `entry`, returning the oldest entry if it was overwritten.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = self.slots[self.head].replace(entry);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
            None
        } else {
            evicted
        }
    }

    /// Take the newest entry, stepping the cursor back one slot.
    pub fn step_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.head = (self.head + self.capacity() - 1) % self.capacity();
        self.len -= 1;
        self.slots[self.head].take()
    }

    /// Newest entry without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let newest = (self.head + self.capacity() - 1) % self.capacity();
        self.slots[newest].as_ref()
    }

    /// Drop every entry and reset the cursor.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

// ============================================================================
// Change Entries
// ============================================================================

/// One batch correction: the confirmed labels the records had before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Stage whose confirmed field was changed
    pub stage: Stage,
    /// Record identity and its confirmed label before the change
    pub previous: Vec<(Uuid, String)>,
}

impl Change {
    /// Capture the current confirmed labels of `indices` for `stage`.
    ///
    /// A record listed more than once is captured once.
    pub fn capture(set: &RecordSet, stage: Stage, indices: &[usize]) -> Self {
        let mut seen = HashSet::with_capacity(indices.len());
        let previous = indices
            .iter()
            .filter_map(|&i| set.get(i))
            .filter(|record| seen.insert(record.uuid))
            .map(|record| (record.uuid, stage.confirmed(record).to_string()))
            .collect();
        Self { stage, previous }
    }

    /// Write the stored labels back, returning the change that reverses it.
    fn restore(self, set: &mut RecordSet) -> Change {
        let stage = self.stage;
        let mut overwritten = Vec::with_capacity(self.previous.len());

        for (uuid, label) in self.previous {
            let Some(record) = set.index_of(&uuid).and_then(|i| set.get_mut(i)) else {
                log::warn!("Undo entry refers to unknown record {}", uuid);
                continue;
            };
            let field = stage.confirmed_mut(record);
            overwritten.push((uuid, std::mem::replace(field, label)));
        }

        set.touch();
        Change {
            stage,
            previous: overwritten,
        }
    }
}

// ============================================================================
// Undo History
// ============================================================================

/// Undo and redo histories for corrections on one record set.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo: HistoryRing<Change>,
    redo: HistoryRing<Change>,
}

impl UndoHistory {
    /// Create empty histories holding `capacity` batches each.
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: HistoryRing::new(capacity),
            redo: HistoryRing::new(capacity),
        }
    }

    /// Record the state of `indices` before a new correction.
    ///
    /// A new forward edit discards the redo history.
    pub fn record(&mut self, set: &RecordSet, stage: Stage, indices: &[usize]) {
        let change = Change::capture(set, stage, indices);
        log::debug!("📝 Undo: recorded {} record(s) on {}", change.previous.len(), stage);
        if self.undo.push(change).is_some() {
            log::trace!("Undo: oldest entry dropped");
        }
        self.redo.clear();
    }

    /// Revert the most recent correction. Returns `false` if there is none.
    pub fn undo(&mut self, set: &mut RecordSet) -> bool {
        let Some(change) = self.undo.step_back() else {
            return false;
        };
        log::debug!("⏪ Undo: {} record(s) on {}", change.previous.len(), change.stage);
        let inverse = change.restore(set);
        self.redo.push(inverse);
        true
    }

    /// Re-apply the most recently undone correction. Returns `false` if there
    /// is none.
    pub fn redo(&mut self, set: &mut RecordSet) -> bool {
        let Some(change) = self.redo.step_back() else {
            return false;
        };
        log::debug!("⏩ Redo: {} record(s) on {}", change.previous.len(), change.stage);
        let inverse = change.restore(set);
        self.undo.push(inverse);
        true
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Get the number of entries in undo history
    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    /// Get the number of entries in redo history
    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        log::debug!("🗑️ Undo history cleared");
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_CAPACITY)
    }
}
