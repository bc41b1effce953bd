//! Applying label corrections to records.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{Record, Stage};
use crate::store::RecordSet;
use crate::undo::UndoHistory;

/// Errors rejecting a correction before anything changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrectionError {
    /// No record set is loaded
    #[error("No data loaded")]
    NoDataLoaded,

    /// A record index is outside the loaded set
    #[error("Record index {index} is out of range ({len} records loaded)")]
    IndexOutOfRange {
        /// The offending index
        index: usize,
        /// Number of loaded records
        len: usize,
    },
}

/// Set the confirmed label of `stage` on the records at `indices`.
///
/// A non-empty `label` becomes the confirmed label; in classification it
/// also fills an empty predicted label. An empty `label` accepts the
/// predicted label as confirmed. The previous state is recorded in `history`
/// first, which also discards the redo history.
///
/// Returns the number of records changed. Every index is validated before
/// any record is touched; an index listed twice counts once.
pub fn assign(
    set: &mut RecordSet,
    history: &mut UndoHistory,
    stage: Stage,
    label: &str,
    indices: &[usize],
) -> Result<usize, CorrectionError> {
    let len = set.len();
    if let Some(&index) = indices.iter().find(|&&i| i >= len) {
        return Err(CorrectionError::IndexOutOfRange { index, len });
    }
    let mut seen = HashSet::with_capacity(indices.len());
    let indices: Vec<usize> = indices.iter().copied().filter(|&i| seen.insert(i)).collect();
    if indices.is_empty() {
        return Ok(0);
    }

    history.record(set, stage, &indices);
    for &index in &indices {
        if let Some(record) = set.get_mut(index) {
            apply_label(record, stage, label);
        }
    }
    set.touch();

    log::debug!(
        "Assigned '{}' to {} record(s) on {}",
        label,
        indices.len(),
        stage
    );
    Ok(indices.len())
}

fn apply_label(record: &mut Record, stage: Stage, label: &str) {
    if label.is_empty() {
        let predicted = stage.predicted(record).to_string();
        *stage.confirmed_mut(record) = predicted;
        return;
    }

    *stage.confirmed_mut(record) = label.to_string();
    if stage == Stage::Classification {
        let predicted = stage.predicted_mut(record);
        if predicted.is_empty() {
            *predicted = label.to_string();
        }
    }
}

/// Rename `old` to `new` in every label field of every record.
///
/// Returns the number of records changed.
pub fn rename_in_records(set: &mut RecordSet, old: &str, new: &str) -> usize {
    if old == new {
        return 0;
    }

    let mut changed = 0;
    for record in set.records_mut() {
        let mut hit = false;
        for stage in Stage::all() {
            hit |= replace_if(stage.predicted_mut(record), old, new);
            hit |= replace_if(stage.confirmed_mut(record), old, new);
        }
        if hit {
            changed += 1;
        }
    }

    if changed > 0 {
        set.touch();
    }
    log::info!("Renamed label '{}' to '{}' in {} record(s)", old, new, changed);
    changed
}

fn replace_if(field: &mut String, old: &str, new: &str) -> bool {
    if field.as_str() == old {
        *field = new.to_string();
        true
    } else {
        false
    }
}
