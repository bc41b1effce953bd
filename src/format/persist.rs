//! Writing a record set back to its source files.
//!
//! Every source file is rewritten from the records that came from it, in
//! their original row order. File groups are independent and are written in
//! parallel; a failing group does not stop the others.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use super::data_file::write_data_file;
use super::error::SaveError;
use crate::model::Record;
use crate::store::{Origin, RecordSet, SourceFile};

/// A file written by a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Path of the file
    pub path: PathBuf,
    /// Number of data rows written
    pub rows: usize,
}

/// Outcome of saving a whole record set.
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Files written successfully
    pub written: Vec<WrittenFile>,
    /// Groups that failed
    pub failures: Vec<SaveError>,
    /// Groups skipped because the save was cancelled
    pub cancelled: Vec<PathBuf>,
}

impl SaveReport {
    /// Whether every group was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.cancelled.is_empty()
    }

    /// Collapse the report into an error if any group failed.
    pub fn into_result(self) -> Result<Vec<WrittenFile>, SaveError> {
        if self.failures.is_empty() {
            Ok(self.written)
        } else {
            Err(SaveError::Incomplete {
                written: self.written.into_iter().map(|f| f.path).collect(),
                failures: self.failures,
            })
        }
    }
}

enum GroupOutcome {
    Written(WrittenFile),
    Failed(SaveError),
    Cancelled(PathBuf),
}

/// Save every file group of `set`.
///
/// Groups that have not started when `cancel` is raised are skipped and
/// listed in [`SaveReport::cancelled`].
pub fn save_record_set(set: &RecordSet, cancel: &AtomicBool) -> SaveReport {
    let outcomes: Vec<GroupOutcome> = set
        .files()
        .par_iter()
        .map(|file| {
            if cancel.load(Ordering::Relaxed) {
                return GroupOutcome::Cancelled(file.path.clone());
            }
            match save_group(set, file) {
                Ok(written) => GroupOutcome::Written(written),
                Err(e) => GroupOutcome::Failed(e),
            }
        })
        .collect();

    let mut report = SaveReport::default();
    for outcome in outcomes {
        match outcome {
            GroupOutcome::Written(written) => report.written.push(written),
            GroupOutcome::Failed(e) => {
                log::error!("{}", e);
                report.failures.push(e);
            }
            GroupOutcome::Cancelled(path) => report.cancelled.push(path),
        }
    }
    report
}

fn save_group(set: &RecordSet, file: &SourceFile) -> Result<WrittenFile, SaveError> {
    let rows = collect_group(set, file)?;
    write_data_file(&file.path, &rows)?;
    log::info!("Saved {} records to {:?}", rows.len(), file.path);
    Ok(WrittenFile {
        path: file.path.clone(),
        rows: rows.len(),
    })
}

/// Resolve a file group to its records, ordered by original row.
///
/// Duplicate rows that lost to an earlier occurrence at load time are
/// included unchanged so the file keeps every row it had. Fails if the
/// group's origins do not all name the group's own file.
pub fn collect_group<'a>(
    set: &'a RecordSet,
    file: &SourceFile,
) -> Result<Vec<(&'a Record, &'a Origin)>, SaveError> {
    let mut rows = Vec::with_capacity(file.uuids.len());
    let mut others = BTreeSet::new();

    for uuid in &file.uuids {
        let origin = set
            .origin(uuid)
            .ok_or(SaveError::MissingOrigin { uuid: *uuid })?;
        let record = set
            .by_uuid(uuid)
            .ok_or(SaveError::MissingOrigin { uuid: *uuid })?;
        if origin.path != file.path {
            others.insert(origin.path.clone());
        }
        rows.push((record, origin));
    }

    if !others.is_empty() {
        return Err(SaveError::MixedOrigins {
            path: file.path.clone(),
            others: others.into_iter().collect(),
        });
    }

    rows.extend(set.shadowed_in(&file.path));
    rows.sort_by_key(|(_, origin)| origin.row);
    Ok(rows)
}
