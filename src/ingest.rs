//! Multi-file ingestion into one record set.
//!
//! Files are parsed on the rayon pool and merged in the order they were
//! given, so the first occurrence of a duplicated UUID is always the one
//! from the earliest file. The merge target is shared between workers behind
//! a single mutex; a worker that finishes early parks its parsed file until
//! all earlier files have been merged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};

use crate::constants::{DATA_FILE_EXTENSION, DATA_FILE_MARKER};
use crate::format::{IngestError, ParsedFile, read_data_file};
use crate::store::RecordSet;

/// Receives load progress.
pub trait ProgressSink: Send + Sync {
    /// Called after each file; `percent` is the share of files done.
    fn report_progress(&self, percent: u8, current_file: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn report_progress(&self, percent: u8, current_file: &str) {
        self(percent, current_file)
    }
}

/// Progress sink that discards all reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report_progress(&self, _percent: u8, _current_file: &str) {}
}

/// Summary of a completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of files read
    pub files: usize,
    /// Number of records kept
    pub records: usize,
    /// UUIDs whose later occurrences were set aside
    pub duplicates: Vec<Uuid>,
    /// Rows that had no UUID and were given a fresh one
    pub generated_uuids: usize,
}

impl LoadReport {
    /// Number of duplicate rows set aside.
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }
}

#[derive(Default)]
struct Merge {
    set: RecordSet,
    report: LoadReport,
    next: usize,
    parked: BTreeMap<usize, ParsedFile>,
}

impl Merge {
    /// Accept file `index` and merge every file that is now next in line.
    fn offer(&mut self, index: usize, parsed: ParsedFile) {
        self.parked.insert(index, parsed);
        while let Some(parsed) = self.parked.remove(&self.next) {
            self.absorb(parsed);
            self.next += 1;
        }
    }

    fn absorb(&mut self, parsed: ParsedFile) {
        if self.set.source_file(&parsed.path).is_some() {
            log::warn!("{:?} was given more than once; reading it once", parsed.path);
            return;
        }
        self.report.files += 1;
        self.report.generated_uuids += parsed.generated_uuids;
        for (record, origin) in parsed.rows {
            let uuid = record.uuid;
            if !self.set.insert(record, origin) {
                log::warn!(
                    "Duplicate UUID {} in {:?}; keeping the first occurrence, the row is written back unchanged",
                    uuid,
                    parsed.path
                );
                self.report.duplicates.push(uuid);
            }
        }
    }
}

/// Load `paths` into a fresh record set.
///
/// Any failing file fails the whole load. Display identities are reassigned
/// 1..N over the merged set.
pub fn load(
    paths: &[PathBuf],
    progress: &dyn ProgressSink,
    cancel: &AtomicBool,
) -> Result<(RecordSet, LoadReport), IngestError> {
    if paths.is_empty() {
        return Err(IngestError::NoFiles);
    }

    let total = paths.len();
    let done = AtomicUsize::new(0);
    let merge = Mutex::new(Merge::default());

    paths
        .par_iter()
        .enumerate()
        .try_for_each(|(index, path)| {
            if cancel.load(Ordering::Relaxed) {
                return Err(IngestError::Cancelled);
            }

            let parsed = read_data_file(path, cancel)?;
            log::debug!("Read {} records from {:?}", parsed.rows.len(), path);

            merge
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .offer(index, parsed);

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            let percent = u8::try_from(finished * 100 / total).unwrap_or(100);
            progress.report_progress(percent, &file_name(path));
            Ok(())
        })?;

    if cancel.load(Ordering::Relaxed) {
        return Err(IngestError::Cancelled);
    }

    let Merge {
        mut set,
        mut report,
        ..
    } = merge
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    set.assign_display_ids();
    report.records = set.len();

    log::info!(
        "Loaded {} records from {} file(s) ({} duplicates set aside)",
        report.records,
        report.files,
        report.duplicate_count()
    );
    Ok((set, report))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn is_data_file(entry: &DirEntry) -> bool {
    if !entry.file_type().is_file() {
        return false;
    }
    let path = entry.path();
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(DATA_FILE_MARKER));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DATA_FILE_EXTENSION));
    let writable = entry
        .metadata()
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false);
    name_matches && ext_matches && writable
}

/// Recursively find data files under `folder`.
///
/// Matches `*.csv` files whose name contains the data-file marker, skipping
/// hidden entries and read-only files. Unreadable directories are skipped.
pub fn discover_data_files(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !folder.is_dir() {
        return Err(IngestError::io(
            folder.display().to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(is_data_file)
        .map(DirEntry::into_path)
        .collect();

    files.sort();
    log::debug!("Found {} data file(s) under {:?}", files.len(), folder);
    Ok(files)
}
