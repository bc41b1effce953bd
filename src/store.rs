//! In-memory record store with per-file origin bookkeeping.
//!
//! Records from any number of source files live in one ordered list. Each
//! record is keyed by its UUID, and the origin map remembers which file and
//! which row it came from so saving can write every record back to exactly
//! one file, in its original order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::model::Record;

/// Where a record was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Canonical path of the source file
    pub path: PathBuf,
    /// 0-based data-row position within the source file
    pub row: usize,
    /// Value of the file's `Id` column as read
    pub file_id: i32,
}

/// The records contributed by one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Canonical path of the source file
    pub path: PathBuf,
    /// Identities of the records read from it, in row order
    pub uuids: Vec<Uuid>,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// All loaded records plus their origin map.
#[derive(Debug, Clone)]
pub struct RecordSet {
    records: Vec<Record>,
    index: HashMap<Uuid, usize>,
    origins: HashMap<Uuid, Origin>,
    files: Vec<SourceFile>,
    shadowed: Vec<(Record, Origin)>,
    generation: u64,
    revision: u64,
}

impl RecordSet {
    /// Create an empty record set with a fresh dataset generation.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            origins: HashMap::new(),
            files: Vec::new(),
            shadowed: Vec::new(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            revision: 0,
        }
    }

    /// Insert a record with its origin.
    ///
    /// The first record seen for a UUID wins. A later duplicate is kept
    /// aside unchanged so saving writes it back to its file, and `false` is
    /// returned.
    pub fn insert(&mut self, record: Record, origin: Origin) -> bool {
        let uuid = record.uuid;
        let slot = match self.files.iter().position(|f| f.path == origin.path) {
            Some(slot) => slot,
            None => {
                self.files.push(SourceFile {
                    path: origin.path.clone(),
                    uuids: Vec::new(),
                });
                self.files.len() - 1
            }
        };

        if self.index.contains_key(&uuid) {
            self.shadowed.push((record, origin));
            return false;
        }
        self.files[slot].uuids.push(uuid);

        self.index.insert(uuid, self.records.len());
        self.origins.insert(uuid, origin);
        self.records.push(record);
        self.revision += 1;
        true
    }

    /// Reassign the display identity 1..N in store order.
    pub fn assign_display_ids(&mut self) {
        for (i, record) in self.records.iter_mut().enumerate() {
            record.id = i32::try_from(i + 1).unwrap_or(i32::MAX);
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are loaded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in display order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record at `index`.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.records.get_mut(index)
    }

    pub(crate) fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Position of the record with `uuid`.
    pub fn index_of(&self, uuid: &Uuid) -> Option<usize> {
        self.index.get(uuid).copied()
    }

    /// Record with `uuid`.
    pub fn by_uuid(&self, uuid: &Uuid) -> Option<&Record> {
        self.index_of(uuid).and_then(|i| self.records.get(i))
    }

    /// Origin of the record with `uuid`.
    pub fn origin(&self, uuid: &Uuid) -> Option<&Origin> {
        self.origins.get(uuid)
    }

    /// Source files in load order.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Duplicate rows read from `path` that lost to an earlier occurrence.
    pub fn shadowed_in(&self, path: &Path) -> Vec<(&Record, &Origin)> {
        self.shadowed
            .iter()
            .filter(|(_, origin)| origin.path == path)
            .map(|(record, origin)| (record, origin))
            .collect()
    }

    /// Source file entry for `path`.
    pub fn source_file(&self, path: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Dataset identity; a new load yields a new generation, a clone keeps it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mutation counter, bumped on every change to record contents.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }
}

impl Default for RecordSet {
    fn default() -> Self {
        Self::new()
    }
}
