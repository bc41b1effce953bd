//! The correction session: everything the host application talks to.
//!
//! A [`Session`] owns the loaded record set, its undo history, the label
//! vocabulary cache, the label-code list and the view settings. It is driven
//! from a single host loop: long-running loads and saves run as background
//! [`Job`]s and their results are applied by [`Session::poll`] on the
//! caller's thread, so records are never mutated concurrently.
//!
//! Failures that the operator should see are both returned and queued as
//! [`Event::Error`] on the session's event channel.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::constants::{
    DEFAULT_AUTOSAVE_DEBOUNCE, DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_EXCLUDED_LABEL,
    DEFAULT_GATING_LABEL, DEFAULT_UNDO_CAPACITY,
};
use crate::correction::{self, CorrectionError};
use crate::event::{Event, EventQueue, EventSender, FileKind};
use crate::filter::{CheckMode, ViewQuery, visible_indices, visible_records};
use crate::format::{
    AutoSave, Hold, IngestError, LabelFileError, SaveError, SaveReport, Snapshot, WrittenFile,
    save_record_set,
};
use crate::ingest::{self, LoadReport};
use crate::jobs::{Job, JobContext, JobUpdate};
use crate::labels::{LabelBook, LabelConflictError};
use crate::model::{Column, LabelCode, Record, Stage};
use crate::store::RecordSet;
use crate::undo::UndoHistory;
use crate::vocabulary::{Vocabulary, label_counts};

/// Tunables of a session, usually derived from the user preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Whether automatic saves run at all
    pub autosave: bool,
    /// Minimum time between automatic saves
    pub autosave_interval: Duration,
    /// Quiet time after the last correction before an automatic save
    pub autosave_debounce: Duration,
    /// Number of correction batches kept for undo
    pub undo_capacity: usize,
    /// Preprocessing label that admits records to classification
    pub gating_label: String,
    /// Label value hidden from the selectable labels
    pub excluded_label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave: true,
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            gating_label: DEFAULT_GATING_LABEL.to_string(),
            excluded_label: DEFAULT_EXCLUDED_LABEL.to_string(),
        }
    }
}

type LoadOutcome = Result<(RecordSet, LoadReport), IngestError>;

struct PendingLoad {
    job: Job<LoadOutcome>,
    paths: Vec<PathBuf>,
}

struct PendingSave {
    job: Job<SaveReport>,
    manual: bool,
    snapshot: Snapshot,
}

/// State of one correction session.
pub struct Session {
    config: SessionConfig,
    records: Option<RecordSet>,
    history: UndoHistory,
    vocabulary: Vocabulary,
    query: ViewQuery,
    labels: LabelBook,
    label_path: Option<PathBuf>,
    autosave: AutoSave,
    events: EventQueue,
    load_job: Option<PendingLoad>,
    save_job: Option<PendingSave>,
}

impl Session {
    /// Create an empty session.
    pub fn new(config: SessionConfig) -> Self {
        let mut autosave = AutoSave::new(config.autosave_interval, config.autosave_debounce);
        autosave.set_enabled(config.autosave);

        Self {
            history: UndoHistory::new(config.undo_capacity),
            vocabulary: Vocabulary::new(config.excluded_label.clone()),
            query: ViewQuery::new(Stage::Preprocessing, config.gating_label.clone()),
            labels: LabelBook::new(),
            label_path: None,
            autosave,
            events: EventQueue::new(),
            load_job: None,
            save_job: None,
            records: None,
            config,
        }
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Take every pending event.
    pub fn drain_events(&self) -> Vec<Event> {
        self.events.drain()
    }

    /// Take the oldest pending event.
    pub fn next_event(&self) -> Option<Event> {
        self.events.try_next()
    }

    /// A sender for host code that wants to queue its own events.
    pub fn event_sender(&self) -> EventSender {
        self.events.sender().clone()
    }

    /// Signal that a modal correction or rename flow has opened.
    pub fn begin_correction(&self) {
        self.events.sender().set_input_locked(true);
    }

    /// Signal that the modal flow has closed.
    pub fn end_correction(&self) {
        self.events.sender().set_input_locked(false);
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load `paths` on the calling thread and install the result.
    ///
    /// On failure the previously loaded data stays in place.
    pub fn load(&mut self, paths: &[PathBuf]) -> Result<LoadReport, IngestError> {
        self.cancel_load();
        self.load_job = None;

        let sender = self.events.sender().clone();
        let progress = |percent: u8, file: &str| {
            sender.emit(Event::Progress {
                percent,
                file: file.to_string(),
            });
        };

        match ingest::load(paths, &progress, &AtomicBool::new(false)) {
            Ok((set, report)) => {
                self.install(set, &report, paths);
                Ok(report)
            }
            Err(e) => {
                self.report_load_error(&e);
                Err(e)
            }
        }
    }

    /// Start loading `paths` on a worker thread.
    ///
    /// A load already in progress is cancelled. The result is installed by
    /// a later [`Session::poll`].
    pub fn load_in_background(&mut self, paths: Vec<PathBuf>) -> std::io::Result<()> {
        self.cancel_load();
        self.load_job = None;

        let worker_paths = paths.clone();
        let job = Job::spawn("labelcheck-load", move |ctx: &JobContext<LoadOutcome>| {
            ingest::load(&worker_paths, ctx, ctx.cancel_flag())
        })?;

        log::info!("Loading {} file(s) in the background", paths.len());
        self.load_job = Some(PendingLoad { job, paths });
        Ok(())
    }

    /// Ask a background load to stop. Nothing is installed.
    pub fn cancel_load(&self) {
        if let Some(pending) = &self.load_job {
            pending.job.cancel();
        }
    }

    /// Whether a background load is running.
    pub fn is_loading(&self) -> bool {
        self.load_job.is_some()
    }

    fn install(&mut self, set: RecordSet, report: &LoadReport, paths: &[PathBuf]) {
        self.history.clear();
        self.vocabulary.invalidate();
        self.autosave.loaded(Snapshot::of(&set));
        self.query.labels.clear();

        let sender = self.events.sender();
        sender.emit(Event::Loaded {
            records: set.len(),
            files: set.files().len(),
        });
        if report.duplicate_count() > 0 {
            sender.warn(format!(
                "{} record(s) with a duplicate UUID are hidden and will be saved unchanged",
                report.duplicate_count()
            ));
        }
        if let [path] = paths {
            sender.push_recent_file(path.clone(), FileKind::Data);
        }

        log::info!(
            "Installed {} records from {} file(s)",
            set.len(),
            set.files().len()
        );
        self.records = Some(set);
    }

    fn report_load_error(&self, e: &IngestError) {
        if matches!(e, IngestError::Cancelled) {
            log::info!("Load cancelled");
            return;
        }
        log::error!("Load failed: {}", e);
        self.events.sender().report(e.kind(), e.to_string());
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Apply progress and results of background jobs.
    pub fn poll(&mut self) {
        self.poll_load();
        self.poll_save();
    }

    /// Poll background jobs and start an automatic save when one is due.
    ///
    /// Returns `true` if an automatic save was started.
    pub fn tick(&mut self) -> bool {
        self.poll();
        if !self.autosave_due() {
            return false;
        }
        match self.save_in_background(false) {
            Ok(started) => started,
            Err(e) => {
                log::warn!("Failed to start auto-save: {}", e);
                if let Some(set) = &self.records {
                    self.autosave.failed(Snapshot::of(set));
                }
                false
            }
        }
    }

    fn poll_load(&mut self) {
        let Some(pending) = self.load_job.as_mut() else {
            return;
        };

        let mut outcome = None;
        while let Some(update) = pending.job.try_update() {
            match update {
                JobUpdate::Progress { percent, file } => {
                    self.events.sender().emit(Event::Progress { percent, file });
                }
                JobUpdate::Finished(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }

        if outcome.is_none() && !pending.job.is_finished() {
            return;
        }
        let Some(pending) = self.load_job.take() else {
            return;
        };

        match outcome {
            Some(Ok((set, report))) => self.install(set, &report, &pending.paths),
            Some(Err(e)) => self.report_load_error(&e),
            None => self
                .events
                .sender()
                .report("IOError", "Loading stopped without a result"),
        }
    }

    fn poll_save(&mut self) {
        let Some(pending) = self.save_job.as_mut() else {
            return;
        };

        let mut outcome = None;
        while let Some(update) = pending.job.try_update() {
            if let JobUpdate::Finished(report) = update {
                outcome = Some(report);
                break;
            }
        }

        if outcome.is_none() && !pending.job.is_finished() {
            return;
        }
        let Some(pending) = self.save_job.take() else {
            return;
        };

        match outcome {
            Some(report) => {
                // Already reported through events.
                let _ = self.finish_save(pending.manual, pending.snapshot, report);
            }
            None => {
                self.events
                    .sender()
                    .report("SaveError", "Saving stopped without a result");
                self.autosave.failed(pending.snapshot);
            }
        }
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Save every file group on the calling thread.
    ///
    /// An automatic save (`manual == false`) is skipped, returning
    /// `Ok(None)`, unless the auto-save throttle says one is due and no
    /// background save is running. A manual save always runs and cancels any
    /// background save first.
    pub fn save(&mut self, manual: bool) -> Result<Option<Vec<WrittenFile>>, SaveError> {
        if manual {
            self.cancel_save();
        } else if !self.autosave_due() {
            return Ok(None);
        }

        let Some(set) = &self.records else {
            if manual {
                self.events.sender().report("SaveError", "No data loaded");
                return Err(SaveError::NoData);
            }
            return Ok(None);
        };

        let snapshot = Snapshot::of(set);
        let report = save_record_set(set, &AtomicBool::new(false));
        self.finish_save(manual, snapshot, report).map(Some)
    }

    /// Start saving a snapshot of the records on a worker thread.
    ///
    /// Returns `Ok(false)` when nothing was started: no data is loaded, or
    /// an automatic save is not due or already running. A manual save
    /// cancels a running background save first.
    pub fn save_in_background(&mut self, manual: bool) -> std::io::Result<bool> {
        if manual {
            self.cancel_save();
        } else if !self.autosave_due() {
            return Ok(false);
        }

        let Some(set) = &self.records else {
            if manual {
                self.events.sender().report("SaveError", "No data loaded");
            }
            return Ok(false);
        };

        let snapshot = Snapshot::of(set);
        let records = set.clone();
        let job = Job::spawn("labelcheck-save", move |ctx: &JobContext<SaveReport>| {
            save_record_set(&records, ctx.cancel_flag())
        })?;

        log::debug!(
            "Started {} save in the background",
            if manual { "manual" } else { "automatic" }
        );
        self.save_job = Some(PendingSave {
            job,
            manual,
            snapshot,
        });
        Ok(true)
    }

    /// Whether a background save is running.
    pub fn is_saving(&self) -> bool {
        self.save_job.is_some()
    }

    /// Whether corrections were made since the last successful save.
    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.is_dirty()
    }

    fn cancel_save(&mut self) {
        if let Some(pending) = self.save_job.take() {
            log::info!("Superseding running save");
            pending.job.cancel();
            // Dropping the job joins the worker; groups not yet started are skipped.
        }
    }

    /// Why an automatic save would not run now; `None` when one is due.
    pub fn autosave_hold(&self) -> Option<Hold> {
        self.autosave.due().err()
    }

    fn autosave_due(&self) -> bool {
        if self.save_job.is_some() {
            return false;
        }
        match self.autosave.due() {
            Ok(()) => true,
            Err(hold) => {
                log::trace!("Auto-save skipped: {}", hold);
                false
            }
        }
    }

    fn note_change(&mut self) {
        if let Some(set) = &self.records {
            self.autosave.changed(Snapshot::of(set));
        }
    }

    fn finish_save(
        &mut self,
        manual: bool,
        snapshot: Snapshot,
        report: SaveReport,
    ) -> Result<Vec<WrittenFile>, SaveError> {
        let cancelled = report.cancelled.len();

        match report.into_result() {
            Ok(written) => {
                if cancelled > 0 {
                    log::info!("Save cancelled; {} file(s) skipped", cancelled);
                    return Ok(written);
                }

                log::info!("Saved {} file(s)", written.len());
                let sender = self.events.sender();
                sender.emit(Event::Saved {
                    files: written.len(),
                    manual,
                });
                if let [file] = written.as_slice() {
                    sender.push_recent_file(file.path.clone(), FileKind::Data);
                }

                self.autosave.saved(snapshot);
                Ok(written)
            }
            Err(e) => {
                log::error!("Save failed: {}", e);
                self.events.sender().report("SaveError", e.to_string());
                self.autosave.failed(snapshot);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Records and view
    // =========================================================================

    /// The loaded record set.
    pub fn records(&self) -> Option<&RecordSet> {
        self.records.as_ref()
    }

    /// Whether data is loaded.
    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    /// Active stage.
    pub fn stage(&self) -> Stage {
        self.query.stage
    }

    /// Switch the active stage; the label filter is cleared.
    pub fn set_stage(&mut self, stage: Stage) {
        if self.query.stage != stage {
            log::debug!("Switched to {}", stage);
            self.query.stage = stage;
            self.query.labels.clear();
        }
    }

    /// Current view settings.
    pub fn view_query(&self) -> &ViewQuery {
        &self.query
    }

    /// Filter by check state.
    pub fn set_check_mode(&mut self, mode: CheckMode) {
        self.query.mode = mode;
    }

    /// Show only records carrying one of `labels`; empty shows all.
    pub fn set_label_filter(&mut self, labels: Vec<String>) {
        self.query.labels = labels;
    }

    /// Sort by `column`, or by display identity when `None`.
    pub fn set_sort(&mut self, column: Option<&'static Column>, descending: bool) {
        self.query.sort = column;
        self.query.descending = descending;
    }

    /// Indices of the visible records, in display order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.records
            .as_ref()
            .map(|set| visible_indices(set, &self.query))
            .unwrap_or_default()
    }

    /// The visible records, in display order.
    pub fn visible_records(&self) -> Vec<&Record> {
        self.records
            .as_ref()
            .map(|set| visible_records(set, &self.query))
            .unwrap_or_default()
    }

    /// Labels the operator can pick for `stage`.
    pub fn selectable_labels(&mut self, stage: Stage) -> &[String] {
        let Some(set) = &self.records else {
            return &[];
        };
        self.vocabulary.refresh(set, stage)
    }

    /// Confirmed classification label counts over the gated records.
    pub fn label_counts(&self) -> Vec<(String, usize)> {
        self.records
            .as_ref()
            .map(|set| {
                label_counts(
                    set.records(),
                    &self.config.gating_label,
                    &self.config.excluded_label,
                )
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Corrections
    // =========================================================================

    /// Assign `label` on `stage` to the records at `indices`.
    ///
    /// An empty `label` accepts the predicted label. See
    /// [`correction::assign`].
    pub fn assign(
        &mut self,
        stage: Stage,
        label: &str,
        indices: &[usize],
    ) -> Result<usize, CorrectionError> {
        let Some(set) = self.records.as_mut() else {
            return Err(CorrectionError::NoDataLoaded);
        };
        let changed = correction::assign(set, &mut self.history, stage, label, indices)?;
        if changed > 0 {
            self.note_change();
        }
        Ok(changed)
    }

    /// Revert the newest correction batch. Returns `false` if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(set) = self.records.as_mut() else {
            return false;
        };
        let changed = self.history.undo(set);
        if changed {
            self.note_change();
        }
        changed
    }

    /// Reapply the newest undone batch. Returns `false` if there is none.
    pub fn redo(&mut self) -> bool {
        let Some(set) = self.records.as_mut() else {
            return false;
        };
        let changed = self.history.redo(set);
        if changed {
            self.note_change();
        }
        changed
    }

    /// Whether [`Session::undo`] would change anything.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`Session::redo`] would change anything.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // =========================================================================
    // Label-code list
    // =========================================================================

    /// Read the label-code list at `path`, replacing the current one.
    pub fn open_labels(&mut self, path: &Path) -> Result<(), LabelFileError> {
        let book = match LabelBook::load(path) {
            Ok(book) => book,
            Err(e) => {
                self.report_label_file_error(&e);
                return Err(e);
            }
        };

        let sender = self.events.sender();
        for (code, labels) in book.code_collisions() {
            sender.warn(format!("Code {} is used by: {}", code, labels.join(", ")));
        }
        sender.push_recent_file(path.to_path_buf(), FileKind::Labels);

        log::info!("Opened {} label(s) from {:?}", book.len(), path);
        self.labels = book;
        self.label_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Write the label-code list to `path` and remember it.
    pub fn save_labels(&mut self, path: &Path) -> Result<(), LabelFileError> {
        if let Err(e) = self.labels.save(path) {
            self.report_label_file_error(&e);
            return Err(e);
        }
        log::info!("Saved {} label(s) to {:?}", self.labels.len(), path);
        self.events
            .sender()
            .push_recent_file(path.to_path_buf(), FileKind::Labels);
        self.label_path = Some(path.to_path_buf());
        Ok(())
    }

    fn report_label_file_error(&self, e: &LabelFileError) {
        let kind = match e {
            LabelFileError::Io { .. } => "IOError",
            _ => "ParseError",
        };
        log::error!("Label file error: {}", e);
        self.events.sender().report(kind, e.to_string());
    }

    /// The label-code list.
    pub fn labels(&self) -> &LabelBook {
        &self.labels
    }

    /// Path the label-code list was read from or last saved to.
    pub fn label_path(&self) -> Option<&Path> {
        self.label_path.as_deref()
    }

    /// Add a label with a numeric `code`.
    pub fn create_label(&mut self, name: &str, code: &str) -> Result<LabelCode, LabelConflictError> {
        self.labels.create(name, code).cloned()
    }

    /// Rename a label everywhere.
    ///
    /// The label-code entry is renamed when present, every record field
    /// holding `old` on either stage is rewritten and the cached vocabulary
    /// entry is replaced in place. The undo history is left alone. Returns
    /// the number of records changed.
    pub fn rename_label(&mut self, old: &str, new: &str) -> Result<usize, LabelConflictError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(LabelConflictError::EmptyName);
        }
        if old == new {
            return Ok(0);
        }

        if self.labels.get(old).is_some() {
            self.labels.rename(old, new)?;
        }

        let changed = self
            .records
            .as_mut()
            .map(|set| correction::rename_in_records(set, old, new))
            .unwrap_or(0);
        self.vocabulary.rename(old, new);
        for label in &mut self.query.labels {
            if *label == old {
                *label = new.to_string();
            }
        }
        if changed > 0 {
            self.note_change();
        }
        Ok(changed)
    }

    /// Remove a label-code entry. Records keep their values.
    pub fn delete_label(&mut self, name: &str) -> Result<LabelCode, LabelConflictError> {
        self.labels.delete(name)
    }

    /// Find the label meant by quick-entry `input`.
    pub fn resolve_label(&self, input: &str) -> Option<&LabelCode> {
        self.labels.resolve(input)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
