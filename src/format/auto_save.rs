//! Automatic-save scheduling for corrected data files.
//!
//! The schedule compares the contents last written with the contents now in
//! memory, both identified by a [`Snapshot`]. The data is dirty exactly
//! when the two differ, so corrections made while a background save was
//! writing an older snapshot keep the data dirty without extra bookkeeping.

use std::fmt;
use std::time::Duration;
use web_time::Instant;

use crate::constants::{DEFAULT_AUTOSAVE_DEBOUNCE, DEFAULT_AUTOSAVE_INTERVAL};
use crate::store::RecordSet;

/// Identity of record-set contents at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Dataset the contents belong to
    pub generation: u64,
    /// Mutation counter of that dataset
    pub revision: u64,
}

impl Snapshot {
    /// Identity of the current contents of `set`.
    pub fn of(set: &RecordSet) -> Self {
        Self {
            generation: set.generation(),
            revision: set.revision(),
        }
    }
}

/// Why an automatic save is not due yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    /// Automatic saves are switched off
    Disabled,
    /// Nothing changed since the last save
    Clean,
    /// The operator is still correcting; the value is the quiet time left
    Settling(Duration),
    /// The previous attempt was too recent; the value is the time left
    Throttled(Duration),
}

impl fmt::Display for Hold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hold::Disabled => write!(f, "auto-save is disabled"),
            Hold::Clean => write!(f, "no unsaved corrections"),
            Hold::Settling(left) => write!(f, "waiting {}s for corrections to settle", left.as_secs()),
            Hold::Throttled(left) => write!(f, "next auto-save in {}s", left.as_secs()),
        }
    }
}

/// Decides when the loaded records should be written automatically.
#[derive(Debug)]
pub struct AutoSave {
    interval: Duration,
    debounce: Duration,
    enabled: bool,
    /// Contents known to be on disk
    saved: Option<Snapshot>,
    /// Contents currently in memory
    current: Option<Snapshot>,
    last_change: Option<Instant>,
    last_attempt: Option<Instant>,
}

impl AutoSave {
    /// Create a schedule with at least `interval` between attempts and a
    /// quiet time of `debounce` after each correction.
    pub fn new(interval: Duration, debounce: Duration) -> Self {
        Self {
            interval,
            debounce,
            enabled: true,
            saved: None,
            current: None,
            last_change: None,
            last_attempt: None,
        }
    }

    /// Switch automatic saves on or off. Dirty tracking is unaffected.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Auto-save: enabled = {}", enabled);
    }

    /// A dataset was loaded from disk; its contents count as saved.
    pub fn loaded(&mut self, snapshot: Snapshot) {
        self.saved = Some(snapshot);
        self.current = Some(snapshot);
        self.last_change = None;
        self.last_attempt = None;
    }

    /// The in-memory contents changed to `snapshot`.
    pub fn changed(&mut self, snapshot: Snapshot) {
        self.current = Some(snapshot);
        self.last_change = Some(Instant::now());
        log::trace!("Auto-save: contents now at revision {}", snapshot.revision);
    }

    /// A save of `written` completed.
    ///
    /// Ignored if another dataset has been loaded since the save started.
    pub fn saved(&mut self, written: Snapshot) {
        if !self.is_current_dataset(written) {
            return;
        }
        self.saved = Some(written);
        self.last_attempt = Some(Instant::now());
        if self.is_dirty() {
            log::debug!("Auto-save: corrections made during the save remain unsaved");
        }
    }

    /// A save of `attempted` failed; the next attempt waits a full interval.
    pub fn failed(&mut self, attempted: Snapshot) {
        if self.is_current_dataset(attempted) {
            self.last_attempt = Some(Instant::now());
        }
    }

    /// Whether the in-memory contents differ from what was last saved.
    pub fn is_dirty(&self) -> bool {
        self.current.is_some() && self.current != self.saved
    }

    /// `Ok` if an automatic save should run now, otherwise the reason why not.
    pub fn due(&self) -> Result<(), Hold> {
        if !self.enabled {
            return Err(Hold::Disabled);
        }
        if !self.is_dirty() {
            return Err(Hold::Clean);
        }
        if let Some(left) = remaining(self.last_change, self.debounce) {
            return Err(Hold::Settling(left));
        }
        if let Some(left) = remaining(self.last_attempt, self.interval) {
            return Err(Hold::Throttled(left));
        }
        Ok(())
    }

    fn is_current_dataset(&self, snapshot: Snapshot) -> bool {
        self.current
            .is_some_and(|current| current.generation == snapshot.generation)
    }
}

impl Default for AutoSave {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_AUTOSAVE_DEBOUNCE)
    }
}

/// Time left until `wait` has passed since `since`, if any.
fn remaining(since: Option<Instant>, wait: Duration) -> Option<Duration> {
    let left = wait.saturating_sub(since?.elapsed());
    (!left.is_zero()).then_some(left)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(generation: u64, revision: u64) -> Snapshot {
        Snapshot {
            generation,
            revision,
        }
    }

    fn instant() -> AutoSave {
        AutoSave::new(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_nothing_loaded_is_clean() {
        let schedule = AutoSave::default();
        assert!(!schedule.is_dirty());
        assert_eq!(schedule.due(), Err(Hold::Clean));
    }

    #[test]
    fn test_change_after_load_is_due() {
        let mut schedule = instant();
        schedule.loaded(snap(1, 10));
        assert_eq!(schedule.due(), Err(Hold::Clean));

        schedule.changed(snap(1, 11));
        assert!(schedule.is_dirty());
        assert_eq!(schedule.due(), Ok(()));
    }

    #[test]
    fn test_disabled_still_tracks_dirty() {
        let mut schedule = instant();
        schedule.set_enabled(false);
        schedule.loaded(snap(1, 0));
        schedule.changed(snap(1, 1));

        assert!(schedule.is_dirty());
        assert_eq!(schedule.due(), Err(Hold::Disabled));
    }

    #[test]
    fn test_debounce_holds_fresh_changes() {
        let mut schedule = AutoSave::new(Duration::ZERO, Duration::from_secs(10));
        schedule.loaded(snap(1, 0));
        schedule.changed(snap(1, 1));

        assert!(matches!(schedule.due(), Err(Hold::Settling(left)) if left > Duration::from_secs(5)));
    }

    #[test]
    fn test_interval_throttles_after_save() {
        let mut schedule = AutoSave::new(Duration::from_secs(300), Duration::ZERO);
        schedule.loaded(snap(1, 0));
        schedule.changed(snap(1, 1));
        assert_eq!(schedule.due(), Ok(()), "first save is not throttled");

        schedule.saved(snap(1, 1));
        schedule.changed(snap(1, 2));
        assert!(matches!(schedule.due(), Err(Hold::Throttled(_))));
    }

    #[test]
    fn test_change_during_save_stays_dirty() {
        let mut schedule = instant();
        schedule.loaded(snap(1, 0));
        schedule.changed(snap(1, 1));
        schedule.changed(snap(1, 2));

        schedule.saved(snap(1, 1));
        assert!(schedule.is_dirty());

        schedule.saved(snap(1, 2));
        assert!(!schedule.is_dirty());
    }

    #[test]
    fn test_failed_save_stays_dirty() {
        let mut schedule = AutoSave::new(Duration::from_secs(300), Duration::ZERO);
        schedule.loaded(snap(1, 0));
        schedule.changed(snap(1, 1));

        schedule.failed(snap(1, 1));
        assert!(schedule.is_dirty());
        assert!(matches!(schedule.due(), Err(Hold::Throttled(_))));
    }

    #[test]
    fn test_stale_dataset_results_are_ignored() {
        let mut schedule = instant();
        schedule.loaded(snap(1, 0));
        schedule.changed(snap(1, 1));
        schedule.loaded(snap(2, 0));
        schedule.changed(snap(2, 1));

        schedule.saved(snap(1, 1));
        assert!(schedule.is_dirty());
        schedule.failed(snap(1, 1));
        assert_eq!(schedule.due(), Ok(()));
    }
}
