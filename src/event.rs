//! Notifications from the core to the host application.
//!
//! The session never calls into UI code. Everything the host needs to react
//! to (errors, progress, input locking, recent-file updates) is queued as an
//! [`Event`] on a single channel and consumed once by the host loop.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

/// Kind of file a recent-files entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Instrument data file
    Data,
    /// Label-code list
    Labels,
}

/// A notification for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An operation failed; show a dismissable notification
    Error {
        /// Error category, e.g. `ParseError`
        kind: String,
        /// Operator-facing message
        message: String,
    },
    /// Something noteworthy that did not fail the operation
    Warning {
        /// Operator-facing message
        message: String,
    },
    /// Disable (`true`) or re-enable (`false`) transient keyboard shortcuts
    InputLocked(bool),
    /// Add a file to the recent-files list
    RecentFile {
        /// Path of the file
        path: PathBuf,
        /// What the file is
        kind: FileKind,
    },
    /// Load progress
    Progress {
        /// Share of files done, 0..=100
        percent: u8,
        /// File just finished
        file: String,
    },
    /// A dataset was installed
    Loaded {
        /// Number of records
        records: usize,
        /// Number of source files
        files: usize,
    },
    /// A save finished
    Saved {
        /// Number of files written
        files: usize,
        /// Whether it was a manual save
        manual: bool,
    },
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    /// Queue `event`. Events are dropped silently once the queue is gone.
    pub fn emit(&self, event: Event) {
        log::trace!("Event: {:?}", event);
        let _ = self.tx.send(event);
    }

    /// Report a failure to the operator.
    pub fn report(&self, kind: &str, message: impl Into<String>) {
        self.emit(Event::Error {
            kind: kind.to_string(),
            message: message.into(),
        });
    }

    /// Report a non-fatal problem.
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Event::Warning {
            message: message.into(),
        });
    }

    /// Lock or unlock transient keyboard shortcuts.
    pub fn set_input_locked(&self, locked: bool) {
        self.emit(Event::InputLocked(locked));
    }

    /// Ask the host to remember `path`.
    pub fn push_recent_file(&self, path: PathBuf, kind: FileKind) {
        self.emit(Event::RecentFile { path, kind });
    }
}

/// The event channel, owned by the session.
#[derive(Debug)]
pub struct EventQueue {
    sender: EventSender,
    rx: Receiver<Event>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            sender: EventSender { tx },
            rx,
        }
    }

    /// Sending half, cloneable into workers.
    pub fn sender(&self) -> &EventSender {
        &self.sender
    }

    /// Take the oldest pending event.
    pub fn try_next(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Take every pending event.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
