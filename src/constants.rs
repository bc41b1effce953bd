//! Global constants for the label-correction core

use std::time::Duration;

/// Number of batch corrections kept in the undo and redo rings
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// Minimum time between two automatic saves
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(300);

/// Quiet time after the last correction before an automatic save
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Stage-A label that routes a record into classification
pub const DEFAULT_GATING_LABEL: &str = "object";

/// Sentinel label that never appears in a selectable vocabulary
pub const DEFAULT_EXCLUDED_LABEL: &str = "not_included";

/// Length of the recent-files lists kept in the settings
pub const MAX_RECENT_FILES: usize = 10;

/// Marker that identifies data files when scanning a folder
pub const DATA_FILE_MARKER: &str = "LabelChecker_";

/// Extension of data and label-code files
pub const DATA_FILE_EXTENSION: &str = "csv";

/// Rows parsed between two cancellation checks during ingestion
pub const CANCEL_CHECK_ROWS: usize = 1024;
