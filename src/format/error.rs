//! Error types for data-file and label-file operations.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors that abort loading a data file.
///
/// Row-level variants identify the file name, the 1-based line number and
/// the offending column so the operator can fix the source file.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The file could not be opened or read
    #[error("Could not read '{file}': {source}")]
    Io {
        /// File name
        file: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed (e.g. invalid UTF-8 inside a row)
    #[error("Error while parsing the file {file} at line {line}: {source}")]
    Csv {
        /// File name
        file: String,
        /// Line of the failing row
        line: u64,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// The file has no header row
    #[error("The file '{file}' is empty. Please check your header.")]
    EmptyFile {
        /// File name
        file: String,
    },

    /// Neither comma nor semicolon splits the header
    #[error(
        "{file} CSV seems to be in a wrong file format. Please use commas ',' or semicolons ';'."
    )]
    WrongDelimiter {
        /// File name
        file: String,
    },

    /// A header token matches no schema column
    #[error("Error while parsing file {file} at line {line} at column {column}. Unknown column name: {column}")]
    UnknownColumn {
        /// File name
        file: String,
        /// Header line
        line: u64,
        /// Header token as written
        column: String,
    },

    /// Two header tokens name the same schema column
    #[error("Error while parsing file {file}: column {column} appears more than once")]
    DuplicateColumn {
        /// File name
        file: String,
        /// Header token as written
        column: String,
    },

    /// A row has a different number of fields than the header
    #[error("Error while parsing file {file} at line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        /// File name
        file: String,
        /// Line of the row
        line: u64,
        /// Header field count
        expected: usize,
        /// Row field count
        found: usize,
    },

    /// A cell could not be converted to its column type
    #[error("Error while reading file {file} at line {line} at column {column}. {message} Target data format: {kind}")]
    InvalidValue {
        /// File name
        file: String,
        /// Line of the row
        line: u64,
        /// Column name
        column: String,
        /// Expected type
        kind: &'static str,
        /// Parser message
        message: String,
    },

    /// No input files were given
    #[error("No data files to load")]
    NoFiles,

    /// Loading was cancelled before completion
    #[error("Loading was cancelled")]
    Cancelled,
}

impl IngestError {
    /// Short category used when reporting the error to the operator.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Io { .. } => "IOError",
            IngestError::Cancelled => "Cancelled",
            IngestError::NoFiles => "NoFilesFound",
            _ => "ParseError",
        }
    }

    /// Create an I/O error for `file`.
    pub fn io(file: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            file: file.into(),
            source,
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        file: impl Into<String>,
        line: u64,
        column: impl Into<String>,
        kind: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            file: file.into(),
            line,
            column: column.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Errors that abort saving one file group.
#[derive(Error, Debug)]
pub enum SaveError {
    /// The temporary file could not be created or moved over the target
    #[error("Failed to save '{path:?}': {source}")]
    Io {
        /// Target file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The CSV writer failed
    #[error("Failed to write '{path:?}': {source}")]
    Csv {
        /// Target file
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// A file group resolved to more than one origin path
    #[error("Failed to save data: records for {path:?} also belong to {others:?}")]
    MixedOrigins {
        /// The file being saved
        path: PathBuf,
        /// Other paths found in the same group
        others: Vec<PathBuf>,
    },

    /// A record listed for a file has no origin entry
    #[error("Failed to save data: record {uuid} has no origin")]
    MissingOrigin {
        /// The record without origin
        uuid: Uuid,
    },

    /// Nothing is loaded
    #[error("No data loaded")]
    NoData,

    /// Some file groups failed; the others were written
    #[error("{} file(s) could not be saved ({} written): {}", failures.len(), written.len(), first_failure(failures))]
    Incomplete {
        /// Files written successfully
        written: Vec<PathBuf>,
        /// Per-group failures
        failures: Vec<SaveError>,
    },
}

fn first_failure(failures: &[SaveError]) -> String {
    failures
        .first()
        .map(|e| e.to_string())
        .unwrap_or_default()
}

impl SaveError {
    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a CSV error for `path`.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Errors reading or writing the label-code list.
#[derive(Error, Debug)]
pub enum LabelFileError {
    /// The file could not be read or written
    #[error("IO error on label file {path:?}: {source}")]
    Io {
        /// Label file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader or writer failed
    #[error("CSV error on label file {path:?}: {source}")]
    Csv {
        /// Label file path
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// The header is missing or not comma/semicolon separated
    #[error("Label file {path:?} seems to be in a wrong file format. Please use commas ',' or semicolons ';'.")]
    WrongDelimiter {
        /// Label file path
        path: PathBuf,
    },

    /// A row has a different number of fields than the header
    #[error("Label file {path:?} line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        /// Label file path
        path: PathBuf,
        /// Line of the row
        line: u64,
        /// Header field count
        expected: usize,
        /// Row field count
        found: usize,
    },
}
