//! labelcheck - label correction for particle-imaging datasets
//!
//! Loads one or more instrument CSV files into a single record set, lets an
//! operator review and correct the predicted labels of two processing stages
//! with bounded undo/redo, and writes every record back to the file it came
//! from.

pub mod config;
pub mod constants;
pub mod correction;
pub mod event;
pub mod filter;
pub mod format;
pub mod ingest;
pub mod jobs;
pub mod labels;
pub mod model;
pub mod session;
pub mod store;
pub mod undo;
pub mod vocabulary;

pub use config::{AppConfig, ConfigError, LogLevel};
pub use correction::CorrectionError;
pub use event::{Event, FileKind};
pub use filter::{CheckMode, ViewQuery};
pub use format::{Hold, IngestError, LabelFileError, SaveError};
pub use ingest::{LoadReport, ProgressSink};
pub use labels::{LabelBook, LabelConflictError};
pub use model::{Column, LabelCode, Record, Stage};
pub use session::{Session, SessionConfig};
pub use store::RecordSet;
pub use undo::UndoHistory;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::event::{Event, FileKind};
    pub use crate::filter::CheckMode;
    pub use crate::model::{Column, Record, Stage};
    pub use crate::session::{Session, SessionConfig};
}
