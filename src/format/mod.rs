//! On-disk formats: instrument data files and the label-code list.
//!
//! ## Data files
//!
//! Delimited tables with a header row naming columns of the record schema.
//! [`read_data_file`] parses one file; [`save_record_set`] writes a whole
//! record set back to its source files, one file group at a time.
//!
//! ## Label-code list
//!
//! A `label,code` table mapping label names to numeric shortcuts, handled by
//! [`read_label_file`] and [`write_label_file`].

mod auto_save;
mod csv_io;
mod data_file;
mod error;
mod label_file;
mod persist;

#[cfg(test)]
mod tests;

pub use auto_save::{AutoSave, Hold, Snapshot};
pub use data_file::{ParsedFile, parse_data, read_data_file, write_data_file, write_records};
pub use error::{IngestError, LabelFileError, SaveError};
pub use label_file::{parse_label_codes, read_label_file, write_label_file};
pub use persist::{SaveReport, WrittenFile, collect_group, save_record_set};
