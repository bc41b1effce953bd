//! Data models for the label-correction core.

mod cell;
mod label_code;
mod record;
mod stage;

pub use cell::{CellKind, CellValue, SortKey};
pub use label_code::LabelCode;
pub use record::{Column, Record, SCHEMA, normalize_header};
pub use stage::Stage;
