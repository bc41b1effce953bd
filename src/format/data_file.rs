//! Reader and writer for instrument data files.
//!
//! A data file is a delimited text table whose first row names the columns.
//! Columns may appear in any order and any subset of [`SCHEMA`]; cells of
//! columns missing from the file keep their defaults. Fields are separated by
//! commas, or by semicolons when the header contains no comma.
//!
//! Files are always written back comma-separated with the full schema in
//! canonical order.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use super::csv_io::{
    ReplaceError, clean_header_token, detect_delimiter, display_name, replace_file,
};
use super::error::{IngestError, SaveError};
use crate::constants::CANCEL_CHECK_ROWS;
use crate::model::{Column, Record, SCHEMA};
use crate::store::Origin;

/// Records parsed from one data file, in row order.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Canonical path of the file
    pub path: PathBuf,
    /// Each record with the origin it was read from
    pub rows: Vec<(Record, Origin)>,
    /// Number of rows whose UUID cell was empty and got a fresh identity
    pub generated_uuids: usize,
}

/// Read and parse the data file at `path`.
pub fn read_data_file(path: &Path, cancel: &AtomicBool) -> Result<ParsedFile, IngestError> {
    let name = display_name(path);
    let canonical = fs::canonicalize(path).map_err(|e| IngestError::io(&name, e))?;
    let content = fs::read_to_string(&canonical).map_err(|e| IngestError::io(&name, e))?;
    parse_data(&canonical, &content, cancel)
}

/// Parse data-file `content` as if read from `path`.
///
/// Any malformed row fails the whole file.
pub fn parse_data(
    path: &Path,
    content: &str,
    cancel: &AtomicBool,
) -> Result<ParsedFile, IngestError> {
    let name = display_name(path);

    let header_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| IngestError::EmptyFile { file: name.clone() })?;
    let delimiter = detect_delimiter(header_line)
        .ok_or_else(|| IngestError::WrongDelimiter { file: name.clone() })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = reader.records();

    let header = match rows.next() {
        Some(Ok(header)) => header,
        Some(Err(source)) => {
            return Err(IngestError::Csv {
                file: name,
                line: 1,
                source,
            });
        }
        None => return Err(IngestError::EmptyFile { file: name }),
    };
    let header_line_no = header.position().map_or(1, |p| p.line());
    let columns = map_header(&name, header_line_no, &header)?;

    let mut parsed = ParsedFile {
        path: path.to_path_buf(),
        rows: Vec::new(),
        generated_uuids: 0,
    };

    for (row, result) in rows.enumerate() {
        if row % CANCEL_CHECK_ROWS == 0 && cancel.load(Ordering::Relaxed) {
            return Err(IngestError::Cancelled);
        }

        let fields = result.map_err(|source| IngestError::Csv {
            file: name.clone(),
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        let line = fields.position().map_or(0, |p| p.line());

        if fields.len() != columns.len() {
            return Err(IngestError::FieldCount {
                file: name,
                line,
                expected: columns.len(),
                found: fields.len(),
            });
        }

        let mut record = Record::default();
        for (column, cell) in columns.iter().zip(fields.iter()) {
            column.read(&mut record, cell).map_err(|message| {
                IngestError::invalid_value(&name, line, column.name, column.kind.name(), message)
            })?;
        }

        if record.uuid.is_nil() {
            record.uuid = Uuid::now_v7();
            parsed.generated_uuids += 1;
        }

        let origin = Origin {
            path: parsed.path.clone(),
            row,
            file_id: record.id,
        };
        parsed.rows.push((record, origin));
    }

    log::debug!(
        "Parsed {} rows from {} ({} columns)",
        parsed.rows.len(),
        name,
        columns.len()
    );
    Ok(parsed)
}

fn map_header(
    file: &str,
    line: u64,
    header: &csv::StringRecord,
) -> Result<Vec<&'static Column>, IngestError> {
    let mut seen = HashSet::new();
    header
        .iter()
        .map(|token| {
            let token = clean_header_token(token);
            let column = Column::lookup(&token).ok_or_else(|| IngestError::UnknownColumn {
                file: file.to_string(),
                line,
                column: token.clone(),
            })?;
            if !seen.insert(column.name) {
                return Err(IngestError::DuplicateColumn {
                    file: file.to_string(),
                    column: token,
                });
            }
            Ok(column)
        })
        .collect()
}

/// Serialize `rows` as a comma-separated table with the full schema.
///
/// The `Id` column receives each row's file-local identity from its origin,
/// not the session display identity.
pub fn write_records<W: io::Write>(
    writer: W,
    rows: &[(&Record, &Origin)],
) -> Result<(), csv::Error> {
    let mut out = csv::WriterBuilder::new().delimiter(b',').from_writer(writer);
    out.write_record(SCHEMA.iter().map(|column| column.name))?;

    for (record, origin) in rows {
        out.write_record(SCHEMA.iter().map(|column| {
            if column.name == "Id" {
                origin.file_id.to_string()
            } else {
                column.write(record)
            }
        }))?;
    }

    out.flush()?;
    Ok(())
}

/// Replace the data file at `path` with `rows`.
pub fn write_data_file(path: &Path, rows: &[(&Record, &Origin)]) -> Result<(), SaveError> {
    replace_file(path, |file| write_records(file, rows)).map_err(|e| match e {
        ReplaceError::Io(source) => SaveError::io(path, source),
        ReplaceError::Write(source) => SaveError::csv(path, source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ParsedFile, IngestError> {
        parse_data(
            Path::new("/data/LabelChecker_test.csv"),
            content,
            &AtomicBool::new(false),
        )
    }

    #[test]
    fn test_parse_comma_file() {
        let parsed = parse(
            "Name,Id,Uuid,AbdArea,LabelPredicted,LabelTrue\n\
             p1,1,0190a1a6-1f2e-7c4d-8e9f-0a1b2c3d4e5f,12.5,algae,\n\
             p2,2,,3,bubble,detritus\n",
        )
        .unwrap();

        assert_eq!(parsed.rows.len(), 2);
        let (first, origin) = &parsed.rows[0];
        assert_eq!(first.name, "p1");
        assert_eq!(first.abd_area, 12.5);
        assert_eq!(first.label_predicted, "algae");
        assert_eq!(origin.row, 0);
        assert_eq!(origin.file_id, 1);

        let (second, origin) = &parsed.rows[1];
        assert_eq!(second.label_true, "detritus");
        assert!(!second.uuid.is_nil());
        assert_eq!(origin.row, 1);
        assert_eq!(parsed.generated_uuids, 1);
    }

    #[test]
    fn test_parse_semicolon_file_with_loose_headers() {
        let parsed = parse("\u{feff}name;\"ID\";abd_area;label_true\nx;5;1.25;algae\n").unwrap();
        let (record, origin) = &parsed.rows[0];
        assert_eq!(record.name, "x");
        assert_eq!(record.abd_area, 1.25);
        assert_eq!(record.label_true, "algae");
        assert_eq!(origin.file_id, 5);
    }

    #[test]
    fn test_empty_cells_take_defaults() {
        let parsed = parse("Name,Id,AbdArea,LabelTrue\n,,,\n").unwrap();
        let (record, _) = &parsed.rows[0];
        assert_eq!(record.name, "");
        assert_eq!(record.id, 0);
        assert_eq!(record.abd_area, 0.0);
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let err = parse("Name,Bogus\nx,y\n").unwrap_err();
        match err {
            IngestError::UnknownColumn { file, line, column } => {
                assert_eq!(file, "LabelChecker_test.csv");
                assert_eq!(line, 1);
                assert_eq!(column, "Bogus");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_column_is_rejected() {
        let err = parse("Name,name\nx,y\n").unwrap_err();
        assert!(matches!(err, IngestError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_invalid_value_names_line_and_column() {
        let err = parse("Name,AbdArea\nok,1.0\nbad,abc\n").unwrap_err();
        match err {
            IngestError::InvalidValue {
                line, column, kind, ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, "AbdArea");
                assert_eq!(kind, "floating point number");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_field_count_mismatch() {
        let err = parse("Name,Id\nx,1,extra\n").unwrap_err();
        assert!(matches!(
            err,
            IngestError::FieldCount {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_delimiter_and_empty_file() {
        assert!(matches!(
            parse("Name\tId\nx\t1\n").unwrap_err(),
            IngestError::WrongDelimiter { .. }
        ));
        assert!(matches!(parse("\n\n").unwrap_err(), IngestError::EmptyFile { .. }));
    }

    #[test]
    fn test_cancelled_parse() {
        let err = parse_data(
            Path::new("x.csv"),
            "Name,Id\na,1\n",
            &AtomicBool::new(true),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::Cancelled));
    }

    #[test]
    fn test_write_uses_file_ids_and_full_schema() {
        let mut record = Record::with_uuid(Uuid::now_v7());
        record.id = 42;
        record.name = "with, comma".into();
        let origin = Origin {
            path: PathBuf::from("a.csv"),
            row: 0,
            file_id: 7,
        };

        let mut out = Vec::new();
        write_records(&mut out, &[(&record, &origin)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(header.len(), SCHEMA.len());
        assert_eq!(header[0], "Name");

        let parsed = parse(&text).unwrap();
        let (back, back_origin) = &parsed.rows[0];
        assert_eq!(back.name, "with, comma");
        assert_eq!(back.uuid, record.uuid);
        assert_eq!(back_origin.file_id, 7);
    }
}
