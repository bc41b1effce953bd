//! Reader and writer for the label-code list.
//!
//! The list is a two-column table `label,code` with a header row. Reading
//! accepts commas or semicolons; writing always uses commas.

use std::fs;
use std::path::Path;

use super::csv_io::{ReplaceError, detect_delimiter, replace_file};
use super::error::LabelFileError;
use crate::model::LabelCode;

/// Read the label-code list at `path`.
pub fn read_label_file(path: &Path) -> Result<Vec<LabelCode>, LabelFileError> {
    let content = fs::read_to_string(path).map_err(|source| LabelFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_label_codes(path, &content)
}

/// Parse label-code `content` as if read from `path`.
pub fn parse_label_codes(path: &Path, content: &str) -> Result<Vec<LabelCode>, LabelFileError> {
    let wrong_delimiter = || LabelFileError::WrongDelimiter {
        path: path.to_path_buf(),
    };

    let header_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(wrong_delimiter)?;
    let delimiter = detect_delimiter(header_line).ok_or_else(wrong_delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let expected = reader
        .headers()
        .map_err(|source| LabelFileError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    let mut entries = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|source| LabelFileError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if row.len() != expected {
            return Err(LabelFileError::FieldCount {
                path: path.to_path_buf(),
                line: row.position().map_or(0, |p| p.line()),
                expected,
                found: row.len(),
            });
        }
        let label = row.get(0).unwrap_or_default().trim();
        let code = row.get(1).unwrap_or_default().trim();
        entries.push(LabelCode::new(label, code));
    }

    log::debug!("Read {} label codes from {:?}", entries.len(), path);
    Ok(entries)
}

/// Replace the label-code list at `path` with `entries`.
pub fn write_label_file(path: &Path, entries: &[LabelCode]) -> Result<(), LabelFileError> {
    replace_file(path, |file| {
        let mut out = csv::Writer::from_writer(file);
        out.write_record(["label", "code"])?;
        for entry in entries {
            out.write_record([entry.label.as_str(), entry.code.as_str()])?;
        }
        out.flush()?;
        Ok(())
    })
    .map_err(|e| match e {
        ReplaceError::Io(source) => LabelFileError::Io {
            path: path.to_path_buf(),
            source,
        },
        ReplaceError::Write(source) => LabelFileError::Csv {
            path: path.to_path_buf(),
            source,
        },
    })?;

    log::info!("Saved {} label codes to {:?}", entries.len(), path);
    Ok(())
}
