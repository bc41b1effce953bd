//! CSV plumbing shared by the data-file and label-file codecs.

use std::fs;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

/// Pick the field delimiter from a header line.
///
/// Comma wins if it splits the header into more than one field, otherwise
/// semicolon is tried. Returns `None` if neither does.
pub(crate) fn detect_delimiter(header: &str) -> Option<u8> {
    if header.split(',').count() > 1 {
        Some(b',')
    } else if header.split(';').count() > 1 {
        Some(b';')
    } else {
        None
    }
}

/// Strip quoting debris, whitespace and a byte-order mark from a header token.
pub(crate) fn clean_header_token(token: &str) -> String {
    token
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .collect::<String>()
        .trim()
        .to_string()
}

/// File name used in operator-facing messages.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Why [`replace_file`] failed.
#[derive(Debug)]
pub(crate) enum ReplaceError {
    /// Creating, syncing or renaming the temporary file failed
    Io(io::Error),
    /// The content writer failed
    Write(csv::Error),
}

/// Replace `path` with whatever `write` produces.
///
/// The content is written to a temporary file in the same directory and then
/// renamed over the target, so a crash never leaves a half-written file. The
/// target's permissions are carried over when it already exists.
pub(crate) fn replace_file<F>(path: &Path, write: F) -> Result<(), ReplaceError>
where
    F: FnOnce(&mut fs::File) -> Result<(), csv::Error>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(ReplaceError::Io)?;
    write(tmp.as_file_mut()).map_err(ReplaceError::Write)?;
    tmp.as_file().sync_all().map_err(ReplaceError::Io)?;

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(ReplaceError::Io)?;
    }

    tmp.persist(path).map_err(|e| ReplaceError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("Name,Id,Uuid"), Some(b','));
        assert_eq!(detect_delimiter("Name;Id;Uuid"), Some(b';'));
        assert_eq!(detect_delimiter("Name\tId"), None);
        assert_eq!(detect_delimiter("Name"), None);
    }

    #[test]
    fn test_clean_header_token() {
        assert_eq!(clean_header_token("\u{feff}Name"), "Name");
        assert_eq!(clean_header_token(" \"Label_True\" "), "Label_True");
        assert_eq!(clean_header_token("Id\\"), "Id");
    }

    #[test]
    fn test_replace_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "old").unwrap();

        replace_file(&path, |file| {
            use std::io::Write;
            file.write_all(b"new")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
