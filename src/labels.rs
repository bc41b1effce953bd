//! The editable label-code list.
//!
//! Labels are unique by name. Codes are numeric shortcuts for fast entry;
//! new codes must not clash with existing ones, but clashes already present
//! in a loaded file are tolerated and reported by
//! [`LabelBook::code_collisions`].

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use thiserror::Error;

use crate::format::{LabelFileError, read_label_file, write_label_file};
use crate::model::LabelCode;

/// Errors rejecting a label-list edit before anything changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelConflictError {
    /// The label name is empty
    #[error("Label name must not be empty")]
    EmptyName,

    /// The code is empty or not a number
    #[error("Code '{code}' is not a number")]
    InvalidCode {
        /// Rejected code
        code: String,
    },

    /// Another label already has this name
    #[error("Label '{name}' already exists")]
    DuplicateName {
        /// Rejected name
        name: String,
    },

    /// Another label already uses this code
    #[error("Code '{code}' is already used by '{label}'")]
    DuplicateCode {
        /// Rejected code
        code: String,
        /// Label holding the code
        label: String,
    },

    /// No label with this name exists
    #[error("Label '{name}' does not exist")]
    UnknownLabel {
        /// Requested name
        name: String,
    },
}

/// Label-code entries in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelBook {
    entries: Vec<LabelCode>,
}

impl LabelBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from `entries`, keeping the first entry for each name.
    pub fn from_entries(entries: impl IntoIterator<Item = LabelCode>) -> Self {
        let mut seen = HashSet::new();
        let mut book = Self::new();
        for entry in entries {
            if entry.label.is_empty() {
                continue;
            }
            if seen.insert(entry.label.clone()) {
                book.entries.push(entry);
            } else {
                log::warn!("Ignoring duplicate label '{}' in label list", entry.label);
            }
        }
        book
    }

    /// Read a book from the label-code file at `path`.
    pub fn load(path: &Path) -> Result<Self, LabelFileError> {
        read_label_file(path).map(Self::from_entries)
    }

    /// Rewrite the label-code file at `path` with this book.
    pub fn save(&self, path: &Path) -> Result<(), LabelFileError> {
        write_label_file(path, &self.entries)
    }

    /// All entries.
    pub fn entries(&self) -> &[LabelCode] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry named exactly `name`.
    pub fn get(&self, name: &str) -> Option<&LabelCode> {
        self.entries.iter().find(|e| e.label == name)
    }

    fn same_name(a: &str, b: &str) -> bool {
        a.to_lowercase() == b.to_lowercase()
    }

    /// Add a label with `code`.
    ///
    /// The name must not exist yet (ignoring case) and the code must be a
    /// number not used by another label.
    pub fn create(&mut self, name: &str, code: &str) -> Result<&LabelCode, LabelConflictError> {
        let name = name.trim();
        let code = code.trim();

        if name.is_empty() {
            return Err(LabelConflictError::EmptyName);
        }
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(LabelConflictError::InvalidCode {
                code: code.to_string(),
            });
        }
        if self.entries.iter().any(|e| Self::same_name(&e.label, name)) {
            return Err(LabelConflictError::DuplicateName {
                name: name.to_string(),
            });
        }
        if let Some(holder) = self.entries.iter().find(|e| e.code == code) {
            return Err(LabelConflictError::DuplicateCode {
                code: code.to_string(),
                label: holder.label.clone(),
            });
        }

        log::info!("Created label '{}' with code {}", name, code);
        self.entries.push(LabelCode::new(name, code));
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Rename `old` to `new`, keeping its code and position.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), LabelConflictError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(LabelConflictError::EmptyName);
        }
        let pos = self
            .entries
            .iter()
            .position(|e| e.label == old)
            .ok_or_else(|| LabelConflictError::UnknownLabel {
                name: old.to_string(),
            })?;
        if old == new {
            return Ok(());
        }
        let clash = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, e)| i != pos && Self::same_name(&e.label, new));
        if clash {
            return Err(LabelConflictError::DuplicateName {
                name: new.to_string(),
            });
        }

        log::info!("Renamed label '{}' to '{}'", old, new);
        self.entries[pos].label = new.to_string();
        Ok(())
    }

    /// Remove the entry named `name`.
    pub fn delete(&mut self, name: &str) -> Result<LabelCode, LabelConflictError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.label == name)
            .ok_or_else(|| LabelConflictError::UnknownLabel {
                name: name.to_string(),
            })?;
        log::info!("Deleted label '{}'", name);
        Ok(self.entries.remove(pos))
    }

    /// Find the label meant by quick-entry `input`.
    ///
    /// A numeric input is matched against codes first. Otherwise, or when no
    /// code matches, the first label containing the input (ignoring case)
    /// is returned.
    pub fn resolve(&self, input: &str) -> Option<&LabelCode> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if input.parse::<i64>().is_ok() {
            if let Some(entry) = self.entries.iter().find(|e| e.code == input) {
                return Some(entry);
            }
        }

        let needle = input.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.label.to_lowercase().contains(&needle))
    }

    /// Codes shared by more than one label, with the labels sharing them.
    pub fn code_collisions(&self) -> Vec<(String, Vec<String>)> {
        let mut by_code: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for entry in &self.entries {
            by_code
                .entry(entry.code.as_str())
                .or_default()
                .push(entry.label.clone());
        }
        by_code
            .into_iter()
            .filter(|(_, labels)| labels.len() > 1)
            .map(|(code, labels)| (code.to_string(), labels))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> LabelBook {
        LabelBook::from_entries([
            LabelCode::new("algae", "1"),
            LabelCode::new("diatom", "2"),
            LabelCode::new("ciliate12", "3"),
        ])
    }

    #[test]
    fn test_create_rejects_conflicts() {
        let mut book = book();

        assert_eq!(
            book.create("Algae", "9"),
            Err(LabelConflictError::DuplicateName {
                name: "Algae".into()
            })
        );
        assert_eq!(
            book.create("rotifer", "2"),
            Err(LabelConflictError::DuplicateCode {
                code: "2".into(),
                label: "diatom".into()
            })
        );
        assert!(matches!(
            book.create("rotifer", "x1"),
            Err(LabelConflictError::InvalidCode { .. })
        ));
        assert_eq!(book.create("  ", "5"), Err(LabelConflictError::EmptyName));
        assert_eq!(book.len(), 3);

        book.create("rotifer", "4").unwrap();
        assert_eq!(book.get("rotifer").unwrap().code, "4");
    }

    #[test]
    fn test_rename_keeps_code_and_position() {
        let mut book = book();
        book.rename("diatom", "diatoms").unwrap();
        assert_eq!(book.entries()[1], LabelCode::new("diatoms", "2"));

        assert!(matches!(
            book.rename("diatoms", "ALGAE"),
            Err(LabelConflictError::DuplicateName { .. })
        ));
        assert!(matches!(
            book.rename("nope", "x"),
            Err(LabelConflictError::UnknownLabel { .. })
        ));
        book.rename("algae", "Algae").unwrap();
        assert_eq!(book.entries()[0].label, "Algae");
    }

    #[test]
    fn test_delete_removes_entry_only() {
        let mut book = book();
        let removed = book.delete("algae").unwrap();
        assert_eq!(removed.code, "1");
        assert!(book.get("algae").is_none());
        assert!(book.delete("algae").is_err());
    }

    #[test]
    fn test_resolve_quick_entry() {
        let book = book();
        assert_eq!(book.resolve("2").unwrap().label, "diatom");
        assert_eq!(book.resolve("DIA").unwrap().label, "diatom");
        // numeric input without a matching code falls back to name search
        assert_eq!(book.resolve("12").unwrap().label, "ciliate12");
        assert!(book.resolve("rotifer").is_none());
        assert!(book.resolve("").is_none());
    }

    #[test]
    fn test_from_entries_first_wins_and_collisions() {
        let book = LabelBook::from_entries([
            LabelCode::new("algae", "1"),
            LabelCode::new("algae", "7"),
            LabelCode::new("diatom", "1"),
        ]);
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("algae").unwrap().code, "1");
        assert_eq!(
            book.code_collisions(),
            vec![("1".to_string(), vec!["algae".to_string(), "diatom".to_string()])]
        );
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "label;code\nalgae;1\ndiatom;2\n").unwrap();

        let mut book = LabelBook::load(&path).unwrap();
        book.create("rotifer", "3").unwrap();
        book.save(&path).unwrap();

        let reloaded = LabelBook::load(&path).unwrap();
        assert_eq!(reloaded, book);
    }
}
