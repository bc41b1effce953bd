//! Selectable labels per processing stage.
//!
//! The vocabulary of a stage lists the confirmed labels in use, sorted,
//! followed by predicted labels not already listed. Empty cells and the
//! excluded sentinel never appear.

use std::collections::{BTreeSet, HashSet};

use crate::model::{Record, Stage};
use crate::store::RecordSet;

/// Compute the vocabulary of `stage` over `records`.
pub fn selectable_labels(records: &[Record], stage: Stage, excluded: &str) -> Vec<String> {
    let confirmed = distinct(records, |r| stage.confirmed(r), excluded);
    let predicted = distinct(records, |r| stage.predicted(r), excluded);

    let mut labels: Vec<String> = confirmed.iter().map(|s| s.to_string()).collect();
    for label in predicted {
        if !confirmed.contains(label) {
            labels.push(label.to_string());
        }
    }
    labels
}

fn distinct<'a>(
    records: &'a [Record],
    field: impl Fn(&'a Record) -> &'a str,
    excluded: &str,
) -> BTreeSet<&'a str> {
    records
        .iter()
        .map(field)
        .filter(|label| !label.is_empty() && *label != excluded)
        .collect()
}

/// Cached vocabulary for the active stage and dataset.
///
/// Refreshing for the same stage and dataset only appends labels that were
/// not listed before, so the list never shrinks without an explicit rename.
/// A stage change or a new dataset rebuilds it.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    labels: Vec<String>,
    excluded: String,
    key: Option<(Stage, u64)>,
    revision: u64,
}

impl Vocabulary {
    /// Create an empty vocabulary that ignores `excluded`.
    pub fn new(excluded: impl Into<String>) -> Self {
        Self {
            excluded: excluded.into(),
            ..Default::default()
        }
    }

    /// Current labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Bring the cache up to date with `set` for `stage`.
    pub fn refresh(&mut self, set: &RecordSet, stage: Stage) -> &[String] {
        let key = (stage, set.generation());
        if self.key == Some(key) && self.revision == set.revision() {
            return &self.labels;
        }

        let fresh = selectable_labels(set.records(), stage, &self.excluded);
        if self.key == Some(key) {
            let known: HashSet<&str> = self.labels.iter().map(String::as_str).collect();
            let added: Vec<String> = fresh
                .into_iter()
                .filter(|label| !known.contains(label.as_str()))
                .collect();
            if !added.is_empty() {
                log::debug!("Vocabulary for {}: {} new label(s)", stage, added.len());
            }
            self.labels.extend(added);
        } else {
            log::debug!("Vocabulary for {} rebuilt: {} label(s)", stage, fresh.len());
            self.labels = fresh;
        }

        self.key = Some(key);
        self.revision = set.revision();
        &self.labels
    }

    /// Replace `old` with `new` in place.
    ///
    /// If `new` is already listed, `old` is just removed.
    pub fn rename(&mut self, old: &str, new: &str) {
        let Some(pos) = self.labels.iter().position(|l| l == old) else {
            return;
        };
        if self.labels.iter().any(|l| l == new) {
            self.labels.remove(pos);
        } else {
            self.labels[pos] = new.to_string();
        }
    }

    /// Forget the cache so the next refresh rebuilds.
    pub fn invalidate(&mut self) {
        self.key = None;
        self.labels.clear();
    }
}

/// Whether `value` equals the gating label, ignoring case.
pub(crate) fn is_gating(value: &str, gating: &str) -> bool {
    value.to_lowercase() == gating.to_lowercase()
}

/// Count gated records per classification label.
///
/// A record counts when its confirmed preprocessing label is the gating
/// value, or its predicted one is and no preprocessing label was confirmed.
pub fn label_counts(records: &[Record], gating: &str, excluded: &str) -> Vec<(String, usize)> {
    let labels = selectable_labels(records, Stage::Classification, excluded);
    labels
        .into_iter()
        .map(|label| {
            let count = records
                .iter()
                .filter(|r| {
                    is_gating(&r.preprocessing_true, gating)
                        || (is_gating(&r.preprocessing, gating) && r.preprocessing_true.is_empty())
                })
                .filter(|r| r.label_true == label)
                .count();
            (label, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;
    use crate::store::Origin;

    fn record(pre: &str, pre_true: &str, predicted: &str, confirmed: &str) -> Record {
        let mut r = Record::with_uuid(Uuid::now_v7());
        r.preprocessing = pre.into();
        r.preprocessing_true = pre_true.into();
        r.label_predicted = predicted.into();
        r.label_true = confirmed.into();
        r
    }

    fn set_of(records: Vec<Record>) -> RecordSet {
        let mut set = RecordSet::new();
        for (row, r) in records.into_iter().enumerate() {
            let origin = Origin {
                path: PathBuf::from("a.csv"),
                row,
                file_id: row as i32,
            };
            set.insert(r, origin);
        }
        set
    }

    #[test]
    fn test_confirmed_first_then_predicted() {
        let records = vec![
            record("", "", "zooplankton", "diatom"),
            record("", "", "algae", "not_included"),
            record("", "", "diatom", ""),
            record("", "", "", "ciliate"),
        ];
        let labels = selectable_labels(&records, Stage::Classification, "not_included");
        assert_eq!(labels, vec!["ciliate", "diatom", "algae", "zooplankton"]);
    }

    #[test]
    fn test_sort_is_ordinal() {
        let records = vec![record("b", "", "", ""), record("B", "", "", ""), record("a", "", "", "")];
        let labels = selectable_labels(&records, Stage::Preprocessing, "not_included");
        assert_eq!(labels, vec!["B", "a", "b"]);
    }

    #[test]
    fn test_refresh_is_monotonic_within_dataset() {
        let mut set = set_of(vec![record("", "", "algae", ""), record("", "", "diatom", "")]);
        let mut vocab = Vocabulary::new("not_included");
        assert_eq!(vocab.refresh(&set, Stage::Classification), ["algae", "diatom"]);

        // "algae" disappears from the records, a new label appears
        set.get_mut(0).unwrap().label_predicted = "ciliate".into();
        set.touch();
        assert_eq!(
            vocab.refresh(&set, Stage::Classification),
            ["algae", "diatom", "ciliate"]
        );
    }

    #[test]
    fn test_stage_change_rebuilds() {
        let set = set_of(vec![record("object", "", "algae", "")]);
        let mut vocab = Vocabulary::new("not_included");
        vocab.refresh(&set, Stage::Classification);
        assert_eq!(vocab.refresh(&set, Stage::Preprocessing), ["object"]);
    }

    #[test]
    fn test_rename_in_place() {
        let set = set_of(vec![
            record("", "", "algae", ""),
            record("", "", "diatom", ""),
            record("", "", "zoo", ""),
        ]);
        let mut vocab = Vocabulary::new("not_included");
        vocab.refresh(&set, Stage::Classification);

        vocab.rename("diatom", "diatoms");
        assert_eq!(vocab.labels(), ["algae", "diatoms", "zoo"]);
        vocab.rename("zoo", "algae");
        assert_eq!(vocab.labels(), ["algae", "diatoms"]);
    }

    #[test]
    fn test_label_counts_respect_gating() {
        let records = vec![
            record("object", "", "", "algae"),
            record("bubble", "object", "", "algae"),
            record("object", "bubble", "", "algae"),
            record("OBJECT", "", "diatom", ""),
        ];
        let counts = label_counts(&records, "object", "not_included");
        assert_eq!(
            counts,
            vec![("algae".to_string(), 2), ("diatom".to_string(), 0)]
        );
    }
}
