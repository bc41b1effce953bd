//! Filtering and ordering of the records shown to the operator.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{Column, Record, Stage};
use crate::store::RecordSet;
use crate::vocabulary::is_gating;

/// Which records to show with respect to the stage's confirmed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckMode {
    /// Every record
    #[default]
    All,
    /// Only records with a confirmed label
    CheckedOnly,
    /// Only records without a confirmed label
    NotCheckedOnly,
}

/// Parameters of the visible record list.
#[derive(Debug, Clone)]
pub struct ViewQuery {
    /// Active stage
    pub stage: Stage,
    /// Check-state filter
    pub mode: CheckMode,
    /// Label filter; empty means any label
    pub labels: Vec<String>,
    /// Sort column; `None` sorts by display identity
    pub sort: Option<&'static Column>,
    /// Sort descending
    pub descending: bool,
    /// Stage-A label that admits records to classification
    pub gating: String,
}

impl ViewQuery {
    /// Query for `stage` with default settings.
    pub fn new(stage: Stage, gating: impl Into<String>) -> Self {
        Self {
            stage,
            mode: CheckMode::All,
            labels: Vec::new(),
            sort: None,
            descending: false,
            gating: gating.into(),
        }
    }

    /// Whether `record` passes this query's filters.
    pub fn matches(&self, record: &Record) -> bool {
        match self.stage {
            Stage::Preprocessing => self.stage_rule(record),
            Stage::Classification => {
                classification_eligible(record, &self.gating) && self.stage_rule(record)
            }
        }
    }

    /// Check-state and label filter applied to the active stage's own fields.
    fn stage_rule(&self, record: &Record) -> bool {
        let predicted = self.stage.predicted(record);
        let confirmed = self.stage.confirmed(record);
        let wanted = |label: &str| self.labels.iter().any(|l| l == label);
        let any_label = self.labels.is_empty();

        match self.mode {
            CheckMode::NotCheckedOnly => confirmed.is_empty() && (any_label || wanted(predicted)),
            CheckMode::CheckedOnly => {
                !confirmed.is_empty() && (any_label || wanted(predicted) || wanted(confirmed))
            }
            CheckMode::All => any_label || wanted(predicted) || wanted(confirmed),
        }
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ord = match self.sort {
            Some(column) => column.sort_key(a).compare(&column.sort_key(b)),
            None => a.id.cmp(&b.id),
        };
        if self.descending { ord.reverse() } else { ord }
    }
}

/// Whether `record` takes part in classification.
///
/// Any of four stage-A situations admits the record:
/// predicted and confirmed are both the gating value; predicted is the
/// gating value and nothing was confirmed; confirmed is the gating value;
/// or both stage-A fields are empty.
pub fn classification_eligible(record: &Record, gating: &str) -> bool {
    let predicted = record.preprocessing.as_str();
    let confirmed = record.preprocessing_true.as_str();

    let both_gating = is_gating(predicted, gating) && is_gating(confirmed, gating);
    let predicted_only = is_gating(predicted, gating) && confirmed.is_empty();
    let confirmed_gating = is_gating(confirmed, gating);
    let both_empty = predicted.is_empty() && confirmed.is_empty();

    both_gating || predicted_only || confirmed_gating || both_empty
}

/// Indices of the records matching `query`, in display order.
pub fn visible_indices(set: &RecordSet, query: &ViewQuery) -> Vec<usize> {
    let records = set.records();
    let mut indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| query.matches(record))
        .map(|(i, _)| i)
        .collect();
    indices.sort_by(|&a, &b| query.compare(&records[a], &records[b]));
    indices
}

/// Records matching `query`, in display order.
pub fn visible_records<'a>(set: &'a RecordSet, query: &ViewQuery) -> Vec<&'a Record> {
    visible_indices(set, query)
        .into_iter()
        .filter_map(|i| set.get(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;
    use crate::store::Origin;

    fn record(name: &str, pre: &str, pre_true: &str, predicted: &str, confirmed: &str) -> Record {
        let mut r = Record::with_uuid(Uuid::now_v7());
        r.name = name.into();
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
                file_id: row as i32 + 1,
            };
            set.insert(r, origin);
        }
        set.assign_display_ids();
        set
    }

    fn names(set: &RecordSet, query: &ViewQuery) -> Vec<String> {
        visible_records(set, query)
            .into_iter()
            .map(|r| r.name.clone())
            .collect()
    }

    #[test]
    fn test_classification_not_checked_scenario() {
        let set = set_of(vec![
            record("r1", "object", "", "algae", ""),
            record("r2", "bubble", "", "", ""),
            record("r3", "object", "object", "", "algae"),
        ]);
        let mut query = ViewQuery::new(Stage::Classification, "object");
        query.mode = CheckMode::NotCheckedOnly;

        assert_eq!(names(&set, &query), vec!["r1"]);
    }

    #[test]
    fn test_eligibility_branches() {
        let eligible = |pre: &str, pre_true: &str| {
            classification_eligible(&record("", pre, pre_true, "", ""), "object")
        };
        assert!(eligible("object", "object"));
        assert!(eligible("Object", ""));
        assert!(eligible("bubble", "OBJECT"));
        assert!(eligible("", ""));
        assert!(!eligible("bubble", ""));
        assert!(!eligible("object", "bubble"));
        assert!(!eligible("", "bubble"));
    }

    #[test]
    fn test_preprocessing_modes() {
        let set = set_of(vec![
            record("a", "object", "", "", ""),
            record("b", "object", "object", "", ""),
            record("c", "bubble", "object", "", ""),
        ]);
        let mut query = ViewQuery::new(Stage::Preprocessing, "object");

        assert_eq!(names(&set, &query), vec!["a", "b", "c"]);
        query.mode = CheckMode::CheckedOnly;
        assert_eq!(names(&set, &query), vec!["b", "c"]);
        query.mode = CheckMode::NotCheckedOnly;
        assert_eq!(names(&set, &query), vec!["a"]);
    }

    #[test]
    fn test_label_filter() {
        let set = set_of(vec![
            record("a", "object", "", "", ""),
            record("b", "bubble", "", "", ""),
            record("c", "bubble", "object", "", ""),
        ]);
        let mut query = ViewQuery::new(Stage::Preprocessing, "object");
        query.labels = vec!["object".into()];

        assert_eq!(names(&set, &query), vec!["a", "c"]);
        query.mode = CheckMode::NotCheckedOnly;
        assert_eq!(names(&set, &query), vec!["a"]);
    }

    #[test]
    fn test_classification_label_filter_checked() {
        let set = set_of(vec![
            record("a", "object", "", "algae", "diatom"),
            record("b", "object", "", "diatom", ""),
            record("c", "", "", "algae", "algae"),
        ]);
        let mut query = ViewQuery::new(Stage::Classification, "object");
        query.labels = vec!["diatom".into()];

        assert_eq!(names(&set, &query), vec!["a", "b"]);
        query.mode = CheckMode::CheckedOnly;
        assert_eq!(names(&set, &query), vec!["a"]);
    }

    #[test]
    fn test_sort_by_column_and_descending() {
        let mut records = vec![
            record("a", "", "", "", ""),
            record("b", "", "", "", ""),
            record("c", "", "", "", ""),
        ];
        records[0].abd_area = 2.0;
        records[1].abd_area = 0.5;
        records[2].abd_area = 2.0;
        let set = set_of(records);

        let mut query = ViewQuery::new(Stage::Preprocessing, "object");
        query.sort = Column::named("AbdArea");
        assert_eq!(names(&set, &query), vec!["b", "a", "c"]);

        query.descending = true;
        assert_eq!(names(&set, &query), vec!["a", "c", "b"]);

        query.sort = None;
        assert_eq!(names(&set, &query), vec!["c", "b", "a"]);
    }
}
