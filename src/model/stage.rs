//! Processing stages and their label fields.

use serde::{Deserialize, Serialize};

use super::record::Record;

/// One of the two sequential labeling passes.
///
/// Preprocessing is the coarse triage (e.g. `object` vs `bubble`);
/// classification assigns the fine-grained label to records that passed
/// preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Stage A: `Preprocessing` / `PreprocessingTrue`
    #[default]
    Preprocessing,
    /// Stage B: `LabelPredicted` / `LabelTrue`
    Classification,
}

impl Stage {
    /// Both stages in processing order.
    pub fn all() -> &'static [Stage] {
        &[Stage::Preprocessing, Stage::Classification]
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Preprocessing => "Preprocessing",
            Stage::Classification => "Classification",
        }
    }

    /// Predicted label of `record` for this stage.
    pub fn predicted<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            Stage::Preprocessing => &record.preprocessing,
            Stage::Classification => &record.label_predicted,
        }
    }

    /// Confirmed label of `record` for this stage.
    pub fn confirmed<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            Stage::Preprocessing => &record.preprocessing_true,
            Stage::Classification => &record.label_true,
        }
    }

    /// Mutable predicted label of `record` for this stage.
    pub fn predicted_mut<'a>(&self, record: &'a mut Record) -> &'a mut String {
        match self {
            Stage::Preprocessing => &mut record.preprocessing,
            Stage::Classification => &mut record.label_predicted,
        }
    }

    /// Mutable confirmed label of `record` for this stage.
    pub fn confirmed_mut<'a>(&self, record: &'a mut Record) -> &'a mut String {
        match self {
            Stage::Preprocessing => &mut record.preprocessing_true,
            Stage::Classification => &mut record.label_true,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_fields() {
        let mut record = Record::default();
        *Stage::Preprocessing.predicted_mut(&mut record) = "object".into();
        *Stage::Classification.confirmed_mut(&mut record) = "algae".into();

        assert_eq!(record.preprocessing, "object");
        assert_eq!(record.label_true, "algae");
        assert_eq!(Stage::Classification.confirmed(&record), "algae");
        assert_eq!(Stage::Preprocessing.confirmed(&record), "");
    }
}
