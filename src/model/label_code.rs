//! Label-code entries for fast keyboard entry.

/// A label paired with its short numeric shortcut code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCode {
    /// Label name as written into the data files
    pub label: String,
    /// Numeric shortcut, kept as text
    pub code: String,
}

impl LabelCode {
    /// Create a new label-code entry.
    pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }
}
