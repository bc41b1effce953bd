//! Typed cell values for the data-file schema.
//!
//! Every record field has one of four cell kinds. Parsing is locale-invariant
//! and empty cells fall back to the type default, so a column that is blank in
//! the source file loads as `0`, `0.0`, `""` or the nil UUID.

use std::cmp::Ordering;

use uuid::Uuid;

/// Declared type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// 32-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Free text
    Text,
    /// RFC 4122 UUID
    Uuid,
}

impl CellKind {
    /// Human-readable type name used in parse errors.
    pub fn name(&self) -> &'static str {
        match self {
            CellKind::Int => "integer",
            CellKind::Float => "floating point number",
            CellKind::Text => "text",
            CellKind::Uuid => "UUID",
        }
    }
}

/// Borrowed comparison key for sorting records by a column.
#[derive(Debug, Clone, Copy)]
pub enum SortKey<'a> {
    /// Integer column value
    Int(i64),
    /// Float column value
    Float(f64),
    /// Text column value, compared ordinally
    Text(&'a str),
    /// UUID column value
    Uuid(Uuid),
}

impl SortKey<'_> {
    /// Total order over keys of the same column.
    ///
    /// Floats use IEEE total ordering so NaN cells sort deterministically.
    /// Text compares ordinally.
    pub fn compare(&self, other: &SortKey<'_>) -> Ordering {
        match (self, other) {
            (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Uuid(a), SortKey::Uuid(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Int(_) => 0,
            SortKey::Float(_) => 1,
            SortKey::Text(_) => 2,
            SortKey::Uuid(_) => 3,
        }
    }
}

/// A Rust type that can live in a schema column.
pub trait CellValue: Sized {
    /// Declared kind of columns holding this type.
    const KIND: CellKind;

    /// Parse cell text. Empty cells yield the type default.
    fn parse_cell(text: &str) -> Result<Self, String>;

    /// Serialize for writing back to disk.
    fn write_cell(&self) -> String;

    /// Comparison key for sorting.
    fn sort_key(&self) -> SortKey<'_>;
}

impl CellValue for i32 {
    const KIND: CellKind = CellKind::Int;

    fn parse_cell(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(0);
        }
        text.parse::<i32>().map_err(|e| e.to_string())
    }

    fn write_cell(&self) -> String {
        self.to_string()
    }

    fn sort_key(&self) -> SortKey<'_> {
        SortKey::Int(i64::from(*self))
    }
}

impl CellValue for f64 {
    const KIND: CellKind = CellKind::Float;

    fn parse_cell(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(0.0);
        }
        text.parse::<f64>().map_err(|e| e.to_string())
    }

    fn write_cell(&self) -> String {
        // Display is the shortest representation that parses back to the same value
        self.to_string()
    }

    fn sort_key(&self) -> SortKey<'_> {
        SortKey::Float(*self)
    }
}

impl CellValue for String {
    const KIND: CellKind = CellKind::Text;

    fn parse_cell(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }

    fn write_cell(&self) -> String {
        self.clone()
    }

    fn sort_key(&self) -> SortKey<'_> {
        SortKey::Text(self.as_str())
    }
}

impl CellValue for Uuid {
    const KIND: CellKind = CellKind::Uuid;

    fn parse_cell(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Uuid::nil());
        }
        Uuid::parse_str(text).map_err(|e| e.to_string())
    }

    fn write_cell(&self) -> String {
        self.hyphenated().to_string()
    }

    fn sort_key(&self) -> SortKey<'_> {
        SortKey::Uuid(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cells_default() {
        assert_eq!(i32::parse_cell("").unwrap(), 0);
        assert_eq!(f64::parse_cell("  ").unwrap(), 0.0);
        assert_eq!(String::parse_cell("").unwrap(), "");
        assert!(Uuid::parse_cell("").unwrap().is_nil());
    }

    #[test]
    fn test_float_is_locale_invariant() {
        assert_eq!(f64::parse_cell("12.5").unwrap(), 12.5);
        assert!(f64::parse_cell("12,5").is_err());
        assert_eq!(f64::parse_cell(" 1e-3 ").unwrap(), 0.001);
    }

    #[test]
    fn test_int_rejects_fraction() {
        assert!(i32::parse_cell("3.0").is_err());
        assert_eq!(i32::parse_cell(" 42 ").unwrap(), 42);
    }

    #[test]
    fn test_float_write_parses_back() {
        for value in [0.1, 1.0 / 3.0, 123456.789, 1e-12, 0.0] {
            let written = value.write_cell();
            assert_eq!(f64::parse_cell(&written).unwrap(), value, "{written}");
        }
    }

    #[test]
    fn test_sort_key_total_order() {
        let nan = SortKey::Float(f64::NAN);
        let one = SortKey::Float(1.0);
        assert_eq!(one.compare(&nan), Ordering::Less);
        assert_eq!(
            SortKey::Text("algae").compare(&SortKey::Text("bubble")),
            Ordering::Less
        );
    }
}
