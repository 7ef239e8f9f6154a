//! Column type inference for uploaded tabular data.
//!
//! Every column starts as an INTEGER candidate and can only be demoted:
//! INTEGER -> FLOAT -> TEXT. Blank cells never demote a column. A column
//! that never sees a non-blank cell ends up TEXT.

use crate::domain::schema::{ColumnSchema, ColumnType, TableSchema};
use crate::domain::tabular::TabularSource;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    integer: bool,
    float: bool,
    seen_value: bool,
}

impl Candidate {
    fn new() -> Self {
        Self {
            integer: true,
            float: true,
            seen_value: false,
        }
    }

    fn observe(&mut self, cell: &str) {
        let value = cell.trim();
        if value.is_empty() {
            return;
        }
        self.seen_value = true;

        if self.integer && !is_integer(value) {
            self.integer = false;
        }
        if !self.integer && self.float && !is_float(value) {
            self.float = false;
        }
    }

    fn resolve(&self) -> ColumnType {
        if !self.seen_value {
            ColumnType::Text
        } else if self.integer {
            ColumnType::Integer
        } else if self.float {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }
}

/// Base-10 integer that fits the 32-bit INT column it will be stored in.
pub fn is_integer(value: &str) -> bool {
    value.parse::<i32>().is_ok()
}

/// Finite floating-point literal (`1.5`, `-2`, `3e4`); `inf` and `NaN` are text.
pub fn is_float(value: &str) -> bool {
    value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

pub struct SchemaInferencer;

impl SchemaInferencer {
    /// Infer one [`ColumnType`] per header column in a single pass over the rows.
    pub fn infer(table_name: &str, source: &TabularSource) -> TableSchema {
        let mut candidates = vec![Candidate::new(); source.column_count()];

        for row in source.rows() {
            for (candidate, cell) in candidates.iter_mut().zip(row.iter()) {
                candidate.observe(cell);
            }
        }

        let columns: Vec<ColumnSchema> = source
            .header()
            .iter()
            .zip(candidates.iter())
            .map(|(name, candidate)| ColumnSchema::new(name, candidate.resolve()))
            .collect();

        debug!(
            table = table_name,
            columns = ?columns.iter().map(|c| (c.name.as_str(), c.column_type)).collect::<Vec<_>>(),
            "Inferred table schema"
        );

        TableSchema::new(table_name, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(header: &[&str], rows: &[&[&str]]) -> TabularSource {
        TabularSource::new(
            header.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn types(schema: &TableSchema) -> Vec<ColumnType> {
        schema.columns.iter().map(|c| c.column_type).collect()
    }

    #[test]
    fn test_mixed_example() {
        let src = source(
            &["id", "name", "score"],
            &[&["1", "Alice", "9.5"], &["2", "Bob", ""]],
        );
        let schema = SchemaInferencer::infer("people", &src);
        assert_eq!(
            types(&schema),
            vec![ColumnType::Integer, ColumnType::Text, ColumnType::Float]
        );
        assert_eq!(schema.table_name, "people");
    }

    #[test]
    fn test_integers_with_blanks_stay_integer() {
        let src = source(&["n"], &[&["1"], &[""], &["-7"], &["  "], &["+3"]]);
        assert_eq!(types(&SchemaInferencer::infer("t", &src)), vec![ColumnType::Integer]);
    }

    #[test]
    fn test_one_decimal_demotes_to_float() {
        let src = source(&["n"], &[&["1"], &["2"], &["2.5"], &["4"]]);
        assert_eq!(types(&SchemaInferencer::infer("t", &src)), vec![ColumnType::Float]);
    }

    #[test]
    fn test_one_word_demotes_to_text() {
        let src = source(&["n"], &[&["1"], &["2.5"], &["n/a"], &["4"]]);
        assert_eq!(types(&SchemaInferencer::infer("t", &src)), vec![ColumnType::Text]);
    }

    #[test]
    fn test_text_before_numbers_still_text() {
        let src = source(&["n"], &[&["abc"], &["1"], &["2"]]);
        assert_eq!(types(&SchemaInferencer::infer("t", &src)), vec![ColumnType::Text]);
    }

    #[test]
    fn test_all_blank_column_is_text() {
        let src = source(&["a", "b"], &[&["1", ""], &["2", " "]]);
        assert_eq!(
            types(&SchemaInferencer::infer("t", &src)),
            vec![ColumnType::Integer, ColumnType::Text]
        );
    }

    #[test]
    fn test_no_rows_defaults_to_text() {
        let src = source(&["a"], &[]);
        assert_eq!(types(&SchemaInferencer::infer("t", &src)), vec![ColumnType::Text]);
    }

    #[test]
    fn test_thousands_separator_is_not_integer() {
        assert!(!is_integer("1,000"));
        assert!(!is_integer("1_000"));
        assert!(!is_integer("1.0"));
        assert!(is_integer("-12"));
        assert!(is_integer("+12"));
    }

    #[test]
    fn test_out_of_range_integer_falls_back_to_float() {
        let src = source(&["big"], &[&["1"], &["3000000000"]]);
        assert_eq!(types(&SchemaInferencer::infer("t", &src)), vec![ColumnType::Float]);
    }

    #[test]
    fn test_non_finite_values_are_text() {
        assert!(!is_float("inf"));
        assert!(!is_float("NaN"));
        assert!(is_float("1e3"));
        assert!(is_float(".5"));
    }

    #[test]
    fn test_ragged_rows_count_missing_cells_as_blank() {
        let src = source(&["a", "b"], &[&["1"], &["2", "3", "junk"]]);
        assert_eq!(
            types(&SchemaInferencer::infer("t", &src)),
            vec![ColumnType::Integer, ColumnType::Integer]
        );
    }
}
