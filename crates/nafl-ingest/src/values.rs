//! Numeric cell parsing with explicit sentinel handling.
//!
//! Extracts carry non-numeric placeholders in numeric columns (shifted `y`/`n`
//! flags, `NA`, blanks). Those are matched against the configured sentinel list
//! and counted before any coercion happens; anything else that fails to parse
//! is a schema error.

use std::collections::BTreeMap;

use tracing::warn;

use nafl_model::{IndexFlag, IngestOptions, PipelineError};

/// Parses an integer, accepting integral floats such as `30.0`.
pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }
    let float = trimmed.parse::<f64>().ok()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}

pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

/// Outcome of reading one numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell<T> {
    Value(T),
    Sentinel,
}

/// Location of a cell, used to build schema errors.
#[derive(Debug, Clone, Copy)]
pub struct CellRef<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub line: usize,
}

impl CellRef<'_> {
    pub fn invalid(&self, value: &str) -> PipelineError {
        PipelineError::InvalidValue {
            table: self.table.to_string(),
            column: self.column.to_string(),
            row: self.line,
            value: value.to_string(),
        }
    }
}

/// Reads an integer cell, diverting sentinels into `counts`.
pub fn integer_cell(
    value: &str,
    cell: CellRef<'_>,
    options: &IngestOptions,
    counts: &mut SentinelCounts,
) -> Result<NumericCell<i64>, PipelineError> {
    if options.is_sentinel(value) {
        counts.record(cell.column, value);
        return Ok(NumericCell::Sentinel);
    }
    parse_i64(value)
        .map(NumericCell::Value)
        .ok_or_else(|| cell.invalid(value))
}

/// Reads a real-valued cell, diverting sentinels into `counts`.
pub fn float_cell(
    value: &str,
    cell: CellRef<'_>,
    options: &IngestOptions,
    counts: &mut SentinelCounts,
) -> Result<NumericCell<f64>, PipelineError> {
    if options.is_sentinel(value) {
        counts.record(cell.column, value);
        return Ok(NumericCell::Sentinel);
    }
    parse_f64(value)
        .map(NumericCell::Value)
        .ok_or_else(|| cell.invalid(value))
}

/// Sentinel occurrences per column and value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentinelCounts {
    counts: BTreeMap<String, BTreeMap<String, usize>>,
}

impl SentinelCounts {
    pub fn record(&mut self, column: &str, value: &str) {
        *self
            .counts
            .entry(column.to_string())
            .or_default()
            .entry(value.trim().to_string())
            .or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.values().flat_map(BTreeMap::values).sum()
    }

    pub fn for_column(&self, column: &str) -> usize {
        self.counts
            .get(column)
            .map_or(0, |values| values.values().sum())
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Emits one warning per column that contained sentinels.
    pub fn log(&self, table: &str) {
        for (column, values) in &self.counts {
            let detail = values
                .iter()
                .map(|(value, count)| format!("'{value}' x{count}"))
                .collect::<Vec<_>>()
                .join(", ");
            warn!(
                table = %table,
                column = %column,
                rows = values.values().sum::<usize>(),
                values = %detail,
                "filtered sentinel values before numeric coercion"
            );
        }
    }
}

/// Index-flag cells that were neither `y` nor `n`, per raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownFlags {
    counts: BTreeMap<String, usize>,
}

impl UnknownFlags {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn log(&self, table: &str, column: &str) {
        if self.counts.is_empty() {
            return;
        }
        let detail = self
            .counts
            .iter()
            .map(|(value, count)| format!("'{value}' x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            table = %table,
            column = %column,
            rows = self.total(),
            values = %detail,
            "dropped rows with an unrecognised index flag"
        );
    }
}

/// Reads an index-flag cell. Unrecognised values are counted and yield `None`.
pub fn index_flag_cell(value: &str, unknown: &mut UnknownFlags) -> Option<IndexFlag> {
    match value.parse() {
        Ok(flag) => Some(flag),
        Err(_) => {
            *unknown.counts.entry(value.trim().to_string()).or_insert(0) += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integral_floats() {
        assert_eq!(parse_i64("30"), Some(30));
        assert_eq!(parse_i64(" -730 "), Some(-730));
        assert_eq!(parse_i64("30.0"), Some(30));
        assert_eq!(parse_i64("30.5"), None);
        assert_eq!(parse_i64("y"), None);
        assert_eq!(parse_i64(""), None);
    }

    #[test]
    fn parses_finite_floats_only() {
        assert_eq!(parse_f64("90"), Some(90.0));
        assert_eq!(parse_f64("inf"), None);
        assert_eq!(parse_f64("NaN"), None);
    }

    #[test]
    fn sentinel_cells_are_counted_not_failed() {
        let options = IngestOptions::default();
        let mut counts = SentinelCounts::default();
        let cell = CellRef {
            table: "medications",
            column: "Med.daysfrom_firstNAFL",
            line: 7,
        };
        assert_eq!(
            integer_cell("n", cell, &options, &mut counts).unwrap(),
            NumericCell::Sentinel
        );
        assert_eq!(
            integer_cell("-12", cell, &options, &mut counts).unwrap(),
            NumericCell::Value(-12)
        );
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.for_column("Med.daysfrom_firstNAFL"), 1);
    }

    #[test]
    fn unrecognised_flags_are_counted() {
        let mut unknown = UnknownFlags::default();
        assert_eq!(index_flag_cell("y", &mut unknown), Some(IndexFlag::Yes));
        assert_eq!(index_flag_cell("", &mut unknown), None);
        assert_eq!(index_flag_cell("maybe", &mut unknown), None);
        assert_eq!(unknown.total(), 2);
    }

    #[test]
    fn unknown_text_is_a_schema_error() {
        let options = IngestOptions::default();
        let mut counts = SentinelCounts::default();
        let cell = CellRef {
            table: "diagnoses",
            column: "Dia.Age.90",
            line: 3,
        };
        let error = float_cell("ninety", cell, &options, &mut counts).unwrap_err();
        assert!(error.is_schema_error());
        assert!(error.to_string().contains("row 3"));
        assert!(counts.is_empty());
    }
}
