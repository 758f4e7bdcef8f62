//! Patient-level tables produced by upstream cleaning stages.
//!
//! Lab, physical-exam and demographic tables arrive already reduced to one
//! row per patient. They are read with Polars so their numeric and categorical
//! summary columns keep inferred dtypes through the join.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::{CsvReadOptions, DataFrame, DataType, IntoLazy, SerReader, col};

use nafl_model::PipelineError;

/// Reads a patient-level CSV and normalises its key column to strings.
///
/// Fails when the key column is missing, blank, or not unique.
pub fn read_patient_table(path: &Path, name: &str, key: &str) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read CSV: {}", path.display()))?;
    if df.column(key).is_err() {
        return Err(PipelineError::missing_column(name, key).into());
    }
    let df = df
        .lazy()
        .with_column(col(key).cast(DataType::String))
        .collect()
        .with_context(|| format!("cast key column '{key}' in {name}"))?;
    ensure_unique_key(&df, name, key)?;
    Ok(df)
}

/// Checks that `key` is a non-blank string column without duplicates.
pub fn ensure_unique_key(df: &DataFrame, name: &str, key: &str) -> Result<()> {
    let column = df
        .column(key)
        .map_err(|_| PipelineError::missing_column(name, key))?;
    let values = column
        .str()
        .with_context(|| format!("key column '{key}' in {name} is not a string column"))?;
    let mut seen = BTreeSet::new();
    for (idx, value) in values.into_iter().enumerate() {
        let value = value.map(str::trim).unwrap_or("");
        if value.is_empty() {
            return Err(PipelineError::InvalidValue {
                table: name.to_string(),
                column: key.to_string(),
                row: idx + 2,
                value: String::new(),
            }
            .into());
        }
        if !seen.insert(value) {
            return Err(PipelineError::DuplicatePatient {
                table: name.to_string(),
                key: key.to_string(),
                patient: value.to_string(),
            }
            .into());
        }
    }
    Ok(())
}
