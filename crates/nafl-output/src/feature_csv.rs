//! Patient-level feature tables as Polars frames and CSV files.
//!
//! The sparse matrix is expanded to dense boolean columns only here, right
//! before writing.

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use polars::prelude::{Column, CsvWriter, DataFrame, IntoColumn, NamedFrom, SerWriter, Series};
use tracing::info;

use nafl_model::{FeatureMatrix, OutcomeTable, PatientId, PipelineError};

pub const OUTCOME_COLUMN: &str = "Outcome";
pub const DAYS_COLUMN: &str = "DaysUntilFirstProgression";
pub const CENSORED_COLUMN: &str = "Censored";

fn key_column(matrix: &FeatureMatrix, key: &str) -> Column {
    let keys: Vec<&str> = matrix.patients().iter().map(PatientId::as_str).collect();
    Series::new(key.into(), keys).into_column()
}

fn indicator_columns(matrix: &FeatureMatrix) -> Vec<Column> {
    matrix
        .column_names()
        .map(|name| Series::new(name.into(), matrix.dense_column(name)).into_column())
        .collect()
}

/// Key column followed by one boolean column per feature.
pub fn feature_frame(matrix: &FeatureMatrix, key: &str) -> Result<DataFrame> {
    let mut columns = vec![key_column(matrix, key)];
    columns.extend(indicator_columns(matrix));
    DataFrame::new(columns).context("build feature frame")
}

/// Key, `Outcome`, `DaysUntilFirstProgression`, `Censored`, then features.
///
/// Every matrix row must have a label.
pub fn diagnosis_frame(
    matrix: &FeatureMatrix,
    labels: &OutcomeTable,
    key: &str,
) -> Result<DataFrame> {
    let height = matrix.height();
    let mut outcome = Vec::with_capacity(height);
    let mut days = Vec::with_capacity(height);
    let mut censored = Vec::with_capacity(height);
    for patient in matrix.patients() {
        let label = labels
            .get(patient)
            .ok_or_else(|| anyhow!("no outcome label for patient {patient}"))?;
        outcome.push(label.outcome);
        days.push(label.days_until_first_progression);
        censored.push(label.censored());
    }

    let mut columns = vec![
        key_column(matrix, key),
        Series::new(OUTCOME_COLUMN.into(), outcome).into_column(),
        Series::new(DAYS_COLUMN.into(), days).into_column(),
        Series::new(CENSORED_COLUMN.into(), censored).into_column(),
    ];
    columns.extend(indicator_columns(matrix));
    DataFrame::new(columns).context("build diagnosis frame")
}

/// Writes `df` as comma-separated CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::io(parent, source))?;
    }
    let mut file = File::create(path).map_err(|source| PipelineError::io(path, source))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .with_context(|| format!("write CSV: {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "wrote table"
    );
    Ok(())
}
