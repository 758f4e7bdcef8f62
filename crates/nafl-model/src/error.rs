use std::path::PathBuf;

use thiserror::Error;

/// Data-contract violations raised by the pipeline.
///
/// Every variant is fatal for the stage that raised it. Sentinel values in
/// numeric columns are not errors; they are filtered and logged by the loaders.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("{table}: missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table}: invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("{table}: cannot drop column '{column}' because it is not present")]
    MissingDropColumn { table: String, column: String },

    #[error("{table}: patient '{patient}' appears more than once in key column '{key}'")]
    DuplicatePatient {
        table: String,
        key: String,
        patient: String,
    },

    #[error("column '{column}' is present in both '{first}' and '{second}'")]
    ColumnCollision {
        column: String,
        first: String,
        second: String,
    },

    #[error("join of {tables} produced zero rows")]
    EmptyJoin { tables: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// True for failures caused by the shape of an input table rather than its values.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::MissingColumn { .. } | Self::InvalidValue { .. })
    }

    /// True for failures raised while assembling the combined table.
    pub fn is_join_error(&self) -> bool {
        matches!(
            self,
            Self::MissingDropColumn { .. }
                | Self::DuplicatePatient { .. }
                | Self::ColumnCollision { .. }
                | Self::EmptyJoin { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
