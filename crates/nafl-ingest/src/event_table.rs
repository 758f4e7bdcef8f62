//! Streaming reader for delimited longitudinal tables.
//!
//! Event extracts run to millions of rows, so rows are streamed straight into
//! typed records by the domain loaders instead of being buffered as strings.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};

use nafl_model::{IngestOptions, PipelineError};

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> &str {
    raw.trim().trim_matches('\u{feff}')
}

/// Picks the field delimiter: the explicit option, else tab for `.txt`,
/// `.tsv` and `.tab` files and comma for everything else.
pub fn delimiter_for(path: &Path, options: &IngestOptions) -> Result<u8, PipelineError> {
    if let Some(delimiter) = options.delimiter {
        return u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                PipelineError::InvalidConfig(format!("delimiter must be ASCII, got {delimiter:?}"))
            });
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("txt" | "tsv" | "tab") => b'\t',
        _ => b',',
    })
}

/// One data row with its 1-based line number in the source file.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub line: usize,
    record: StringRecord,
}

impl TableRow {
    /// Trimmed cell value; short rows read as empty cells.
    pub fn cell(&self, index: usize) -> &str {
        self.record.get(index).map_or("", normalize_cell)
    }
}

pub struct TableReader {
    name: String,
    path: PathBuf,
    headers: Vec<String>,
    reader: csv::Reader<File>,
}

impl TableReader {
    /// Opens `path` and reads its header row. `name` labels the table in errors.
    pub fn open(path: &Path, name: impl Into<String>, options: &IngestOptions) -> Result<Self> {
        let delimiter = delimiter_for(path, options)?;
        let file = File::open(path).map_err(|error| PipelineError::io(path, error))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("read header: {}", path.display()))?
            .iter()
            .map(normalize_header)
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(PipelineError::Csv {
                path: path.to_path_buf(),
                message: "missing header row".to_string(),
            }
            .into());
        }
        Ok(Self {
            name: name.into(),
            path: path.to_path_buf(),
            headers,
            reader,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Position of a required column, or a schema error naming the table.
    pub fn column_index(&self, column: &str) -> Result<usize, PipelineError> {
        self.headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| PipelineError::missing_column(&self.name, column))
    }

    /// Streams the data rows. Blank rows are skipped.
    pub fn rows(&mut self) -> impl Iterator<Item = Result<TableRow>> + '_ {
        let path = self.path.clone();
        self.reader
            .records()
            .enumerate()
            .filter_map(move |(idx, record)| match record {
                Ok(record) => {
                    if record.iter().all(|value| normalize_cell(value).is_empty()) {
                        return None;
                    }
                    let line = record
                        .position()
                        .map_or(idx + 2, |position| position.line() as usize);
                    Some(Ok(TableRow { line, record }))
                }
                Err(error) => Some(Err(anyhow::Error::new(PipelineError::Csv {
                    path: path.clone(),
                    message: error.to_string(),
                }))),
            })
    }
}
