use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use nafl_model::IngestOptions;

use crate::event_table::TableReader;

pub const EXCLUSION_TABLE: &str = "exclusion codes";

/// Reads the supplementary exclusion list: the first column of a table with a
/// header row. Blank cells are ignored.
pub fn load_exclusion_codes(path: &Path, options: &IngestOptions) -> Result<BTreeSet<String>> {
    let mut reader = TableReader::open(path, EXCLUSION_TABLE, options)
        .with_context(|| format!("open exclusion list: {}", path.display()))?;
    let header = reader.headers().first().cloned().unwrap_or_default();
    let mut codes = BTreeSet::new();
    for row in reader.rows() {
        let row = row?;
        let code = row.cell(0);
        if !code.is_empty() {
            codes.insert(code.to_string());
        }
    }
    info!(
        path = %path.display(),
        column = %header,
        codes = codes.len(),
        "loaded exclusion codes"
    );
    Ok(codes)
}
