use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use nafl_model::{IngestOptions, MedicationColumns, MedicationEvent, PatientId};

use crate::event_table::TableReader;
use crate::values::{
    CellRef, NumericCell, SentinelCounts, UnknownFlags, index_flag_cell, integer_cell,
};

pub const MEDICATION_TABLE: &str = "medications";

fn cell_ref(column: &str, line: usize) -> CellRef<'_> {
    CellRef {
        table: MEDICATION_TABLE,
        column,
        line,
    }
}

/// Medication events plus what was filtered while reading them.
#[derive(Debug, Clone, Default)]
pub struct MedicationLoad {
    pub events: Vec<MedicationEvent>,
    /// Row count per code type over every data row of the file, sentinel
    /// rows included. The rare-code-type filter is evaluated on these counts.
    pub code_type_rows: BTreeMap<String, usize>,
    pub rows_read: usize,
    /// Rows dropped for a sentinel day or an unrecognised index flag.
    pub rows_skipped: usize,
    pub sentinels: SentinelCounts,
    pub unknown_flags: UnknownFlags,
}

/// Loads the medication extract, dropping rows whose days-from-index is a
/// sentinel or whose index flag is neither `y` nor `n`.
pub fn load_medications(
    path: &Path,
    columns: &MedicationColumns,
    options: &IngestOptions,
) -> Result<MedicationLoad> {
    let mut reader = TableReader::open(path, MEDICATION_TABLE, options)?;
    let patient_idx = reader.column_index(&columns.patient_id)?;
    let code_idx = reader.column_index(&columns.code)?;
    let code_type_idx = reader.column_index(&columns.code_type)?;
    let days_idx = reader.column_index(&columns.days_from_index)?;
    let flag_idx = reader.column_index(&columns.index_flag)?;
    debug!(path = %path.display(), headers = reader.headers().len(), "reading medications");

    let mut load = MedicationLoad::default();
    for row in reader.rows() {
        let row = row?;
        load.rows_read += 1;
        let code_type = row.cell(code_type_idx);
        *load.code_type_rows.entry(code_type.to_string()).or_insert(0) += 1;

        let days_from_index = match integer_cell(
            row.cell(days_idx),
            cell_ref(&columns.days_from_index, row.line),
            options,
            &mut load.sentinels,
        )? {
            NumericCell::Value(days) => days,
            NumericCell::Sentinel => {
                load.rows_skipped += 1;
                continue;
            }
        };

        let patient_id = PatientId::new(row.cell(patient_idx))
            .ok_or_else(|| cell_ref(&columns.patient_id, row.line).invalid(""))?;

        let Some(index_flag) = index_flag_cell(row.cell(flag_idx), &mut load.unknown_flags)
        else {
            load.rows_skipped += 1;
            continue;
        };

        load.events.push(MedicationEvent {
            patient_id,
            code: row.cell(code_idx).to_string(),
            code_type: code_type.to_string(),
            days_from_index,
            index_flag,
        });
    }

    load.sentinels.log(MEDICATION_TABLE);
    load.unknown_flags.log(MEDICATION_TABLE, &columns.index_flag);
    info!(
        table = MEDICATION_TABLE,
        rows_read = load.rows_read,
        rows_kept = load.events.len(),
        rows_skipped = load.rows_skipped,
        code_types = load.code_type_rows.len(),
        "loaded medication events"
    );
    Ok(load)
}
