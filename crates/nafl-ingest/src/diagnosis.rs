use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use nafl_model::{DiagnosisColumns, DiagnosisEvent, IngestOptions, PatientId};

use crate::event_table::TableReader;
use crate::values::{
    CellRef, NumericCell, SentinelCounts, UnknownFlags, float_cell, index_flag_cell, integer_cell,
};

pub const DIAGNOSIS_TABLE: &str = "diagnoses";

fn cell_ref(column: &str, line: usize) -> CellRef<'_> {
    CellRef {
        table: DIAGNOSIS_TABLE,
        column,
        line,
    }
}

/// Diagnosis events plus what was filtered while reading them.
#[derive(Debug, Clone, Default)]
pub struct DiagnosisLoad {
    pub events: Vec<DiagnosisEvent>,
    /// Data rows read from the file.
    pub rows_read: usize,
    /// Rows dropped because the index flag was neither `y` nor `n`.
    pub rows_skipped: usize,
    pub sentinels: SentinelCounts,
    pub unknown_flags: UnknownFlags,
}

/// Loads the diagnosis extract.
///
/// Sentinel ages and days keep the row with the value set to `None`: the
/// code-based cohort predicates still see the row, while the age filter and
/// the day reductions skip it. Rows with an unrecognised index flag can never
/// match the index-flag filter and are dropped here.
pub fn load_diagnoses(
    path: &Path,
    columns: &DiagnosisColumns,
    options: &IngestOptions,
) -> Result<DiagnosisLoad> {
    let mut reader = TableReader::open(path, DIAGNOSIS_TABLE, options)?;
    let patient_idx = reader.column_index(&columns.patient_id)?;
    let code_idx = reader.column_index(&columns.code)?;
    let code_type_idx = reader.column_index(&columns.code_type)?;
    let age_idx = reader.column_index(&columns.age)?;
    let days_idx = reader.column_index(&columns.days_from_index)?;
    let flag_idx = reader.column_index(&columns.index_flag)?;
    debug!(path = %path.display(), headers = reader.headers().len(), "reading diagnoses");

    let mut load = DiagnosisLoad::default();
    for row in reader.rows() {
        let row = row?;
        load.rows_read += 1;
        let Some(index_flag) = index_flag_cell(row.cell(flag_idx), &mut load.unknown_flags)
        else {
            load.rows_skipped += 1;
            continue;
        };

        let days_from_index = match integer_cell(
            row.cell(days_idx),
            cell_ref(&columns.days_from_index, row.line),
            options,
            &mut load.sentinels,
        )? {
            NumericCell::Value(days) => Some(days),
            NumericCell::Sentinel => None,
        };

        let patient_id = PatientId::new(row.cell(patient_idx))
            .ok_or_else(|| cell_ref(&columns.patient_id, row.line).invalid(""))?;

        let age = match float_cell(
            row.cell(age_idx),
            cell_ref(&columns.age, row.line),
            options,
            &mut load.sentinels,
        )? {
            NumericCell::Value(age) => Some(age),
            NumericCell::Sentinel => None,
        };

        load.events.push(DiagnosisEvent {
            patient_id,
            code: row.cell(code_idx).to_string(),
            code_type: row.cell(code_type_idx).to_string(),
            age,
            days_from_index,
            index_flag,
        });
    }

    load.sentinels.log(DIAGNOSIS_TABLE);
    load.unknown_flags.log(DIAGNOSIS_TABLE, &columns.index_flag);
    info!(
        table = DIAGNOSIS_TABLE,
        rows_read = load.rows_read,
        rows_kept = load.events.len(),
        rows_skipped = load.rows_skipped,
        "loaded diagnosis events"
    );
    Ok(load)
}
