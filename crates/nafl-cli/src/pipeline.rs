//! Stage drivers shared by the subcommands.
//!
//! Each driver reads its inputs, runs the pure transformations, writes one
//! CSV and returns what it wrote. `run_study` chains them and records a
//! manifest.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use nafl_ingest::{load_diagnoses, load_exclusion_codes, load_medications, read_patient_table};
use nafl_model::CombineInput;
use nafl_output::{ManifestStage, RunManifest, diagnosis_frame, feature_frame, write_csv};
use nafl_transform::{NamedTable, combine_tables, run_diagnosis_stage, run_medication_stage};

use crate::config::{
    COMBINED_OUTPUT, DIAGNOSIS_OUTPUT, DIAGNOSIS_TABLE_NAME, MEDICATION_OUTPUT,
    MEDICATION_TABLE_NAME, StudyConfig,
};
use crate::types::{StageResult, StudyResult, TableOutput};

/// Diagnosis extract to `dia.nafl.csv`-style output.
pub fn run_diagnoses(
    input: &Path,
    exclusions: Option<&Path>,
    output: &Path,
    config: &StudyConfig,
) -> Result<StageResult> {
    let span = info_span!("diagnoses", input = %input.display());
    let _guard = span.enter();

    let exclusion_codes = match exclusions {
        Some(path) => load_exclusion_codes(path, &config.ingest)?,
        None => {
            warn!("no exclusion list given; comorbidity exclusion is skipped");
            BTreeSet::new()
        }
    };
    let load = load_diagnoses(input, &config.diagnosis_columns, &config.ingest)?;
    let features = run_diagnosis_stage(load.events, &exclusion_codes, &config.cohort)?;

    let mut df = diagnosis_frame(&features.matrix, &features.labels, &config.patient_key)?;
    write_csv(&mut df, output)?;

    Ok(StageResult {
        output: TableOutput {
            name: DIAGNOSIS_TABLE_NAME.to_string(),
            path: output.to_path_buf(),
            rows: df.height(),
            columns: df.width(),
        },
        attrition: features.attrition,
        encoding: features.summary,
        sentinels: load.sentinels,
        outcomes: Some((
            features.labels.positive_count(),
            features.labels.censored_count(),
        )),
    })
}

/// Medication extract to `med.nafl.csv`-style output.
pub fn run_medications(input: &Path, output: &Path, config: &StudyConfig) -> Result<StageResult> {
    let span = info_span!("medications", input = %input.display());
    let _guard = span.enter();

    let load = load_medications(input, &config.medication_columns, &config.ingest)?;
    let features = run_medication_stage(load.events, &load.code_type_rows, &config.medication)?;

    let mut df = feature_frame(&features.matrix, &config.patient_key)?;
    write_csv(&mut df, output)?;

    Ok(StageResult {
        output: TableOutput {
            name: MEDICATION_TABLE_NAME.to_string(),
            path: output.to_path_buf(),
            rows: df.height(),
            columns: df.width(),
        },
        attrition: features.attrition,
        encoding: features.summary,
        sentinels: load.sentinels,
        outcomes: None,
    })
}

/// Reads each patient-level table, joins them on `key` and writes the result.
pub fn run_combine(inputs: &[CombineInput], key: &str, output: &Path) -> Result<TableOutput> {
    let span = info_span!("combine", inputs = inputs.len());
    let _guard = span.enter();

    let mut tables = Vec::with_capacity(inputs.len());
    for input in inputs {
        let frame = read_patient_table(&input.path, &input.name, key)
            .with_context(|| format!("read combine input '{}'", input.name))?;
        tables.push(NamedTable::new(&input.name, frame).with_drop_columns(&input.drop_columns));
    }
    let mut combined = combine_tables(tables, key)?;
    write_csv(&mut combined, output)?;

    Ok(TableOutput {
        name: "combined".to_string(),
        path: output.to_path_buf(),
        rows: combined.height(),
        columns: combined.width(),
    })
}

fn manifest_stage(stage: &StageResult) -> ManifestStage {
    ManifestStage {
        attrition: stage.attrition.clone(),
        encoding: stage.encoding.clone(),
        patients: stage.output.rows,
        outcome_positive: stage.outcomes.map(|(positive, _)| positive),
        censored: stage.outcomes.map(|(_, censored)| censored),
    }
}

/// Runs diagnoses, medications and combine, then writes the manifest.
///
/// `config_path` is hashed into the manifest when given.
pub fn run_study(config: &StudyConfig, config_path: Option<&Path>) -> Result<StudyResult> {
    config.validate()?;
    let diagnoses = config.diagnoses_path()?;
    let medications = config.medications_path()?;
    let output_dir = config.output_dir.as_path();
    let span = info_span!("study", output_dir = %output_dir.display());
    let _guard = span.enter();

    let mut manifest = RunManifest::new(config)?;
    if let Some(path) = config_path {
        manifest.add_input("config", path)?;
    }
    manifest.add_input("diagnoses", diagnoses)?;
    manifest.add_input("medications", medications)?;
    if let Some(path) = config.inputs.exclusions.as_deref() {
        manifest.add_input("exclusions", path)?;
    }
    for input in &config.combine.inputs {
        manifest.add_input(input.name.as_str(), &input.path)?;
    }

    let diagnosis = run_diagnoses(
        diagnoses,
        config.inputs.exclusions.as_deref(),
        &output_dir.join(DIAGNOSIS_OUTPUT),
        config,
    )?;
    let medication = run_medications(medications, &output_dir.join(MEDICATION_OUTPUT), config)?;

    let mut combine_inputs = config.combine.inputs.clone();
    combine_inputs.push(
        CombineInput::new(MEDICATION_TABLE_NAME, &medication.output.path)
            .with_drop_columns(&config.combine.medication_drop_columns),
    );
    combine_inputs.push(
        CombineInput::new(DIAGNOSIS_TABLE_NAME, &diagnosis.output.path)
            .with_drop_columns(&config.combine.diagnosis_drop_columns),
    );
    let combined = run_combine(
        &combine_inputs,
        &config.patient_key,
        &output_dir.join(COMBINED_OUTPUT),
    )?;

    manifest.add_stage(manifest_stage(&diagnosis));
    manifest.add_stage(manifest_stage(&medication));
    for output in [&diagnosis.output, &medication.output, &combined] {
        manifest.add_output(output.name.as_str(), &output.path, output.rows, output.columns);
    }
    let manifest_path = manifest.write(output_dir)?;
    info!(manifest = %manifest_path.display(), "study complete");

    Ok(StudyResult {
        output_dir: output_dir.to_path_buf(),
        diagnosis,
        medication,
        combined,
        manifest: manifest_path,
    })
}
