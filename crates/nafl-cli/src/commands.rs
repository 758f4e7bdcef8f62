use std::collections::BTreeMap;

use anyhow::{Result, bail};
use comfy_table::Table;

use nafl_cli::config::StudyConfig;
use nafl_cli::pipeline::{run_combine, run_diagnoses, run_medications, run_study};
use nafl_cli::types::{StageResult, StudyResult, TableOutput};
use nafl_model::CombineInput;

use crate::cli::{CodesArgs, CombineArgs, CommonArgs, DiagnosesArgs, MedicationsArgs, RunArgs};
use crate::summary::apply_table_style;

fn stage_config(common: &CommonArgs) -> Result<StudyConfig> {
    let mut config = StudyConfig::load_or_default(common.config.as_deref())?;
    if let Some(key) = &common.key {
        config.patient_key.clone_from(key);
    }
    if let Some(delimiter) = common.delimiter {
        config.ingest.delimiter = Some(delimiter);
    }
    Ok(config)
}

pub fn run_diagnoses_command(args: &DiagnosesArgs) -> Result<StageResult> {
    let mut config = stage_config(&args.common)?;
    if let Some(min_age) = args.min_age {
        config.cohort.min_age = min_age;
    }
    if let Some(min_support) = args.min_support {
        config.cohort.min_support = min_support;
    }
    config.validate()?;
    let exclusions = args
        .exclusions
        .as_deref()
        .or(config.inputs.exclusions.as_deref());
    run_diagnoses(&args.input, exclusions, &args.output, &config)
}

pub fn run_medications_command(args: &MedicationsArgs) -> Result<StageResult> {
    let mut config = stage_config(&args.common)?;
    if let Some(start) = args.lookback_start {
        config.medication.lookback_start = start;
    }
    if let Some(end) = args.lookback_end {
        config.medication.lookback_end = end;
    }
    if let Some(rows) = args.min_code_type_rows {
        config.medication.min_code_type_rows = rows;
    }
    if let Some(min_support) = args.min_support {
        config.medication.min_support = min_support;
    }
    config.validate()?;
    run_medications(&args.input, &args.output, &config)
}

pub fn run_combine_command(args: &CombineArgs) -> Result<TableOutput> {
    let mut drops: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, column) in &args.drops {
        drops.entry(name.as_str()).or_default().push(column.clone());
    }
    let mut inputs = Vec::with_capacity(args.inputs.len());
    for (name, path) in &args.inputs {
        let columns = drops.remove(name.as_str()).unwrap_or_default();
        inputs.push(CombineInput::new(name, path).with_drop_columns(columns));
    }
    if let Some(name) = drops.keys().next() {
        bail!("--drop names unknown input '{name}'");
    }
    run_combine(&inputs, &args.key, &args.output)
}

pub fn run_study_command(args: &RunArgs) -> Result<StudyResult> {
    let mut config = StudyConfig::load(&args.config)?;
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    run_study(&config, Some(&args.config))
}

pub fn run_codes(args: &CodesArgs) -> Result<()> {
    let config = StudyConfig::load_or_default(args.config.as_deref())?;
    let cohort = &config.cohort;
    let progression = cohort.progression_set();
    let mut table = Table::new();
    table.set_header(vec!["Code", "Role"]);
    apply_table_style(&mut table);
    table.add_row(vec![cohort.anchor_code.as_str(), "anchor"]);
    for code in &cohort.progression_codes {
        table.add_row(vec![code.as_str(), "progression"]);
    }
    for code in cohort
        .all_liver_codes
        .iter()
        .filter(|code| !progression.contains(code.as_str()))
    {
        table.add_row(vec![code.as_str(), "liver (stripped)"]);
    }
    println!("{table}");
    Ok(())
}
