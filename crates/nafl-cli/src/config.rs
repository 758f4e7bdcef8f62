//! Study configuration loaded from TOML.
//!
//! Every section is optional; missing values fall back to the reference study
//! parameters. Relative paths are resolved against the directory holding the
//! TOML file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nafl_model::{
    CohortOptions, CombineInput, DEFAULT_PATIENT_KEY, DiagnosisColumns, IngestOptions,
    MedicationColumns, MedicationOptions, PipelineError,
};

pub const DIAGNOSIS_OUTPUT: &str = "dia.nafl.csv";
pub const MEDICATION_OUTPUT: &str = "med.nafl.csv";
pub const COMBINED_OUTPUT: &str = "combined.nafl.csv";

/// Table names the `run` command gives to its own stage outputs.
pub const DIAGNOSIS_TABLE_NAME: &str = "dia";
pub const MEDICATION_TABLE_NAME: &str = "med";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyInputs {
    pub diagnoses: Option<PathBuf>,
    pub medications: Option<PathBuf>,
    pub exclusions: Option<PathBuf>,
}

/// Patient-level tables joined with the stage outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// External tables, joined in this order before `med` and `dia`.
    pub inputs: Vec<CombineInput>,
    pub diagnosis_drop_columns: Vec<String>,
    pub medication_drop_columns: Vec<String>,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            diagnosis_drop_columns: vec!["Code_K76.0".to_string(), "Censored".to_string()],
            medication_drop_columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub patient_key: String,
    pub output_dir: PathBuf,
    pub inputs: StudyInputs,
    pub ingest: IngestOptions,
    pub diagnosis_columns: DiagnosisColumns,
    pub medication_columns: MedicationColumns,
    pub cohort: CohortOptions,
    pub medication: MedicationOptions,
    pub combine: CombineConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            patient_key: DEFAULT_PATIENT_KEY.to_string(),
            output_dir: PathBuf::from("output"),
            inputs: StudyInputs::default(),
            ingest: IngestOptions::default(),
            diagnosis_columns: DiagnosisColumns::default(),
            medication_columns: MedicationColumns::default(),
            cohort: CohortOptions::default(),
            medication: MedicationOptions::default(),
            combine: CombineConfig::default(),
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl StudyConfig {
    /// Parses `text` without resolving paths or validating.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse study configuration")
    }

    /// Reads, resolves and validates a study file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::io(path, source))?;
        let mut config = Self::from_toml_str(&text)
            .with_context(|| format!("invalid study file: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        self.output_dir = resolve(base, &self.output_dir);
        for input in [
            &mut self.inputs.diagnoses,
            &mut self.inputs.medications,
            &mut self.inputs.exclusions,
        ]
        .into_iter()
        .flatten()
        {
            *input = resolve(base, input);
        }
        for table in &mut self.combine.inputs {
            table.path = resolve(base, &table.path);
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.patient_key.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "patient key must not be empty".to_string(),
            ));
        }
        self.cohort.validate()?;
        self.medication.validate()?;
        let mut names = BTreeSet::new();
        for table in &self.combine.inputs {
            let name = table.name.as_str();
            if name == DIAGNOSIS_TABLE_NAME || name == MEDICATION_TABLE_NAME {
                return Err(PipelineError::InvalidConfig(format!(
                    "combine input name '{name}' is reserved for stage output"
                )));
            }
            if !names.insert(name) {
                return Err(PipelineError::InvalidConfig(format!(
                    "combine input '{name}' is listed twice"
                )));
            }
        }
        Ok(())
    }

    /// The diagnosis input, required by `run`.
    pub fn diagnoses_path(&self) -> Result<&Path, PipelineError> {
        required(self.inputs.diagnoses.as_deref(), "inputs.diagnoses")
    }

    pub fn medications_path(&self) -> Result<&Path, PipelineError> {
        required(self.inputs.medications.as_deref(), "inputs.medications")
    }
}

fn required<'a>(path: Option<&'a Path>, field: &str) -> Result<&'a Path, PipelineError> {
    path.ok_or_else(|| PipelineError::InvalidConfig(format!("missing '{field}'")))
}
