use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nafl_model::PipelineError;
use nafl_transform::{Attrition, EncodeSummary};

use crate::hash::sha256_file;

pub const MANIFEST_SCHEMA: &str = "nafl.run_manifest";
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;
pub const MANIFEST_FILE_NAME: &str = "run_manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestInput {
    pub role: String,
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStage {
    pub attrition: Attrition,
    pub encoding: EncodeSummary,
    pub patients: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_positive: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub censored: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestOutput {
    pub role: String,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Provenance for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema: String,
    pub schema_version: u32,
    pub config: serde_json::Value,
    pub inputs: Vec<ManifestInput>,
    pub stages: Vec<ManifestStage>,
    pub outputs: Vec<ManifestOutput>,
}

impl RunManifest {
    pub fn new<C: Serialize>(config: &C) -> Result<Self> {
        Ok(Self {
            schema: MANIFEST_SCHEMA.to_string(),
            schema_version: MANIFEST_SCHEMA_VERSION,
            config: serde_json::to_value(config).context("serialize run configuration")?,
            inputs: Vec::new(),
            stages: Vec::new(),
            outputs: Vec::new(),
        })
    }

    /// Hashes `path` and records it under `role`.
    pub fn add_input(&mut self, role: impl Into<String>, path: &Path) -> Result<(), PipelineError> {
        let sha256 = sha256_file(path)?;
        self.inputs.push(ManifestInput {
            role: role.into(),
            path: path.to_path_buf(),
            sha256,
        });
        Ok(())
    }

    pub fn add_stage(&mut self, stage: ManifestStage) {
        self.stages.push(stage);
    }

    pub fn add_output(&mut self, role: impl Into<String>, path: &Path, rows: usize, columns: usize) {
        self.outputs.push(ManifestOutput {
            role: role.into(),
            path: path.to_path_buf(),
            rows,
            columns,
        });
    }

    /// Writes `run_manifest.json` into `output_dir`.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)
            .map_err(|source| PipelineError::io(output_dir, source))?;
        let output_path = output_dir.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&output_path, format!("{json}\n"))
            .map_err(|source| PipelineError::io(&output_path, source))?;
        Ok(output_path)
    }
}
