use std::path::PathBuf;

use nafl_ingest::SentinelCounts;
use nafl_transform::{Attrition, EncodeSummary};

/// One written table.
#[derive(Debug, Clone)]
pub struct TableOutput {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug)]
pub struct StageResult {
    pub output: TableOutput,
    pub attrition: Attrition,
    pub encoding: EncodeSummary,
    pub sentinels: SentinelCounts,
    /// Outcome-positive and censored patient counts (diagnosis stage only).
    pub outcomes: Option<(usize, usize)>,
}

#[derive(Debug)]
pub struct StudyResult {
    pub output_dir: PathBuf,
    pub diagnosis: StageResult,
    pub medication: StageResult,
    pub combined: TableOutput,
    pub manifest: PathBuf,
}
