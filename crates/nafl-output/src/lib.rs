//! Output generation for the NAFL pipeline.
//!
//! - **Feature CSVs**: diagnosis labels and indicators, medication indicators,
//!   and the combined table
//! - **Run manifest**: input digests, configuration, attrition and outputs

pub mod feature_csv;
pub mod hash;
pub mod manifest;

pub use feature_csv::{
    CENSORED_COLUMN, DAYS_COLUMN, OUTCOME_COLUMN, diagnosis_frame, feature_frame, write_csv,
};
pub use hash::{sha256_file, sha256_hex};
pub use manifest::{
    MANIFEST_FILE_NAME, ManifestInput, ManifestOutput, ManifestStage, RunManifest,
};
