//! Configuration options for the cohort, outcome and encoding stages.
//!
//! Every `Default` reproduces the reference NAFL configuration. All fields are
//! overridable from a study TOML file or the command line.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::codes::{NAFL_ANCHOR_CODE, all_liver_codes, progression_codes};
use crate::error::{PipelineError, Result};
use crate::event::IndexFlag;

/// Default key column shared by every input and output table.
pub const DEFAULT_PATIENT_KEY: &str = "StudyID";

/// Default threshold for the number of distinct patients a feature needs.
pub const DEFAULT_MIN_SUPPORT: usize = 100;

/// Options shared by the delimited-table loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Field delimiter. When `None` it is inferred from the file extension.
    pub delimiter: Option<char>,
    /// Values in numeric columns that are filtered (and logged) instead of
    /// failing the load.
    pub sentinels: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            sentinels: ["", "NA", "y", "n"].iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl IngestOptions {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn is_sentinel(&self, value: &str) -> bool {
        let trimmed = value.trim();
        self.sentinels.iter().any(|sentinel| sentinel == trimmed)
    }
}

/// Column names of the diagnosis extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisColumns {
    pub patient_id: String,
    pub code: String,
    pub code_type: String,
    pub age: String,
    pub days_from_index: String,
    pub index_flag: String,
}

impl Default for DiagnosisColumns {
    fn default() -> Self {
        Self {
            patient_id: DEFAULT_PATIENT_KEY.to_string(),
            code: "Code".to_string(),
            code_type: "Code_Type".to_string(),
            age: "Dia.Age.90".to_string(),
            days_from_index: "Dia.daysfrom_firstNAFL".to_string(),
            index_flag: "Dia.before.ICD11".to_string(),
        }
    }
}

/// Column names of the medication extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationColumns {
    pub patient_id: String,
    pub code: String,
    pub code_type: String,
    pub days_from_index: String,
    pub index_flag: String,
}

impl Default for MedicationColumns {
    fn default() -> Self {
        Self {
            patient_id: DEFAULT_PATIENT_KEY.to_string(),
            code: "Code".to_string(),
            code_type: "Code_Type".to_string(),
            days_from_index: "Med.daysfrom_firstNAFL".to_string(),
            index_flag: "Med.before.ICD11".to_string(),
        }
    }
}

/// Cohort eligibility, outcome derivation and diagnosis encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortOptions {
    /// Rows must carry this flag value to be considered.
    pub index_flag: IndexFlag,
    /// Minimum age at event, inclusive.
    pub min_age: f64,
    /// Code every cohort patient must have.
    pub anchor_code: String,
    /// Codes that define a progression event.
    pub progression_codes: Vec<String>,
    /// Superset of `progression_codes` stripped before encoding.
    pub all_liver_codes: Vec<String>,
    /// Minimum distinct patients per diagnosis feature column.
    pub min_support: usize,
    /// Prefix of diagnosis indicator columns.
    pub column_prefix: String,
}

impl Default for CohortOptions {
    fn default() -> Self {
        Self {
            index_flag: IndexFlag::Yes,
            min_age: 30.0,
            anchor_code: NAFL_ANCHOR_CODE.to_string(),
            progression_codes: progression_codes(),
            all_liver_codes: all_liver_codes(),
            min_support: DEFAULT_MIN_SUPPORT,
            column_prefix: "Code_".to_string(),
        }
    }
}

impl CohortOptions {
    pub fn progression_set(&self) -> BTreeSet<&str> {
        self.progression_codes.iter().map(String::as_str).collect()
    }

    pub fn liver_set(&self) -> BTreeSet<&str> {
        self.all_liver_codes.iter().map(String::as_str).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.anchor_code.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "anchor code must not be empty".to_string(),
            ));
        }
        if !self.min_age.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "minimum age must be finite, got {}",
                self.min_age
            )));
        }
        if self.progression_codes.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "progression code list must not be empty".to_string(),
            ));
        }
        let liver = self.liver_set();
        let missing: Vec<&str> = self
            .progression_codes
            .iter()
            .map(String::as_str)
            .filter(|code| !liver.contains(code))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "all-liver code list must contain every progression code; missing: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Medication filtering and encoding parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationOptions {
    pub index_flag: IndexFlag,
    /// Exclusive lower bound of the lookback window (days from index).
    pub lookback_start: i64,
    /// Exclusive upper bound of the lookback window (days from index).
    pub lookback_end: i64,
    /// A code type is kept only when it occurs in more than this many rows.
    pub min_code_type_rows: usize,
    /// Minimum distinct patients per medication feature column.
    pub min_support: usize,
    /// Prefix of medication indicator columns.
    pub column_prefix: String,
}

impl Default for MedicationOptions {
    fn default() -> Self {
        Self {
            index_flag: IndexFlag::Yes,
            lookback_start: -730,
            lookback_end: 0,
            min_code_type_rows: 20,
            min_support: DEFAULT_MIN_SUPPORT,
            column_prefix: "MedType_Code_".to_string(),
        }
    }
}

impl MedicationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.lookback_start >= self.lookback_end {
            return Err(PipelineError::InvalidConfig(format!(
                "lookback window ({}, {}) is empty",
                self.lookback_start, self.lookback_end
            )));
        }
        Ok(())
    }

    /// True when `days` falls strictly inside the lookback window.
    pub fn in_window(&self, days: i64) -> bool {
        days > self.lookback_start && days < self.lookback_end
    }
}

/// One patient-level table fed to the combiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineInput {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub drop_columns: Vec<String>,
}

impl CombineInput {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            drop_columns: Vec::new(),
        }
    }

    pub fn with_drop_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.drop_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        CohortOptions::default().validate().expect("cohort defaults");
        MedicationOptions::default().validate().expect("medication defaults");
    }

    #[test]
    fn rejects_progression_code_outside_liver_superset() {
        let options = CohortOptions {
            progression_codes: vec!["K75.81".to_string(), "X99".to_string()],
            all_liver_codes: vec!["K75.81".to_string()],
            ..CohortOptions::default()
        };
        let error = options.validate().unwrap_err();
        assert!(error.to_string().contains("X99"));
    }

    #[test]
    fn lookback_window_is_exclusive() {
        let options = MedicationOptions::default();
        assert!(!options.in_window(-730));
        assert!(options.in_window(-729));
        assert!(options.in_window(-1));
        assert!(!options.in_window(0));
    }

    #[test]
    fn sentinels_match_trimmed_values() {
        let options = IngestOptions::default();
        assert!(options.is_sentinel(" y "));
        assert!(options.is_sentinel(""));
        assert!(!options.is_sentinel("12"));
    }

    #[test]
    fn partial_toml_style_json_uses_defaults() {
        let options: MedicationOptions =
            serde_json::from_str(r#"{"lookback_start": -365}"#).expect("parse");
        assert_eq!(options.lookback_start, -365);
        assert_eq!(options.lookback_end, 0);
        assert_eq!(options.min_support, DEFAULT_MIN_SUPPORT);
    }
}
