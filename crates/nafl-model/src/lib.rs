pub mod codes;
pub mod error;
pub mod event;
pub mod features;
pub mod ids;
pub mod options;
pub mod outcome;

pub use error::{PipelineError, Result};
pub use event::{DiagnosisEvent, IndexFlag, MedicationEvent, PatientEvent};
pub use features::FeatureMatrix;
pub use ids::PatientId;
pub use options::{
    CohortOptions, CombineInput, DEFAULT_MIN_SUPPORT, DEFAULT_PATIENT_KEY, DiagnosisColumns,
    IngestOptions, MedicationColumns, MedicationOptions,
};
pub use outcome::{OutcomeLabel, OutcomeTable};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_table_counts() {
        let table: OutcomeTable = [
            (PatientId::new("A").unwrap(), OutcomeLabel::observed(30)),
            (PatientId::new("B").unwrap(), OutcomeLabel::censored_at(400)),
            (PatientId::new("C").unwrap(), OutcomeLabel::censored_at(12)),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.len(), 3);
        assert_eq!(table.positive_count(), 1);
        assert_eq!(table.censored_count(), 2);
    }

    #[test]
    fn schema_and_join_errors_are_classified() {
        let missing = PipelineError::missing_column("diagnoses", "Code");
        assert!(missing.is_schema_error());
        assert!(!missing.is_join_error());
        let empty = PipelineError::EmptyJoin {
            tables: "lab, dia".to_string(),
        };
        assert!(empty.is_join_error());
    }
}
