//! Pure transformations from loaded event relations to patient-level tables.
//!
//! Each step takes a relation plus explicit parameters and returns a new
//! relation, so the eligibility chain, labelling and encoding can be tested
//! in isolation and composed by [`stages`].

pub mod attrition;
pub mod cohort;
pub mod combine;
pub mod encoder;
pub mod medication;
pub mod outcome;
pub mod relation;
pub mod stages;

pub use attrition::{Attrition, AttritionStep};
pub use cohort::{CohortSelection, apply_eligibility};
pub use combine::{NamedTable, combine_tables};
pub use encoder::{EncodeSummary, EncodedFeatures, SparseEncoder};
pub use medication::{PreparedMedications, prepare_medications};
pub use outcome::{derive_outcomes, strip_codes};
pub use stages::{DiagnosisFeatures, MedicationFeatures, run_diagnosis_stage, run_medication_stage};
