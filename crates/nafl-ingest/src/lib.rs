pub mod diagnosis;
pub mod event_table;
pub mod exclusion;
pub mod medication;
pub mod patient_table;
pub mod values;

pub use diagnosis::{DIAGNOSIS_TABLE, DiagnosisLoad, load_diagnoses};
pub use event_table::{TableReader, TableRow, delimiter_for};
pub use exclusion::load_exclusion_codes;
pub use medication::{MEDICATION_TABLE, MedicationLoad, load_medications};
pub use patient_table::{ensure_unique_key, read_patient_table};
pub use values::{NumericCell, SentinelCounts, parse_f64, parse_i64};
