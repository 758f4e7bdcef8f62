//! Longitudinal event records.
//!
//! Both event domains are keyed by patient and by days relative to the index
//! diagnosis. Only the columns the pipeline reads are carried; descriptive
//! columns such as `Diagnosis_Name` are left behind at load time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PatientId;

/// The `before.ICD11` style y/n flag carried by every event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IndexFlag {
    #[default]
    #[serde(rename = "y")]
    Yes,
    #[serde(rename = "n")]
    No,
}

impl IndexFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "y",
            Self::No => "n",
        }
    }
}

impl FromStr for IndexFlag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "y" | "Y" => Ok(Self::Yes),
            "n" | "N" => Ok(Self::No),
            other => Err(format!("expected 'y' or 'n', found '{other}'")),
        }
    }
}

impl fmt::Display for IndexFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessors shared by diagnosis and medication rows.
pub trait PatientEvent {
    fn patient_id(&self) -> &PatientId;
    fn code(&self) -> &str;
    fn code_type(&self) -> &str;
    /// `None` when the source cell held a sentinel.
    fn days_from_index(&self) -> Option<i64>;
    fn index_flag(&self) -> IndexFlag;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisEvent {
    pub patient_id: PatientId,
    pub code: String,
    pub code_type: String,
    /// Age at the event. `None` when the source cell held a sentinel.
    pub age: Option<f64>,
    /// Days relative to the index diagnosis. A sentinel day keeps the row
    /// for the code-based predicates with `None` here.
    pub days_from_index: Option<i64>,
    pub index_flag: IndexFlag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationEvent {
    pub patient_id: PatientId,
    pub code: String,
    pub code_type: String,
    pub days_from_index: i64,
    pub index_flag: IndexFlag,
}

impl MedicationEvent {
    /// Composite category used for one-hot encoding: `<CodeType>_<Code>`.
    pub fn category_key(&self) -> String {
        format!("{}_{}", self.code_type, self.code)
    }
}

macro_rules! impl_patient_event {
    ($ty:ty, |$event:ident| $days:expr) => {
        impl PatientEvent for $ty {
            fn patient_id(&self) -> &PatientId {
                &self.patient_id
            }

            fn code(&self) -> &str {
                &self.code
            }

            fn code_type(&self) -> &str {
                &self.code_type
            }

            fn days_from_index(&self) -> Option<i64> {
                let $event = self;
                $days
            }

            fn index_flag(&self) -> IndexFlag {
                self.index_flag
            }
        }
    };
}

impl_patient_event!(DiagnosisEvent, |event| event.days_from_index);
impl_patient_event!(MedicationEvent, |event| Some(event.days_from_index));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_index_flag() {
        assert_eq!("y".parse::<IndexFlag>(), Ok(IndexFlag::Yes));
        assert_eq!(" N ".parse::<IndexFlag>(), Ok(IndexFlag::No));
        assert!("yes".parse::<IndexFlag>().is_err());
    }

    #[test]
    fn medication_category_key_joins_type_and_code() {
        let event = MedicationEvent {
            patient_id: PatientId::new("P1").unwrap(),
            code: "860975".to_string(),
            code_type: "RXNORM".to_string(),
            days_from_index: -10,
            index_flag: IndexFlag::Yes,
        };
        assert_eq!(event.category_key(), "RXNORM_860975");
    }
}
