use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::PatientId;

/// Progression label for one patient.
///
/// `days_until_first_progression` is the first progression day when
/// `outcome` is true and the last observed day (censoring time) otherwise.
/// It is `None` when none of the patient's rows carried a known day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLabel {
    pub outcome: bool,
    pub days_until_first_progression: Option<i64>,
}

impl OutcomeLabel {
    pub fn observed(first_progression_day: impl Into<Option<i64>>) -> Self {
        Self {
            outcome: true,
            days_until_first_progression: first_progression_day.into(),
        }
    }

    pub fn censored_at(last_observed_day: impl Into<Option<i64>>) -> Self {
        Self {
            outcome: false,
            days_until_first_progression: last_observed_day.into(),
        }
    }

    pub fn censored(&self) -> bool {
        !self.outcome
    }
}

/// Labels per patient, in patient order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTable {
    labels: BTreeMap<PatientId, OutcomeLabel>,
}

impl OutcomeTable {
    pub fn get(&self, patient: &PatientId) -> Option<&OutcomeLabel> {
        self.labels.get(patient)
    }

    pub fn patients(&self) -> impl Iterator<Item = &PatientId> {
        self.labels.keys()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keeps labels for patients in `patients` only.
    pub fn retain_patients(&mut self, patients: &BTreeSet<PatientId>) {
        self.labels.retain(|patient, _| patients.contains(patient));
    }

    pub fn positive_count(&self) -> usize {
        self.labels.values().filter(|label| label.outcome).count()
    }

    pub fn censored_count(&self) -> usize {
        self.labels.values().filter(|label| label.censored()).count()
    }
}

impl FromIterator<(PatientId, OutcomeLabel)> for OutcomeTable {
    fn from_iter<I: IntoIterator<Item = (PatientId, OutcomeLabel)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
