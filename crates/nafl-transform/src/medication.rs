//! Medication pre-filtering ahead of encoding.

use std::collections::BTreeMap;

use tracing::debug;

use nafl_model::{MedicationEvent, MedicationOptions, PatientEvent};

use crate::attrition::Attrition;
use crate::relation::keep_index_flag;

pub const STEP_LOADED: &str = "loaded";
pub const STEP_CODE_TYPES: &str = "common code types";
pub const STEP_LOOKBACK: &str = "lookback window";
pub const STEP_INDEX_FLAG: &str = "index flag";

/// Rows per code type.
pub fn count_code_types<E: PatientEvent>(events: &[E]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.code_type().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Keeps rows whose code type occurs in more than `min_rows` rows of `counts`.
pub fn keep_common_code_types<E: PatientEvent>(
    mut events: Vec<E>,
    counts: &BTreeMap<String, usize>,
    min_rows: usize,
) -> Vec<E> {
    for (code_type, count) in counts.iter().filter(|(_, count)| **count <= min_rows) {
        debug!(code_type = %code_type, rows = count, "rare code type dropped");
    }
    events.retain(|event| {
        counts
            .get(event.code_type())
            .is_some_and(|count| *count > min_rows)
    });
    events
}

/// Keeps rows strictly inside the lookback window.
pub fn keep_lookback_window<E: PatientEvent>(mut events: Vec<E>, options: &MedicationOptions) -> Vec<E> {
    events.retain(|event| {
        event
            .days_from_index()
            .is_some_and(|days| options.in_window(days))
    });
    events
}

#[derive(Debug, Clone)]
pub struct PreparedMedications {
    pub events: Vec<MedicationEvent>,
    pub attrition: Attrition,
}

/// Applies the code-type, lookback and index-flag filters in order.
///
/// `code_type_rows` holds counts over the raw table, including rows whose
/// days value was a sentinel.
pub fn prepare_medications(
    events: Vec<MedicationEvent>,
    code_type_rows: &BTreeMap<String, usize>,
    options: &MedicationOptions,
) -> PreparedMedications {
    let mut attrition = Attrition::new("medications");
    attrition.record(STEP_LOADED, &events);

    let events = keep_common_code_types(events, code_type_rows, options.min_code_type_rows);
    attrition.record(STEP_CODE_TYPES, &events);

    let events = keep_lookback_window(events, options);
    attrition.record(STEP_LOOKBACK, &events);

    let events = keep_index_flag(events, options.index_flag);
    attrition.record(STEP_INDEX_FLAG, &events);

    PreparedMedications { events, attrition }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nafl_model::{IndexFlag, PatientId};

    fn med(patient: &str, code_type: &str, days: i64, flag: IndexFlag) -> MedicationEvent {
        MedicationEvent {
            patient_id: PatientId::new(patient).unwrap(),
            code: "860975".to_string(),
            code_type: code_type.to_string(),
            days_from_index: days,
            index_flag: flag,
        }
    }

    #[test]
    fn lookback_bounds_are_exclusive() {
        let options = MedicationOptions::default();
        let events = vec![
            med("A", "RXNORM", -730, IndexFlag::Yes),
            med("A", "RXNORM", -729, IndexFlag::Yes),
            med("A", "RXNORM", -1, IndexFlag::Yes),
            med("A", "RXNORM", 0, IndexFlag::Yes),
        ];
        let kept = keep_lookback_window(events, &options);
        let days: Vec<i64> = kept.iter().map(|event| event.days_from_index).collect();
        assert_eq!(days, vec![-729, -1]);
    }

    #[test]
    fn code_type_needs_more_than_min_rows() {
        let counts: BTreeMap<String, usize> =
            [("RXNORM".to_string(), 21), ("NDC".to_string(), 20)]
                .into_iter()
                .collect();
        let events = vec![
            med("A", "RXNORM", -10, IndexFlag::Yes),
            med("A", "NDC", -10, IndexFlag::Yes),
            med("A", "LOCAL", -10, IndexFlag::Yes),
        ];
        let kept = keep_common_code_types(events, &counts, 20);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].code_type, "RXNORM");
    }

    #[test]
    fn prepare_applies_every_filter() {
        let counts: BTreeMap<String, usize> = [("RXNORM".to_string(), 50)].into_iter().collect();
        let events = vec![
            med("A", "RXNORM", -10, IndexFlag::Yes),
            med("A", "RXNORM", -10, IndexFlag::No),
            med("B", "RXNORM", 5, IndexFlag::Yes),
        ];
        let prepared = prepare_medications(events, &counts, &MedicationOptions::default());
        assert_eq!(prepared.events.len(), 1);
        assert_eq!(prepared.attrition.step(STEP_LOOKBACK).unwrap().rows, 2);
        assert_eq!(prepared.attrition.last().unwrap().patients, 1);
    }

    #[test]
    fn counts_rows_per_code_type() {
        let events = vec![
            med("A", "RXNORM", -1, IndexFlag::Yes),
            med("B", "RXNORM", -1, IndexFlag::Yes),
            med("B", "NDC", -1, IndexFlag::Yes),
        ];
        let counts = count_code_types(&events);
        assert_eq!(counts.get("RXNORM"), Some(&2));
        assert_eq!(counts.get("NDC"), Some(&1));
    }
}
