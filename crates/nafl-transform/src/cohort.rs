//! Cohort eligibility predicates over the diagnosis relation.
//!
//! The first two predicates are row-level. The remaining three are
//! patient-level: they compute a patient set from the rows that trigger them
//! and then drop or keep each patient's full history.

use std::collections::BTreeSet;

use tracing::debug;

use nafl_model::{CohortOptions, DiagnosisEvent, PatientEvent};

use crate::attrition::Attrition;
use crate::relation::{drop_patients, keep_index_flag, patients_where, retain_patients};

pub const STEP_LOADED: &str = "loaded";
pub const STEP_INDEX_FLAG: &str = "index flag";
pub const STEP_MIN_AGE: &str = "minimum age";
pub const STEP_ANCHOR: &str = "anchor code";
pub const STEP_PREVALENT: &str = "no progression at or before index";
pub const STEP_EXCLUSIONS: &str = "exclusion codes";

/// Keeps rows whose age is known and at least `min_age`.
pub fn keep_min_age(mut events: Vec<DiagnosisEvent>, min_age: f64) -> Vec<DiagnosisEvent> {
    events.retain(|event| event.age.is_some_and(|age| age >= min_age));
    events
}

/// Keeps patients with at least one `anchor` row.
pub fn require_anchor_code<E: PatientEvent>(events: Vec<E>, anchor: &str) -> Vec<E> {
    let anchored = patients_where(&events, |event| event.code() == anchor);
    retain_patients(events, &anchored)
}

/// Drops patients whose progression already occurred at or before index.
///
/// Rows with an unknown day never count as prevalent.
pub fn exclude_prevalent_progression<E: PatientEvent>(
    events: Vec<E>,
    progression: &BTreeSet<&str>,
) -> Vec<E> {
    let prevalent = patients_where(&events, |event| {
        progression.contains(event.code())
            && event.days_from_index().is_some_and(|days| days <= 0)
    });
    debug!(patients = prevalent.len(), "prevalent progression");
    drop_patients(events, &prevalent)
}

/// Drops patients with any code on the exclusion list.
pub fn exclude_codes<E: PatientEvent>(events: Vec<E>, exclusions: &BTreeSet<String>) -> Vec<E> {
    let excluded = patients_where(&events, |event| exclusions.contains(event.code()));
    debug!(patients = excluded.len(), "excluded comorbidities");
    drop_patients(events, &excluded)
}

/// Eligible diagnosis rows plus the attrition trail that produced them.
#[derive(Debug, Clone)]
pub struct CohortSelection {
    pub events: Vec<DiagnosisEvent>,
    pub attrition: Attrition,
}

/// Runs the eligibility chain in order.
pub fn apply_eligibility(
    events: Vec<DiagnosisEvent>,
    exclusions: &BTreeSet<String>,
    options: &CohortOptions,
) -> CohortSelection {
    let mut attrition = Attrition::new("diagnoses");
    attrition.record(STEP_LOADED, &events);

    let events = keep_index_flag(events, options.index_flag);
    attrition.record(STEP_INDEX_FLAG, &events);

    let events = keep_min_age(events, options.min_age);
    attrition.record(STEP_MIN_AGE, &events);

    let events = require_anchor_code(events, &options.anchor_code);
    attrition.record(STEP_ANCHOR, &events);

    let events = exclude_prevalent_progression(events, &options.progression_set());
    attrition.record(STEP_PREVALENT, &events);

    let events = exclude_codes(events, exclusions);
    attrition.record(STEP_EXCLUSIONS, &events);

    CohortSelection { events, attrition }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nafl_model::{IndexFlag, PatientId};

    fn dia(
        patient: &str,
        code: &str,
        days: impl Into<Option<i64>>,
        age: Option<f64>,
        flag: IndexFlag,
    ) -> DiagnosisEvent {
        DiagnosisEvent {
            patient_id: PatientId::new(patient).unwrap(),
            code: code.to_string(),
            code_type: "ICD10".to_string(),
            age,
            days_from_index: days.into(),
            index_flag: flag,
        }
    }

    fn patients(events: &[DiagnosisEvent]) -> Vec<&str> {
        let set: BTreeSet<&str> = events.iter().map(|e| e.patient_id.as_str()).collect();
        set.into_iter().collect()
    }

    #[test]
    fn age_filter_drops_rows_not_patients() {
        let events = vec![
            dia("A", "K76.0", -1, Some(29.0), IndexFlag::Yes),
            dia("A", "E11.9", 10, Some(30.0), IndexFlag::Yes),
            dia("B", "K76.0", -1, None, IndexFlag::Yes),
        ];
        let kept = keep_min_age(events, 30.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].code, "E11.9");
    }

    #[test]
    fn patients_without_anchor_are_dropped() {
        let events = vec![
            dia("A", "K76.0", -1, Some(40.0), IndexFlag::Yes),
            dia("A", "E11.9", 10, Some(40.0), IndexFlag::Yes),
            dia("B", "E11.9", 10, Some(40.0), IndexFlag::Yes),
        ];
        let kept = require_anchor_code(events, "K76.0");
        assert_eq!(patients(&kept), vec!["A"]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn progression_on_index_day_excludes_whole_patient() {
        let progression: BTreeSet<&str> = ["K74.60"].into_iter().collect();
        let events = vec![
            dia("A", "K76.0", -3, Some(40.0), IndexFlag::Yes),
            dia("A", "K74.60", 0, Some(40.0), IndexFlag::Yes),
            dia("B", "K76.0", -3, Some(40.0), IndexFlag::Yes),
            dia("B", "K74.60", 1, Some(40.0), IndexFlag::Yes),
        ];
        let kept = exclude_prevalent_progression(events, &progression);
        assert_eq!(patients(&kept), vec!["B"]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn unknown_day_rows_still_drive_code_predicates() {
        let exclusions: BTreeSet<String> = ["B18.2".to_string()].into_iter().collect();
        let events = vec![
            dia("A", "K76.0", -5, Some(50.0), IndexFlag::Yes),
            dia("A", "B18.2", None, Some(50.0), IndexFlag::Yes),
            dia("B", "K76.0", None, Some(50.0), IndexFlag::Yes),
            dia("B", "K74.60", None, Some(50.0), IndexFlag::Yes),
            dia("C", "K76.0", -1, Some(50.0), IndexFlag::Yes),
        ];

        let selection = apply_eligibility(events, &exclusions, &CohortOptions::default());

        assert_eq!(patients(&selection.events), vec!["B", "C"]);
    }

    #[test]
    fn eligibility_chain_records_each_step() {
        let exclusions: BTreeSet<String> = ["B18.2".to_string()].into_iter().collect();
        let events = vec![
            dia("A", "K76.0", -5, Some(50.0), IndexFlag::Yes),
            dia("A", "K75.81", 30, Some(50.0), IndexFlag::Yes),
            dia("B", "K76.0", -2, Some(50.0), IndexFlag::Yes),
            dia("B", "B18.2", 12, Some(50.0), IndexFlag::Yes),
            dia("C", "K76.0", -2, Some(50.0), IndexFlag::No),
        ];

        let selection = apply_eligibility(events, &exclusions, &CohortOptions::default());

        assert_eq!(patients(&selection.events), vec!["A"]);
        let labels: Vec<&str> = selection
            .attrition
            .steps
            .iter()
            .map(|step| step.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![
                STEP_LOADED,
                STEP_INDEX_FLAG,
                STEP_MIN_AGE,
                STEP_ANCHOR,
                STEP_PREVALENT,
                STEP_EXCLUSIONS
            ]
        );
        assert_eq!(selection.attrition.step(STEP_LOADED).unwrap().patients, 3);
        assert_eq!(selection.attrition.step(STEP_INDEX_FLAG).unwrap().patients, 2);
        assert_eq!(selection.attrition.last().unwrap().patients, 1);
    }
}
