//! Progression outcome and censoring time per cohort patient.

use std::collections::{BTreeMap, BTreeSet};

use nafl_model::{OutcomeLabel, OutcomeTable, PatientEvent, PatientId};

#[derive(Debug, Default)]
struct Observation {
    progressed: bool,
    last_day: Option<i64>,
    first_progression: Option<i64>,
}

fn fold_day(current: Option<i64>, day: Option<i64>, pick: fn(i64, i64) -> i64) -> Option<i64> {
    match (current, day) {
        (Some(current), Some(day)) => Some(pick(current, day)),
        (current, day) => current.or(day),
    }
}

/// Labels every patient present in `events`.
///
/// Outcome-positive patients get the earliest progression day; the others
/// are censored at their latest observed day. Unknown days are skipped by
/// both reductions but still count towards the outcome flag. A positive
/// patient whose progression rows all lack a day falls back to the latest
/// observed day.
pub fn derive_outcomes<E: PatientEvent>(
    events: &[E],
    progression: &BTreeSet<&str>,
) -> OutcomeTable {
    let mut observations: BTreeMap<PatientId, Observation> = BTreeMap::new();
    for event in events {
        let days = event.days_from_index();
        let entry = observations.entry(event.patient_id().clone()).or_default();
        entry.last_day = fold_day(entry.last_day, days, i64::max);
        if progression.contains(event.code()) {
            entry.progressed = true;
            entry.first_progression = fold_day(entry.first_progression, days, i64::min);
        }
    }

    observations
        .into_iter()
        .map(|(patient, observation)| {
            let label = if observation.progressed {
                OutcomeLabel::observed(observation.first_progression.or(observation.last_day))
            } else {
                OutcomeLabel::censored_at(observation.last_day)
            };
            (patient, label)
        })
        .collect()
}

/// Removes rows whose code is in `codes`.
pub fn strip_codes<E: PatientEvent>(mut events: Vec<E>, codes: &BTreeSet<&str>) -> Vec<E> {
    events.retain(|event| !codes.contains(event.code()));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use nafl_model::{DiagnosisEvent, IndexFlag};

    fn dia(patient: &str, code: &str, days: impl Into<Option<i64>>) -> DiagnosisEvent {
        DiagnosisEvent {
            patient_id: PatientId::new(patient).unwrap(),
            code: code.to_string(),
            code_type: "ICD10".to_string(),
            age: Some(45.0),
            days_from_index: days.into(),
            index_flag: IndexFlag::Yes,
        }
    }

    #[test]
    fn earliest_progression_wins_over_later_rows() {
        let progression: BTreeSet<&str> = ["K75.81", "K74.60"].into_iter().collect();
        let events = vec![
            dia("A", "K76.0", -5),
            dia("A", "K74.60", 90),
            dia("A", "K75.81", 30),
            dia("A", "E11.9", 500),
        ];
        let table = derive_outcomes(&events, &progression);
        let label = table.get(&PatientId::new("A").unwrap()).unwrap();
        assert!(label.outcome);
        assert_eq!(label.days_until_first_progression, Some(30));
    }

    #[test]
    fn negative_patient_is_censored_at_last_day() {
        let progression: BTreeSet<&str> = ["K75.81"].into_iter().collect();
        let events = vec![dia("B", "K76.0", -2), dia("B", "E11.9", 400), dia("B", "I10", 12)];
        let table = derive_outcomes(&events, &progression);
        let label = table.get(&PatientId::new("B").unwrap()).unwrap();
        assert!(label.censored());
        assert_eq!(label.days_until_first_progression, Some(400));
    }

    #[test]
    fn unknown_days_are_skipped_by_both_reductions() {
        let progression: BTreeSet<&str> = ["K75.81"].into_iter().collect();
        let events = vec![
            dia("A", "K76.0", -5),
            dia("A", "K75.81", None),
            dia("A", "K75.81", 60),
            dia("B", "K76.0", -2),
            dia("B", "I10", None),
        ];
        let table = derive_outcomes(&events, &progression);

        let a = table.get(&PatientId::new("A").unwrap()).unwrap();
        assert!(a.outcome);
        assert_eq!(a.days_until_first_progression, Some(60));
        let b = table.get(&PatientId::new("B").unwrap()).unwrap();
        assert!(b.censored());
        assert_eq!(b.days_until_first_progression, Some(-2));
    }

    #[test]
    fn progression_without_a_known_day_still_sets_the_outcome() {
        let progression: BTreeSet<&str> = ["K74.60"].into_iter().collect();
        let events = vec![dia("C", "K76.0", -1), dia("C", "K74.60", None), dia("C", "I10", 40)];
        let table = derive_outcomes(&events, &progression);

        let c = table.get(&PatientId::new("C").unwrap()).unwrap();
        assert!(c.outcome);
        assert_eq!(c.days_until_first_progression, Some(40));

        let only_unknown = vec![dia("D", "K76.0", None)];
        let table = derive_outcomes(&only_unknown, &progression);
        let d = table.get(&PatientId::new("D").unwrap()).unwrap();
        assert!(d.censored());
        assert_eq!(d.days_until_first_progression, None);
    }

    #[test]
    fn stripping_liver_codes_keeps_other_rows() {
        let liver: BTreeSet<&str> = ["K76.0", "K75.81"].into_iter().collect();
        let events = vec![dia("A", "K76.0", -5), dia("A", "K75.81", 30), dia("A", "E11.9", 3)];
        let stripped = strip_codes(events, &liver);
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped[0].code, "E11.9");
    }
}
