use std::collections::{BTreeMap, BTreeSet};

use nafl_model::{
    CohortOptions, DiagnosisEvent, IndexFlag, MedicationEvent, MedicationOptions, PatientId,
    PipelineError,
};
use nafl_transform::{run_diagnosis_stage, run_medication_stage};

fn pid(value: &str) -> PatientId {
    PatientId::new(value).expect("patient id")
}

fn dia(patient: &str, code: &str, days: impl Into<Option<i64>>) -> DiagnosisEvent {
    DiagnosisEvent {
        patient_id: pid(patient),
        code: code.to_string(),
        code_type: "ICD10".to_string(),
        age: Some(52.0),
        days_from_index: days.into(),
        index_flag: IndexFlag::Yes,
    }
}

fn med(patient: &str, code: &str, days: i64) -> MedicationEvent {
    MedicationEvent {
        patient_id: pid(patient),
        code: code.to_string(),
        code_type: "RXNORM".to_string(),
        days_from_index: days,
        index_flag: IndexFlag::Yes,
    }
}

fn cohort_options(min_support: usize) -> CohortOptions {
    CohortOptions {
        min_support,
        ..CohortOptions::default()
    }
}

#[test]
fn scenario_progression_and_censoring() {
    let events = vec![
        dia("A", "K76.0", -5),
        dia("A", "K75.81", 30),
        dia("B", "K76.0", -2),
        dia("B", "E11.9", 400),
    ];

    let features =
        run_diagnosis_stage(events, &BTreeSet::new(), &cohort_options(1)).expect("diagnosis stage");

    let a = features.labels.get(&pid("A")).expect("label A");
    assert!(a.outcome);
    assert_eq!(a.days_until_first_progression, Some(30));
    let b = features.labels.get(&pid("B")).expect("label B");
    assert!(!b.outcome);
    assert!(b.censored());
    assert_eq!(b.days_until_first_progression, Some(400));

    // Progression codes are used for the label but never become predictors.
    let columns: Vec<&str> = features.matrix.column_names().collect();
    assert_eq!(columns, vec!["Code_E11.9", "Code_K76.0"]);
    assert_eq!(features.matrix.dense_column("Code_E11.9"), vec![false, true]);
    assert_eq!(features.matrix.height(), 2);
}

#[test]
fn every_cohort_patient_has_the_anchor_code() {
    let events = vec![
        dia("A", "K76.0", -5),
        dia("B", "E11.9", 10),
        dia("C", "K76.0", -1),
        dia("C", "I10", 15),
    ];

    let features =
        run_diagnosis_stage(events, &BTreeSet::new(), &cohort_options(1)).expect("diagnosis stage");

    let anchored = features.matrix.column("Code_K76.0").expect("anchor column");
    let cohort: BTreeSet<PatientId> = features.labels.patients().cloned().collect();
    assert_eq!(&cohort, anchored);
    assert!(!cohort.contains(&pid("B")));
}

#[test]
fn rows_without_a_known_day_still_count_for_cohort_codes() {
    let exclusions: BTreeSet<String> = ["B18.2".to_string()].into_iter().collect();
    let events = vec![
        dia("A", "K76.0", -5),
        dia("A", "B18.2", None),
        dia("A", "E11.9", 10),
        dia("B", "K76.0", None),
        dia("B", "E11.9", 10),
        dia("C", "K76.0", -1),
    ];

    let features =
        run_diagnosis_stage(events, &exclusions, &cohort_options(1)).expect("diagnosis stage");

    let cohort: Vec<&str> = features.labels.patients().map(PatientId::as_str).collect();
    assert_eq!(cohort, vec!["B", "C"]);
    let b = features.labels.get(&pid("B")).expect("label B");
    assert!(b.censored());
    assert_eq!(b.days_until_first_progression, Some(10));
    assert_eq!(features.matrix.dense_column("Code_K76.0"), vec![true, true]);
}

#[test]
fn patients_without_retained_codes_get_no_row() {
    let mut events = vec![dia("Z", "K76.0", -1), dia("Z", "I10", 20)];
    for idx in 0..3 {
        let patient = format!("P{idx}");
        events.push(dia(&patient, "K76.0", -1));
        events.push(dia(&patient, "E11.9", 5));
    }
    let mut all_liver_codes = CohortOptions::default().all_liver_codes;
    all_liver_codes.push("K76.0".to_string());
    let options = CohortOptions {
        min_support: 3,
        all_liver_codes,
        ..CohortOptions::default()
    };

    let features =
        run_diagnosis_stage(events, &BTreeSet::new(), &options).expect("diagnosis stage");

    let rows: Vec<&str> = features.matrix.patients().iter().map(PatientId::as_str).collect();
    assert_eq!(rows, vec!["P0", "P1", "P2"]);
    assert_eq!(features.matrix.column_names().collect::<Vec<_>>(), vec!["Code_E11.9"]);
    assert_eq!(features.labels.len(), 3);
    assert!(features.labels.get(&pid("Z")).is_none());
}

#[test]
fn liver_superset_must_cover_progression_codes() {
    let options = CohortOptions {
        all_liver_codes: vec!["K76.1".to_string()],
        ..CohortOptions::default()
    };

    let error = run_diagnosis_stage(vec![dia("A", "K76.0", -1)], &BTreeSet::new(), &options)
        .expect_err("invalid options");

    assert!(matches!(error, PipelineError::InvalidConfig(_)));
}

#[test]
fn medication_support_threshold_is_inclusive() {
    let mut events = Vec::new();
    for idx in 0..100 {
        events.push(med(&format!("P{idx:03}"), "860975", -30));
    }
    for idx in 0..99 {
        events.push(med(&format!("P{idx:03}"), "6809", -30));
    }
    let code_type_rows: BTreeMap<String, usize> =
        [("RXNORM".to_string(), events.len())].into_iter().collect();

    let features = run_medication_stage(events, &code_type_rows, &MedicationOptions::default())
        .expect("medication stage");

    let columns: Vec<&str> = features.matrix.column_names().collect();
    assert_eq!(columns, vec!["MedType_Code_RXNORM_860975"]);
    assert_eq!(features.matrix.support("MedType_Code_RXNORM_860975"), 100);
    assert_eq!(features.summary.dropped_columns, 1);
}

#[test]
fn inverted_lookback_window_is_rejected() {
    let options = MedicationOptions {
        lookback_start: 0,
        lookback_end: -730,
        ..MedicationOptions::default()
    };

    let error = run_medication_stage(Vec::new(), &BTreeMap::new(), &options)
        .expect_err("invalid window");

    assert!(matches!(error, PipelineError::InvalidConfig(_)));
}
