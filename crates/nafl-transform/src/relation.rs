//! Row- and patient-level filters over event relations.
//!
//! Every function consumes a relation and returns the narrowed one. Patient
//! level filters are two-phase: the patient set is computed from the rows that
//! trigger the predicate, then the whole relation is filtered by that set.

use std::collections::BTreeSet;

use nafl_model::{IndexFlag, PatientEvent, PatientId};

pub fn distinct_patients<E: PatientEvent>(events: &[E]) -> BTreeSet<PatientId> {
    events
        .iter()
        .map(|event| event.patient_id().clone())
        .collect()
}

/// Patients with at least one row matching `predicate`.
pub fn patients_where<E, F>(events: &[E], predicate: F) -> BTreeSet<PatientId>
where
    E: PatientEvent,
    F: Fn(&E) -> bool,
{
    events
        .iter()
        .filter(|event| predicate(event))
        .map(|event| event.patient_id().clone())
        .collect()
}

/// Keeps every row of the patients in `keep`.
pub fn retain_patients<E: PatientEvent>(mut events: Vec<E>, keep: &BTreeSet<PatientId>) -> Vec<E> {
    events.retain(|event| keep.contains(event.patient_id()));
    events
}

/// Removes every row of the patients in `drop`.
pub fn drop_patients<E: PatientEvent>(mut events: Vec<E>, drop: &BTreeSet<PatientId>) -> Vec<E> {
    if drop.is_empty() {
        return events;
    }
    events.retain(|event| !drop.contains(event.patient_id()));
    events
}

/// Row-level filter on the y/n index flag.
pub fn keep_index_flag<E: PatientEvent>(mut events: Vec<E>, flag: IndexFlag) -> Vec<E> {
    events.retain(|event| event.index_flag() == flag);
    events
}
