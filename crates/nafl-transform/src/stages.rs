//! Diagnosis and medication stages: filter, label, strip, encode.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, info_span};

use nafl_model::{
    CohortOptions, DiagnosisEvent, FeatureMatrix, MedicationEvent, MedicationOptions,
    OutcomeTable, PatientId, Result,
};

use crate::attrition::Attrition;
use crate::cohort::apply_eligibility;
use crate::encoder::{EncodeSummary, SparseEncoder};
use crate::medication::prepare_medications;
use crate::outcome::{derive_outcomes, strip_codes};

pub const STEP_LIVER_STRIPPED: &str = "liver codes removed";

#[derive(Debug, Clone)]
pub struct DiagnosisFeatures {
    pub labels: OutcomeTable,
    pub matrix: FeatureMatrix,
    pub attrition: Attrition,
    pub summary: EncodeSummary,
}

#[derive(Debug, Clone)]
pub struct MedicationFeatures {
    pub matrix: FeatureMatrix,
    pub attrition: Attrition,
    pub summary: EncodeSummary,
}

/// Runs eligibility, labels the cohort, strips liver codes and encodes.
///
/// Labels are derived before liver-code rows are removed so progression
/// codes never reach the feature matrix. Patients left without any retained
/// code are removed from both the matrix and the labels.
pub fn run_diagnosis_stage(
    events: Vec<DiagnosisEvent>,
    exclusions: &BTreeSet<String>,
    options: &CohortOptions,
) -> Result<DiagnosisFeatures> {
    options.validate()?;
    let span = info_span!("diagnosis_stage", rows = events.len());
    let _guard = span.enter();

    let selection = apply_eligibility(events, exclusions, options);
    let mut attrition = selection.attrition;

    let mut labels = derive_outcomes(&selection.events, &options.progression_set());
    info!(
        patients = labels.len(),
        positive = labels.positive_count(),
        censored = labels.censored_count(),
        "derived outcomes"
    );

    let stripped = strip_codes(selection.events, &options.liver_set());
    attrition.record(STEP_LIVER_STRIPPED, &stripped);

    let pairs = stripped
        .into_iter()
        .map(|event| (event.patient_id, event.code));
    let mut encoded = SparseEncoder::new(&options.column_prefix, options.min_support)
        .encode(pairs, BTreeSet::new());
    let uncovered = encoded.matrix.retain_covered_patients();
    labels.retain_patients(encoded.matrix.patients());
    if !uncovered.is_empty() {
        info!(
            patients = uncovered.len(),
            remaining = labels.len(),
            "dropped patients without retained codes"
        );
    }

    Ok(DiagnosisFeatures {
        labels,
        matrix: encoded.matrix,
        attrition,
        summary: encoded.summary,
    })
}

/// Filters medication rows and encodes `<CodeType>_<Code>` categories.
pub fn run_medication_stage(
    events: Vec<MedicationEvent>,
    code_type_rows: &BTreeMap<String, usize>,
    options: &MedicationOptions,
) -> Result<MedicationFeatures> {
    options.validate()?;
    let span = info_span!("medication_stage", rows = events.len());
    let _guard = span.enter();

    let prepared = prepare_medications(events, code_type_rows, options);
    let universe: BTreeSet<PatientId> = prepared
        .events
        .iter()
        .map(|event| event.patient_id.clone())
        .collect();
    let pairs = prepared.events.into_iter().map(|event| {
        let key = event.category_key();
        (event.patient_id, key)
    });
    let encoded = SparseEncoder::new(&options.column_prefix, options.min_support)
        .encode(pairs, universe);

    Ok(MedicationFeatures {
        matrix: encoded.matrix,
        attrition: prepared.attrition,
        summary: encoded.summary,
    })
}
