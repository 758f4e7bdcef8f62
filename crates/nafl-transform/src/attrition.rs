use serde::{Deserialize, Serialize};
use tracing::info;

use nafl_model::PatientEvent;

use crate::relation::distinct_patients;

/// Patient and row counts after one filtering step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttritionStep {
    pub label: String,
    pub patients: usize,
    pub rows: usize,
}

/// Ordered record of how a stage narrowed its input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attrition {
    pub stage: String,
    pub steps: Vec<AttritionStep>,
}

impl Attrition {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            steps: Vec::new(),
        }
    }

    /// Counts `events` under `label` and logs the step.
    pub fn record<E: PatientEvent>(&mut self, label: impl Into<String>, events: &[E]) {
        let step = AttritionStep {
            label: label.into(),
            patients: distinct_patients(events).len(),
            rows: events.len(),
        };
        info!(
            stage = %self.stage,
            step = %step.label,
            patients = step.patients,
            rows = step.rows,
            "attrition"
        );
        self.steps.push(step);
    }

    pub fn last(&self) -> Option<&AttritionStep> {
        self.steps.last()
    }

    pub fn step(&self, label: &str) -> Option<&AttritionStep> {
        self.steps.iter().find(|step| step.label == label)
    }
}
