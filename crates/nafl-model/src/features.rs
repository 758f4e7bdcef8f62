//! Sparse patient-level indicator matrix.
//!
//! Each column stores only the patients for which the indicator is true, so
//! memory scales with the number of distinct (patient, category) pairs rather
//! than patients x categories. Rows and columns are kept in sorted order,
//! which makes every derived table independent of input order.

use std::collections::{BTreeMap, BTreeSet};

use crate::PatientId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureMatrix {
    patients: BTreeSet<PatientId>,
    columns: BTreeMap<String, BTreeSet<PatientId>>,
}

impl FeatureMatrix {
    /// Builds a matrix from explicit columns. Patients that only appear in a
    /// column are added to the row set.
    pub fn from_columns(
        mut patients: BTreeSet<PatientId>,
        columns: BTreeMap<String, BTreeSet<PatientId>>,
    ) -> Self {
        for members in columns.values() {
            patients.extend(members.iter().cloned());
        }
        Self { patients, columns }
    }

    pub fn patients(&self) -> &BTreeSet<PatientId> {
        &self.patients
    }

    pub fn height(&self) -> usize {
        self.patients.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&BTreeSet<PatientId>> {
        self.columns.get(name)
    }

    /// Number of patients with a true value in `name` (0 when absent).
    pub fn support(&self, name: &str) -> usize {
        self.columns.get(name).map_or(0, BTreeSet::len)
    }

    /// Materialises one column as booleans in row order.
    pub fn dense_column(&self, name: &str) -> Vec<bool> {
        match self.columns.get(name) {
            Some(members) => self
                .patients
                .iter()
                .map(|patient| members.contains(patient))
                .collect(),
            None => vec![false; self.patients.len()],
        }
    }

    /// Keeps columns whose support is at least `min_support`.
    ///
    /// Returns the names of the dropped columns.
    pub fn retain_min_support(&mut self, min_support: usize) -> Vec<String> {
        let dropped: Vec<String> = self
            .columns
            .iter()
            .filter(|(_, members)| members.len() < min_support)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &dropped {
            self.columns.remove(name);
        }
        dropped
    }

    /// Drops rows that are false in every column. Returns the removed patients.
    pub fn retain_covered_patients(&mut self) -> Vec<PatientId> {
        let covered: BTreeSet<&PatientId> = self.columns.values().flatten().collect();
        let (kept, removed): (BTreeSet<PatientId>, BTreeSet<PatientId>) =
            std::mem::take(&mut self.patients)
                .into_iter()
                .partition(|patient| covered.contains(patient));
        self.patients = kept;
        removed.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(value: &str) -> PatientId {
        PatientId::new(value).unwrap()
    }

    #[test]
    fn dense_column_follows_patient_order() {
        let patients = BTreeSet::from([pid("B"), pid("A"), pid("C")]);
        let columns = BTreeMap::from([("Code_X".to_string(), BTreeSet::from([pid("C")]))]);
        let matrix = FeatureMatrix::from_columns(patients, columns);
        assert_eq!(matrix.dense_column("Code_X"), vec![false, false, true]);
        assert_eq!(matrix.dense_column("Code_Missing"), vec![false; 3]);
    }

    #[test]
    fn retain_min_support_is_inclusive() {
        let columns = BTreeMap::from([
            ("keep".to_string(), BTreeSet::from([pid("A"), pid("B")])),
            ("drop".to_string(), BTreeSet::from([pid("A")])),
        ]);
        let mut matrix = FeatureMatrix::from_columns(BTreeSet::new(), columns);
        let dropped = matrix.retain_min_support(2);
        assert_eq!(dropped, vec!["drop".to_string()]);
        assert_eq!(matrix.column_names().collect::<Vec<_>>(), vec!["keep"]);
        assert_eq!(matrix.height(), 2);
    }

    #[test]
    fn uncovered_rows_are_removed() {
        let patients = BTreeSet::from([pid("A"), pid("B"), pid("C")]);
        let columns = BTreeMap::from([
            ("keep".to_string(), BTreeSet::from([pid("A"), pid("C")])),
            ("drop".to_string(), BTreeSet::from([pid("B")])),
        ]);
        let mut matrix = FeatureMatrix::from_columns(patients, columns);
        matrix.retain_min_support(2);

        let removed = matrix.retain_covered_patients();

        assert_eq!(removed, vec![pid("B")]);
        assert_eq!(matrix.patients().iter().collect::<Vec<_>>(), vec![&pid("A"), &pid("C")]);
        assert_eq!(matrix.dense_column("keep"), vec![true, true]);
    }
}
