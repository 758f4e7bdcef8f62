//! Sparse one-hot encoder shared by the diagnosis and medication stages.
//!
//! Input is a relation of `(patient, category)` pairs. Output is a
//! [`FeatureMatrix`] with one column per category that reaches the
//! minimum-support threshold, named `<prefix><category>`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nafl_model::{FeatureMatrix, PatientId};

/// Distinct `(patient, category)` pairs in sorted order.
pub fn dedupe_pairs<I>(pairs: I) -> BTreeSet<(PatientId, String)>
where
    I: IntoIterator<Item = (PatientId, String)>,
{
    pairs.into_iter().collect()
}

/// One indicator per pair, keyed by prefixed column name.
pub fn one_hot<'a>(
    pairs: &'a BTreeSet<(PatientId, String)>,
    prefix: &'a str,
) -> impl Iterator<Item = (String, &'a PatientId)> + 'a {
    pairs
        .iter()
        .map(move |(patient, category)| (format!("{prefix}{category}"), patient))
}

/// Collapses indicator rows to one row per patient with logical OR.
pub fn or_aggregate<'a, I>(indicators: I, universe: BTreeSet<PatientId>) -> FeatureMatrix
where
    I: IntoIterator<Item = (String, &'a PatientId)>,
{
    let mut columns: BTreeMap<String, BTreeSet<PatientId>> = BTreeMap::new();
    for (column, patient) in indicators {
        columns.entry(column).or_default().insert(patient.clone());
    }
    FeatureMatrix::from_columns(universe, columns)
}

/// Drops columns with fewer than `min_support` patients (inclusive threshold).
pub fn retain_supported(matrix: &mut FeatureMatrix, min_support: usize) -> Vec<String> {
    let dropped = matrix.retain_min_support(min_support);
    for column in &dropped {
        debug!(column = %column, "below minimum support");
    }
    dropped
}

/// Counts reported for one encoding run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSummary {
    pub distinct_pairs: usize,
    pub categories: usize,
    pub retained_columns: usize,
    pub dropped_columns: usize,
}

#[derive(Debug, Clone)]
pub struct EncodedFeatures {
    pub matrix: FeatureMatrix,
    pub summary: EncodeSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseEncoder {
    prefix: String,
    min_support: usize,
}

impl SparseEncoder {
    pub fn new(prefix: impl Into<String>, min_support: usize) -> Self {
        Self {
            prefix: prefix.into(),
            min_support,
        }
    }

    /// Dedupe, one-hot, OR-aggregate, then drop unsupported columns.
    ///
    /// Every patient in `universe` gets a row even when all of their
    /// indicators are false.
    pub fn encode<I>(&self, pairs: I, universe: BTreeSet<PatientId>) -> EncodedFeatures
    where
        I: IntoIterator<Item = (PatientId, String)>,
    {
        let deduped = dedupe_pairs(pairs);
        let mut matrix = or_aggregate(one_hot(&deduped, &self.prefix), universe);
        let categories = matrix.width();
        let dropped = retain_supported(&mut matrix, self.min_support);
        let summary = EncodeSummary {
            distinct_pairs: deduped.len(),
            categories,
            retained_columns: matrix.width(),
            dropped_columns: dropped.len(),
        };
        info!(
            prefix = %self.prefix,
            min_support = self.min_support,
            patients = matrix.height(),
            distinct_pairs = summary.distinct_pairs,
            categories = summary.categories,
            retained = summary.retained_columns,
            "encoded features"
        );
        EncodedFeatures { matrix, summary }
    }
}
