//! Inner join of patient-level tables on the patient key.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::{DataFrame, DataType, Expr, IntoLazy, SortMultipleOptions, col};
use tracing::{info, info_span};

use nafl_ingest::ensure_unique_key;
use nafl_model::PipelineError;

/// A named patient-level table and the columns to drop before joining.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub frame: DataFrame,
    pub drop_columns: Vec<String>,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
            drop_columns: Vec::new(),
        }
    }

    pub fn with_drop_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.drop_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str().to_string())
        .collect()
}

/// Applies the drop list and normalises the key column to strings.
fn prepare_table(table: NamedTable, key: &str) -> Result<(String, DataFrame)> {
    let NamedTable {
        name,
        mut frame,
        drop_columns,
    } = table;
    if frame.column(key).is_err() {
        return Err(PipelineError::missing_column(&name, key).into());
    }
    for column in &drop_columns {
        if column == key {
            return Err(PipelineError::InvalidConfig(format!(
                "cannot drop key column '{key}' from {name}"
            ))
            .into());
        }
        if frame.column(column).is_err() {
            return Err(PipelineError::MissingDropColumn {
                table: name.clone(),
                column: column.clone(),
            }
            .into());
        }
        frame = frame
            .drop(column)
            .with_context(|| format!("drop column '{column}' from {name}"))?;
    }
    let frame = frame
        .lazy()
        .with_column(col(key).cast(DataType::String))
        .collect()
        .with_context(|| format!("cast key column '{key}' in {name}"))?;
    ensure_unique_key(&frame, &name, key)?;
    Ok((name, frame))
}

/// Inner-joins `tables` on `key`.
///
/// Output columns are the key followed by each table's remaining columns in
/// input order; rows are sorted by key. Fails on a missing drop column, a
/// duplicated key, a non-key column shared by two tables, or an empty result.
pub fn combine_tables(tables: Vec<NamedTable>, key: &str) -> Result<DataFrame> {
    if tables.is_empty() {
        return Err(PipelineError::InvalidConfig("no tables to combine".to_string()).into());
    }
    let span = info_span!("combine", tables = tables.len(), key = %key);
    let _guard = span.enter();

    let mut prepared = Vec::with_capacity(tables.len());
    for table in tables {
        let (name, frame) = prepare_table(table, key)?;
        info!(table = %name, rows = frame.height(), columns = frame.width(), "join input");
        prepared.push((name, frame));
    }

    let mut owners: BTreeMap<String, String> = BTreeMap::new();
    let mut ordered: Vec<String> = vec![key.to_string()];
    for (name, frame) in &prepared {
        for column in column_names(frame) {
            if column == key {
                continue;
            }
            if let Some(first) = owners.get(&column) {
                return Err(PipelineError::ColumnCollision {
                    column,
                    first: first.clone(),
                    second: name.clone(),
                }
                .into());
            }
            owners.insert(column.clone(), name.clone());
            ordered.push(column);
        }
    }

    let names: Vec<String> = prepared.iter().map(|(name, _)| name.clone()).collect();
    let mut frames = prepared.into_iter().map(|(_, frame)| frame.lazy());
    let Some(mut joined) = frames.next() else {
        return Err(PipelineError::InvalidConfig("no tables to combine".to_string()).into());
    };
    for frame in frames {
        joined = joined.inner_join(frame, col(key), col(key));
    }
    let selection: Vec<Expr> = ordered.iter().map(|column| col(column.as_str())).collect();
    let combined = joined
        .select(selection)
        .sort([key], SortMultipleOptions::default())
        .collect()
        .context("inner join of patient tables")?;

    if combined.height() == 0 {
        return Err(PipelineError::EmptyJoin {
            tables: names.join(", "),
        }
        .into());
    }
    info!(
        rows = combined.height(),
        columns = combined.width(),
        "combined patient tables"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, IntoColumn, NamedFrom, Series};

    fn frame(columns: Vec<Column>) -> DataFrame {
        DataFrame::new(columns).expect("frame")
    }

    fn strings(name: &str, values: &[&str]) -> Column {
        Series::new(name.into(), values.to_vec()).into_column()
    }

    fn keys(df: &DataFrame) -> Vec<String> {
        df.column("StudyID")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .map(String::from)
            .collect()
    }

    #[test]
    fn join_keeps_only_shared_patients() {
        let lab = frame(vec![
            strings("StudyID", &["C", "A", "B"]),
            Series::new("mean_ALT".into(), vec![30.0, 41.0, 22.5]).into_column(),
        ]);
        let dem = frame(vec![
            strings("StudyID", &["B", "C", "D"]),
            strings("sex", &["F", "M", "F"]),
        ]);

        let combined = combine_tables(
            vec![NamedTable::new("lab", lab), NamedTable::new("dem", dem)],
            "StudyID",
        )
        .expect("combine");

        assert_eq!(keys(&combined), vec!["B".to_string(), "C".to_string()]);
        assert_eq!(column_names(&combined), vec!["StudyID", "mean_ALT", "sex"]);
    }

    #[test]
    fn absent_drop_column_is_a_join_error() {
        let phy = frame(vec![
            strings("StudyID", &["A"]),
            strings("mean_BMI_category", &["obese"]),
        ]);
        let error = combine_tables(
            vec![NamedTable::new("phy", phy).with_drop_columns(["last_BMI_category"])],
            "StudyID",
        )
        .expect_err("missing drop column");
        let pipeline = error.downcast_ref::<PipelineError>().expect("pipeline error");
        assert!(pipeline.is_join_error());
    }

    #[test]
    fn shared_feature_column_is_rejected() {
        let lab = frame(vec![strings("StudyID", &["A"]), strings("sex", &["F"])]);
        let dem = frame(vec![strings("StudyID", &["A"]), strings("sex", &["F"])]);
        let error = combine_tables(
            vec![NamedTable::new("lab", lab), NamedTable::new("dem", dem)],
            "StudyID",
        )
        .expect_err("collision");
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::ColumnCollision { column, .. }) if column == "sex"
        ));
    }

    #[test]
    fn disjoint_tables_fail_with_empty_join() {
        let lab = frame(vec![strings("StudyID", &["A"]), strings("x", &["1"])]);
        let dem = frame(vec![strings("StudyID", &["B"]), strings("y", &["2"])]);
        let error = combine_tables(
            vec![NamedTable::new("lab", lab), NamedTable::new("dem", dem)],
            "StudyID",
        )
        .expect_err("empty join");
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyJoin { .. })
        ));
    }
}
