//! Hand-off from tabular loaders
//!
//! File readers (CSV, Excel) live outside this crate. They produce a
//! [`TraceTable`] of named numeric columns, optionally carrying the stored
//! edit log, and [`TraceModel::from_table`] picks the columns by the
//! conventional VasoAnalyzer names.

use std::collections::BTreeMap;

use super::model::TraceModel;
use crate::audit::{deserialize_edit_log, EditAction};
use crate::config::LodSettings;
use crate::error::{Result, TraceError};

pub const TIME_COLUMN: &str = "Time (s)";

pub const INNER_CLEAN_COLUMNS: &[&str] = &["Inner Diameter (clean)", "Inner Diameter"];
pub const INNER_RAW_COLUMNS: &[&str] = &[
    "Inner Diameter (raw)",
    "Inner Diameter Raw",
    "Inner Diameter (original)",
];
pub const OUTER_CLEAN_COLUMNS: &[&str] = &["Outer Diameter (clean)", "Outer Diameter"];
pub const OUTER_RAW_COLUMNS: &[&str] = &[
    "Outer Diameter (raw)",
    "Outer Diameter Raw",
    "Outer Diameter (original)",
];

/// Named numeric columns plus an optional stored edit log
#[derive(Debug, Clone, Default)]
pub struct TraceTable {
    columns: BTreeMap<String, Vec<f64>>,
    edit_log: Option<serde_json::Value>,
}

impl TraceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert_column(name, values);
        self
    }

    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Attach a stored edit log (a JSON array of actions)
    pub fn with_edit_log(mut self, payload: serde_json::Value) -> Self {
        self.edit_log = Some(payload);
        self
    }

    pub fn edit_log(&self) -> Option<&serde_json::Value> {
        self.edit_log.as_ref()
    }

    /// First column present from `candidates`
    fn prefer_column(&self, candidates: &[&str]) -> Option<&[f64]> {
        candidates.iter().find_map(|name| self.column(name))
    }

    /// Actions from the attached log; unreadable entries are skipped
    fn stored_actions(&self) -> Vec<EditAction> {
        match self.edit_log.as_ref() {
            Some(serde_json::Value::Array(entries)) => deserialize_edit_log(entries),
            Some(other) => {
                tracing::warn!("Ignoring edit log that is not a list: {}", other);
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

impl TraceModel {
    /// Build a model from loader output.
    ///
    /// Clean columns are preferred over plain ones. When `edit_actions` is
    /// `None` the table's stored edit log, if any, is replayed.
    pub fn from_table(
        table: &TraceTable,
        settings: &LodSettings,
        edit_actions: Option<Vec<EditAction>>,
    ) -> Result<Self> {
        let time = table.column(TIME_COLUMN).ok_or_else(|| {
            TraceError::Validation(format!("Table missing {} column", TIME_COLUMN))
        })?;
        let inner = table
            .prefer_column(INNER_CLEAN_COLUMNS)
            .ok_or_else(|| TraceError::Validation("Table missing Inner Diameter column".into()))?;

        let mut builder = TraceModel::builder(time.to_vec(), inner.to_vec())
            .lod_settings(settings.clone())
            .edit_actions(edit_actions.unwrap_or_else(|| table.stored_actions()));

        if let Some(raw) = table.prefer_column(INNER_RAW_COLUMNS) {
            builder = builder.inner_raw(raw.to_vec());
        }
        if let Some(outer) = table.prefer_column(OUTER_CLEAN_COLUMNS) {
            builder = builder.outer(outer.to_vec());
            if let Some(raw) = table.prefer_column(OUTER_RAW_COLUMNS) {
                builder = builder.outer_raw(raw.to_vec());
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefers_clean_columns() {
        let table = TraceTable::new()
            .with_column(TIME_COLUMN, vec![0.0, 1.0, 2.0])
            .with_column("Inner Diameter", vec![1.0, 1.0, 1.0])
            .with_column("Inner Diameter (clean)", vec![2.0, f64::NAN, 2.0])
            .with_column("Inner Diameter (raw)", vec![3.0, 3.0, 3.0])
            .with_column("Outer Diameter", vec![4.0, 4.0, 4.0]);

        let model = TraceModel::from_table(&table, &LodSettings::default(), None).unwrap();
        assert_eq!(model.inner_full()[0], 2.0);
        assert!(model.inner_full()[1].is_nan());
        assert_eq!(model.inner_raw(), &[3.0, 3.0, 3.0]);
        assert_eq!(model.outer_full().unwrap(), &[4.0, 4.0, 4.0]);
        assert_eq!(model.outer_raw().unwrap(), &[4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_missing_columns() {
        let table = TraceTable::new().with_column("Inner Diameter", vec![1.0]);
        assert!(TraceModel::from_table(&table, &LodSettings::default(), None).is_err());

        let table = TraceTable::new().with_column(TIME_COLUMN, vec![1.0]);
        let err = TraceModel::from_table(&table, &LodSettings::default(), None).unwrap_err();
        assert!(err.to_string().contains("Inner Diameter"));
    }

    #[test]
    fn test_replays_stored_log() {
        let table = TraceTable::new()
            .with_column(TIME_COLUMN, vec![0.0, 1.0, 2.0, 3.0])
            .with_column("Inner Diameter", vec![1.0, 2.0, 3.0, 4.0])
            .with_edit_log(json!([
                {"channel": "ID", "op": "delete_points", "indices": [[1, 2]]},
                {"channel": "ID", "op": "bogus", "indices": [[0, 0]]},
            ]));

        let model = TraceModel::from_table(&table, &LodSettings::default(), None).unwrap();
        assert_eq!(model.edit_log().len(), 1);
        assert!(model.inner_full()[1].is_nan());
        assert!(model.inner_full()[2].is_nan());

        // Explicit actions win over the stored log
        let model = TraceModel::from_table(&table, &LodSettings::default(), Some(Vec::new())).unwrap();
        assert!(model.edit_log().is_empty());
    }
}
