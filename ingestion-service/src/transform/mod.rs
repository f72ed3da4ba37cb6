use std::collections::BTreeMap;

use energy_client::domain::{GenerationRecord, FALLBACK_RESOURCE_TYPE};
use time::{OffsetDateTime, UtcOffset};

/// Detailed generation in wide form: one column per resource type, one row
/// per timestamp. Cells the provider did not report stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationTable {
    resource_types: Vec<String>,
    rows: BTreeMap<OffsetDateTime, Vec<Option<f64>>>,
}

impl GenerationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cell at (`ts`, `resource_type`), adding the column on first use.
    /// A repeated cell keeps the last value.
    pub fn insert(&mut self, ts: OffsetDateTime, resource_type: &str, value: f64) {
        let col = match self.resource_types.iter().position(|r| r == resource_type) {
            Some(idx) => idx,
            None => {
                self.resource_types.push(resource_type.to_string());
                for cells in self.rows.values_mut() {
                    cells.push(None);
                }
                self.resource_types.len() - 1
            }
        };

        let width = self.resource_types.len();
        let cells = self.rows.entry(to_utc(ts)).or_insert_with(|| vec![None; width]);
        cells[col] = Some(value);
    }

    #[cfg(test)]
    pub fn resource_types(&self) -> &[String] {
        &self.resource_types
    }

    #[cfg(test)]
    pub fn timestamps(&self) -> impl Iterator<Item = &OffsetDateTime> {
        self.rows.keys()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.resource_types.is_empty()
    }
}

/// Aggregate load: a single value column keyed by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadTable {
    rows: BTreeMap<OffsetDateTime, f64>,
}

impl LoadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ts: OffsetDateTime, value: f64) {
        self.rows.insert(to_utc(ts), value);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn to_utc(ts: OffsetDateTime) -> OffsetDateTime {
    ts.to_offset(UtcOffset::UTC)
}

fn stamp(timestamp: OffsetDateTime, country_code: &str, resource_type: &str, value: Option<f64>) -> GenerationRecord {
    GenerationRecord {
        timestamp: to_utc(timestamp),
        country_code: country_code.to_string(),
        resource_type: resource_type.to_string(),
        actual_generation_mw: value,
        forecast_generation_mw: None,
    }
}

/// Reshape wide generation into long form, column by column.
pub fn melt_generation(table: &GenerationTable, country_code: &str) -> Vec<GenerationRecord> {
    let mut out = Vec::with_capacity(table.rows.len() * table.resource_types.len());
    for (col, resource_type) in table.resource_types.iter().enumerate() {
        for (ts, cells) in &table.rows {
            out.push(stamp(*ts, country_code, resource_type, cells[col]));
        }
    }
    out
}

/// Reshape aggregate load into long form under the fallback label.
pub fn melt_load(table: &LoadTable, country_code: &str) -> Vec<GenerationRecord> {
    table
        .rows
        .iter()
        .map(|(ts, value)| stamp(*ts, country_code, FALLBACK_RESOURCE_TYPE, Some(*value)))
        .collect()
}
