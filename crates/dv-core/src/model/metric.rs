//! Tabular metrics and their descriptors

use std::fmt;

use ahash::AHashMap;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::{CountyId, SENTINEL};

/// A metric reading for one county
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    NoData,
}

impl MetricValue {
    /// Interpret a raw number, mapping the sentinel (and non-finite values) to `NoData`
    pub fn from_raw(raw: f64) -> Self {
        if raw == SENTINEL || !raw.is_finite() {
            MetricValue::NoData
        } else {
            MetricValue::Value(raw)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(v),
            MetricValue::NoData => None,
        }
    }

    /// The raw number, with `NoData` written back as the sentinel
    pub fn raw(self) -> f64 {
        self.value().unwrap_or(SENTINEL)
    }

    pub fn is_no_data(self) -> bool {
        matches!(self, MetricValue::NoData)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::NoData, MetricValue::from_raw)
    }
}

/// One row of the metric table
#[derive(Debug, Clone, Default)]
pub struct MetricRow {
    pub county_id: CountyId,
    pub metrics: AHashMap<String, f64>,
}

impl MetricRow {
    pub fn new(county_id: CountyId) -> Self {
        Self {
            county_id,
            metrics: AHashMap::new(),
        }
    }

    /// Builder-style insert, handy for fixtures
    pub fn with(mut self, metric: impl Into<String>, raw: f64) -> Self {
        self.metrics.insert(metric.into(), raw);
        self
    }

    /// Look up a metric. Absent columns read as `NoData`.
    pub fn value(&self, metric: &str) -> MetricValue {
        self.metrics.get(metric).copied().into()
    }
}

/// Immutable metric table with the union of its column names
#[derive(Debug, Clone, Default)]
pub struct MetricTable {
    rows: Vec<MetricRow>,
    columns: IndexSet<String>,
}

impl MetricTable {
    pub fn new(rows: Vec<MetricRow>) -> Self {
        Self::with_columns(rows, std::iter::empty())
    }

    /// Build a table that also knows `columns`, even ones no row has a value
    /// for. A source column whose cells are all null is still a metric.
    pub fn with_columns(rows: Vec<MetricRow>, columns: impl IntoIterator<Item = String>) -> Self {
        let mut known: IndexSet<String> = columns.into_iter().collect();
        for row in &rows {
            for name in row.metrics.keys() {
                if !known.contains(name) {
                    known.insert(name.clone());
                }
            }
        }
        known.sort();

        Self { rows, columns: known }
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether `metric` is a known column
    pub fn has_column(&self, metric: &str) -> bool {
        self.columns.contains(metric)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

/// Labeling metadata for a selectable metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    #[serde(rename = "feature_id")]
    pub metric_id: String,
    #[serde(rename = "feature_name")]
    pub display_name: String,
    #[serde(rename = "tooltip_desc", default)]
    pub tooltip_suffix: String,
}

impl FeatureDescriptor {
    pub fn new(
        metric_id: impl Into<String>,
        display_name: impl Into<String>,
        tooltip_suffix: impl Into<String>,
    ) -> Self {
        Self {
            metric_id: metric_id.into(),
            display_name: display_name.into(),
            tooltip_suffix: tooltip_suffix.into(),
        }
    }
}

/// Descriptor lookup table keyed by metric id, in declaration order
#[derive(Debug, Clone, Default)]
pub struct MetricCatalog {
    descriptors: IndexMap<String, FeatureDescriptor>,
}

impl MetricCatalog {
    pub fn new(descriptors: impl IntoIterator<Item = FeatureDescriptor>) -> Self {
        let mut map = IndexMap::new();
        for descriptor in descriptors {
            if map.contains_key(&descriptor.metric_id) {
                tracing::warn!("Duplicate feature descriptor '{}' ignored", descriptor.metric_id);
                continue;
            }
            map.insert(descriptor.metric_id.clone(), descriptor);
        }
        Self { descriptors: map }
    }

    pub fn get(&self, metric: &str) -> Option<&FeatureDescriptor> {
        self.descriptors.get(metric)
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.descriptors.contains_key(metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// The two active metrics: primary becomes metric A, secondary metric B
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricPair {
    pub primary: String,
    pub secondary: String,
}

impl MetricPair {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn with_primary(&self, primary: impl Into<String>) -> Self {
        Self::new(primary, self.secondary.clone())
    }

    pub fn with_secondary(&self, secondary: impl Into<String>) -> Self {
        Self::new(self.primary.clone(), secondary)
    }
}

impl fmt::Display for MetricPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.primary, self.secondary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_columns_survive_empty_rows() {
        let table = MetricTable::with_columns(
            vec![MetricRow::new(1001).with("poverty_perc", 18.2)],
            ["percent_stroke".to_string(), "poverty_perc".to_string()],
        );

        assert!(table.has_column("percent_stroke"));
        assert_eq!(table.columns().collect::<Vec<_>>(), vec!["percent_stroke", "poverty_perc"]);
        assert!(!MetricTable::new(table.rows().to_vec()).has_column("percent_stroke"));
    }

    #[test]
    fn test_sentinel_is_no_data() {
        assert_eq!(MetricValue::from_raw(-1.0), MetricValue::NoData);
        assert_eq!(MetricValue::from_raw(f64::NAN), MetricValue::NoData);
        assert_eq!(MetricValue::from_raw(0.0), MetricValue::Value(0.0));
        assert_eq!(MetricValue::NoData.raw(), SENTINEL);
    }

    #[test]
    fn test_absent_column_reads_no_data() {
        let row = MetricRow::new(1001).with("poverty_perc", 18.2);
        assert_eq!(row.value("poverty_perc"), MetricValue::Value(18.2));
        assert_eq!(row.value("percent_stroke"), MetricValue::NoData);
    }

    #[test]
    fn test_table_columns_are_union() {
        let table = MetricTable::new(vec![
            MetricRow::new(1).with("a", 1.0),
            MetricRow::new(2).with("b", -1.0),
        ]);
        assert!(table.has_column("a"));
        assert!(table.has_column("b"));
        assert!(!table.has_column("c"));
        assert_eq!(table.columns().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_descriptor_json_names() {
        let descriptor: FeatureDescriptor = serde_json::from_str(
            r#"{"feature_id": "poverty_perc", "feature_name": "Poverty", "tooltip_desc": "% in poverty"}"#,
        )
        .unwrap();
        assert_eq!(descriptor.metric_id, "poverty_perc");
        assert_eq!(descriptor.tooltip_suffix, "% in poverty");

        let catalog = MetricCatalog::new(vec![descriptor.clone(), descriptor]);
        assert_eq!(catalog.len(), 1);
    }
}
