//! Keyed join of geometry and metric columns into the enriched record set

use std::sync::Arc;

use ahash::AHashMap;
use geo_types::MultiPolygon;

use crate::error::CoreError;
use crate::model::{CountyId, GeometryStore, MetricPair, MetricRow, MetricTable, MetricValue};

/// One county's geometry plus its two active metric values
#[derive(Debug, Clone)]
pub struct EnrichedRecord {
    pub county_id: CountyId,
    pub name: String,
    pub boundary: Arc<MultiPolygon<f64>>,
    /// Metric A
    pub primary: MetricValue,
    /// Metric B
    pub secondary: MetricValue,
}

/// Join output, in geometry order. Rebuilt wholesale, never mutated.
#[derive(Debug, Clone)]
pub struct EnrichedRecordSet {
    pair: MetricPair,
    records: Vec<EnrichedRecord>,
    index: AHashMap<CountyId, usize>,
}

impl EnrichedRecordSet {
    pub fn pair(&self) -> &MetricPair {
        &self.pair
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnrichedRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, county_id: CountyId) -> Option<&EnrichedRecord> {
        self.index.get(&county_id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, county_id: CountyId) -> bool {
        self.index.contains_key(&county_id)
    }

    pub fn county_ids(&self) -> impl Iterator<Item = CountyId> + '_ {
        self.records.iter().map(|r| r.county_id)
    }
}

impl<'a> IntoIterator for &'a EnrichedRecordSet {
    type Item = &'a EnrichedRecord;
    type IntoIter = std::slice::Iter<'a, EnrichedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Merge geometry with two metric columns.
///
/// Every geometry feature yields exactly one record, in geometry order. A
/// county missing from the table, or whose metric is the sentinel, gets
/// `MetricValue::NoData`. The function is pure: identical inputs give
/// identical output.
pub fn join(
    geometry: &GeometryStore,
    table: &MetricTable,
    primary: &str,
    secondary: &str,
) -> Result<EnrichedRecordSet, CoreError> {
    if geometry.is_empty() {
        return Err(CoreError::EmptyGeometry);
    }
    for metric in [primary, secondary] {
        if !table.has_column(metric) {
            return Err(CoreError::UnknownMetric(metric.to_string()));
        }
    }

    let mut lookup: AHashMap<CountyId, &MetricRow> = AHashMap::with_capacity(table.len());
    let mut duplicate_rows = 0usize;
    for row in table.rows() {
        if lookup.contains_key(&row.county_id) {
            duplicate_rows += 1;
        } else {
            lookup.insert(row.county_id, row);
        }
    }
    if duplicate_rows > 0 {
        tracing::warn!("Metric table has {} duplicate county rows, first row wins", duplicate_rows);
    }

    let mut records = Vec::with_capacity(geometry.len());
    let mut index = AHashMap::with_capacity(geometry.len());
    let mut unmatched = 0usize;

    for feature in geometry.features() {
        let row = lookup.get(&feature.county_id);
        if row.is_none() {
            unmatched += 1;
        }
        let value_of = |metric: &str| row.map_or(MetricValue::NoData, |r| r.value(metric));

        index.entry(feature.county_id).or_insert(records.len());
        records.push(EnrichedRecord {
            county_id: feature.county_id,
            name: feature.name.clone(),
            boundary: Arc::clone(&feature.boundary),
            primary: value_of(primary),
            secondary: value_of(secondary),
        });
    }

    let orphan_rows = lookup.keys().filter(|id| !geometry.contains(**id)).count();
    tracing::debug!(
        "Joined {} counties on ({}, {}): {} without metrics, {} table rows without geometry",
        records.len(),
        primary,
        secondary,
        unmatched,
        orphan_rows
    );

    Ok(EnrichedRecordSet {
        pair: MetricPair::new(primary, secondary),
        records,
        index,
    })
}
