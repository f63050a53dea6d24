//! Metric table loading from CSV

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use dv_core::{CountyId, MetricRow, MetricTable};
use tracing::{debug, info, warn};

use crate::config::NullConfig;
use crate::DataError;

/// Load the metric table from a CSV file
pub fn load_metric_table(path: &Path, id_column: &str, nulls: &NullConfig) -> Result<MetricTable, DataError> {
    let file = File::open(path)?;
    let table = read_metric_table(BufReader::new(file), id_column, nulls)?;
    info!(
        "Loaded {} metric rows with {} numeric columns from {:?}",
        table.len(),
        table.columns().count(),
        path
    );
    Ok(table)
}

/// Read a metric table from any CSV reader.
///
/// Every non-id cell that parses as a number becomes a metric; null patterns
/// and non-numeric cells are left out of the row. A header is a metric column
/// unless it only ever holds text, so a column of nulls is still known.
pub fn read_metric_table<R: Read>(reader: R, id_column: &str, nulls: &NullConfig) -> Result<MetricTable, DataError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let id_idx = headers
        .iter()
        .position(|h| h == id_column)
        .ok_or_else(|| DataError::MissingColumn(id_column.to_string()))?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    // Per header: saw a number, saw a non-null cell that is not one
    let mut numeric = vec![false; headers.len()];
    let mut text = vec![false; headers.len()];

    for (line, result) in csv_reader.records().enumerate() {
        let record = result?;

        let Some(county_id) = record.get(id_idx).and_then(parse_county_id) else {
            skipped += 1;
            debug!("Skipping CSV row {}: unusable id {:?}", line + 2, record.get(id_idx));
            continue;
        };

        let mut row = MetricRow::new(county_id);
        for (idx, (name, cell)) in headers.iter().zip(record.iter()).enumerate() {
            if idx == id_idx || nulls.is_null(cell) {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(value) => {
                    numeric[idx] = true;
                    row.metrics.insert(name.to_string(), value);
                }
                Err(_) => text[idx] = true,
            }
        }
        rows.push(row);
    }

    if skipped > 0 {
        warn!("Skipped {} metric rows without a usable '{}'", skipped, id_column);
    }

    let columns = headers
        .iter()
        .enumerate()
        .filter(|&(idx, _)| idx != id_idx && (numeric[idx] || !text[idx]))
        .map(|(_, name)| name.to_string());

    Ok(MetricTable::with_columns(rows, columns))
}

/// FIPS codes may carry leading zeros or a trailing ".0"
pub(crate) fn parse_county_id(raw: &str) -> Option<CountyId> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<CountyId>() {
        return Some(id);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value >= 0.0 && value <= CountyId::MAX as f64 {
        Some(value as CountyId)
    } else {
        None
    }
}
