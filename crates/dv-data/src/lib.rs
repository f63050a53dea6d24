//! Dataset loading for the linked county health views

pub mod config;
pub mod sources;

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use dv_core::{GeometryStore, MetricCatalog, MetricTable};

// Re-exports
pub use config::{DatasetConfig, GeometryFormat, NullConfig};
pub use sources::features::{load_feature_descriptors, read_feature_descriptors};
pub use sources::geojson_source::{read_geojson, FeatureKeys};
pub use sources::metric_csv::{load_metric_table, read_metric_table};
pub use sources::topojson_source::read_topojson;

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("TopoJSON error: {0}")]
    Topology(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<geojson::Error> for DataError {
    fn from(error: geojson::Error) -> Self {
        DataError::GeoJson(error.to_string())
    }
}

/// The three fully loaded startup inputs
#[derive(Debug, Clone)]
pub struct Dataset {
    pub geometry: GeometryStore,
    pub table: MetricTable,
    pub catalog: MetricCatalog,
}

/// Load geometry, metrics and descriptors. Nothing is returned until all
/// three are complete.
pub fn load_dataset(config: &DatasetConfig) -> Result<Dataset, DataError> {
    let geometry = load_geometry(config)?;
    let table = load_metric_table(&config.metrics_path, &config.id_column, &config.null_config)?;
    let catalog = load_feature_descriptors(&config.features_path)?;

    info!(
        "Dataset loaded: {} counties, {} metric rows, {} feature descriptors",
        geometry.len(),
        table.len(),
        catalog.len()
    );

    Ok(Dataset { geometry, table, catalog })
}

/// Load county geometry in whichever format the configuration names
pub fn load_geometry(config: &DatasetConfig) -> Result<GeometryStore, DataError> {
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config.geometry_path)?)?;
    let keys = config.feature_keys();

    let format = match config.format_from_extension() {
        GeometryFormat::Auto => sniff_format(&value),
        format => format,
    };

    let store = match format {
        GeometryFormat::TopoJson => read_topojson(value, &config.topology_object, &keys)?,
        _ => read_geojson(value, &keys)?,
    };

    info!("Loaded {} county geometries from {}", store.len(), file_label(&config.geometry_path));
    Ok(store)
}

fn sniff_format(value: &serde_json::Value) -> GeometryFormat {
    match value.get("type").and_then(|t| t.as_str()) {
        Some("Topology") => GeometryFormat::TopoJson,
        _ => GeometryFormat::GeoJson,
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("geometry")
        .to_string()
}
