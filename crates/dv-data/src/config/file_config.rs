//! Dataset configuration for startup loading

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dv_core::MetricPair;

use super::null_handling::NullConfig;
use crate::sources::geojson_source::FeatureKeys;
use crate::DataError;

/// Geometry file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFormat {
    GeoJson,
    TopoJson,
    /// Decide from the extension, then from the document's top-level `type`
    Auto,
}

/// Configuration for the three startup inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// County boundaries
    pub geometry_path: PathBuf,

    pub geometry_format: GeometryFormat,

    /// TopoJSON object holding the counties
    pub topology_object: String,

    /// Feature property holding the county id; the feature `id` when unset
    pub id_property: Option<String>,

    pub name_property: String,

    /// Tabular metrics, one row per county
    pub metrics_path: PathBuf,

    /// CSV column joining metrics to geometry
    pub id_column: String,

    /// Feature descriptor list
    pub features_path: PathBuf,

    pub null_config: NullConfig,

    pub primary_metric: String,

    pub secondary_metric: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            geometry_path: PathBuf::from("data/counties.json"),
            geometry_format: GeometryFormat::Auto,
            topology_object: "counties".to_string(),
            id_property: None,
            name_property: "name".to_string(),
            metrics_path: PathBuf::from("data/national_health_data.csv"),
            id_column: "cnty_fips".to_string(),
            features_path: PathBuf::from("data/feature.json"),
            null_config: NullConfig::default(),
            primary_metric: "poverty_perc".to_string(),
            secondary_metric: "percent_high_cholesterol".to_string(),
        }
    }
}

impl DatasetConfig {
    /// Load a JSON configuration file. Relative dataset paths are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path)?;
        let mut config: DatasetConfig = serde_json::from_str(&text)
            .map_err(|e| DataError::Config(format!("{}: {}", path.display(), e)))?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Prefix every relative path with `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.geometry_path, &mut self.metrics_path, &mut self.features_path] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn initial_pair(&self) -> MetricPair {
        MetricPair::new(self.primary_metric.clone(), self.secondary_metric.clone())
    }

    pub fn feature_keys(&self) -> FeatureKeys {
        FeatureKeys {
            id_property: self.id_property.clone(),
            name_property: self.name_property.clone(),
        }
    }

    /// Format implied by the geometry path's extension, if any
    pub fn format_from_extension(&self) -> GeometryFormat {
        if self.geometry_format != GeometryFormat::Auto {
            return self.geometry_format;
        }
        match self.geometry_path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("topojson") => GeometryFormat::TopoJson,
            Some(ext) if ext.eq_ignore_ascii_case("geojson") => GeometryFormat::GeoJson,
            _ => GeometryFormat::Auto,
        }
    }
}
