//! Feature descriptor list (display names and tooltip suffixes)

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use dv_core::{FeatureDescriptor, MetricCatalog};

use crate::DataError;

pub fn load_feature_descriptors(path: &Path) -> Result<MetricCatalog, DataError> {
    let file = File::open(path)?;
    read_feature_descriptors(BufReader::new(file))
}

/// Read a JSON array of `{feature_id, feature_name, tooltip_desc}` objects
pub fn read_feature_descriptors<R: Read>(reader: R) -> Result<MetricCatalog, DataError> {
    let descriptors: Vec<FeatureDescriptor> = serde_json::from_reader(reader)?;
    Ok(MetricCatalog::new(descriptors))
}
