//! Data model shared by the joiner, the coordinator and every view

mod geometry;
mod metric;

pub use geometry::{GeometryFeature, GeometryStore};
pub use metric::{FeatureDescriptor, MetricCatalog, MetricPair, MetricRow, MetricTable, MetricValue};

/// Stable key joining geometry to metrics (a FIPS code)
pub type CountyId = u32;

/// Reserved raw value meaning "metric not available" for a county
pub const SENTINEL: f64 = -1.0;
