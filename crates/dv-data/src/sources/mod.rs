pub mod features;
pub mod geojson_source;
pub mod metric_csv;
pub mod topojson_source;
