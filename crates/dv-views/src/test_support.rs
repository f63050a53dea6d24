//! Fixtures shared by the view tests

use std::sync::Arc;

use geo_types::{polygon, MultiPolygon};

use dv_core::{
    Coordinator, FeatureDescriptor, GeometryFeature, GeometryStore, MetricCatalog, MetricPair,
    MetricRow, MetricTable, SelectionBroadcaster,
};

/// Unit square with its lower-left corner at `(x, 0)`
pub fn square(x: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x, y: 0.0),
        (x: x + 1.0, y: 0.0),
        (x: x + 1.0, y: 1.0),
        (x: x, y: 1.0),
        (x: x, y: 0.0),
    ]])
}

fn catalog() -> MetricCatalog {
    MetricCatalog::new(vec![
        FeatureDescriptor::new("poverty_perc", "Poverty Percentage", "% in poverty"),
        FeatureDescriptor::new("percent_high_cholesterol", "High Cholesterol", "% with high cholesterol"),
        FeatureDescriptor::new("median_household_income", "Median Household Income", " USD"),
    ])
}

fn build(features: Vec<GeometryFeature>, rows: Vec<MetricRow>) -> Coordinator {
    Coordinator::new(
        Arc::new(GeometryStore::new(features)),
        Arc::new(MetricTable::new(rows)),
        Arc::new(catalog()),
        Arc::new(SelectionBroadcaster::new()),
        MetricPair::new("poverty_perc", "percent_high_cholesterol"),
    )
    .unwrap()
}

/// Hamilton lacks cholesterol, Barbour lacks poverty
pub fn coordinator() -> Coordinator {
    build(
        vec![
            GeometryFeature::new(1001, "Hamilton", square(0.0)),
            GeometryFeature::new(1003, "Baldwin", square(1.0)),
            GeometryFeature::new(1005, "Barbour", square(2.0)),
        ],
        vec![
            MetricRow::new(1001)
                .with("poverty_perc", 18.2)
                .with("percent_high_cholesterol", -1.0)
                .with("median_household_income", 41000.0),
            MetricRow::new(1003)
                .with("poverty_perc", 11.0)
                .with("percent_high_cholesterol", 30.5)
                .with("median_household_income", 58000.0),
            MetricRow::new(1005)
                .with("poverty_perc", -1.0)
                .with("percent_high_cholesterol", 36.1)
                .with("median_household_income", 33000.0),
        ],
    )
}

/// The three counties above plus Bibb, which has every metric
pub fn with_full_row() -> Coordinator {
    build(
        vec![
            GeometryFeature::new(1001, "Hamilton", square(0.0)),
            GeometryFeature::new(1003, "Baldwin", square(1.0)),
            GeometryFeature::new(1005, "Barbour", square(2.0)),
            GeometryFeature::new(1007, "Bibb", square(3.0)),
        ],
        vec![
            MetricRow::new(1001).with("poverty_perc", 18.2).with("percent_high_cholesterol", -1.0),
            MetricRow::new(1003).with("poverty_perc", 11.0).with("percent_high_cholesterol", 30.5),
            MetricRow::new(1005).with("poverty_perc", -1.0).with("percent_high_cholesterol", 36.1),
            MetricRow::new(1007).with("poverty_perc", 25.0).with("percent_high_cholesterol", 40.0),
        ],
    )
}
