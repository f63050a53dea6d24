//! End-to-end coordination across maps, histograms and the scatter plot

use std::sync::Arc;

use geo_types::{coord, polygon, MultiPolygon, Rect};

use dv_core::{
    Channel, Coordinator, CoordinatorPhase, CoreError, FeatureDescriptor, GeometryFeature,
    GeometryStore, LinkedView, MetricCatalog, MetricPair, MetricRow, MetricSlot, MetricTable,
    MetricValue, Selection, SelectionBroadcaster,
};
use dv_views::{
    HistogramConfig, HistogramView, MapView, MapViewConfig, ScatterConfig, ScatterView,
};

fn square(x: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x, y: 0.0),
        (x: x + 1.0, y: 0.0),
        (x: x + 1.0, y: 1.0),
        (x: x, y: 1.0),
        (x: x, y: 0.0),
    ]])
}

fn coordinator() -> Coordinator {
    let geometry = GeometryStore::new(vec![
        GeometryFeature::new(1001, "Hamilton", square(0.0)),
        GeometryFeature::new(1003, "Baldwin", square(1.0)),
        GeometryFeature::new(1005, "Barbour", square(2.0)),
    ]);
    let table = MetricTable::new(vec![
        MetricRow::new(1001)
            .with("poverty_perc", 18.2)
            .with("percent_high_cholesterol", -1.0)
            .with("median_household_income", 41000.0),
        MetricRow::new(1003)
            .with("poverty_perc", 11.0)
            .with("percent_high_cholesterol", 30.5)
            .with("median_household_income", 58000.0),
        MetricRow::new(1005)
            .with("poverty_perc", 14.9)
            .with("percent_high_cholesterol", 36.1)
            .with("median_household_income", 33000.0),
    ]);
    let catalog = MetricCatalog::new(vec![
        FeatureDescriptor::new("poverty_perc", "Poverty Percentage", "%"),
        FeatureDescriptor::new("percent_high_cholesterol", "High Cholesterol", "%"),
        FeatureDescriptor::new("median_household_income", "Median Household Income", " USD"),
    ]);

    Coordinator::new(
        Arc::new(geometry),
        Arc::new(table),
        Arc::new(catalog),
        Arc::new(SelectionBroadcaster::new()),
        MetricPair::new("poverty_perc", "percent_high_cholesterol"),
    )
    .unwrap()
}

struct Dashboard {
    coordinator: Coordinator,
    primary_map: Arc<MapView>,
    secondary_map: Arc<MapView>,
    primary_hist: Arc<HistogramView>,
    secondary_hist: Arc<HistogramView>,
    scatter: Arc<ScatterView>,
}

impl Dashboard {
    fn new() -> Self {
        let coordinator = coordinator();
        let primary_map = MapView::create("Primary map", MapViewConfig::default(), &coordinator).unwrap();
        let secondary_map = MapView::create(
            "Secondary map",
            MapViewConfig {
                metric: MetricSlot::Secondary,
                ..MapViewConfig::default()
            },
            &coordinator,
        )
        .unwrap();
        let primary_hist =
            HistogramView::create("Primary histogram", HistogramConfig::default(), &coordinator).unwrap();
        let secondary_hist = HistogramView::create(
            "Secondary histogram",
            HistogramConfig {
                metric: MetricSlot::Secondary,
                ..HistogramConfig::default()
            },
            &coordinator,
        )
        .unwrap();
        let scatter = ScatterView::create("Scatter", ScatterConfig::default(), &coordinator).unwrap();

        Self {
            coordinator,
            primary_map,
            secondary_map,
            primary_hist,
            secondary_hist,
            scatter,
        }
    }
}

#[test]
fn test_scatter_brush_reaches_maps_and_histograms() {
    let dash = Dashboard::new();
    assert_eq!(dash.coordinator.views().len(), 5);

    // Every plotted point: Baldwin and Barbour
    let report = dash.scatter.brush(0.0, 0.0, 445.0, 555.0).unwrap();
    assert!(report.is_clean());
    // Two maps and two histograms listen on the scatter channel
    assert_eq!(report.delivered, 4);

    let expected = Selection::from([1003, 1005]);
    assert_eq!(dash.scatter.highlighted(), expected);
    assert_eq!(dash.primary_map.highlighted(), expected);
    assert_eq!(dash.secondary_map.highlighted(), expected);
    assert_eq!(dash.primary_hist.highlighted(), expected);
    assert_eq!(dash.secondary_hist.highlighted(), expected);
}

#[test]
fn test_map_brush_reaches_the_other_map_and_scatter() {
    let dash = Dashboard::new();

    let report = dash
        .primary_map
        .brush(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 1.0 }))
        .unwrap();

    // Every FROM_MAP subscriber, the brushing map included; it skips its own echo
    assert_eq!(report.delivered, 5);
    assert!(report.is_clean());
    let expected = Selection::from([1001, 1003]);
    assert_eq!(dash.primary_map.highlighted(), expected);
    assert_eq!(dash.secondary_map.highlighted(), expected);
    assert_eq!(dash.scatter.highlighted(), expected);
    assert_eq!(dash.primary_hist.highlighted(), expected);

    // Hamilton has no cholesterol value, so it sits in the no-data bucket
    assert_eq!(dash.secondary_hist.no_data().highlighted, 1);
}

#[test]
fn test_published_ids_reach_every_listener() {
    let dash = Dashboard::new();

    dash.coordinator
        .broadcaster()
        .publish(&Channel::FROM_MAP, Selection::from([1001, 1003]));

    let expected = Selection::from([1001, 1003]);
    assert_eq!(dash.scatter.highlighted(), expected);
    assert_eq!(dash.primary_hist.highlighted(), expected);
    assert_eq!(dash.primary_map.highlighted(), expected);
    assert_eq!(dash.secondary_map.highlighted(), expected);
}

#[test]
fn test_empty_selection_clears_everywhere() {
    let dash = Dashboard::new();
    dash.scatter.brush(0.0, 0.0, 445.0, 555.0).unwrap();

    dash.scatter.clear_brush().unwrap();

    for view in dash.coordinator.views() {
        assert!(view.highlighted().is_empty(), "{} still highlighted", view.title());
    }
    let active = dash.coordinator.broadcaster().active_selection().unwrap();
    assert!(active.selection.is_empty());
}

#[test]
fn test_pair_change_keeps_selection() {
    let dash = Dashboard::new();
    dash.coordinator
        .broadcaster()
        .publish(&Channel::FROM_MAP, Selection::from([1001]));

    let report = dash.coordinator.select_secondary("median_household_income").unwrap();
    assert!(report.is_clean());
    assert_eq!(report.refreshed, 5);
    assert_eq!(dash.coordinator.phase(), CoordinatorPhase::Idle);

    // Hamilton now has both values and is plotted, still highlighted
    let hamilton = dash
        .scatter
        .points()
        .into_iter()
        .find(|p| p.county_id == 1001)
        .unwrap();
    assert!(hamilton.highlighted);
    assert_eq!(hamilton.x, 41000.0);
    assert_eq!(
        dash.scatter.axis_titles(),
        Some(("Median Household Income".to_string(), "Poverty Percentage".to_string()))
    );

    let active = dash.coordinator.broadcaster().active_selection().unwrap();
    assert_eq!(active.selection, Selection::from([1001]));
}

#[test]
fn test_unknown_metric_leaves_views_untouched() {
    let dash = Dashboard::new();
    let before = dash.coordinator.records();

    let err = dash.coordinator.select_primary("not_a_metric").unwrap_err();
    assert_eq!(err, CoreError::UnknownMetric("not_a_metric".to_string()));
    assert!(Arc::ptr_eq(&before, &dash.coordinator.records()));
    assert_eq!(dash.primary_map.legend().unwrap().title, "Poverty Percentage");
}

#[test]
fn test_sentinel_counties_stay_in_every_view() {
    let dash = Dashboard::new();

    let hamilton = dash.coordinator.records().get(1001).unwrap().secondary;
    assert_eq!(hamilton, MetricValue::NoData);

    assert_eq!(dash.secondary_map.regions().len(), 3);
    assert_eq!(dash.secondary_hist.no_data().count, 1);
    assert_eq!(dash.scatter.no_data().len(), 1);
    assert_eq!(
        dash.secondary_map.tooltip(1001).as_deref(),
        Some("Hamilton: No data available")
    );
}

#[test]
fn test_dropped_views_are_pruned() {
    let Dashboard {
        coordinator,
        primary_hist,
        scatter,
        ..
    } = Dashboard::new();
    let channel = Channel::FROM_SCATTER;
    let before = coordinator.broadcaster().subscriber_count(&channel);
    let weak = Arc::downgrade(&primary_hist);

    assert!(primary_hist.detach(&coordinator));
    drop(primary_hist);

    assert!(weak.upgrade().is_none());
    assert_eq!(coordinator.broadcaster().subscriber_count(&channel), before - 1);
    assert_eq!(coordinator.views().len(), 4);

    let report = coordinator.select_primary("median_household_income").unwrap();
    assert_eq!(report.refreshed, 4);
    assert_eq!(scatter.brush(0.0, 0.0, 445.0, 555.0).unwrap().delivered, 3);
}
