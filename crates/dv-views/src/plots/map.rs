//! Choropleth map view

use std::sync::Arc;

use ahash::AHashMap;
use geo::Centroid;
use geo_types::{Point, Rect};
use parking_lot::RwLock;
use uuid::Uuid;

use dv_core::{
    Channel, Coordinator, CoreError, CountyId, DeliveryReport, HighlightState, LinkedView,
    MetricSlot, RefreshContext, Selection, SelectionBroadcaster, ViewId,
};

use super::utils::{extent, LinearScale};
use crate::links::{self, attach, Linked, ViewLinks};

/// Configuration for map view
#[derive(Debug, Clone)]
pub struct MapViewConfig {
    /// Which active metric colours the counties
    pub metric: MetricSlot,

    /// Channels whose selections highlight counties here
    pub listens_to: Vec<Channel>,

    /// Channel brushing publishes on
    pub publishes_on: Channel,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            metric: MetricSlot::Primary,
            listens_to: vec![Channel::FROM_MAP, Channel::FROM_SCATTER],
            publishes_on: Channel::FROM_MAP,
        }
    }
}

/// How a county is filled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    /// Position on the colour ramp, in `[0, 1]`
    Scaled(f64),
    /// Hatched "no data" pattern
    NoData,
}

/// Render state of one county
#[derive(Debug, Clone, PartialEq)]
pub struct RegionState {
    pub county_id: CountyId,
    pub name: String,
    pub fill: Fill,
    pub highlighted: bool,
}

/// Legend endpoints, rounded to one decimal
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Default)]
struct MapState {
    ctx: Option<RefreshContext>,
    color_scale: Option<LinearScale>,
    centroids: AHashMap<CountyId, Point<f64>>,
    highlight: HighlightState,
}

/// Map view
pub struct MapView {
    id: ViewId,
    title: String,
    pub config: MapViewConfig,
    links: ViewLinks,
    state: RwLock<MapState>,
}

impl MapView {
    /// Build the view, subscribe it and register it with the coordinator
    pub fn create(
        title: impl Into<String>,
        config: MapViewConfig,
        coordinator: &Coordinator,
    ) -> Result<Arc<Self>, CoreError> {
        let view = Self::new(title, config, Arc::clone(coordinator.broadcaster()));
        attach(Arc::new(view), coordinator)
    }

    fn new(title: impl Into<String>, config: MapViewConfig, broadcaster: Arc<SelectionBroadcaster>) -> Self {
        let links = ViewLinks::new(
            broadcaster,
            config.listens_to.clone(),
            Some(config.publishes_on.clone()),
        );
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            config,
            links,
            state: RwLock::new(MapState::default()),
        }
    }

    /// Per-county fill and highlight, in record order
    pub fn regions(&self) -> Vec<RegionState> {
        let state = self.state.read();
        let Some(ctx) = &state.ctx else {
            return Vec::new();
        };

        ctx.records
            .iter()
            .map(|record| {
                let fill = match (self.config.metric.value_of(record).value(), state.color_scale) {
                    (Some(v), Some(scale)) => Fill::Scaled(scale.scale(v).clamp(0.0, 1.0)),
                    _ => Fill::NoData,
                };
                RegionState {
                    county_id: record.county_id,
                    name: record.name.clone(),
                    fill,
                    highlighted: state.highlight.is_highlighted(record.county_id),
                }
            })
            .collect()
    }

    pub fn legend(&self) -> Option<Legend> {
        let state = self.state.read();
        let ctx = state.ctx.as_ref()?;
        let scale = state.color_scale?;
        let round = |v: f64| (v * 10.0).round() / 10.0;

        Some(Legend {
            title: self.config.metric.descriptor(ctx).display_name.clone(),
            min: round(scale.domain.0),
            max: round(scale.domain.1),
        })
    }

    pub fn tooltip(&self, county_id: CountyId) -> Option<String> {
        let state = self.state.read();
        let ctx = state.ctx.as_ref()?;
        let record = ctx.records.get(county_id)?;

        Some(match self.config.metric.value_of(record).value() {
            Some(v) => format!("{}: {}{}", record.name, v, self.config.metric.descriptor(ctx).tooltip_suffix),
            None => format!("{}: No data available", record.name),
        })
    }

    /// Select counties whose centroid lies inside `bounds` (lon/lat,
    /// inclusive), highlight them here and publish them.
    pub fn brush(&self, bounds: Rect<f64>) -> anyhow::Result<DeliveryReport> {
        let selection: Selection = {
            let state = self.state.read();
            if state.ctx.is_none() {
                anyhow::bail!("map '{}' has not been refreshed yet", self.title);
            }
            let (min, max) = (bounds.min(), bounds.max());
            state
                .centroids
                .iter()
                .filter(|(_, c)| c.x() >= min.x && c.x() <= max.x && c.y() >= min.y && c.y() <= max.y)
                .map(|(&id, _)| id)
                .collect()
        };

        tracing::debug!("{} brushed {} counties", self.title, selection.len());
        self.on_external_selection(&selection)?;
        self.links.publish(selection)
    }

    /// Clear this view's brush and tell every other view
    pub fn clear_brush(&self) -> anyhow::Result<DeliveryReport> {
        self.on_external_selection(&Selection::empty())?;
        self.links.publish(Selection::empty())
    }

    /// Unsubscribe and stop being refreshed by `coordinator`
    pub fn detach(&self, coordinator: &Coordinator) -> bool {
        links::detach(self, coordinator)
    }
}

impl LinkedView for MapView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "MapView"
    }

    fn listens_to(&self) -> &[Channel] {
        self.links.listens_to()
    }

    fn refresh(&self, ctx: &RefreshContext) -> anyhow::Result<()> {
        let slot = self.config.metric;
        let color_scale = extent(ctx.records.iter().map(|r| slot.value_of(r)))
            .map(|domain| LinearScale::new(domain, (0.0, 1.0)));

        let mut centroids = AHashMap::with_capacity(ctx.records.len());
        for record in ctx.records.iter() {
            if let Some(centroid) = record.boundary.centroid() {
                centroids.insert(record.county_id, centroid);
            }
        }

        let mut state = self.state.write();
        state.color_scale = color_scale;
        state.centroids = centroids;
        state.highlight.revalidate(Some(ctx.records.as_ref()));
        state.ctx = Some(ctx.clone());
        Ok(())
    }

    fn on_external_selection(&self, selection: &Selection) -> anyhow::Result<()> {
        let mut state = self.state.write();
        let MapState { ctx, highlight, .. } = &mut *state;
        highlight.apply(selection, ctx.as_ref().map(|c| c.records.as_ref()));
        Ok(())
    }

    fn highlighted(&self) -> Selection {
        self.state.read().highlight.effective().clone()
    }

    fn is_publishing(&self) -> bool {
        self.links.is_publishing()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Linked for MapView {
    fn links(&self) -> &ViewLinks {
        &self.links
    }
}
