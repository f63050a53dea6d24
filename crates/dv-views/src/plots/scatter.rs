//! Scatter plot implementation

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use dv_core::{
    Channel, Coordinator, CoreError, CountyId, DeliveryReport, HighlightState, LinkedView,
    RefreshContext, Selection, SelectionBroadcaster, ViewId,
};

use super::utils::{extent, LinearScale};
use crate::links::{self, attach, Linked, ViewLinks};

/// Configuration for scatter plot view
#[derive(Debug, Clone)]
pub struct ScatterConfig {
    /// Plot area width in pixels
    pub width: f64,

    /// Plot area height in pixels
    pub height: f64,

    pub listens_to: Vec<Channel>,

    pub publishes_on: Channel,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            width: 445.0,
            height: 555.0,
            listens_to: vec![Channel::FROM_MAP],
            publishes_on: Channel::FROM_SCATTER,
        }
    }
}

/// A plotted county. `x`/`y` are metric values, `px`/`py` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PointState {
    pub county_id: CountyId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub px: f64,
    pub py: f64,
    pub highlighted: bool,
}

/// A county missing one or both metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnplottedState {
    pub county_id: CountyId,
    pub name: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone)]
struct PlotPoint {
    county_id: CountyId,
    name: String,
    x: f64,
    y: f64,
    px: f64,
    py: f64,
}

#[derive(Default)]
struct ScatterState {
    ctx: Option<RefreshContext>,
    points: Vec<PlotPoint>,
    unplotted: Vec<(CountyId, String)>,
    x_scale: Option<LinearScale>,
    y_scale: Option<LinearScale>,
    highlight: HighlightState,
}

/// Scatter plot view: secondary metric on x, primary on y
pub struct ScatterView {
    id: ViewId,
    title: String,
    pub config: ScatterConfig,
    links: ViewLinks,
    state: RwLock<ScatterState>,
}

impl ScatterView {
    pub fn create(
        title: impl Into<String>,
        config: ScatterConfig,
        coordinator: &Coordinator,
    ) -> Result<Arc<Self>, CoreError> {
        let view = Self::new(title, config, Arc::clone(coordinator.broadcaster()));
        attach(Arc::new(view), coordinator)
    }

    fn new(title: impl Into<String>, config: ScatterConfig, broadcaster: Arc<SelectionBroadcaster>) -> Self {
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
            state: RwLock::new(ScatterState::default()),
        }
    }

    pub fn points(&self) -> Vec<PointState> {
        let state = self.state.read();
        state
            .points
            .iter()
            .map(|p| PointState {
                county_id: p.county_id,
                name: p.name.clone(),
                x: p.x,
                y: p.y,
                px: p.px,
                py: p.py,
                highlighted: state.highlight.is_highlighted(p.county_id),
            })
            .collect()
    }

    pub fn no_data(&self) -> Vec<UnplottedState> {
        let state = self.state.read();
        state
            .unplotted
            .iter()
            .map(|(id, name)| UnplottedState {
                county_id: *id,
                name: name.clone(),
                highlighted: state.highlight.is_highlighted(*id),
            })
            .collect()
    }

    /// `(x title, y title)`
    pub fn axis_titles(&self) -> Option<(String, String)> {
        let state = self.state.read();
        let ctx = state.ctx.as_ref()?;
        Some((ctx.secondary.display_name.clone(), ctx.primary.display_name.clone()))
    }

    pub fn scales(&self) -> (Option<LinearScale>, Option<LinearScale>) {
        let state = self.state.read();
        (state.x_scale, state.y_scale)
    }

    /// Select the plotted points inside a pixel rectangle (corners in any
    /// order, edges inclusive), highlight them here and publish them.
    pub fn brush(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> anyhow::Result<DeliveryReport> {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));

        let selection: Selection = {
            let state = self.state.read();
            if state.ctx.is_none() {
                anyhow::bail!("scatter '{}' has not been refreshed yet", self.title);
            }
            state
                .points
                .iter()
                .filter(|p| p.px >= left && p.px <= right && p.py >= top && p.py <= bottom)
                .map(|p| p.county_id)
                .collect()
        };

        tracing::debug!("{} brushed {} points", self.title, selection.len());
        self.on_external_selection(&selection)?;
        self.links.publish(selection)
    }

    pub fn clear_brush(&self) -> anyhow::Result<DeliveryReport> {
        self.on_external_selection(&Selection::empty())?;
        self.links.publish(Selection::empty())
    }

    /// Unsubscribe and stop being refreshed by `coordinator`
    pub fn detach(&self, coordinator: &Coordinator) -> bool {
        links::detach(self, coordinator)
    }
}

impl LinkedView for ScatterView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "ScatterView"
    }

    fn listens_to(&self) -> &[Channel] {
        self.links.listens_to()
    }

    fn refresh(&self, ctx: &RefreshContext) -> anyhow::Result<()> {
        let records = &ctx.records;
        let x_scale = extent(records.iter().map(|r| r.secondary))
            .map(|domain| LinearScale::new(domain, (0.0, self.config.width)));
        let y_scale = extent(records.iter().map(|r| r.primary))
            .map(|domain| LinearScale::new(domain, (self.config.height, 0.0)));

        let mut points = Vec::with_capacity(records.len());
        let mut unplotted = Vec::new();

        for record in records.iter() {
            match (record.secondary.value(), record.primary.value(), x_scale, y_scale) {
                (Some(x), Some(y), Some(xs), Some(ys)) => points.push(PlotPoint {
                    county_id: record.county_id,
                    name: record.name.clone(),
                    x,
                    y,
                    px: xs.scale(x),
                    py: ys.scale(y),
                }),
                _ => unplotted.push((record.county_id, record.name.clone())),
            }
        }

        tracing::debug!(
            "{}: {} points plotted, {} without data",
            self.title,
            points.len(),
            unplotted.len()
        );

        let mut state = self.state.write();
        state.points = points;
        state.unplotted = unplotted;
        state.x_scale = x_scale;
        state.y_scale = y_scale;
        state.highlight.revalidate(Some(records.as_ref()));
        state.ctx = Some(ctx.clone());
        Ok(())
    }

    fn on_external_selection(&self, selection: &Selection) -> anyhow::Result<()> {
        let mut state = self.state.write();
        let ScatterState { ctx, highlight, .. } = &mut *state;
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

impl Linked for ScatterView {
    fn links(&self) -> &ViewLinks {
        &self.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{coordinator, with_full_row};

    #[test]
    fn test_points_need_both_values() {
        let coordinator = coordinator();
        let scatter = ScatterView::create("Scatter", ScatterConfig::default(), &coordinator).unwrap();

        // Hamilton lacks cholesterol, Barbour lacks poverty
        let points = scatter.points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].county_id, 1003);
        assert_eq!((points[0].x, points[0].y), (30.5, 11.0));

        let missing: Vec<CountyId> = scatter.no_data().iter().map(|u| u.county_id).collect();
        assert_eq!(missing, vec![1001, 1005]);

        assert_eq!(
            scatter.axis_titles(),
            Some(("High Cholesterol".to_string(), "Poverty Percentage".to_string()))
        );
    }

    #[test]
    fn test_pixel_scales() {
        let coordinator = with_full_row();
        let scatter = ScatterView::create("Scatter", ScatterConfig::default(), &coordinator).unwrap();

        let (x_scale, y_scale) = scatter.scales();
        assert_eq!(x_scale.unwrap().range, (0.0, 445.0));
        assert_eq!(y_scale.unwrap().range, (555.0, 0.0));

        // Smallest x sits on the left edge, largest y on the top edge
        let points = scatter.points();
        let left = points.iter().find(|p| p.px == 0.0).unwrap();
        let top = points.iter().find(|p| p.py == 0.0).unwrap();
        assert_eq!(left.county_id, 1003);
        assert_eq!(top.county_id, 1007);
    }

    #[test]
    fn test_brush_normalizes_corners_and_publishes() {
        let coordinator = with_full_row();
        let scatter = ScatterView::create("Scatter", ScatterConfig::default(), &coordinator).unwrap();

        let report = scatter.brush(445.0, 555.0, 0.0, 0.0).unwrap();
        assert_eq!(report.channel, Channel::FROM_SCATTER);
        assert_eq!(scatter.highlighted(), Selection::from([1003, 1007]));

        let active = coordinator.broadcaster().active_selection().unwrap();
        assert_eq!(active.channel, Channel::FROM_SCATTER);

        scatter.clear_brush().unwrap();
        assert!(scatter.highlighted().is_empty());
        assert!(coordinator.broadcaster().active_selection().unwrap().selection.is_empty());
    }

    #[test]
    fn test_unplotted_counties_still_highlight() {
        let coordinator = coordinator();
        let scatter = ScatterView::create("Scatter", ScatterConfig::default(), &coordinator).unwrap();

        coordinator.broadcaster().publish(&Channel::FROM_MAP, Selection::from([1001]));

        assert!(scatter.no_data().iter().any(|u| u.county_id == 1001 && u.highlighted));
        assert!(scatter.points().iter().all(|p| !p.highlighted));
    }
}
