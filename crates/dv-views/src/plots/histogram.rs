//! Histogram implementation

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use dv_core::{
    Channel, Coordinator, CoreError, CountyId, HighlightState, LinkedView, MetricSlot,
    RefreshContext, Selection, SelectionBroadcaster, ViewId,
};

use super::utils::extent;
use crate::links::{self, attach, Linked, ViewLinks};

/// Configuration for histogram view
#[derive(Debug, Clone)]
pub struct HistogramConfig {
    /// Metric to bin
    pub metric: MetricSlot,

    /// Number of bins
    pub bin_count: usize,

    /// Channels whose selections highlight bins
    pub listens_to: Vec<Channel>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            metric: MetricSlot::Primary,
            bin_count: 70,
            listens_to: vec![Channel::FROM_MAP, Channel::FROM_SCATTER],
        }
    }
}

/// One bin as rendered
#[derive(Debug, Clone, PartialEq)]
pub struct BinState {
    pub start: f64,
    pub end: f64,
    pub count: usize,
    /// Selected counties falling in this bin
    pub highlighted: usize,
}

/// Counties without a value for the binned metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDataBucket {
    pub count: usize,
    pub highlighted: usize,
}

#[derive(Debug, Clone)]
struct Bin {
    start: f64,
    end: f64,
    members: Vec<CountyId>,
}

#[derive(Default)]
struct HistogramState {
    ctx: Option<RefreshContext>,
    bins: Vec<Bin>,
    no_data: Vec<CountyId>,
    highlight: HistogramHighlight,
}

/// Highlight counts derived from the effective selection
#[derive(Default)]
struct HistogramHighlight {
    state: HighlightState,
    per_bin: Vec<usize>,
    no_data: usize,
}

impl HistogramHighlight {
    fn recount(&mut self, bins: &[Bin], no_data: &[CountyId]) {
        let effective = self.state.effective();
        let count = |ids: &[CountyId]| ids.iter().filter(|&&id| effective.contains(id)).count();
        self.per_bin = bins.iter().map(|b| count(&b.members)).collect();
        self.no_data = count(no_data);
    }
}

/// Histogram view
pub struct HistogramView {
    id: ViewId,
    title: String,
    pub config: HistogramConfig,
    links: ViewLinks,
    state: RwLock<HistogramState>,
}

impl HistogramView {
    pub fn create(
        title: impl Into<String>,
        config: HistogramConfig,
        coordinator: &Coordinator,
    ) -> Result<Arc<Self>, CoreError> {
        let view = Self::new(title, config, Arc::clone(coordinator.broadcaster()));
        attach(Arc::new(view), coordinator)
    }

    fn new(title: impl Into<String>, config: HistogramConfig, broadcaster: Arc<SelectionBroadcaster>) -> Self {
        // Histograms only listen; brushing lives on the map and scatter
        let links = ViewLinks::new(broadcaster, config.listens_to.clone(), None);
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            config,
            links,
            state: RwLock::new(HistogramState::default()),
        }
    }

    pub fn bins(&self) -> Vec<BinState> {
        let state = self.state.read();
        state
            .bins
            .iter()
            .enumerate()
            .map(|(i, bin)| BinState {
                start: bin.start,
                end: bin.end,
                count: bin.members.len(),
                highlighted: state.highlight.per_bin.get(i).copied().unwrap_or(0),
            })
            .collect()
    }

    pub fn no_data(&self) -> NoDataBucket {
        let state = self.state.read();
        NoDataBucket {
            count: state.no_data.len(),
            highlighted: state.highlight.no_data,
        }
    }

    /// `[0, max bin count]`
    pub fn y_domain(&self) -> (f64, f64) {
        let state = self.state.read();
        let max = state.bins.iter().map(|b| b.members.len()).max().unwrap_or(0);
        (0.0, max as f64)
    }

    pub fn axis_title(&self) -> Option<String> {
        let state = self.state.read();
        let ctx = state.ctx.as_ref()?;
        Some(self.config.metric.descriptor(ctx).display_name.clone())
    }

    /// Unsubscribe and stop being refreshed by `coordinator`
    pub fn detach(&self, coordinator: &Coordinator) -> bool {
        links::detach(self, coordinator)
    }
}

/// Equal-width bins over `[min(0, lo), hi]`. The last bin is closed on the
/// right; a zero-width domain gets a single bin.
///
/// Thresholds are exact fractions of the domain, not rounded "nice" tick
/// values, so `bin_count` is always the number of bins produced and edges
/// need not land on round numbers.
fn compute_bins(values: &[(CountyId, f64)], domain: (f64, f64), bin_count: usize) -> Vec<Bin> {
    let (d0, d1) = domain;
    let n = if d1 > d0 { bin_count.max(1) } else { 1 };
    let width = (d1 - d0) / n as f64;

    let mut bins: Vec<Bin> = (0..n)
        .map(|i| Bin {
            start: d0 + i as f64 * width,
            end: if i + 1 == n { d1 } else { d0 + (i + 1) as f64 * width },
            members: Vec::new(),
        })
        .collect();

    for &(id, value) in values {
        let index = if width > 0.0 {
            (((value - d0) / width).floor().max(0.0) as usize).min(n - 1)
        } else {
            0
        };
        bins[index].members.push(id);
    }

    bins
}

impl LinkedView for HistogramView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "HistogramView"
    }

    fn listens_to(&self) -> &[Channel] {
        self.links.listens_to()
    }

    fn refresh(&self, ctx: &RefreshContext) -> anyhow::Result<()> {
        let slot = self.config.metric;

        let mut present = Vec::with_capacity(ctx.records.len());
        let mut no_data = Vec::new();
        for record in ctx.records.iter() {
            match slot.value_of(record).value() {
                Some(v) => present.push((record.county_id, v)),
                None => no_data.push(record.county_id),
            }
        }

        let bins = match extent(ctx.records.iter().map(|r| slot.value_of(r))) {
            Some((lo, hi)) => compute_bins(&present, (lo.min(0.0), hi), self.config.bin_count),
            None => Vec::new(),
        };

        tracing::debug!(
            "{}: {} bins, {} counties without data",
            self.title,
            bins.len(),
            no_data.len()
        );

        let mut state = self.state.write();
        state.highlight.state.revalidate(Some(ctx.records.as_ref()));
        state.highlight.recount(&bins, &no_data);
        state.bins = bins;
        state.no_data = no_data;
        state.ctx = Some(ctx.clone());
        Ok(())
    }

    fn on_external_selection(&self, selection: &Selection) -> anyhow::Result<()> {
        let mut state = self.state.write();
        let HistogramState { ctx, bins, no_data, highlight } = &mut *state;
        highlight.state.apply(selection, ctx.as_ref().map(|c| c.records.as_ref()));
        highlight.recount(bins.as_slice(), no_data.as_slice());
        Ok(())
    }

    fn highlighted(&self) -> Selection {
        self.state.read().highlight.state.effective().clone()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Linked for HistogramView {
    fn links(&self) -> &ViewLinks {
        &self.links
    }
}
