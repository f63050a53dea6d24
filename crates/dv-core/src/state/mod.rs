//! Coordinator: owns the active metric pair and the enriched record set

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{ReentrantMutexGuard, RwLock};

use crate::error::CoreError;
use crate::events::SelectionBroadcaster;
use crate::join::{join, EnrichedRecordSet};
use crate::model::{FeatureDescriptor, GeometryStore, MetricCatalog, MetricPair, MetricTable};
use crate::view::{LinkedView, RefreshContext, ViewId};

/// Metric-pair change state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    /// All views show the current pair
    Idle,
    /// A new pair is being joined; views still show the previous set
    Rejoining,
}

/// A view whose refresh failed
#[derive(Debug, Clone, PartialEq)]
pub struct ViewFailure {
    pub view: ViewId,
    pub title: String,
    pub message: String,
}

/// Outcome of refreshing the registered views
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub pair: MetricPair,
    pub refreshed: usize,
    pub failures: Vec<ViewFailure>,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Glue between the selectors, the joiner and the views.
///
/// The record set is replaced in one step after a successful join; a failed
/// join leaves the previous set in place. The active selection is never
/// touched here.
pub struct Coordinator {
    geometry: Arc<GeometryStore>,
    table: Arc<MetricTable>,
    catalog: Arc<MetricCatalog>,
    broadcaster: Arc<SelectionBroadcaster>,
    records: RwLock<Arc<EnrichedRecordSet>>,
    phase: RwLock<CoordinatorPhase>,
    views: RwLock<Vec<Arc<dyn LinkedView>>>,
}

impl Coordinator {
    /// Run the initial join. Fails when geometry is empty or a metric is unknown.
    pub fn new(
        geometry: Arc<GeometryStore>,
        table: Arc<MetricTable>,
        catalog: Arc<MetricCatalog>,
        broadcaster: Arc<SelectionBroadcaster>,
        initial: MetricPair,
    ) -> Result<Self, CoreError> {
        validate_pair(&catalog, &table, &initial)?;
        let records = join(&geometry, &table, &initial.primary, &initial.secondary)?;

        tracing::info!(
            "Coordinator ready: {} counties, {} metric rows, pair {}",
            records.len(),
            table.len(),
            initial
        );

        Ok(Self {
            geometry,
            table,
            catalog,
            broadcaster,
            records: RwLock::new(Arc::new(records)),
            phase: RwLock::new(CoordinatorPhase::Idle),
            views: RwLock::new(Vec::new()),
        })
    }

    pub fn phase(&self) -> CoordinatorPhase {
        *self.phase.read()
    }

    /// The record set views currently read from
    pub fn records(&self) -> Arc<EnrichedRecordSet> {
        Arc::clone(&self.records.read())
    }

    pub fn pair(&self) -> MetricPair {
        self.records.read().pair().clone()
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    pub fn broadcaster(&self) -> &Arc<SelectionBroadcaster> {
        &self.broadcaster
    }

    /// Context describing the current record set, for building views
    pub fn refresh_context(&self) -> Result<RefreshContext, CoreError> {
        let records = self.records();
        let (primary, secondary) = self.descriptors(records.pair())?;
        Ok(RefreshContext {
            records,
            primary,
            secondary,
        })
    }

    /// Register a view and bring it up to date with the current set
    pub fn register_view(&self, view: Arc<dyn LinkedView>) -> Result<(), CoreError> {
        let _round = self.broadcaster.lock_round();
        let ctx = self.refresh_context()?;
        if let Some(failure) = refresh_one(view.as_ref(), &ctx) {
            tracing::warn!("Initial refresh of '{}' failed: {}", failure.title, failure.message);
        }
        tracing::debug!("Registered {} view '{}'", view.view_type(), view.title());
        self.views.write().push(view);
        Ok(())
    }

    /// Stop refreshing a view. Returns `false` if it was not registered.
    pub fn unregister_view(&self, id: ViewId) -> bool {
        let _round = self.broadcaster.lock_round();
        let mut views = self.views.write();
        let before = views.len();
        views.retain(|view| view.id() != id);
        let removed = views.len() != before;
        if removed {
            tracing::debug!("Unregistered view {}", id);
        }
        removed
    }

    pub fn views(&self) -> Vec<Arc<dyn LinkedView>> {
        self.views.read().clone()
    }

    /// Primary selector changed
    pub fn select_primary(&self, metric: &str) -> Result<RefreshReport, CoreError> {
        let _round = self.broadcaster.lock_round();
        let pair = self.pair().with_primary(metric);
        self.set_metric_pair(pair)
    }

    /// Secondary selector changed
    pub fn select_secondary(&self, metric: &str) -> Result<RefreshReport, CoreError> {
        let _round = self.broadcaster.lock_round();
        let pair = self.pair().with_secondary(metric);
        self.set_metric_pair(pair)
    }

    /// Rejoin on a new pair, swap the set, then refresh every view in
    /// registration order.
    pub fn set_metric_pair(&self, pair: MetricPair) -> Result<RefreshReport, CoreError> {
        Ok(self.begin_rejoin(pair)?.commit())
    }

    /// First half of [`Coordinator::set_metric_pair`]: validate and join
    /// while holding the round lock, leaving the phase at `Rejoining` and the
    /// previous set in place until the returned rejoin is committed.
    pub fn begin_rejoin(&self, pair: MetricPair) -> Result<PendingRejoin<'_>, CoreError> {
        let round = self.broadcaster.lock_round();
        *self.phase.write() = CoordinatorPhase::Rejoining;
        tracing::info!("Rejoining on {}", pair);

        let rebuilt = validate_pair(&self.catalog, &self.table, &pair)
            .and_then(|(primary, secondary)| {
                join(&self.geometry, &self.table, &pair.primary, &pair.secondary)
                    .map(|records| (records, primary, secondary))
            });

        match rebuilt {
            Ok((records, primary, secondary)) => Ok(PendingRejoin {
                coordinator: self,
                _round: round,
                ctx: RefreshContext {
                    records: Arc::new(records),
                    primary,
                    secondary,
                },
                committed: false,
            }),
            Err(e) => {
                *self.phase.write() = CoordinatorPhase::Idle;
                tracing::error!("Rebuild on {} failed, keeping {}: {}", pair, self.pair(), e);
                Err(e)
            }
        }
    }

    fn descriptors(&self, pair: &MetricPair) -> Result<(FeatureDescriptor, FeatureDescriptor), CoreError> {
        validate_pair(&self.catalog, &self.table, pair)
    }
}

/// A joined record set waiting to replace the current one.
///
/// Holds the broadcaster's round lock, so no selection round or other
/// rejoin can interleave. Dropping it without committing abandons the join
/// and keeps the previous set.
pub struct PendingRejoin<'a> {
    coordinator: &'a Coordinator,
    _round: ReentrantMutexGuard<'a, ()>,
    ctx: RefreshContext,
    committed: bool,
}

impl PendingRejoin<'_> {
    pub fn pair(&self) -> &MetricPair {
        self.ctx.records.pair()
    }

    /// Swap the new set in, return to `Idle` and refresh every view
    pub fn commit(mut self) -> RefreshReport {
        let coordinator = self.coordinator;
        let ctx = &self.ctx;

        *coordinator.records.write() = Arc::clone(&ctx.records);
        *coordinator.phase.write() = CoordinatorPhase::Idle;

        let views = coordinator.views();
        let failures: Vec<ViewFailure> = views
            .iter()
            .filter_map(|view| refresh_one(view.as_ref(), ctx))
            .collect();

        for failure in &failures {
            tracing::warn!("View '{}' failed to refresh: {}", failure.title, failure.message);
        }

        let report = RefreshReport {
            pair: ctx.records.pair().clone(),
            refreshed: views.len(),
            failures,
        };
        self.committed = true;
        report
    }
}

impl Drop for PendingRejoin<'_> {
    fn drop(&mut self) {
        if !self.committed {
            *self.coordinator.phase.write() = CoordinatorPhase::Idle;
            tracing::info!(
                "Rejoin on {} abandoned, keeping {}",
                self.ctx.records.pair(),
                self.coordinator.pair()
            );
        }
    }
}

/// Both metrics must have a descriptor and a table column
fn validate_pair(
    catalog: &MetricCatalog,
    table: &MetricTable,
    pair: &MetricPair,
) -> Result<(FeatureDescriptor, FeatureDescriptor), CoreError> {
    let lookup = |metric: &str| {
        if !table.has_column(metric) {
            return Err(CoreError::UnknownMetric(metric.to_string()));
        }
        catalog
            .get(metric)
            .cloned()
            .ok_or_else(|| CoreError::UnknownMetric(metric.to_string()))
    };
    Ok((lookup(&pair.primary)?, lookup(&pair.secondary)?))
}

fn refresh_one(view: &dyn LinkedView, ctx: &RefreshContext) -> Option<ViewFailure> {
    let message = match panic::catch_unwind(AssertUnwindSafe(|| view.refresh(ctx))) {
        Ok(Ok(())) => return None,
        Ok(Err(e)) => format!("{e:#}"),
        Err(_) => "panicked during refresh".to_string(),
    };
    Some(ViewFailure {
        view: view.id(),
        title: view.title().to_string(),
        message,
    })
}
