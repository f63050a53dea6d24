//! The contract every linked view fulfils

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{Channel, SelectionSubscriber};
use crate::join::EnrichedRecord;
use crate::join::EnrichedRecordSet;
use crate::model::{FeatureDescriptor, MetricValue};
use crate::sync::Selection;

/// Unique identifier for a view
pub type ViewId = Uuid;

/// Which of the two active metrics a single-metric view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricSlot {
    Primary,
    Secondary,
}

impl MetricSlot {
    pub fn value_of(self, record: &EnrichedRecord) -> MetricValue {
        match self {
            MetricSlot::Primary => record.primary,
            MetricSlot::Secondary => record.secondary,
        }
    }

    pub fn descriptor(self, ctx: &RefreshContext) -> &FeatureDescriptor {
        match self {
            MetricSlot::Primary => &ctx.primary,
            MetricSlot::Secondary => &ctx.secondary,
        }
    }
}

/// Everything a view needs to rebuild its scales after a rejoin
#[derive(Debug, Clone)]
pub struct RefreshContext {
    pub records: Arc<EnrichedRecordSet>,
    pub primary: FeatureDescriptor,
    pub secondary: FeatureDescriptor,
}

/// Base trait for all linked views (maps, histograms, scatter plots).
///
/// Views read the enriched record set but never change it. They react to
/// external selections by recomputing highlight state only.
pub trait LinkedView: Send + Sync {
    /// Get the unique ID of this view
    fn id(&self) -> ViewId;

    /// Get the title of this view
    fn title(&self) -> &str;

    /// Get the view type
    fn view_type(&self) -> &str;

    /// Channels this view reacts to
    fn listens_to(&self) -> &[Channel];

    /// Rebuild scales and domains from a new record set, then re-validate
    /// the last requested selection against it
    fn refresh(&self, ctx: &RefreshContext) -> anyhow::Result<()>;

    /// Recompute highlight state from `selection`. Empty clears.
    fn on_external_selection(&self, selection: &Selection) -> anyhow::Result<()>;

    /// The ids currently highlighted
    fn highlighted(&self) -> Selection;

    /// True while this view is publishing a selection of its own. Deliveries
    /// arriving in that window are its own echo and are skipped.
    fn is_publishing(&self) -> bool {
        false
    }

    /// Get as any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;
}

impl<V: LinkedView> SelectionSubscriber for V {
    fn on_selection(&self, channel: &Channel, selection: &Selection) -> anyhow::Result<()> {
        if self.is_publishing() {
            tracing::trace!("{} skipped its own selection on '{}'", self.title(), channel);
            return Ok(());
        }
        tracing::trace!("{} received {} ids from '{}'", self.title(), selection.len(), channel);
        self.on_external_selection(selection)
    }
}

impl Debug for dyn LinkedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedView")
            .field("id", &self.id())
            .field("title", &self.title())
            .field("view_type", &self.view_type())
            .finish()
    }
}
