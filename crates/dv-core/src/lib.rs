//! Core functionality for the linked county health views
//!
//! This crate provides the data model, the dataset joiner, the selection
//! broadcaster and the coordinator that keeps every view on one consistent
//! record set and selection.

pub mod error;
pub mod events;
pub mod join;
pub mod model;
pub mod state;
pub mod sync;
pub mod view;

// Re-export commonly used types
pub use error::CoreError;
pub use events::{
    handler_from_fn, Channel, DeliveryReport, SelectionBroadcaster, SelectionSubscriber,
    SubscriberFailure, SubscriptionId,
};
pub use join::{join, EnrichedRecord, EnrichedRecordSet};
pub use model::{
    CountyId, FeatureDescriptor, GeometryFeature, GeometryStore, MetricCatalog, MetricPair,
    MetricRow, MetricTable, MetricValue, SENTINEL,
};
pub use state::{Coordinator, CoordinatorPhase, PendingRejoin, RefreshReport, ViewFailure};
pub use sync::{ActiveSelection, HighlightState, Selection};
pub use view::{LinkedView, MetricSlot, RefreshContext, ViewId};
