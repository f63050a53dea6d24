//! Linked views over the enriched county record set
//!
//! Each view keeps its own scales and highlight state behind a lock, reacts
//! to selections published by the others, and publishes its own brushes.

mod links;
pub mod plots;

#[cfg(test)]
mod test_support;

pub use links::{attach, Linked, ViewLinks};
pub use plots::utils::{extent, LinearScale};
pub use plots::{
    BinState, Fill, HistogramConfig, HistogramView, Legend, MapView, MapViewConfig, NoDataBucket,
    PointState, RegionState, ScatterConfig, ScatterView, UnplottedState,
};
