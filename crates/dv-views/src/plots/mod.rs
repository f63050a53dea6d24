//! Linked plot views

pub mod histogram;
pub mod map;
pub mod scatter;
pub mod utils;

pub use histogram::{BinState, HistogramConfig, HistogramView, NoDataBucket};
pub use map::{Fill, Legend, MapView, MapViewConfig, RegionState};
pub use scatter::{PointState, ScatterConfig, ScatterView, UnplottedState};
