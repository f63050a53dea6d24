//! Errors raised by the coordination engine

use thiserror::Error;

/// Failures that abort a join or a metric-pair rebuild
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown metric: '{0}'")]
    UnknownMetric(String),

    #[error("Geometry is empty, nothing to join against")]
    EmptyGeometry,
}
