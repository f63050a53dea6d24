//! Configuration for dataset loading

pub mod file_config;
pub mod null_handling;

pub use file_config::{DatasetConfig, GeometryFormat};
pub use null_handling::NullConfig;
