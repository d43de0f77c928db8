//! Galaxy Prep - Galaxy Zoo data preparation
//!
//! Loads the Galaxy Zoo label table and SDSS photometric metadata, joins them
//! and turns the result into a cleaned, model-ready numeric table.

pub mod config;
pub mod data;
pub mod logging;
pub mod stats;

pub use config::{AppConfig, LoaderConfig, OutlierConfig, PreprocessConfig};
pub use data::{DataLoader, PipelineReport, Preprocessor};
