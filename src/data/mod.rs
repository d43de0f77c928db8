//! Data module - table loading and preprocessing

mod loader;
mod processor;

pub use loader::{DataLoader, LoaderError};
pub use processor::{
    is_numeric_dtype, numeric_columns, PipelineReport, Preprocessor, ProcessorError, StepFn,
    StepReport,
};
