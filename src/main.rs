//! Galaxy Prep - Galaxy Zoo data preparation
//!
//! Loads, joins and preprocesses the Galaxy Zoo tables, then optionally writes
//! the model-ready table as CSV.

use anyhow::{Context, Result};
use galaxy_prep::config::{AppConfig, CONFIG_ENV_VAR};
use galaxy_prep::logging::init_logging;
use galaxy_prep::{DataLoader, Preprocessor};
use polars::prelude::*;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    init_logging();

    let config = match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            AppConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => AppConfig::default(),
    };

    let loader = DataLoader::new(config.loader.clone());
    let joined = loader.load().context("Failed to load input tables")?;

    let (mut df, report) = Preprocessor::preprocess_with_report(&joined, &config.preprocess)
        .context("Preprocessing failed")?;

    for step in &report.steps {
        info!(step = step.step, rows = step.rows, columns = step.columns, "Pipeline step");
    }

    if let Some(output_path) = &config.output_path {
        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        info!(path = %output_path.display(), rows = df.height(), "Wrote output table");
    }

    Ok(())
}
