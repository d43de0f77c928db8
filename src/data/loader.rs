//! Table Loader Module
//! Reads the label and metadata tables and joins them using Polars.

use crate::config::LoaderConfig;
use flate2::read::GzDecoder;
use polars::prelude::*;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Leading bytes of every gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Column '{column}' not found in {table} table")]
    MissingColumn { table: &'static str, column: String },
}

/// Loads the Galaxy Zoo label table and the photometric metadata table.
pub struct DataLoader {
    config: LoaderConfig,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl DataLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Read both source files and return the joined table.
    ///
    /// Output columns: [target, <every metadata column>]
    pub fn load(&self) -> Result<DataFrame, LoaderError> {
        let labels = self.read_table(&self.config.labels_path)?;
        let metadata = self.read_table(&self.config.metadata_path)?;
        self.join(&labels, &metadata)
    }

    /// Read a whole delimited file, gzip-compressed or plain.
    pub fn read_table(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let raw = fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let bytes = if raw.starts_with(&GZIP_MAGIC) {
            let mut decoded = Vec::new();
            GzDecoder::new(raw.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|source| LoaderError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            debug!(path = %path.display(), compressed = raw.len(), decoded = decoded.len(), "Decompressed gzip input");
            decoded
        } else {
            raw
        };

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.config.infer_schema_length)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        info!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded table");
        Ok(df)
    }

    /// Inner-join labels and metadata on their id columns, keep the target plus
    /// every metadata column, and rename the target.
    ///
    /// Duplicate keys multiply rows; nothing is deduplicated.
    pub fn join(&self, labels: &DataFrame, metadata: &DataFrame) -> Result<DataFrame, LoaderError> {
        let cfg = &self.config;
        for (table, df, column) in [
            ("label", labels, &cfg.label_key),
            ("label", labels, &cfg.target_source),
            ("metadata", metadata, &cfg.metadata_key),
        ] {
            if df.get_column_index(column).is_none() {
                return Err(LoaderError::MissingColumn {
                    table,
                    column: column.clone(),
                });
            }
        }

        let metadata_columns: Vec<PlSmallStr> =
            metadata.get_column_names().into_iter().cloned().collect();

        let mut selection = vec![col(cfg.target_source.as_str()).alias(cfg.target_name.as_str())];
        selection.extend(metadata_columns.into_iter().map(col));

        // Rows follow the label table's order.
        let mut args = JoinArgs::new(JoinType::Inner).with_coalesce(JoinCoalesce::KeepColumns);
        args.maintain_order = MaintainOrderJoin::Left;

        let joined = labels
            .clone()
            .lazy()
            .select([col(cfg.label_key.as_str()), col(cfg.target_source.as_str())])
            .join(
                metadata.clone().lazy(),
                [col(cfg.label_key.as_str())],
                [col(cfg.metadata_key.as_str())],
                args,
            )
            .select(selection)
            .collect()?;

        info!(rows = joined.height(), columns = joined.width(), "Joined labels with metadata");
        Ok(joined)
    }
}
