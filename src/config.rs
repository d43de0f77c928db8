//! Pipeline Configuration Module
//! Column lists, file locations and filter parameters as plain data.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the path of a JSON config file.
pub const CONFIG_ENV_VAR: &str = "GALAXY_PREP_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub preprocess: PreprocessConfig,
    /// Where the binary writes the final table; nothing is written when unset.
    pub output_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read a JSON config file. Missing fields fall back to the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Source files and the join / target columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub labels_path: PathBuf,
    pub metadata_path: PathBuf,
    pub label_key: String,
    pub metadata_key: String,
    pub target_source: String,
    pub target_name: String,
    /// Rows used for type inference; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            labels_path: PathBuf::from("zoo.gz"),
            metadata_path: PathBuf::from("redshift.gz"),
            label_key: "dr7objid".to_string(),
            metadata_key: "OBJID".to_string(),
            target_source: "t01_smooth_or_features_a01_smooth_debiased".to_string(),
            target_name: "target".to_string(),
            infer_schema_length: None,
        }
    }
}

/// Parameters of the extreme-outlier filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// IQR multiplier `k` in `[Q1 - k*IQR, Q3 + k*IQR]`.
    pub threshold: f64,
    /// Feature columns to check; `None` means every numeric column but the id.
    pub features: Option<Vec<String>>,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            features: None,
        }
    }
}

/// Column lists and constants driving every preprocessing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub id_column: String,
    pub unwanted_columns: Vec<String>,
    pub extinction_pairs: Vec<(String, String)>,
    pub error_columns: Vec<String>,
    pub error_sentinel: f64,
    pub color_pairs: Vec<(String, String)>,
    pub radius90_column: String,
    pub radius50_column: String,
    pub magnitude_column: String,
    pub concentration_column: String,
    pub surface_brightness_column: String,
    pub radius_columns: Vec<String>,
    pub flux_like_columns: Vec<String>,
    pub outliers: OutlierConfig,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            id_column: "OBJID".to_string(),
            unwanted_columns: owned(&[
                "PETROR50_R_KPC_SIMPLE_BIN",
                "PETROMAG_MR_SIMPLE_BIN",
                "REDSHIFT_SIMPLE_BIN",
                "WVT_BIN",
                "ROWC_U",
                "COLC_U",
                "ROWC_G",
                "COLC_G",
                "ROWC_R",
                "COLC_R",
                "ROWC_I",
                "COLC_I",
                "ROWC_Z",
                "COLC_Z",
                "RUN",
                "RERUN",
                "CAMCOL",
                "FIELD",
                "OBJ",
                "RA",
                "DEC",
                "REGION",
            ]),
            extinction_pairs: owned_pairs(&[
                ("PETROMAG_U", "EXTINCTION_U"),
                ("PETROMAG_G", "EXTINCTION_G"),
                ("PETROMAG_R", "EXTINCTION_R"),
                ("PETROMAG_I", "EXTINCTION_I"),
                ("PETROMAG_Z", "EXTINCTION_Z"),
            ]),
            error_columns: owned(&[
                "PETROMAGERR_U",
                "PETROMAGERR_G",
                "PETROMAGERR_R",
                "PETROMAGERR_I",
                "PETROMAGERR_Z",
                "PETROMAGERR_MU",
                "PETROMAGERR_MG",
                "PETROMAGERR_MR",
                "PETROMAGERR_MI",
                "PETROMAGERR_MZ",
                "DEVMAGERR_R",
                "EXPMAGERR_R",
                "CMODELMAGERR_R",
            ]),
            error_sentinel: 99999.0,
            color_pairs: owned_pairs(&[
                ("PETROMAG_U", "PETROMAG_G"),
                ("PETROMAG_G", "PETROMAG_R"),
                ("PETROMAG_R", "PETROMAG_I"),
                ("PETROMAG_I", "PETROMAG_Z"),
            ]),
            radius90_column: "PETROR90_R".to_string(),
            radius50_column: "PETROR50_R".to_string(),
            magnitude_column: "PETROMAG_R".to_string(),
            concentration_column: "CONC_R".to_string(),
            surface_brightness_column: "SURFACE_BRIGHTNESS_R".to_string(),
            radius_columns: owned(&["PETROR50_R", "PETROR90_R", "PETROR50_R_KPC"]),
            flux_like_columns: owned(&[
                "PETROR50_R",
                "PETROR90_R",
                "PETROR50_R_KPC",
                "PETROMAGERR_U",
                "PETROMAGERR_G",
                "PETROMAGERR_R",
                "PETROMAGERR_I",
                "PETROMAGERR_Z",
                "PETROMAGERR_MU",
                "PETROMAGERR_MG",
                "PETROMAGERR_MR",
                "PETROMAGERR_MI",
                "PETROMAGERR_MZ",
                "DEVMAGERR_R",
                "EXPMAGERR_R",
                "CMODELMAGERR_R",
            ]),
            outliers: OutlierConfig::default(),
        }
    }
}
