//! Data Processor Module
//! Galaxy Zoo preprocessing: extinction correction, derived features,
//! log transforms, missing-value and extreme-outlier filtering.

use crate::config::PreprocessConfig;
use crate::stats::StatsCalculator;
use polars::prelude::*;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{column}' has non-numeric type {dtype}")]
    NonNumeric { column: String, dtype: String },
}

/// Signature shared by every pipeline step.
pub type StepFn = fn(&DataFrame, &PreprocessConfig) -> Result<DataFrame, ProcessorError>;

/// Shape of the table after one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: &'static str,
    pub rows: usize,
    pub columns: usize,
}

/// Per-step shapes of one pipeline run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub input_rows: usize,
    pub input_columns: usize,
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    /// Rows removed between input and output.
    pub fn rows_removed(&self) -> usize {
        let output = self.steps.last().map_or(self.input_rows, |s| s.rows);
        self.input_rows.saturating_sub(output)
    }
}

/// Check whether a dtype is numeric.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Names of all numeric columns, in table order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Read a numeric column as f64, with nulls and NaN as `None`.
fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
    let column = df.column(name)?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(ProcessorError::NonNumeric {
            column: name.to_string(),
            dtype: column.dtype().to_string(),
        });
    }

    let cast = column.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Add or replace a Float64 column. Non-finite results are stored as null.
fn put_column(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<f64>>,
) -> Result<(), ProcessorError> {
    let values: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    df.with_column(Column::new(name.into(), values))?;
    Ok(())
}

fn combine(
    left: &[Option<f64>],
    right: &[Option<f64>],
    f: impl Fn(f64, f64) -> Option<f64>,
) -> Vec<Option<f64>> {
    left.iter()
        .zip(right)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => f(*a, *b),
            _ => None,
        })
        .collect()
}

/// Drop each listed column that is present; absent names are ignored.
fn drop_present<'a>(
    df: &DataFrame,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<DataFrame, ProcessorError> {
    let mut out = df.clone();
    for name in names {
        if has_column(&out, name) {
            out.drop_in_place(name)?;
        }
    }
    Ok(out)
}

/// Handles the Galaxy Zoo preprocessing steps.
///
/// Each step takes the previous table and returns a new one; the caller's
/// table is never modified.
pub struct Preprocessor;

impl Preprocessor {
    /// Steps in execution order.
    pub const STEPS: [(&'static str, StepFn); 11] = [
        ("remove_unwanted_columns", Self::remove_unwanted_columns),
        ("correct_for_extinction", Self::correct_for_extinction),
        ("correct_error_sentinel", Self::correct_error_sentinel),
        ("add_color_indices", Self::add_color_indices),
        ("add_concentration_index", Self::add_concentration_index),
        ("add_surface_brightness", Self::add_surface_brightness),
        ("add_log_radii", Self::add_log_radii),
        ("add_flux_logs", Self::add_flux_logs),
        ("drop_missing_rows", Self::drop_missing_rows),
        ("remove_extreme_outliers", Self::remove_extreme_outliers),
        ("drop_id", Self::drop_id),
    ];

    /// Run the full pipeline.
    pub fn preprocess(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        Self::preprocess_with_report(df, config).map(|(df, _)| df)
    }

    /// Run the full pipeline and record the table shape after every step.
    pub fn preprocess_with_report(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<(DataFrame, PipelineReport), ProcessorError> {
        let mut report = PipelineReport {
            input_rows: df.height(),
            input_columns: df.width(),
            steps: Vec::with_capacity(Self::STEPS.len()),
        };

        let mut current = df.clone();
        for (step, run) in Self::STEPS {
            current = run(&current, config)?;
            debug!(step, rows = current.height(), columns = current.width(), "Step complete");
            report.steps.push(StepReport {
                step,
                rows: current.height(),
                columns: current.width(),
            });
        }

        info!(
            rows = current.height(),
            columns = current.width(),
            rows_removed = report.rows_removed(),
            "Preprocessing complete"
        );
        Ok((current, report))
    }

    /// Drop administrative and survey-bookkeeping columns.
    pub fn remove_unwanted_columns(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        drop_present(df, config.unwanted_columns.iter().map(String::as_str))
    }

    /// `<mag>_corr = mag - extinction` for every complete pair, then drop all
    /// listed magnitude and extinction columns.
    pub fn correct_for_extinction(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();

        for (mag_col, ext_col) in &config.extinction_pairs {
            if has_column(&out, mag_col) && has_column(&out, ext_col) {
                let mag = float_values(&out, mag_col)?;
                let ext = float_values(&out, ext_col)?;
                let corrected = combine(&mag, &ext, |m, e| Some(m - e));
                put_column(&mut out, &format!("{mag_col}_corr"), corrected)?;
            }
        }

        let to_drop = config
            .extinction_pairs
            .iter()
            .map(|(mag, _)| mag.as_str())
            .chain(config.extinction_pairs.iter().map(|(_, ext)| ext.as_str()));
        drop_present(&out, to_drop)
    }

    /// Replace the error sentinel (99999.0) with missing.
    pub fn correct_error_sentinel(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();

        for name in &config.error_columns {
            if has_column(&out, name) {
                let values = float_values(&out, name)?
                    .into_iter()
                    .map(|v| v.filter(|x| *x != config.error_sentinel))
                    .collect();
                put_column(&mut out, name, values)?;
            }
        }
        Ok(out)
    }

    /// `<a>_<b>_color = a - b` for each adjacent-band pair present.
    ///
    /// The pairs name the raw magnitudes, which `correct_for_extinction`
    /// has already dropped when run as part of the pipeline.
    pub fn add_color_indices(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();

        for (a, b) in &config.color_pairs {
            if has_column(&out, a) && has_column(&out, b) {
                let left = float_values(&out, a)?;
                let right = float_values(&out, b)?;
                put_column(
                    &mut out,
                    &format!("{a}_{b}_color"),
                    combine(&left, &right, |x, y| Some(x - y)),
                )?;
            }
        }
        Ok(out)
    }

    /// `CONC_R = r90 / r50`; a zero r50 gives missing.
    pub fn add_concentration_index(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();
        if !(has_column(&out, &config.radius90_column) && has_column(&out, &config.radius50_column))
        {
            return Ok(out);
        }

        let r90 = float_values(&out, &config.radius90_column)?;
        let r50 = float_values(&out, &config.radius50_column)?;
        let conc = combine(&r90, &r50, |num, den| (den != 0.0).then(|| num / den));
        put_column(&mut out, &config.concentration_column, conc)?;
        Ok(out)
    }

    /// `SURFACE_BRIGHTNESS_R = mag + 2.5 * log10(2*pi*r50^2)`; a zero r50
    /// gives missing.
    pub fn add_surface_brightness(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();
        if !(has_column(&out, &config.magnitude_column) && has_column(&out, &config.radius50_column))
        {
            return Ok(out);
        }

        let mag = float_values(&out, &config.magnitude_column)?;
        let r50 = float_values(&out, &config.radius50_column)?;
        let sb = combine(&mag, &r50, |m, r| {
            (r != 0.0).then(|| m + 2.5 * (2.0 * PI * r * r).log10())
        });
        put_column(&mut out, &config.surface_brightness_column, sb)?;
        Ok(out)
    }

    /// `LOG_<col> = ln(1 + x)` for the radius columns, then drop the originals.
    pub fn add_log_radii(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();

        for name in &config.radius_columns {
            if has_column(&out, name) {
                let logged = float_values(&out, name)?
                    .into_iter()
                    .map(|v| v.map(f64::ln_1p))
                    .collect();
                put_column(&mut out, &format!("LOG_{name}"), logged)?;
            }
        }

        drop_present(&out, config.radius_columns.iter().map(String::as_str))
    }

    /// Clip negatives to zero, `LOG_<col> = ln(1 + x)` for each flux-like
    /// column, then drop the originals.
    pub fn add_flux_logs(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();

        for name in &config.flux_like_columns {
            if has_column(&out, name) {
                let logged = float_values(&out, name)?
                    .into_iter()
                    .map(|v| v.map(|x| x.max(0.0).ln_1p()))
                    .collect();
                put_column(&mut out, &format!("LOG_{name}"), logged)?;
            }
        }

        drop_present(&out, config.flux_like_columns.iter().map(String::as_str))
    }

    /// Remove every row holding a null (or a float NaN) in any column.
    pub fn drop_missing_rows(
        df: &DataFrame,
        _config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let mut keep = vec![true; df.height()];

        for column in df.get_columns() {
            for (k, is_null) in keep.iter_mut().zip(column.is_null().into_iter()) {
                if is_null.unwrap_or(true) {
                    *k = false;
                }
            }

            if matches!(column.dtype(), DataType::Float32 | DataType::Float64) {
                let cast = column.cast(&DataType::Float64)?;
                for (k, v) in keep.iter_mut().zip(cast.f64()?.into_iter()) {
                    if v.is_some_and(f64::is_nan) {
                        *k = false;
                    }
                }
            }
        }

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        Ok(df.filter(&mask)?)
    }

    /// Remove rows where any feature falls outside `[Q1 - k*IQR, Q3 + k*IQR]`.
    ///
    /// Quartiles are computed on the incoming table; all flagged rows are
    /// removed in one pass. Features default to every numeric column except
    /// the id column.
    pub fn remove_extreme_outliers(
        df: &DataFrame,
        config: &PreprocessConfig,
    ) -> Result<DataFrame, ProcessorError> {
        let threshold = config.outliers.threshold;
        let features: Vec<String> = config
            .outliers
            .features
            .clone()
            .unwrap_or_else(|| numeric_columns(df))
            .into_iter()
            .filter(|name| name != &config.id_column && has_column(df, name))
            .collect();

        let mut outlier = vec![false; df.height()];
        for name in &features {
            let values = float_values(df, name)?;
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let Some((lower, upper)) = StatsCalculator::iqr_bounds(&present, threshold) else {
                continue;
            };

            let mut flagged = 0usize;
            for (flag, v) in outlier.iter_mut().zip(&values) {
                if let Some(v) = v {
                    if *v < lower || *v > upper {
                        *flag = true;
                        flagged += 1;
                    }
                }
            }
            if flagged > 0 {
                debug!(feature = %name, lower, upper, flagged, "Outliers flagged");
            }
        }

        let keep: Vec<bool> = outlier.iter().map(|o| !o).collect();
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        Ok(df.filter(&mask)?)
    }

    /// Drop the identifier column if present.
    pub fn drop_id(df: &DataFrame, config: &PreprocessConfig) -> Result<DataFrame, ProcessorError> {
        drop_present(df, [config.id_column.as_str()])
    }
}
