//! Locality-median price model
//!
//! The model is a per-locality median of price per square foot with a
//! global median fallback, fitted on the cleaned dataset with a seeded
//! train/validation split and validated with MAE and R². It is deliberate
//! pipeline glue rather than statistics: it gives the serving endpoint a
//! defensible number and the training stage something to measure.

use crate::clean::CleanRecord;
use crate::dataset;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Seed of the train/validation shuffle; fixed so refits on the same data
/// reproduce the same split and metrics.
const SPLIT_SEED: u64 = 42;

/// Share of rows held out for validation.
const VALIDATION_SHARE: usize = 5; // one in five

/// Errors from fitting, saving, or loading the price model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("no rows to fit a model on")]
    NoData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model artifact error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fitted pricing model plus its training metadata.
///
/// Persisted as pretty-printed JSON so the artifact stays diffable across
/// training runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModel {
    /// Median price per square foot by locality, from the training rows
    pub locality_median_ppsf: BTreeMap<String, f64>,

    /// Fallback for localities unseen during training
    pub global_median_ppsf: f64,

    pub train_rows: usize,
    pub validation_rows: usize,

    /// Mean absolute error on the held-out rows, in lakhs; `None` when no
    /// rows were held out
    pub validation_mae_lakhs: Option<f64>,

    /// R² on the held-out rows; `None` when it is undefined there
    pub validation_r2: Option<f64>,

    pub trained_at: DateTime<Utc>,
}

impl PriceModel {
    /// Fits a model on cleaned rows.
    ///
    /// One row in five (seeded shuffle) is held out for validation; with
    /// fewer than five rows everything trains and the metrics stay `None`.
    ///
    /// # Arguments
    ///
    /// * `records` - Cleaned rows to fit on
    ///
    /// # Returns
    ///
    /// * `Ok(PriceModel)` - Fitted model with validation metrics
    /// * `Err(ModelError::NoData)` - `records` is empty
    pub fn fit(records: &[CleanRecord]) -> Result<Self, ModelError> {
        if records.is_empty() {
            return Err(ModelError::NoData);
        }

        let mut indices: Vec<usize> = (0..records.len()).collect();
        let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
        indices.shuffle(&mut rng);

        let validation_len = records.len() / VALIDATION_SHARE;
        let (validation_idx, train_idx) = indices.split_at(validation_len);

        let mut by_locality: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut all_ppsf = Vec::with_capacity(train_idx.len());
        for &i in train_idx {
            let record = &records[i];
            by_locality
                .entry(record.locality.clone())
                .or_default()
                .push(record.price_per_sqft);
            all_ppsf.push(record.price_per_sqft);
        }

        let locality_median_ppsf = by_locality
            .into_iter()
            .map(|(locality, mut values)| (locality, median(&mut values)))
            .collect();
        let global_median_ppsf = median(&mut all_ppsf);

        let mut model = Self {
            locality_median_ppsf,
            global_median_ppsf,
            train_rows: train_idx.len(),
            validation_rows: validation_idx.len(),
            validation_mae_lakhs: None,
            validation_r2: None,
            trained_at: Utc::now(),
        };

        let held_out: Vec<&CleanRecord> = validation_idx.iter().map(|&i| &records[i]).collect();
        let (mae, r2) = validate(&model, &held_out);
        model.validation_mae_lakhs = mae;
        model.validation_r2 = r2;

        Ok(model)
    }

    /// Predicted price in lakhs for a property of `area_sqft` square feet
    /// in `locality`.
    ///
    /// Uses the locality's median price per square foot when that locality
    /// was seen during training, the global median otherwise.
    pub fn predict(&self, area_sqft: f64, locality: &str) -> f64 {
        let ppsf = self
            .locality_median_ppsf
            .get(locality)
            .copied()
            .unwrap_or(self.global_median_ppsf);
        ppsf * area_sqft / 1e5
    }

    /// Writes the model artifact as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reads a model artifact back from JSON.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Runs the training stage: reads the clean dataset, fits the model, logs
/// its metrics, and writes the artifact.
pub fn run(clean_path: &Path, model_path: &Path) -> crate::Result<PriceModel> {
    let records: Vec<CleanRecord> = dataset::read_csv(clean_path)?;
    let model = PriceModel::fit(&records)?;

    info!(
        train_rows = model.train_rows,
        validation_rows = model.validation_rows,
        localities = model.locality_median_ppsf.len(),
        mae_lakhs = ?model.validation_mae_lakhs,
        r2 = ?model.validation_r2,
        "model fitted"
    );

    model.save(model_path)?;
    info!(path = %model_path.display(), "model artifact written");
    Ok(model)
}

/// MAE (lakhs) and R² of the model over held-out rows. Either is `None`
/// where undefined (no rows, or zero price variance for R²).
fn validate(model: &PriceModel, held_out: &[&CleanRecord]) -> (Option<f64>, Option<f64>) {
    if held_out.is_empty() {
        return (None, None);
    }

    let n = held_out.len() as f64;
    let mean_actual = held_out.iter().map(|r| r.price_lakhs).sum::<f64>() / n;

    let mut abs_error_sum = 0.0;
    let mut ss_residual = 0.0;
    let mut ss_total = 0.0;
    for record in held_out {
        let predicted = model.predict(record.area_sqft, &record.locality);
        abs_error_sum += (predicted - record.price_lakhs).abs();
        ss_residual += (record.price_lakhs - predicted).powi(2);
        ss_total += (record.price_lakhs - mean_actual).powi(2);
    }

    let mae = Some(abs_error_sum / n);
    let r2 = if ss_total > 0.0 {
        Some(1.0 - ss_residual / ss_total)
    } else {
        None
    };
    (mae, r2)
}

/// Median of `values`; the mean of the middle two when the count is even.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
