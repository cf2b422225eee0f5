#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime category prediction.
//!
//! The schedule generator only depends on the [`Predictor`] trait: given a
//! neighborhood, a day and an hour it returns the most likely crime category
//! and its probability. [`CrimeClassifier`] is the default implementation, a
//! softmax regression over `[neighborhood_code, day, hour]` trained on a
//! single shuffled train/test split.

pub mod encoding;
pub mod logistic;

use std::collections::BTreeMap;

use patrol_card_incident_models::{PredictionResult, Weekday};
use patrol_card_ingest::Dataset;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use serde::{Deserialize, Serialize};

use crate::encoding::{Features, LabelEncoder, StandardScaler};
use crate::logistic::{FitParams, LogisticRegression, argmax};

/// Errors returned by a [`Predictor`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictError {
    /// The neighborhood was not seen when the model was fitted.
    #[error("Unknown neighborhood '{neighborhood}': not seen during training")]
    UnknownCategory {
        /// The rejected neighborhood.
        neighborhood: String,
    },

    /// The hour is outside 0-23.
    #[error("Invalid hour {hour}: expected 0-23")]
    InvalidHour {
        /// The rejected hour.
        hour: u8,
    },

    /// The model produced no class probabilities.
    #[error("Model has no classes")]
    NoClasses,
}

/// Errors that can occur while training a [`CrimeClassifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrainError {
    /// The configuration is unusable.
    #[error("Invalid training configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

/// Predicts the most likely crime category for a place and time.
///
/// Implementations must be side-effect free and `Send + Sync` so a single
/// instance can be shared by every day worker.
pub trait Predictor: Send + Sync {
    /// Returns the most likely category for `(neighborhood, day, hour)` and
    /// its probability.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::UnknownCategory`] if `neighborhood` was not
    /// seen during training.
    fn predict(
        &self,
        neighborhood: &str,
        day: Weekday,
        hour: u8,
    ) -> Result<PredictionResult, PredictError>;
}

/// Training hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TrainingConfig {
    /// Number of gradient descent epochs.
    pub epochs: u32,
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// L2 regularization strength.
    pub l2: f64,
    /// Fraction of records held out for the accuracy check.
    pub test_fraction: f64,
    /// Seed for the train/test shuffle. Random when `None`.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.5,
            l2: 1e-3,
            test_fraction: 0.2,
            seed: None,
        }
    }
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    /// Records used for fitting.
    pub train_size: usize,
    /// Records held out.
    pub test_size: usize,
    /// Held-out accuracy, `None` when nothing was held out.
    pub accuracy: Option<f64>,
    /// Number of distinct crime categories.
    pub n_categories: usize,
    /// Number of distinct neighborhoods.
    pub n_neighborhoods: usize,
    /// Seed used for the split.
    pub seed: u64,
}

/// A trained crime category classifier.
#[derive(Debug, Clone)]
pub struct CrimeClassifier {
    neighborhoods: LabelEncoder,
    categories: LabelEncoder,
    scaler: StandardScaler,
    model: LogisticRegression,
}

impl CrimeClassifier {
    /// Trains a classifier on `dataset`.
    ///
    /// Records are shuffled, split into train and test sets according to
    /// `config.test_fraction`, fitted on the train set, and scored on the
    /// test set. The encoders and scaler are fitted on the full dataset so
    /// every neighborhood in it is known to the model.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::InvalidConfig`] if the configuration is out of
    /// range. `dataset` is never empty, see [`Dataset::new`].
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn train(
        dataset: &Dataset,
        config: &TrainingConfig,
    ) -> Result<(Self, TrainingReport), TrainError> {
        if !(0.0..1.0).contains(&config.test_fraction) {
            return Err(TrainError::InvalidConfig {
                message: format!("test_fraction {} not in [0, 1)", config.test_fraction),
            });
        }
        if config.learning_rate <= 0.0 {
            return Err(TrainError::InvalidConfig {
                message: format!("learning_rate {} must be positive", config.learning_rate),
            });
        }

        let records = dataset.records();
        let neighborhoods = LabelEncoder::fit(records.iter().map(|r| r.neighborhood.as_str()));
        let categories = LabelEncoder::fit(records.iter().map(|r| r.category.as_str()));

        let mut raw = Vec::with_capacity(records.len());
        let mut labels = Vec::with_capacity(records.len());
        for record in records {
            let (Some(code), Some(label)) = (
                neighborhoods.transform(&record.neighborhood),
                categories.transform(&record.category),
            ) else {
                continue;
            };
            raw.push(raw_features(code, record.day, record.hour));
            labels.push(label);
        }

        let scaler = StandardScaler::fit(&raw);
        let rows: Vec<Features> = raw.iter().map(|row| scaler.transform(row)).collect();

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let test_size = ((rows.len() as f64) * config.test_fraction).round() as usize;
        let test_size = test_size.min(rows.len().saturating_sub(1));
        let (test_idx, train_idx) = order.split_at(test_size);

        let pick = |idx: &[usize]| -> (Vec<Features>, Vec<usize>) {
            idx.iter().map(|&i| (rows[i], labels[i])).unzip()
        };
        let (train_rows, train_labels) = pick(train_idx);
        let (test_rows, test_labels) = pick(test_idx);

        log::info!(
            "Training classifier: {} categories, {} neighborhoods, {} train / {} test records (seed {seed})",
            categories.len(),
            neighborhoods.len(),
            train_rows.len(),
            test_rows.len()
        );

        let model = LogisticRegression::fit(
            &train_rows,
            &train_labels,
            categories.len(),
            FitParams {
                epochs: config.epochs,
                learning_rate: config.learning_rate,
                l2: config.l2,
            },
        );

        let accuracy = (!test_rows.is_empty()).then(|| {
            let correct = test_rows
                .iter()
                .zip(&test_labels)
                .filter(|(row, label)| {
                    argmax(&model.predict_proba(row)).is_some_and(|(k, _)| k == **label)
                })
                .count();
            correct as f64 / test_rows.len() as f64
        });

        match accuracy {
            Some(accuracy) => log::info!("Model accuracy: {accuracy:.4}"),
            None => log::info!("Model accuracy: not measured (no held-out records)"),
        }

        let report = TrainingReport {
            train_size: train_rows.len(),
            test_size: test_rows.len(),
            accuracy,
            n_categories: categories.len(),
            n_neighborhoods: neighborhoods.len(),
            seed,
        };

        Ok((
            Self {
                neighborhoods,
                categories,
                scaler,
                model,
            },
            report,
        ))
    }

    /// Returns the probability of every category for a raw feature vector
    /// `[neighborhood_code, day, hour]`.
    #[must_use]
    pub fn predict_probabilities(&self, features: &Features) -> BTreeMap<String, f64> {
        let probabilities = self.model.predict_proba(&self.scaler.transform(features));
        self.categories
            .classes()
            .iter()
            .cloned()
            .zip(probabilities)
            .collect()
    }

    /// Encodes `(neighborhood, day, hour)` into a raw feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if the neighborhood is unknown or the hour is
    /// out of range.
    pub fn features(
        &self,
        neighborhood: &str,
        day: Weekday,
        hour: u8,
    ) -> Result<Features, PredictError> {
        if hour > 23 {
            return Err(PredictError::InvalidHour { hour });
        }
        let code = self.neighborhoods.transform(neighborhood).ok_or_else(|| {
            PredictError::UnknownCategory {
                neighborhood: neighborhood.to_string(),
            }
        })?;
        Ok(raw_features(code, day, hour))
    }

    /// Returns the neighborhoods known to the model.
    #[must_use]
    pub fn neighborhoods(&self) -> &[String] {
        self.neighborhoods.classes()
    }

    /// Returns the crime categories the model can predict.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        self.categories.classes()
    }
}

impl Predictor for CrimeClassifier {
    fn predict(
        &self,
        neighborhood: &str,
        day: Weekday,
        hour: u8,
    ) -> Result<PredictionResult, PredictError> {
        let features = self.features(neighborhood, day, hour)?;
        let probabilities = self.model.predict_proba(&self.scaler.transform(&features));
        let (code, probability) = argmax(&probabilities).ok_or(PredictError::NoClasses)?;
        let category = self
            .categories
            .inverse(code)
            .ok_or(PredictError::NoClasses)?;

        Ok(PredictionResult {
            category: category.to_string(),
            probability,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn raw_features(neighborhood_code: usize, day: Weekday, hour: u8) -> Features {
    [
        neighborhood_code as f64,
        f64::from(day.index()),
        f64::from(hour),
    ]
}
