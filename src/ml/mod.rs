//! Machine Learning Module
//!
//! Inference-side pieces of the forecasting models:
//! - Feature vectors and standardization
//! - Predictor implementations rebuilt from serialized artifacts
//! - The model bundle (feature ordering, scaler statistics, both predictors)
//!
//! Training happens offline; this crate only consumes the exported artifacts.

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod bundle;
pub mod models;

pub use bundle::{FeatureConfig, ModelBundle, ModelStore};
pub use models::{LinearRegressionModel, ModelArtifact, Predictor, TreeEnsembleModel};

/// Feature Vector for ML models, ordered by the bundle's feature list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != feature_names.len() {
            anyhow::bail!(
                "Feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            );
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Standardize features with stored per-feature statistics: `(x - mean) / scale`.
    ///
    /// Scale entries come from a fitted scaler and are validated non-zero when the
    /// bundle is loaded, so no division guard is applied here.
    pub fn standardize(&self, means: &[f64], scales: &[f64]) -> Result<Self> {
        if means.len() != self.features.len() || scales.len() != self.features.len() {
            anyhow::bail!(
                "Standardization parameter count mismatch: {} features, {} means, {} scales",
                self.features.len(),
                means.len(),
                scales.len()
            );
        }

        let standardized = self
            .features
            .iter()
            .zip(means.iter().zip(scales.iter()))
            .map(|(f, (mean, scale))| (f - mean) / scale)
            .collect();

        Ok(Self {
            features: standardized,
            feature_names: self.feature_names.clone(),
        })
    }
}
