//! Model bundle: feature ordering, scaler statistics and the two predictors.
//!
//! Layout of the model directory:
//! - `feature_config.json` ([`FeatureConfig`])
//! - `<best_lc_model_type>_lc_model.json` ([`ModelArtifact`])
//! - `<best_gen_model_type>_gen_model.json` ([`ModelArtifact`])

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use super::models::{ModelArtifact, Predictor};
use super::FeatureVector;
use crate::forecast::features::FeatureLayout;

/// Exported training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub feature_cols: Vec<String>,
    pub best_lc_model_type: String,
    pub best_gen_model_type: String,
    /// StandardScaler statistics, applied to the low-carbon model input only
    pub scaler_mean: Vec<f64>,
    pub scaler_scale: Vec<f64>,
}

impl FeatureConfig {
    pub const FILE_NAME: &'static str = "feature_config.json";

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read feature config {}", path.display()))?;
        serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse feature config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.feature_cols.len();
        if n == 0 {
            anyhow::bail!("feature_cols is empty");
        }
        if self.scaler_mean.len() != n || self.scaler_scale.len() != n {
            anyhow::bail!(
                "scaler has {} means and {} scales for {} features",
                self.scaler_mean.len(),
                self.scaler_scale.len(),
                n
            );
        }
        if let Some(i) = self.scaler_mean.iter().position(|m| !m.is_finite()) {
            anyhow::bail!("scaler_mean[{}] is not finite", i);
        }
        if let Some(i) = self
            .scaler_scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            anyhow::bail!("scaler_scale[{}] must be finite and non-zero", i);
        }
        Ok(())
    }

    pub fn lc_model_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_lc_model.json", self.best_lc_model_type))
    }

    pub fn gen_model_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_gen_model.json", self.best_gen_model_type))
    }
}

/// Loaded, validated models ready for inference. Read-only once built.
pub struct ModelBundle {
    layout: FeatureLayout,
    scaler_mean: Vec<f64>,
    scaler_scale: Vec<f64>,
    lc_model: Box<dyn Predictor>,
    gen_model: Box<dyn Predictor>,
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("n_features", &self.layout.len())
            .field("lc_model", &self.lc_model.model_type())
            .field("gen_model", &self.gen_model.model_type())
            .finish_non_exhaustive()
    }
}

impl ModelBundle {
    pub fn new(
        config: FeatureConfig,
        lc_model: Box<dyn Predictor>,
        gen_model: Box<dyn Predictor>,
    ) -> Result<Self> {
        config.validate()?;

        let n = config.feature_cols.len();
        for (target, model) in [("lc", &lc_model), ("gen", &gen_model)] {
            if model.n_features() != n {
                anyhow::bail!(
                    "{} model expects {} features, feature list has {}",
                    target,
                    model.n_features(),
                    n
                );
            }
        }

        let layout = FeatureLayout::new(config.feature_cols);
        for name in layout.unknown_features() {
            warn!(feature = name, "feature is not produced by the pipeline, it will be 0.0");
        }

        Ok(Self {
            layout,
            scaler_mean: config.scaler_mean,
            scaler_scale: config.scaler_scale,
            lc_model,
            gen_model,
        })
    }

    /// Read config and both model artifacts from `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::read_dir(dir).map_err(|e| {
            let detail = format!("{:#}", e);
            error!(path = %dir.display(), error = %detail, "failed to load models");
            e
        })
    }

    fn read_dir(dir: &Path) -> Result<Self> {
        let cfg_path = dir.join(FeatureConfig::FILE_NAME);
        info!(path = %cfg_path.display(), "loading feature config");
        let config = FeatureConfig::from_json_file(&cfg_path)?;
        config.validate()?;
        let n = config.feature_cols.len();

        let lc_path = config.lc_model_path(dir);
        info!(path = %lc_path.display(), "loading LC model");
        let lc_model = ModelArtifact::from_json_file(&lc_path)?
            .into_predictor(n)
            .with_context(|| format!("incompatible LC model {}", lc_path.display()))?;

        let gen_path = config.gen_model_path(dir);
        info!(path = %gen_path.display(), "loading GEN model");
        let gen_model = ModelArtifact::from_json_file(&gen_path)?
            .into_predictor(n)
            .with_context(|| format!("incompatible GEN model {}", gen_path.display()))?;

        let bundle = Self::new(config, lc_model, gen_model)?;
        info!(path = %dir.display(), n_features = n, "models loaded");
        Ok(bundle)
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn standardize(&self, raw: &FeatureVector) -> Result<FeatureVector> {
        raw.standardize(&self.scaler_mean, &self.scaler_scale)
    }

    /// Low-carbon share delta (percentage points); expects standardized input
    pub fn predict_low_carbon_delta(&self, scaled: &FeatureVector) -> Result<f64> {
        self.lc_model.predict(scaled)
    }

    /// Log-generation delta; expects raw (unscaled) input
    pub fn predict_log_generation_delta(&self, raw: &FeatureVector) -> Result<f64> {
        self.gen_model.predict(raw)
    }
}

type BundleLoader = Arc<dyn Fn(&Path) -> Result<ModelBundle> + Send + Sync>;

/// Lazily loaded, shared model bundle.
///
/// The first `get` performs the load; concurrent callers wait on the same
/// in-flight load. A failed load is not cached.
pub struct ModelStore {
    dir: PathBuf,
    loader: BundleLoader,
    cell: OnceCell<Arc<ModelBundle>>,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_loader(dir, ModelBundle::load_from_dir)
    }

    /// Store that builds its bundle with `loader` (run on the blocking pool)
    pub fn with_loader<F>(dir: impl Into<PathBuf>, loader: F) -> Self
    where
        F: Fn(&Path) -> Result<ModelBundle> + Send + Sync + 'static,
    {
        Self {
            dir: dir.into(),
            loader: Arc::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Store around an already built bundle
    pub fn preloaded(bundle: ModelBundle) -> Self {
        Self {
            dir: PathBuf::new(),
            loader: Arc::new(ModelBundle::load_from_dir),
            cell: OnceCell::new_with(Some(Arc::new(bundle))),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<Arc<ModelBundle>> {
        let bundle = self
            .cell
            .get_or_try_init(|| async {
                let dir = self.dir.clone();
                let loader = Arc::clone(&self.loader);
                let bundle = tokio::task::spawn_blocking(move || loader(&dir)).await??;
                Ok::<_, anyhow::Error>(Arc::new(bundle))
            })
            .await?;
        Ok(Arc::clone(bundle))
    }
}
