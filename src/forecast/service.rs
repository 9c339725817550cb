use std::sync::Arc;

use tracing::{info, warn};

use super::{ForecastEngine, ForecastError, MAX_HORIZON};
use crate::domain::ForecastResult;
use crate::ml::ModelStore;
use crate::repo::HistorySource;

/// Upper-cased, trimmed country code
pub fn normalize_iso3(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Request-level entry point: history lookup, model bundle, engine run
pub struct ForecastService {
    history: Arc<dyn HistorySource>,
    models: Arc<ModelStore>,
}

impl ForecastService {
    pub fn new(history: Arc<dyn HistorySource>, models: Arc<ModelStore>) -> Self {
        Self { history, models }
    }

    pub async fn forecast(
        &self,
        iso3: &str,
        horizon: u32,
    ) -> Result<ForecastResult, ForecastError> {
        if !(1..=MAX_HORIZON).contains(&horizon) {
            return Err(ForecastError::InvalidHorizon {
                got: horizon,
                max: MAX_HORIZON,
            });
        }

        let iso3 = normalize_iso3(iso3);
        info!(iso3 = %iso3, horizon, "forecast requested");

        let history = self.history.fetch_history(&iso3).await.map_err(|e| {
            warn!(iso3 = %iso3, error = %e, "history lookup failed");
            ForecastError::Storage(format!("{:#}", e))
        })?;

        let bundle = self
            .models
            .get()
            .await
            .map_err(|e| {
                warn!(path = %self.models.dir().display(), "model bundle unavailable");
                ForecastError::ModelUnavailable(format!("{:#}", e))
            })?;

        ForecastEngine::new(bundle).forecast(&iso3, &history, horizon)
    }
}
