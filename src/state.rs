use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, DataSourceKind};
use crate::forecast::ForecastService;
use crate::ml::ModelStore;
use crate::repo::{HistorySource, InMemoryHistorySource};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub history: Arc<dyn HistorySource>,
    pub models: Arc<ModelStore>,
    pub forecasts: Arc<ForecastService>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let history = history_source(&cfg).await?;

        let models = Arc::new(ModelStore::new(cfg.models.dir.clone()));
        if cfg.models.preload {
            models.get().await?;
            info!(path = %cfg.models.dir.display(), "models preloaded");
        }

        Ok(Self::from_parts(cfg, history, models))
    }

    pub fn from_parts(
        cfg: Config,
        history: Arc<dyn HistorySource>,
        models: Arc<ModelStore>,
    ) -> Self {
        let forecasts = Arc::new(ForecastService::new(history.clone(), models.clone()));
        Self {
            cfg,
            history,
            models,
            forecasts,
        }
    }
}

async fn history_source(cfg: &Config) -> Result<Arc<dyn HistorySource>> {
    match cfg.data.source {
        DataSourceKind::Memory => {
            let source = match &cfg.data.history_path {
                Some(path) => InMemoryHistorySource::from_json_file(path).await?,
                None => InMemoryHistorySource::default(),
            };
            Ok(Arc::new(source))
        }
        DataSourceKind::Postgres => {
            #[cfg(feature = "db")]
            {
                let url = cfg.db.url.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("db.url (or DATABASE_URL) must be set for the postgres source")
                })?;
                Ok(Arc::new(crate::repo::PgHistorySource::connect(url).await?))
            }

            #[cfg(not(feature = "db"))]
            {
                anyhow::bail!("data.source = \"postgres\" requires the `db` feature")
            }
        }
    }
}
