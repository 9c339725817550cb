use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{api::error::ApiError, state::AppState};

pub const METRICS_FILE: &str = "metrics.json";

/// GET /model-metrics - Validation/test metrics exported alongside the models
pub async fn get_model_metrics(State(st): State<AppState>) -> Result<Json<Value>, ApiError> {
    let path = st.cfg.models.dir.join(METRICS_FILE);

    let txt = match tokio::fs::read_to_string(&path).await {
        Ok(txt) => txt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Json(json!({
                "error": "metrics file not found",
                "path": path.display().to_string(),
            })));
        }
        Err(e) => {
            return Err(ApiError::InternalError(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let metrics: Value = serde_json::from_str(&txt).map_err(|e| {
        ApiError::InternalError(format!("failed to parse {}: {}", path.display(), e))
    })?;
    Ok(Json(metrics))
}
