use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{api::error::ApiError, domain::ForecastResult, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct ForecastQuery {
    #[validate(range(min = 1, max = 10))]
    pub horizon: Option<u32>,
}

/// GET /forecast/:iso3?horizon=N - forecast the next N years (default from config)
pub async fn get_forecast(
    State(st): State<AppState>,
    Path(iso3): Path<String>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<Json<ForecastResult>, ApiError> {
    let Query(q) = query?;
    q.validate()?;
    let horizon = q.horizon.unwrap_or(st.cfg.forecast.default_horizon);

    let result = st.forecasts.forecast(&iso3, horizon).await?;
    Ok(Json(result))
}
