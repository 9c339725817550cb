use axum::{extract::State, Json};

use crate::{api::error::ApiError, domain::CountrySummary, state::AppState};

/// GET /countries - Countries with history, ordered by name
pub async fn list_countries(
    State(st): State<AppState>,
) -> Result<Json<Vec<CountrySummary>>, ApiError> {
    let countries = st
        .history
        .list_countries()
        .await
        .map_err(|e| ApiError::DatabaseError(format!("{:#}", e)))?;
    Ok(Json(countries))
}
