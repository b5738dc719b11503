//! `GET /api/rain/daily?days=N`: long-term daily rain rollups, newest first.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use super::AppState;

const DEFAULT_DAYS: u32 = 30;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/rain/daily", get(handler))
}

#[derive(Debug, Deserialize)]
pub struct RainQuery {
    days: Option<String>,
}

async fn handler(
    Query(params): Query<RainQuery>,
    State(station): State<AppState>,
) -> impl IntoResponse {
    // ---
    let days = params
        .days
        .as_deref()
        .and_then(|d| d.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_DAYS);

    match station.daily_rain(days).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            error!("Failed to load rain rollups: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json("Failed to load rain rollups"))
                .into_response()
        }
    }
}
