//! `GET /api/history?hours=N`: minute-bucketed averages for charting.
//!
//! `hours` is clamped to 1..=168; anything unparseable means 24.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error};

use super::AppState;
use crate::history::DEFAULT_WINDOW_HOURS;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/history", get(handler))
}

/// Kept as a string so a bad value falls back instead of being rejected.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    hours: Option<String>,
}

impl HistoryQuery {
    fn window_hours(&self) -> i64 {
        self.hours
            .as_deref()
            .and_then(|h| h.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_WINDOW_HOURS)
    }
}

async fn handler(
    Query(params): Query<HistoryQuery>,
    State(station): State<AppState>,
) -> impl IntoResponse {
    // ---
    let hours = params.window_hours();
    debug!("GET /api/history hours={}", hours);

    match station.history(hours, Utc::now().timestamp()).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => {
            error!("Failed to build history: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json("Failed to load history")).into_response()
        }
    }
}
