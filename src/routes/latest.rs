//! `GET /api/latest`: current snapshot with trends and place name.

use axum::{extract::State, routing::get, Json, Router};

use super::AppState;
use crate::LatestSnapshot;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/latest", get(handler))
}

async fn handler(State(station): State<AppState>) -> Json<LatestSnapshot> {
    Json(station.latest().await)
}
