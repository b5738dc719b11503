// src/routes/health.rs
//! Liveness endpoint for the station service.
//!
//! `/health` is polled by container orchestrators and by the radio summary
//! sender before it asks for `/api/latest`. It never touches the database
//! or the geocoder, so it stays cheap while either of those is failing.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    location: String,
}

async fn health(State(station): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        location: station.location().to_string(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
