//! `POST /ecowitt`: form-encoded uploads from the station gateway.

use std::collections::HashMap;

use axum::{
    extract::rejection::FormRejection, extract::State, http::StatusCode,
    response::IntoResponse, routing::post, Form, Router,
};
use chrono::Utc;
use tracing::{error, warn};

use super::AppState;
use crate::{GatewayUpload, Payload};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/ecowitt", post(handler))
}

async fn handler(
    State(station): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> impl IntoResponse {
    // ---
    let upload = match form {
        Ok(Form(fields)) => GatewayUpload::new(fields),
        Err(e) => {
            warn!("[GW1100] Not form-urlencoded: {}", e);
            return (StatusCode::BAD_REQUEST, "NO DATA");
        }
    };
    if upload.is_empty() {
        warn!("[GW1100] Empty POST");
        return (StatusCode::BAD_REQUEST, "NO DATA");
    }

    let now = Utc::now().timestamp();
    let payload = Payload::Gateway(upload);
    match station.ingest(payload, station.location(), now).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            error!("[GW1100] Upload failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR")
        }
    }
}
