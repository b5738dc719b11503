//! Route gateway: every endpoint module exports a subrouter that is merged
//! here, so `main.rs` only needs [`router`].

use std::sync::Arc;

use axum::Router;

use crate::Station;

mod health;
mod history;
mod latest;
mod rain;
mod upload;

/// Shared application state handed to every handler.
pub type AppState = Arc<Station>;

// ---

pub fn router(station: AppState) -> Router {
    // ---
    Router::new()
        .merge(upload::router())
        .merge(latest::router())
        .merge(history::router())
        .merge(rain::router())
        .merge(health::router())
        .with_state(station)
}
