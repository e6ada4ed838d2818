//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the websocket endpoint and the small read-only HTTP API
//! under a single Axum router. Everything interactive goes over `/api/ws`;
//! the HTTP routes serve leaderboards and match history to pages that do not
//! hold a socket.

pub mod ws;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::frame::ErrorCode;
use crate::game::GameMode;
use crate::protocol::{matches_data, scores_data};
use crate::services::persistence::StoreError;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ws", get(ws::handle_ws))
        .route("/api/scores/{mode}", get(scores))
        .route("/api/matches", get(matches))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn scores(State(state): State<AppState>, Path(mode): Path<String>) -> Response {
    let Some(mode) = GameMode::parse(&mode) else {
        return (StatusCode::NOT_FOUND, "unknown mode").into_response();
    };
    match state.store.top_scores(mode).await {
        Ok(rows) => Json(scores_data(mode, &rows)).into_response(),
        Err(e) => store_failure(&e),
    }
}

async fn matches(State(state): State<AppState>) -> Response {
    match state.store.matches().await {
        Ok(rows) => Json(matches_data(&rows)).into_response(),
        Err(e) => store_failure(&e),
    }
}

fn store_failure(e: &StoreError) -> Response {
    tracing::error!(error = %e, code = e.error_code(), "store read failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
