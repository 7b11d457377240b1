//! On-demand trigger surface
//!
//! `GET /` runs one reconciliation synchronously and answers with the
//! post-sync list of managed records. Every other method or path is 405.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use std::sync::Arc;
use zonesync_core::{SyncEngine, Trigger};

/// Build the trigger router around a shared engine
pub fn router(engine: Arc<SyncEngine>) -> Router {
    Router::new()
        .route("/", get(sync_now))
        .fallback(method_not_allowed)
        .with_state(engine)
}

async fn sync_now(State(engine): State<Arc<SyncEngine>>) -> Response {
    match engine.run_once(Trigger::OnDemand).await {
        Ok(report) => Json(report.records).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}
