//! Status API: read-only JSON views over the check history.

mod routes;
pub mod state;

use self::state::AppState;
use axum::{
    http::{StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

/// Everything lives under `/api/v1`; other paths get a JSON 404.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "data": null,
            "meta": { "path": uri.path(), "message": "no such route" }
        })),
    )
}
