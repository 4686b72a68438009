//! API route definitions.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status_all))
        .route("/status/target", get(status_one))
}

/// Liveness plus what is being watched. `checked` counts targets that have
/// completed at least one check.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.query.query_all().await;
    let checked = snapshot.values().filter(|h| h.latest().is_some()).count();
    let up = snapshot
        .values()
        .filter(|h| h.latest().is_some_and(|r| r.success))
        .count();

    Json(json!({
        "data": {
            "status": "ok",
            "targets": state.query.target_count(),
            "checked": checked,
            "up": up,
            "history_capacity": state.query.history_capacity()
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn status_all(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.query.query_all().await;
    Json(json!({
        "data": snapshot,
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "total": snapshot.len(),
            "history_capacity": state.query.history_capacity()
        }
    }))
}

#[derive(Debug, Deserialize)]
struct TargetParams {
    url: String,
}

async fn status_one(State(state): State<AppState>, Query(params): Query<TargetParams>) -> Response {
    match state.query.query_one(&params.url).await {
        Some(history) => Json(json!({
            "data": history,
            "meta": {
                "url": params.url,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "data": null,
                "meta": { "url": params.url, "message": "url is not monitored" }
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{router, state::AppState};
    use crate::probes::{CheckResult, ProbeFailure, Target};
    use crate::query::StatusQuery;
    use crate::storage::HistoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    async fn app() -> axum::Router {
        let targets = vec![
            Target::parse("http://a.test/", Some("Alpha".into())).unwrap(),
            Target::parse("http://b.test/", None).unwrap(),
        ];
        let store = Arc::new(HistoryStore::new(&targets, 3));
        store
            .record("http://a.test/", CheckResult::from_status(Utc::now(), 200, 8.0))
            .await;
        store
            .record(
                "http://b.test/",
                CheckResult::failed(Utc::now(), None, 2.0, ProbeFailure::ConnectionRefused, "refused"),
            )
            .await;
        router(AppState::new(StatusQuery::new(store)))
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 100_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, json) = get_json(app().await, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["targets"], 2);
        assert_eq!(json["data"]["checked"], 2);
        assert_eq!(json["data"]["up"], 1);
        assert_eq!(json["data"]["history_capacity"], 3);
        assert!(json["meta"]["version"].is_string());
    }

    #[tokio::test]
    async fn test_health_before_first_check() {
        let targets = vec![Target::parse("http://a.test/", None).unwrap()];
        let store = Arc::new(HistoryStore::new(&targets, 5));
        let app = router(AppState::new(StatusQuery::new(store)));

        let (_, json) = get_json(app, "/api/v1/health").await;
        assert_eq!(json["data"]["targets"], 1);
        assert_eq!(json["data"]["checked"], 0);
        assert_eq!(json["data"]["up"], 0);
    }

    #[tokio::test]
    async fn test_status_keyed_by_url() {
        let (status, json) = get_json(app().await, "/api/v1/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["total"], 2);
        assert_eq!(json["meta"]["history_capacity"], 3);

        let a = &json["data"]["http://a.test/"];
        assert_eq!(a["label"], "Alpha");
        assert_eq!(a["latest"]["success"], true);
        assert_eq!(a["latest"]["status_code"], 200);
        assert_eq!(a["recent"].as_array().unwrap().len(), 1);

        let b = &json["data"]["http://b.test/"];
        assert_eq!(b["latest"]["success"], false);
        assert_eq!(b["latest"]["failure"], "connection_refused");
        assert!(b["latest"]["status_code"].is_null());
    }

    #[tokio::test]
    async fn test_single_target_status() {
        let (status, json) =
            get_json(app().await, "/api/v1/status/target?url=http%3A%2F%2Fa.test%2F").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["url"], "http://a.test/");
        assert_eq!(json["data"]["latest"]["latency_ms"], 8.0);
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let (status, json) =
            get_json(app().await, "/api/v1/status/target?url=http%3A%2F%2Fz.test%2F").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_route_falls_back() {
        let (status, json) = get_json(app().await, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["data"].is_null());
        assert_eq!(json["meta"]["path"], "/nope");
    }
}
