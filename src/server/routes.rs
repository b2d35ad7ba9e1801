//! HTTP routes
//!
//! ```text
//! GET  /                               health check
//! GET  /ws/traffic                     live updates (WebSocket)
//! POST /traffic-flow/traffic/record    record a measurement
//! GET  /traffic-flow/traffic/latest    most recent measurements
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::state::AppState;
use super::websocket;
use crate::event::{NewTrafficRecord, TrafficRecord};
use crate::store::StoreError;

/// Error returned by HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(msg) => ApiError::BadRequest(msg),
            StoreError::Unavailable(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/ws/traffic", get(websocket::upgrade))
        .route("/traffic-flow/traffic/record", post(record_traffic))
        .route("/traffic-flow/traffic/latest", get(latest_traffic))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn record_traffic(
    State(state): State<AppState>,
    body: Result<Json<NewTrafficRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<TrafficRecord>), ApiError> {
    let Json(new) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    new.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let record = state.ingestor.record(new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
struct LatestParams {
    limit: Option<String>,
}

async fn latest_traffic(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Result<Json<Vec<TrafficRecord>>, ApiError> {
    let limit = match params.limit {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::BadRequest("Invalid limit parameter".into()))?,
        None => state.latest_default_limit,
    };

    let records = state.ingestor.store().fetch_recent(limit).await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tokio::sync::watch;
    use tower::ServiceExt;

    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::event::TrafficUpdate;
    use crate::ingest::Ingestor;
    use crate::registry::{SubscriberHandle, SubscriberRegistry};
    use crate::store::{MemoryStore, TrafficStore};
    use crate::testing::{within, RecordingSink, ScriptedStore};

    struct Harness {
        router: Router,
        registry: Arc<SubscriberRegistry>,
        _closing: watch::Sender<bool>,
    }

    fn harness(store: Arc<dyn TrafficStore>) -> Harness {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
        let ingestor = Ingestor::new(store, broadcaster);
        let (closing, closing_rx) = watch::channel(false);
        let state = AppState::new(Arc::clone(&registry), ingestor, 100, 0, closing_rx);

        Harness {
            router: router(state),
            registry,
            _closing: closing,
        }
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(Arc::new(MemoryStore::new()));
        let (status, body) = call(&h.router, Method::GET, "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_record_stores_and_broadcasts() {
        let h = harness(Arc::new(MemoryStore::new()));
        let (sink, mut rx) = RecordingSink::new();
        h.registry.register(SubscriberHandle::new(sink));

        let (status, body) = call(
            &h.router,
            Method::POST,
            "/traffic-flow/traffic/record",
            Some(r#"{"sensor_id":7,"traffic_volume":120,"average_speed":42.0,"congestion_level":"moderate"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sensor_id"], 7);
        assert_eq!(body["traffic_volume"], 120);
        assert_eq!(body["congestion_level"], "moderate");

        let bytes = within(rx.recv()).await.unwrap();
        match serde_json::from_slice::<TrafficUpdate>(&bytes).unwrap() {
            TrafficUpdate::Single(record) => assert_eq!(record.traffic_id, body["traffic_id"]),
            other => panic!("expected single update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_record_rejects_bad_level() {
        let h = harness(Arc::new(MemoryStore::new()));
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/traffic-flow/traffic/record",
            Some(r#"{"sensor_id":7,"traffic_volume":120,"average_speed":42.0,"congestion_level":"gridlock"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_record_rejects_invalid_values() {
        let h = harness(Arc::new(MemoryStore::new()));
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/traffic-flow/traffic/record",
            Some(r#"{"sensor_id":0,"traffic_volume":120,"average_speed":42.0,"congestion_level":"low"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("sensor_id"));
    }

    #[tokio::test]
    async fn test_record_store_failure() {
        let h = harness(Arc::new(ScriptedStore::empty().failing_writes()));
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/traffic-flow/traffic/record",
            Some(r#"{"sensor_id":1,"traffic_volume":1,"average_speed":1.0,"congestion_level":"low"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("write refused"));
    }

    #[tokio::test]
    async fn test_latest_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(store.clone());
        for volume in [10, 20, 30] {
            store
                .record(NewTrafficRecord::new(
                    1,
                    volume,
                    40.0,
                    crate::event::CongestionLevel::Low,
                ))
                .await
                .unwrap();
        }

        let (status, body) = call(&h.router, Method::GET, "/traffic-flow/traffic/latest?limit=2", None).await;

        assert_eq!(status, StatusCode::OK);
        let volumes: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["traffic_volume"].as_i64().unwrap())
            .collect();
        assert_eq!(volumes, vec![30, 20]);
    }

    #[tokio::test]
    async fn test_latest_bad_limit() {
        let h = harness(Arc::new(MemoryStore::new()));
        let (status, body) = call(&h.router, Method::GET, "/traffic-flow/traffic/latest?limit=abc", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid limit parameter");
    }

    #[tokio::test]
    async fn test_latest_store_failure() {
        let store = ScriptedStore::new(vec![Err(StoreError::Unavailable("db down".into()))], Vec::new());
        let h = harness(Arc::new(store));
        let (status, _) = call(&h.router, Method::GET, "/traffic-flow/traffic/latest", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
