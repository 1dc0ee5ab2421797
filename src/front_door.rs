//! HTTP gateway in front of the lookup backend.
//!
//! `GET /search?key=<int>` validates the key, forwards it over RPC and echoes
//! the result. Malformed keys never reach the backend.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tonic::async_trait;

use crate::error::LookupResult;
use crate::lookup::SearchResponse;
use crate::service::client::RpcClient;

pub const MISSING_KEY: &str = "Bad Request: 'key' parameter missing.";
pub const NOT_AN_INTEGER: &str = "Bad Request: 'key' must be an integer.";
pub const BACKEND_DOWN: &str = "Service Unavailable: The data service could not be reached.";

/// Anything that can answer a membership query for the gateway.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn search(&self, key: i64) -> LookupResult<SearchResponse>;
}

#[async_trait]
impl Backend for RpcClient {
    async fn search(&self, key: i64) -> LookupResult<SearchResponse> {
        RpcClient::search(self, key).await
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchReply {
    pub key_searched: i64,
    pub found: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReply {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorReply {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub fn router(backend: Arc<dyn Backend>) -> Router {
    Router::new()
        .route("/search", get(search))
        .with_state(backend)
}

async fn search(
    State(backend): State<Arc<dyn Backend>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(raw) = params.key else {
        tracing::warn!("search request without key");
        return error_response(StatusCode::BAD_REQUEST, MISSING_KEY);
    };

    let Ok(key) = raw.trim().parse::<i64>() else {
        tracing::warn!(key = %raw, "search request with non-integer key");
        return error_response(StatusCode::BAD_REQUEST, NOT_AN_INTEGER);
    };

    tracing::info!(key, "forwarding search to backend");
    match backend.search(key).await {
        Ok(reply) => Json(SearchReply {
            key_searched: key,
            found: reply.found,
            error: reply.error,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(key, error = %e, "backend lookup failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, BACKEND_DOWN)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Answers from a fixed key list and counts how often it was asked.
    #[derive(Default)]
    struct FixedBackend {
        keys: Vec<i64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Backend for FixedBackend {
        async fn search(&self, key: i64) -> LookupResult<SearchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchResponse {
                found: self.keys.contains(&key),
                error: None,
            })
        }
    }

    struct DownBackend;

    #[async_trait]
    impl Backend for DownBackend {
        async fn search(&self, _key: i64) -> LookupResult<SearchResponse> {
            Err(LookupError::Timeout(std::time::Duration::from_secs(2)))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_found_key() {
        let backend = Arc::new(FixedBackend {
            keys: vec![17],
            ..Default::default()
        });

        let (status, reply): (_, SearchReply) = get_json(router(backend), "/search?key=17").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            reply,
            SearchReply {
                key_searched: 17,
                found: true,
                error: None
            }
        );
    }

    #[tokio::test]
    async fn test_reply_serializes_null_error() {
        let backend = Arc::new(FixedBackend::default());

        let (status, reply): (_, serde_json::Value) =
            get_json(router(backend), "/search?key=99").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            reply,
            serde_json::json!({"key_searched": 99, "found": false, "error": null})
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_client_error() {
        let backend = Arc::new(FixedBackend::default());

        let (status, reply): (_, ErrorReply) = get_json(router(backend.clone()), "/search").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.error, MISSING_KEY);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_integer_key_never_reaches_backend() {
        let backend = Arc::new(FixedBackend::default());

        let (status, reply): (_, ErrorReply) =
            get_json(router(backend.clone()), "/search?key=abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.error, NOT_AN_INTEGER);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_down_is_service_unavailable() {
        let (status, reply): (_, ErrorReply) =
            get_json(router(Arc::new(DownBackend)), "/search?key=17").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(reply.error, BACKEND_DOWN);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = router(Arc::new(DownBackend))
            .oneshot(Request::builder().uri("/lookup").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
