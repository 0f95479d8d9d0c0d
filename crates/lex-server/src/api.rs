//! Routes and handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use lex_core::{ContentHash, GenerationRequest};
use lex_pipeline::{Caller, CancelToken, Pipeline, PipelineError, PipelineResponse};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Header carrying a caller id when no bearer token is sent
pub const CALLER_HEADER: &str = "x-caller-id";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Wrap a pipeline for sharing across requests
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short description
    pub error: String,
    /// Underlying cause, for internal failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Whether repeating the request may succeed
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn json_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            details: None,
            retryable: false,
        }),
    )
}

/// Build the router
///
/// Requests running longer than `request_timeout` are dropped by the
/// timeout layer, which cancels the in-flight pipeline run.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/sequential-thinking", post(sequential_thinking))
        .route("/healthz", get(healthz))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn sequential_thinking(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let caller = extract_caller(&headers)?;
    let Json(request) = req.map_err(|rejection| json_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    let cancel = CancelToken::new();
    let guard = cancel.drop_guard();
    let result = state.pipeline.run(&request, &caller, &cancel).await;
    guard.disarm();

    match result {
        Ok(response) => {
            tracing::info!(
                caller = %caller.id,
                completo = response.is_complete(),
                "document generated"
            );
            Ok(Json(response))
        }
        Err(e) => Err(pipeline_error(&e)),
    }
}

fn pipeline_error(e: &PipelineError) -> ApiError {
    if e.is_input_error() {
        tracing::debug!(error = %e, "rejected request");
        return json_error(StatusCode::BAD_REQUEST, e.to_string());
    }
    tracing::error!(error = %e, retryable = e.is_retryable(), "pipeline failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "document generation failed".to_string(),
            details: Some(e.to_string()),
            retryable: e.is_retryable(),
        }),
    )
}

/// Identify the caller from a bearer token or the caller id header
///
/// Tokens are never logged or echoed; the caller id derived from one is a
/// short hash of it.
fn extract_caller(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        let id = format!("bearer:{}", ContentHash::compute(token.as_bytes()).short());
        return Ok(Caller::new(id));
    }

    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(Caller::new)
        .ok_or_else(|| {
            json_error(
                StatusCode::UNAUTHORIZED,
                format!("missing caller identity: send a bearer token or {CALLER_HEADER}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_hashed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secreto"));
        let caller = extract_caller(&headers).unwrap();
        assert!(caller.id.starts_with("bearer:"));
        assert!(!caller.id.contains("secreto"));
        assert!(caller.autorizado);
    }

    #[test]
    fn bearer_takes_precedence_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(CALLER_HEADER, HeaderValue::from_static("analista"));
        assert!(extract_caller(&headers).unwrap().id.starts_with("bearer:"));
    }

    #[test]
    fn caller_header_used_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(CALLER_HEADER, HeaderValue::from_static(" analista "));
        assert_eq!(extract_caller(&headers).unwrap().id, "analista");
    }

    #[test]
    fn blank_identity_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        headers.insert(CALLER_HEADER, HeaderValue::from_static(""));
        let (status, Json(body)) = extract_caller(&headers).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.error.contains(CALLER_HEADER));
    }

    #[test]
    fn input_errors_map_to_bad_request() {
        let e = PipelineError::from(lex_core::ModelError::MissingField("tema"));
        assert_eq!(pipeline_error(&e).0, StatusCode::BAD_REQUEST);
        assert_eq!(pipeline_error(&PipelineError::Cancelled).0, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(pipeline_error(&PipelineError::Cancelled).1.details.is_some());
    }
}
