//! Status mapping of the HTTP boundary

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lex_server::{router, AppState};
use lex_test_utils::{pipeline, StubFetcher};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    router(
        AppState::new(pipeline(Arc::new(StubFetcher::complete()))),
        Duration::from_secs(60),
    )
}

fn post() -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri("/sequential-thinking")
        .header(header::CONTENT_TYPE, "application/json")
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn valid_body() -> String {
    json!({
        "objetivo": "memorando",
        "tema": "responsabilidad civil extracontractual",
        "audiencia": "equipo jurídico",
    })
    .to_string()
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let body = valid_body();
    let (status, json) = send(post().body(Body::from(body)).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, json) = send(
        post()
            .header("x-caller-id", "analista")
            .body(Body::from("{\"objetivo\": "))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_blank_tema_is_bad_request() {
    let body = json!({ "objetivo": "memorando", "tema": "   " }).to_string();
    let (status, json) = send(
        post()
            .header("x-caller-id", "analista")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("tema"));
}

#[tokio::test]
async fn test_underspecified_tema_is_bad_request() {
    let body = json!({ "objetivo": "memorando", "tema": "de la" }).to_string();
    let (status, _) = send(
        post()
            .header("x-caller-id", "analista")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_valid_request_returns_aggregate_response() {
    let body = valid_body();
    let (status, json) = send(
        post()
            .header(header::AUTHORIZATION, "Bearer token-de-prueba")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["planner"].is_object());
    assert!(json["retriever"].is_object());
    assert!(json["drafter"].is_object());
    assert!(json["verifier"].is_object());
    assert!(json["texto_final"].as_str().unwrap().starts_with('#'));

    let solicitante = json["finalizer"]["trazabilidad"]["controles_seguridad"]["control_acceso"]["solicitante"]
        .as_str()
        .unwrap();
    assert!(solicitante.starts_with("bearer:"));
    assert!(!solicitante.contains("token-de-prueba"));
}

#[tokio::test]
async fn test_healthz() {
    let response = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
