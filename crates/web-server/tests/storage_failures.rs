use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use configuration::EnrollmentSettings;
use database::{DbError, InMemoryRepository, TransactionalStore, TxHandle};
use enrollment::{EnrollmentManager, EnrollmentQueryService};
use serde_json::{json, Value};
use tower::ServiceExt;
use web_server::{build_router, AppState};

const INTERNAL_DETAIL: &str = "connection to 10.0.3.7:5432 reset by peer";

/// Fails every transaction before it starts.
struct BrokenStore {
    error: fn() -> DbError,
}

#[async_trait]
impl TransactionalStore for BrokenStore {
    async fn begin_serializable(&self) -> Result<TxHandle, DbError> {
        Err((self.error)())
    }
}

fn app(error: fn() -> DbError) -> axum::Router {
    let repo = Arc::new(InMemoryRepository::new());
    let settings = EnrollmentSettings {
        max_retries: 2,
        retry_backoff_ms: 1,
    };
    let state = AppState {
        store: repo.clone(),
        enrollments: EnrollmentManager::new(Arc::new(BrokenStore { error }), &settings),
        queries: EnrollmentQueryService::new(repo),
    };
    build_router(Arc::new(state))
}

async fn send(app: &axum::Router, method: Method, uri: &str, payload: Option<Value>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match payload {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    (status, String::from_utf8_lossy(&body).into_owned())
}

fn enrollment_payload() -> Value {
    json!({ "studentId": 1, "subjectId": 1, "academicPeriod": "2024-1" })
}

#[tokio::test]
async fn storage_failures_answer_500_without_internal_details() {
    let app = app(|| DbError::Backend(INTERNAL_DETAIL.to_string()));

    let (status, body) = send(&app, Method::POST, "/enrollments", Some(enrollment_payload())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains(INTERNAL_DETAIL), "leaked: {body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, json!({ "error": "An error occurred while processing the enrollment" }));

    let (status, body) = send(&app, Method::DELETE, "/enrollments/1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains(INTERNAL_DETAIL), "leaked: {body}");
}

#[tokio::test]
async fn exhausted_retries_answer_409() {
    let app = app(|| DbError::SerializationFailure("could not serialize access".to_string()));

    let (status, body) = send(&app, Method::POST, "/enrollments", Some(enrollment_payload())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("after 3 attempts"));

    let (status, _) = send(&app, Method::DELETE, "/enrollments/1", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
