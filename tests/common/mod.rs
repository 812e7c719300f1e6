//! Shared fixtures for the HTTP-level tests.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use tasktrack::app::router;
use tasktrack::filter::FilterPipeline;
use tasktrack::handlers::USER_ID_HEADER;
use tasktrack::models::NewTask;
use tasktrack::rate_limit::{AdmissionController, RateLimitConfig};
use tasktrack::state::AppState;
use tasktrack::store::{InMemoryTaskStore, TaskStore};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryTaskStore>,
}

pub fn test_app(limit: u32, window: Duration, workers: usize) -> TestApp {
    let store = Arc::new(InMemoryTaskStore::new());
    let config = RateLimitConfig::new(limit, window).unwrap();

    let state = Arc::new(AppState {
        store: Arc::clone(&store) as Arc<dyn TaskStore>,
        admission: Arc::new(AdmissionController::new(config)),
        pipeline: FilterPipeline::with_workers(workers).unwrap(),
        filter_deadline: Duration::from_secs(5),
        trust_forwarded_for: true,
    });

    TestApp {
        router: router(state),
        store,
    }
}

// generous limit for tests that are not about admission
pub fn roomy_app(workers: usize) -> TestApp {
    test_app(10_000, Duration::from_secs(60), workers)
}

pub fn get(uri: &str, user: Option<u64>, client: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

pub fn send_json(method: &str, uri: &str, user: u64, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.1")
        .header(USER_ID_HEADER, user.to_string())
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn call(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn seed(store: &InMemoryTaskStore, owner: u64, name: &str, category: Option<&str>) {
    store
        .create(
            owner,
            NewTask {
                task_name: name.to_string(),
                category: category.map(str::to_string),
                ..NewTask::default()
            },
        )
        .unwrap();
}
