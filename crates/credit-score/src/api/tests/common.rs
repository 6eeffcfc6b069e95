use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

use crate::accounts::tests::common::{issuer, MemoryUsers, PASSWORD};
use crate::accounts::{AccountService, TokenPair};
use crate::api::credit_router;
use crate::predictions::tests::common::MemoryPredictions;
use crate::predictions::{PredictionRecord, PredictionRepository, PredictionService};
use crate::scoring::tests::common::static_context;
use crate::scoring::ScoringContext;

pub(super) struct Harness {
    pub(super) router: Router,
    pub(super) predictions: Arc<MemoryPredictions>,
}

pub(super) fn harness(p_default: f64) -> Harness {
    harness_with(static_context(p_default))
}

pub(super) fn harness_with(context: ScoringContext) -> Harness {
    let predictions = Arc::new(MemoryPredictions::default());
    let router = router_with(context, predictions.clone());
    Harness {
        router,
        predictions,
    }
}

pub(super) fn router_with<P>(context: ScoringContext, predictions: Arc<P>) -> Router
where
    P: PredictionRepository + 'static,
{
    let accounts = Arc::new(AccountService::new(
        Arc::new(MemoryUsers::default()),
        issuer(),
    ));
    let predictions = Arc::new(PredictionService::new(Arc::new(context), predictions));
    credit_router(accounts, predictions)
}

pub(super) async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes")
}

pub(super) fn json_request<T: Serialize>(
    method: Method,
    uri: &str,
    payload: &T,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(payload).expect("serializes")))
        .expect("valid request")
}

pub(super) fn authed_request(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("valid request")
}

pub(super) fn form_login(email: &str, password: &str) -> Request<Body> {
    let body = format!(
        "username={}&password={}",
        email.replace('@', "%40"),
        password
    );
    Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("valid request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn register_and_login(router: &Router, email: &str) -> TokenPair {
    let registration = serde_json::json!({
        "email": email,
        "username": "ada",
        "password": PASSWORD,
    });
    let response = send(
        router,
        json_request(Method::POST, "/register", &registration, None),
    )
    .await;
    assert!(response.status().is_success(), "registration failed");

    let response = send(router, form_login(email, PASSWORD)).await;
    assert!(response.status().is_success(), "login failed");
    serde_json::from_value(read_json_body(response).await).expect("token pair")
}

/// Persistence runs on the blocking pool after the response; poll until it lands.
pub(super) fn wait_for_records(
    repository: &MemoryPredictions,
    expected: usize,
) -> Vec<PredictionRecord> {
    for _ in 0..300 {
        let records = repository.all();
        if records.len() >= expected {
            return records;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    repository.all()
}
