use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use credit_score::accounts::{AccountService, TokenIssuer};
use credit_score::credit_router;
use credit_score::predictions::PredictionService;
use credit_score::scoring::{load_context, CreditApplication, Decision, RiskLevel, ScoringContext};
use credit_score::storage::SqliteStore;

fn bundled_context() -> ScoringContext {
    let path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/credit_scoring_model.json");
    load_context(path).expect("bundled model loads")
}

fn form_payload() -> Value {
    json!({
        "client_name": "Baobab Traders",
        "age": 35,
        "income": 120000,
        "employment": "employed",
        "loanAmount": 10000,
        "loanPurpose": "business",
        "location": "Douala",
        "phoneUsage": "moderate",
        "utilityPayments": "excellent",
        "interestRate": 8,
        "turnover": 300000,
        "customerTenure": 30,
        "avgDaysLateCurrent": 0,
        "numLatePaymentsCurrent": 0,
        "unpaidAmount": 0,
        "industrySector": "technology",
        "creditType": "consumer_loan",
        "hasGuarantee": "yes",
        "guaranteeType": "collateral",
        "repaymentFrequency": "monthly"
    })
}

fn build_router() -> Router {
    let store = Arc::new(SqliteStore::in_memory().expect("in-memory database"));
    let tokens = TokenIssuer::new(
        "workflow-secret",
        chrono::Duration::minutes(30),
        chrono::Duration::days(7),
    );
    let accounts = Arc::new(AccountService::new(store.clone(), tokens));
    let predictions = Arc::new(PredictionService::new(Arc::new(bundled_context()), store));
    credit_router(accounts, predictions)
}

fn request(method: Method, uri: &str, body: Option<&Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(payload) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(payload).expect("serializes"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json payload")
    };
    (status, payload)
}

async fn wait_for_count(router: &Router, token: &str, expected: i64) -> i64 {
    let mut count = 0;
    for _ in 0..200 {
        let (_, payload) = call(
            router,
            request(Method::GET, "/predictions/count", None, Some(token)),
        )
        .await;
        count = payload["count"].as_i64().unwrap_or_default();
        if count >= expected {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    count
}

#[test]
fn bundled_model_scores_form_payload() {
    let context = bundled_context();
    let application: CreditApplication =
        serde_json::from_value(form_payload()).expect("form payload deserializes");

    let result = context.score(&application).expect("scores");
    assert_eq!(result.client, "Baobab Traders");
    assert_eq!(result.credit_score, 714);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.decision, Decision::Approved);
    assert_eq!(result.model_version, "1.0");
}

#[test]
fn missing_client_name_defaults_to_applicant() {
    let mut payload = form_payload();
    payload
        .as_object_mut()
        .expect("object payload")
        .remove("client_name");
    let application: CreditApplication =
        serde_json::from_value(payload).expect("form payload deserializes");

    let result = bundled_context().score(&application).expect("scores");
    assert_eq!(result.client, "Applicant");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn account_and_history_lifecycle_on_sqlite() {
    let router = build_router();

    let (status, user) = call(
        &router,
        request(
            Method::POST,
            "/register",
            Some(&json!({
                "email": "Grace@Example.com",
                "username": "grace",
                "password": "correct-horse-battery",
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "grace@example.com");
    assert!(user.get("hashed_password").is_none());

    let (status, duplicate) = call(
        &router,
        request(
            Method::POST,
            "/register",
            Some(&json!({
                "email": "grace@example.com",
                "username": "grace2",
                "password": "correct-horse-battery",
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate["error"], "Email already registered");

    let (status, tokens) = call(
        &router,
        request(
            Method::POST,
            "/login",
            Some(&json!({
                "username": "grace@example.com",
                "password": "correct-horse-battery",
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "bearer");
    let access = tokens["access_token"]
        .as_str()
        .expect("access token")
        .to_string();

    let (status, scored) = call(
        &router,
        request(Method::POST, "/predict", Some(&form_payload()), Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scored["creditScore"], 714);

    assert_eq!(wait_for_count(&router, &access, 1).await, 1);

    let (status, history) = call(
        &router,
        request(Method::GET, "/predictions", None, Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().expect("history array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["client_name"], "Baobab Traders");
    assert_eq!(entries[0]["credit_score"], 714);
    let id = entries[0]["id"].as_i64().expect("prediction id");

    let (status, _) = call(
        &router,
        request(
            Method::DELETE,
            &format!("/predictions/{id}"),
            None,
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, missing) = call(
        &router,
        request(
            Method::DELETE,
            &format!("/predictions/{id}"),
            None,
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"], "Prediction not found");
}

#[tokio::test]
async fn history_requires_a_bearer_token() {
    let router = build_router();
    let (status, payload) = call(&router, request(Method::GET, "/predictions", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(payload["error"], "Not authenticated");
}
