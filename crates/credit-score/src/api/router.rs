use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde_json::json;
use tracing::{error, warn};

use crate::accounts::{
    bearer_token, AccountError, AccountService, LoginRequest, RefreshRequest, RegisterRequest,
    User, UserRepository, UserUpdate,
};
use crate::error::AppError;
use crate::predictions::{
    record_prediction, NewPrediction, PredictionId, PredictionQuery, PredictionQueryParams,
    PredictionRepository, PredictionService, PredictionServiceError,
};
use crate::scoring::CreditApplication;
use crate::storage::RepositoryError;

/// Shared handler state: the two collaborators behind the HTTP surface.
pub struct ApiState<U, P> {
    pub accounts: Arc<AccountService<U>>,
    pub predictions: Arc<PredictionService<P>>,
}

impl<U, P> Clone for ApiState<U, P> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            predictions: Arc::clone(&self.predictions),
        }
    }
}

/// Router builder exposing account, scoring and history endpoints.
pub fn credit_router<U, P>(
    accounts: Arc<AccountService<U>>,
    predictions: Arc<PredictionService<P>>,
) -> Router
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    Router::new()
        .route("/register", post(register_handler::<U, P>))
        .route("/login", post(login_handler::<U, P>))
        .route("/token/refresh", post(refresh_handler::<U, P>))
        .route(
            "/users/me",
            get(me_handler::<U, P>).patch(update_me_handler::<U, P>),
        )
        .route("/predict", post(predict_handler::<U, P>))
        .route("/predictions", get(history_handler::<U, P>))
        .route("/predictions/count", get(count_handler::<U, P>))
        .route("/predictions/:prediction_id", delete(delete_handler::<U, P>))
        .with_state(ApiState {
            accounts,
            predictions,
        })
}

pub(crate) async fn register_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    Json(request): Json<RegisterRequest>,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    match state.accounts.register(request) {
        Ok(user) => (StatusCode::OK, Json(user.view())).into_response(),
        Err(err) => account_error_response(err),
    }
}

/// Accepts the OAuth2 password form or the same fields as JSON.
pub(crate) async fn login_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    request: Request,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let credentials = if is_json {
        match Json::<LoginRequest>::from_request(request, &()).await {
            Ok(Json(credentials)) => credentials,
            Err(rejection) => return rejection.into_response(),
        }
    } else {
        match Form::<LoginRequest>::from_request(request, &()).await {
            Ok(Form(credentials)) => credentials,
            Err(rejection) => return rejection.into_response(),
        }
    };

    match state.accounts.login(&credentials) {
        Ok(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn refresh_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    Json(request): Json<RefreshRequest>,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    match state.accounts.refresh(&request.refresh_token) {
        Ok(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn me_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    match authenticate(&state.accounts, &headers) {
        Ok(user) => (StatusCode::OK, Json(user.view())).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn update_me_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    headers: HeaderMap,
    Json(update): Json<UserUpdate>,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    let user = match authenticate(&state.accounts, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.accounts.update_profile(&user, update) {
        Ok(updated) => (StatusCode::OK, Json(updated.view())).into_response(),
        Err(err) => account_error_response(err),
    }
}

/// Score an application. A valid bearer token attaches the prediction to its
/// owner; storage happens on the blocking pool once the response is built.
pub(crate) async fn predict_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    headers: HeaderMap,
    Json(application): Json<CreditApplication>,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    let owner = match authorization(&headers) {
        Some(token) => match state.accounts.current_user(token) {
            Ok(user) => Some(user.id),
            Err(err) => {
                warn!(error = %err, "prediction submitted with invalid token; storing anonymously");
                None
            }
        },
        None => None,
    };

    let result = match state.predictions.score(&application) {
        Ok(result) => result,
        Err(err) => return AppError::from(err).into_response(),
    };

    let response = (StatusCode::OK, Json(&result)).into_response();

    let prediction = NewPrediction::from_result(&application, &result, owner);
    let repository = state.predictions.repository();
    tokio::task::spawn_blocking(move || {
        record_prediction(repository.as_ref(), prediction);
    });

    response
}

pub(crate) async fn history_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    headers: HeaderMap,
    Query(params): Query<PredictionQueryParams>,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    let user = match authenticate(&state.accounts, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .predictions
        .history(user.id, &PredictionQuery::from(params))
    {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => prediction_error_response(err, "Failed to fetch predictions"),
    }
}

pub(crate) async fn count_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    let user = match authenticate(&state.accounts, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.predictions.count(user.id) {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(err) => prediction_error_response(err, "Failed to count predictions"),
    }
}

pub(crate) async fn delete_handler<U, P>(
    State(state): State<ApiState<U, P>>,
    headers: HeaderMap,
    Path(prediction_id): Path<i64>,
) -> Response
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    let user = match authenticate(&state.accounts, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .predictions
        .delete(user.id, PredictionId(prediction_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => prediction_error_response(err, "Failed to delete prediction"),
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(bearer_token)
}

fn authenticate<U>(accounts: &AccountService<U>, headers: &HeaderMap) -> Result<User, Response>
where
    U: UserRepository + 'static,
{
    let Some(token) = authorization(headers) else {
        return Err(unauthorized("Not authenticated"));
    };
    accounts.current_user(token).map_err(account_error_response)
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({
        "error": message,
    });
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(payload),
    )
        .into_response()
}

fn account_error_response(err: AccountError) -> Response {
    match err {
        AccountError::InvalidCredentials | AccountError::Unauthorized => {
            unauthorized(&err.to_string())
        }
        AccountError::EmailTaken => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        AccountError::InvalidInput(message) => {
            let payload = json!({
                "error": message,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "account operation failed");
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn prediction_error_response(err: PredictionServiceError, context: &str) -> Response {
    match err {
        PredictionServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({
                "error": "Prediction not found",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "{}", context);
            let payload = json!({
                "error": context,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
