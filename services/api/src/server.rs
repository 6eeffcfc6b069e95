use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryPredictionRepository, InMemoryUserRepository};
use crate::routes::with_service_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use credit_score::accounts::{AccountService, TokenIssuer, UserRepository};
use credit_score::config::AppConfig;
use credit_score::credit_router;
use credit_score::error::AppError;
use credit_score::predictions::{PredictionRepository, PredictionService};
use credit_score::scoring::{load_context, ScoringContext};
use credit_score::storage::SqliteStore;
use credit_score::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(model) = args.model.take() {
        config.model.artifact_path = model;
    }

    telemetry::init(&config.telemetry)?;

    let context = load_context(&config.model.artifact_path).map_err(|err| {
        error!(
            path = %config.model.artifact_path.display(),
            error = %err,
            "failed to load model artifact"
        );
        err
    })?;
    info!(
        version = context.model_version(),
        features = context.feature_names().len(),
        "model loaded"
    );
    let context = Arc::new(context);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        model_version: Arc::from(context.model_version()),
    };

    let tokens = TokenIssuer::from_config(&config.auth);
    let router = match &config.storage.database_path {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            info!(path = %path.display(), "using sqlite storage");
            build_router(store.clone(), store, tokens, context)
        }
        None => {
            info!("using in-memory storage");
            build_router(
                Arc::new(InMemoryUserRepository::default()),
                Arc::new(InMemoryPredictionRepository::default()),
                tokens,
                context,
            )
        }
    };

    let app = with_service_routes(router)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "credit scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router<U, P>(
    users: Arc<U>,
    predictions: Arc<P>,
    tokens: TokenIssuer,
    context: Arc<ScoringContext>,
) -> Router
where
    U: UserRepository + 'static,
    P: PredictionRepository + 'static,
{
    let accounts = Arc::new(AccountService::new(users, tokens));
    let predictions = Arc::new(PredictionService::new(context, predictions));
    credit_router(accounts, predictions)
}
