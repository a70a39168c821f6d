use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::Settings;
use database::{ConnectionPool, QueryExecutor};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod response;

use error::{AppError, Failure};

/// The shared application state that all handlers can access.
pub struct AppState {
    pub executor: QueryExecutor,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Builds state around a lazily connected pool; no connection is opened yet.
    pub fn new(settings: Settings) -> Self {
        let pool = ConnectionPool::connect_lazy(&settings);
        Self {
            executor: QueryExecutor::new(pool),
            settings: Arc::new(settings),
        }
    }

    /// Wraps a failure, exposing its raw text outside production.
    pub fn fail(&self, message: impl Into<String>, failure: impl Into<Failure>) -> AppError {
        AppError {
            message: message.into(),
            failure: failure.into(),
            expose_details: !self.settings.server.environment.is_production(),
        }
    }
}

/// All routes, with CORS and request tracing applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/test/env-check", get(handlers::env_check))
        .route("/api/test/db-test", get(handlers::db_test))
        .route("/api/test/network-test", get(handlers::network_test))
        .route("/api/test/create-tables", post(handlers::create_tag_tables))
        .route("/api/test/insert-test-data", post(handlers::insert_tag_data))
        .route("/api/tags", get(handlers::get_tags))
        .route("/api/snippets", get(handlers::get_snippets))
        .route("/api/snippets/recommended", get(handlers::get_recommended_snippets))
        .route("/api/demo/create-tables", post(handlers::create_category_tables))
        .route("/api/demo/insert-data", post(handlers::insert_category_data))
        .route("/api/demo/categories", get(handlers::get_categories))
        .route("/api/demo/animals", get(handlers::get_animals))
        .route("/api/demo/statistics", get(handlers::get_statistics))
        .route("/api/demo/view-data", get(handlers::view_data))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

/// Serves the API on `0.0.0.0:<server.port>` until the process is stopped.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
    let state = Arc::new(AppState::new(settings));
    tracing::info!(
        database = %state.executor.pool().diagnostics(),
        environment = %state.settings.server.environment,
        "Database pool initialised."
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
