//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the health routes and any domain routes
//! - Wire up middleware (tracing, request ID, CORS, limits, security headers)
//! - Funnel handler faults through one formatting stage
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{Environment, ServerConfig};
use crate::db::{ConfigurationError, Pool};
use crate::health::{database_health, liveness, DatabaseState};
use crate::http::error::{format_faults, json_rejections, not_found, panic_to_fault};
use crate::http::request::{make_span, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::security;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<DatabaseState>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(database: DatabaseState, environment: Environment) -> Self {
        Self {
            database: Arc::new(database),
            environment,
        }
    }

    /// The pool, if it was configured.
    pub fn pool(&self) -> Result<&Pool, ConfigurationError> {
        self.database.pool()
    }
}

/// HTTP server for the backend.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server exposing only the built-in routes.
    pub fn new(config: ServerConfig, database: DatabaseState) -> Self {
        Self::with_routes(config, database, Router::new())
    }

    /// Create a server with additional routes mounted next to the built-in
    /// ones. They share the fallback, fault formatting and middleware stack.
    pub fn with_routes(config: ServerConfig, database: DatabaseState, routes: Router<AppState>) -> Self {
        let state = AppState::new(database, config.environment);
        let router = Self::build_router(&config, state, routes);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState, routes: Router<AppState>) -> Router {
        let router = Router::new()
            .route("/", get(liveness))
            .route("/health/db", get(database_health))
            .merge(routes)
            .fallback(not_found)
            .method_not_allowed_fallback(not_found)
            .with_state(state.clone())
            .layer(CatchPanicLayer::custom(panic_to_fault))
            .layer(middleware::from_fn_with_state(state.environment, format_faults));

        let router = security::limits::apply(router, config).layer(middleware::from_fn(json_rejections));
        let router = security::headers::apply(router);

        router
            .layer(CorsLayer::permissive())
            .layer(middleware::from_fn(record_request))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(make_span::<axum::body::Body>))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = ?self.config.environment,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::recv(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

async fn record_request(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16());
    response
}
