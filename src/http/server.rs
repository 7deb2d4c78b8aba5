//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, rate limit)
//! - Prepare the temp directory and background sweeper
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ApiCredentials, AppConfig};
use crate::enrichment::Enricher;
use crate::http::handlers;
use crate::http::request::make_request_span;
use crate::security::headers::apply_security_headers;
use crate::security::rate_limit::{rate_limit_middleware, run_sweeper, BudgetParseError, RateLimiter};
use crate::upload::{StorageError, TransientFileStore, UploadValidator};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid rate limit configuration: {0}")]
    RateLimit(#[from] BudgetParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<UploadValidator>,
    pub store: Arc<TransientFileStore>,
    pub enricher: Arc<dyn Enricher>,
    pub credentials: Arc<ApiCredentials>,
    pub enrichment_timeout: Duration,
}

/// HTTP server for the upload form.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    rate_limiter: Arc<RateLimiter>,
    store: Arc<TransientFileStore>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: AppConfig,
        credentials: ApiCredentials,
        enricher: Arc<dyn Enricher>,
    ) -> Result<Self, ServerError> {
        let rate_limiter = Arc::new(RateLimiter::for_upload_route(&config.rate_limit)?);
        let store = Arc::new(TransientFileStore::new(&config.upload.temp_dir));

        let state = AppState {
            validator: Arc::new(UploadValidator::new(&config.upload.allowed_extensions)),
            store: store.clone(),
            enricher,
            credentials: Arc::new(credentials),
            enrichment_timeout: Duration::from_secs(config.enrichment.timeout_secs),
        };

        let router = Self::build_router(&config, state, rate_limiter.clone());
        Ok(Self {
            router,
            config,
            rate_limiter,
            store,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
        let upload_routes = Router::new()
            .route("/", get(handlers::index).post(handlers::upload))
            .layer(DefaultBodyLimit::max(config.upload.max_body_bytes))
            .route_layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

        let router = Router::new()
            .merge(upload_routes)
            .route("/health", get(handlers::health))
            .with_state(state);

        let router = if config.security.enable_headers {
            apply_security_headers(router)
        } else {
            router
        };

        router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        self.store.ensure_dir().await?;

        tracing::info!(
            address = %addr,
            temp_dir = %self.store.dir().display(),
            budgets = ?self.rate_limiter.budgets().iter().map(|b| b.to_string()).collect::<Vec<_>>(),
            "HTTP server starting"
        );

        if !self.rate_limiter.budgets().is_empty() {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1));
            tokio::spawn(run_sweeper(self.rate_limiter.clone(), interval, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Shared rate limiter, for inspection and resets.
    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        self.rate_limiter.clone()
    }
}
