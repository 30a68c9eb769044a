//! # quotez: a small REST service for quotes
//!
//! `quotez` stores quotes, each with a `quote` text, an `author` and an optional author image, and
//! exposes them over a JSON REST API at `/api/quotes`. Images are uploaded as a multipart file
//! field next to the text fields, written to a local upload directory and served back statically
//! under `/uploads`.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer.
//! Quotes live behind the [`QuoteStore`](db::store::QuoteStore) trait, backed by PostgreSQL in
//! production or by a process-local store for development and tests.
//!
//! ### Request Flow
//!
//! A request is validated in a fixed order before any state is touched. Typed extractors from
//! [`api::extractors`] first check the `{id}` path segment, then decode the body (multipart or
//! JSON), enforce the image ceiling and MIME type, and run the quote schema. Only a request that
//! passed all of this reaches a handler, which writes the image (if any) and then the record.
//! Every failure renders as the JSON envelope described in [`errors`].
//!
//! ### Core Components
//!
//! - **API layer** ([`api`]): extractors, handlers and wire models
//! - **Validation** ([`validation`]): the full (create) and partial (update) quote schemas
//! - **Database layer** ([`db`]): the store trait, its postgres and in-memory backends, and the
//!   `sqlx` repository behind the postgres one
//! - **Uploads** ([`uploads`]): collision-free image files on local disk
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use quotez::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = quotez::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     quotez::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! With the postgres backend, migrations run automatically on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! quotez::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;
pub mod uploads;
pub mod validation;

#[cfg(test)]
pub mod test_utils;

use axum::{Router, extract::DefaultBodyLimit, http, routing::get};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    config::{CorsOrigin, DatabaseConfig},
    db::store::{InMemoryQuoteStore, PostgresQuoteStore, QuoteStore},
    openapi::ApiDoc,
    uploads::{ImageStorage, LocalImageStorage, QUOTE_IMAGES_DIR, UPLOADS_MOUNT},
};

/// Multipart framing and text fields allowed on top of the image ceiling.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(Arc::new(InMemoryQuoteStore::new()))
///     .images(Arc::new(images))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn QuoteStore>,
    pub images: Arc<dyn ImageStorage>,
}

/// Get the quotez database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect the configured quote store. For postgres this also runs migrations.
async fn setup_store(config: &Config) -> anyhow::Result<Arc<dyn QuoteStore>> {
    match &config.database {
        DatabaseConfig::Postgres { url, pool } => {
            info!("Connecting to postgres quote store");
            Ok(Arc::new(PostgresQuoteStore::connect(url, pool).await?))
        }
        DatabaseConfig::Memory => {
            warn!("Using the in-memory quote store; quotes are lost on restart");
            Ok(Arc::new(InMemoryQuoteStore::new()))
        }
    }
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    let mut cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(cors_config.allow_credentials);

    // tower-http rejects a literal "*" inside an origin list
    if cors_config.allowed_origins.contains(&CorsOrigin::Wildcard) {
        cors = cors.allow_origin(Any);
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<http::HeaderValue>()?);
            }
        }
        cors = cors.allow_origin(origins);
    }

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - `/`, `/healthz`: liveness
/// - `/api/quotes/*`: quote CRUD, with a body limit derived from `uploads.max_file_size`
/// - `/uploads/*`: static files from the upload directory
/// - `/docs`, `/api-docs/openapi.json`: API reference
/// - `/internal/metrics`: Prometheus metrics, when enabled
/// - anything else: the frontend bundle, when configured
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let body_limit = usize::try_from(state.config.uploads.max_file_size)?.saturating_add(FORM_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .route(
            "/api/quotes",
            get(api::handlers::quotes::list_quotes).post(api::handlers::quotes::create_quote),
        )
        // Collection with a trailing slash, as clients commonly send it
        .route(
            "/api/quotes/",
            get(api::handlers::quotes::list_quotes).post(api::handlers::quotes::create_quote),
        )
        .route(
            "/api/quotes/{id}",
            get(api::handlers::quotes::get_quote)
                .put(api::handlers::quotes::update_quote)
                .delete(api::handlers::quotes::delete_quote),
        )
        .route(
            "/api/quotes/files/{filename}",
            get(api::handlers::static_assets::get_uploaded_image),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/", get(|| async { "Server runs!" }))
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(api_routes)
        .nest_service(UPLOADS_MOUNT, ServeDir::new(&state.config.uploads.directory))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if state.config.frontend.directory.is_some() {
        router = router.fallback_service(get(api::handlers::static_assets::serve_frontend_asset).with_state(state.clone()));
    }

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and shared state.
///
/// 1. **Create**: [`Application::new`] connects the store (running migrations for postgres) and
///    prepares the upload directory
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests finish, the store is
///    closed and telemetry is flushed
pub struct Application {
    router: Router,
    app_state: AppState,
}

impl Application {
    /// Create a new application instance with the configured store
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = setup_store(&config).await?;
        Self::with_store(config, store).await
    }

    /// Create an application around an already constructed store
    pub async fn with_store(config: Config, store: Arc<dyn QuoteStore>) -> anyhow::Result<Self> {
        let images = LocalImageStorage::new(
            config.uploads.quote_images_dir(),
            format!("{UPLOADS_MOUNT}/{QUOTE_IMAGES_DIR}"),
        )
        .await?;

        let app_state = AppState::builder()
            .config(config)
            .store(store)
            .images(Arc::new(images))
            .build();
        let router = build_router(&app_state)?;

        Ok(Self { router, app_state })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let config = &self.app_state.config;
        let bind_addr = config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Quotez listening on http://{}, available at http://localhost:{}", bind_addr, config.port);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing quote store...");
        self.app_state.store.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
