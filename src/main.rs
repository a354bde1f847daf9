//! license-gate - Main Application Entry Point
//!
//! A licensing/entitlement server: it validates API keys presented by client
//! software, registers device "installations" against a per-key quota, tracks
//! heartbeats and deactivations, and serves read-only dashboard aggregates.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: opaque API key token in the `X-API-Key` header
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::connect(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Device-facing routes: require an X-API-Key header. Per-operation key
    // rules (revocation, quota, expiry) are applied inside the services.
    let device_routes = Router::new()
        .route("/api/v1/validate", post(handlers::device::validate))
        .route("/api/v1/heartbeat", post(handlers::device::heartbeat))
        .route("/api/v1/deactivate", post(handlers::device::deactivate))
        .route(
            "/api/v1/key/heartbeat",
            post(handlers::device::key_heartbeat),
        )
        .route(
            "/api/v1/key/deactivate",
            post(handlers::device::key_deactivate),
        )
        // Apply key extraction middleware to all routes in this group
        .route_layer(axum_middleware::from_fn(
            middleware::auth::require_api_key,
        ));

    // Admin and dashboard routes: operator authentication is delegated to a
    // fronting layer, so no key middleware here.
    let admin_routes = Router::new()
        .route("/api/v1/admin/keys", post(handlers::admin::create_key))
        .route("/api/v1/admin/keys", get(handlers::admin::list_keys))
        .route("/api/v1/admin/keys/{id}", patch(handlers::admin::update_key))
        .route(
            "/api/v1/admin/keys/{id}/revoke",
            post(handlers::admin::revoke_key),
        )
        .route(
            "/api/v1/admin/installations",
            get(handlers::admin::list_installations),
        )
        .route("/api/v1/admin/clients", post(handlers::admin::create_client))
        .route("/api/v1/admin/clients", get(handlers::admin::list_clients))
        .route(
            "/api/v1/admin/clients/{id}",
            patch(handlers::admin::update_client),
        )
        .route(
            "/api/v1/dashboard/metrics",
            get(handlers::dashboard::metrics),
        )
        .route(
            "/api/v1/dashboard/installations-by-day",
            get(handlers::dashboard::installations_by_day),
        )
        .route(
            "/api/v1/dashboard/near-limit",
            get(handlers::dashboard::near_limit),
        );

    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .merge(device_routes)
        .merge(admin_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share database pool with all handlers via State extraction
        .with_state(pool);

    // Bind to network address and start server
    let addr = format!("{}:{}", config.bind_address, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
