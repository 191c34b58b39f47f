use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod db;
mod error;
mod models;
mod rate_limit;
mod services;
mod utils;

use config::Config;
use constants::{API_VERSION, SEARCH_RATE_LIMIT_WINDOW_SECS};
use db::Database;
use rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petits_bureaux_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting PetitsBureaux Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);

    if config.is_production() && config.cors_allowed_origins.trim() == "*" {
        tracing::warn!("Permissive CORS enabled in production");
    }

    // Initialize database
    let db = Database::new(&config).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db.run_migrations().await?;

    // Process-wide limiter for the public search API
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_search,
        Duration::from_secs(SEARCH_RATE_LIMIT_WINDOW_SECS),
    ));

    let app_state = api::AppState {
        db,
        config: config.clone(),
        rate_limiter,
    };

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    // Only the public search endpoint is rate limited.
    let search = Router::new()
        .route("/api/v1/offices", get(api::offices::search_offices))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ));

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Public catalogue
        .merge(search)
        .route(
            "/api/v1/offices/{id_or_slug}",
            get(api::offices::get_office),
        )
        .route("/api/v1/services", get(api::offices::list_services))
        // Lead capture
        .route("/api/v1/leads", post(api::leads::create_lead))
        // Admin back-office
        .route("/api/v1/admin/offices", post(api::admin::create_office))
        .route(
            "/api/v1/admin/offices/export",
            get(api::admin::export_offices_csv),
        )
        .route(
            "/api/v1/admin/offices/{id}",
            put(api::admin::update_office).delete(api::admin::delete_office),
        )
        .route("/api/v1/admin/leads", get(api::admin::list_leads))
        .route(
            "/api/v1/admin/leads/{id}/status",
            put(api::admin::update_lead_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
