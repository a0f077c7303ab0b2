mod cache;
mod category;
mod config;
mod engine;
mod errors;
mod explain;
mod handlers;
mod models;
mod services;

use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::category::CategoryTable;
use crate::config::Config;
use crate::engine::RewardEngine;
use crate::explain::ExplanationService;
use crate::services::{LocationService, WalletService};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the scoring engine, collaborator
/// clients and caches, then starts the Axum server with rate limiting and
/// CORS in front of the API routes.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_wallet_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // The engine is pure and stateless; one instance serves all requests.
    let engine = RewardEngine::new(CategoryTable::new(), config.point_dollar_value);
    tracing::info!("Reward engine initialized");

    // Wallet response cache (5 minute TTL) so bursts of recommendations for
    // the same user don't re-fetch the wallet every time
    let wallet_cache = Cache::builder()
        .time_to_live(Duration::from_secs(300))
        .max_capacity(10_000)
        .build();
    tracing::info!("Wallet cache initialized");

    // Nearby-place cache (10 minute TTL), keyed by rounded coordinate cell
    let places_cache = Cache::builder()
        .time_to_live(Duration::from_secs(600))
        .max_capacity(10_000)
        .build();
    tracing::info!("Places cache initialized");

    let wallet_service = WalletService::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize wallet client: {}", e))?;
    let location_service = LocationService::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize location client: {}", e))?;
    let explainer = ExplanationService::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize explanation client: {}", e))?;

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        config: config.clone(),
        engine,
        wallet_service,
        location_service,
        explainer,
        wallet_cache,
        places_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/categories", get(handlers::get_categories))
        .route("/api/v1/recommend", post(handlers::recommend))
        .route("/api/v1/recommend/nearby", get(handlers::recommend_nearby))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
