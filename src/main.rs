mod config;
mod discovery;
mod errors;
mod export;
mod extract;
mod generator;
mod handlers;
mod hunter;
mod models;
mod openai;
mod sections;
mod store;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::store::InMemoryStore;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the in-memory campaign store, the
/// external API clients, and the HTTP routes with their middleware (CORS,
/// rate limiting, body size limit), then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_outreach_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the generative text service client (optional)
    let openai_client = match &config.openai_api_key {
        Some(key) => {
            match openai::OpenAiClient::new(config.openai_base_url.clone(), key.clone()) {
                Ok(client) => {
                    tracing::info!("✓ OpenAI client initialized: {}", config.openai_base_url);
                    Some(client)
                }
                Err(e) => {
                    tracing::error!("Failed to initialize OpenAI client: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    // Initialize the email-discovery client (optional)
    let hunter_client = match &config.hunter_api_key {
        Some(key) => {
            match hunter::HunterClient::new(config.hunter_base_url.clone(), key.clone()) {
                Ok(client) => {
                    tracing::info!("✓ Hunter client initialized: {}", config.hunter_base_url);
                    Some(client)
                }
                Err(e) => {
                    tracing::error!("Failed to initialize Hunter client: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        store: Arc::new(InMemoryStore::new()),
        config: config.clone(),
        openai_client,
        hunter_client,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/campaigns", post(handlers::create_campaign))
        .route(
            "/api/v1/campaigns/:id",
            get(handlers::get_campaign).put(handlers::update_campaign),
        )
        .route(
            "/api/v1/campaigns/generate",
            post(handlers::generate_campaign),
        )
        .route("/api/v1/emails/generate", post(handlers::generate_emails))
        .route("/api/v1/targets/find", post(handlers::find_targets))
        .route("/api/v1/export/csv", post(handlers::export_csv))
        .route(
            "/api/v1/competitors/analyze",
            post(handlers::analyze_competitors),
        )
        .route(
            "/api/v1/competitors/metrics",
            post(handlers::extract_metrics),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
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
