use axum::Router;
use leadscout::config::Config;
use leadscout::credential_store::{CredentialStore, FileStore};
use leadscout::handlers::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, opens the credential store
/// (migrating a legacy single key if present), builds the search clients and
/// webhook relay, and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadscout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Open credential store
    let backend = FileStore::open(&config.credentials_path)?;
    tracing::info!("Credential store opened at {}", backend.path().display());
    let mut store = CredentialStore::new(backend);
    if let Some(profile) = store.migrate_legacy()? {
        tracing::info!("Legacy API key migrated to profile {}", profile.id);
    }
    let summary = store.summary();
    tracing::info!(
        "{} active API key profile(s), {}/{} credits used",
        summary.active_accounts,
        summary.credits_used,
        summary.total_credits
    );

    let app_state = Arc::new(AppState::new(config.clone(), store.into_shared())?);
    tracing::info!("Search clients and webhook relay initialized");

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 5MB max payload
            .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
            // Rate limiting: 10 req/sec per IP, burst of 20
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", axum::routing::get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
