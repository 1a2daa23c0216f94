use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use portfolio_advisor_api::config::{Config, StoreBackend};
use portfolio_advisor_api::db::Database;
use portfolio_advisor_api::handlers::{self, ApiDoc, AppState};
use portfolio_advisor_api::pg_store::PgClientStore;
use portfolio_advisor_api::poller::IngestionPoller;
use portfolio_advisor_api::store::ClientStore;
use portfolio_advisor_api::supabase_client::SupabaseClient;

/// Connects the configured client data store.
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn ClientStore>> {
    match &config.backend {
        StoreBackend::Postgres { database_url } => {
            let db = Database::new(database_url, config.store_timeout).await?;
            tracing::info!("Database connection pool established");
            Ok(Arc::new(PgClientStore::new(
                db.pool,
                &config.intake_table,
                &config.analysis_table,
            )))
        }
        StoreBackend::Supabase { url, key } => {
            let client = SupabaseClient::new(
                url,
                key.clone(),
                &config.intake_table,
                &config.analysis_table,
                config.store_timeout,
            )?;
            tracing::info!("✓ Supabase client initialized: {}", url);
            Ok(Arc::new(client))
        }
    }
}

/// Waits for Ctrl-C, then tells the poller to stop.
async fn shutdown_signal(stop: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    let _ = stop.send(true);
}

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Client data store connection.
/// - The background intake poller.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server and shuts both down on Ctrl-C.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Ok if the server runs successfully, or an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_advisor_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let store = connect_store(&config).await?;

    // Stop signal shared by the poller and the server
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (poller_status, poller_handle) = if config.poller_enabled {
        let poller = IngestionPoller::new(
            store.clone(),
            config.poll_interval,
            config.analysis_user_id.clone(),
        );
        let status = poller.subscribe();
        let handle = tokio::spawn(poller.run(shutdown_rx));
        (Some(status), Some(handle))
    } else {
        tracing::info!("Intake poller disabled");
        (None, None)
    };

    // Build application state
    let app_state = Arc::new(AppState {
        store,
        config: config.clone(),
        poller_status,
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

    // Analysis route runs the full derivation and a store round trip per call
    let protected_routes = Router::new()
        .route(
            "/analyze-portfolio/:client_id",
            post(handlers::analyze_portfolio),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
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
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await?;

    if let Some(handle) = poller_handle {
        if let Err(e) = handle.await {
            tracing::error!("Intake poller task failed: {}", e);
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
