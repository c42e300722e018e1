//! Binwatch - garbage-detection event server
//!
//! Main entry point.

use binwatch::{
    cleanup_classifier::{CleanupClassifier, CleanupPolicy},
    content_store::ContentStore,
    detector_client::DetectorClient,
    event_store::{EventStore, RetentionPolicy},
    pipeline::DetectionPipeline,
    state::{AppConfig, AppState},
    web_api,
    zone_resolver::ZoneResolver,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "binwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Binwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        detector_url = %config.detector_url,
        data_dir = %config.data_dir.display(),
        public_base_url = %config.public_base_url,
        "Configuration loaded"
    );

    // Create database pool
    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await?;

    tracing::info!("Database connected");

    // Initialize components
    let retention = RetentionPolicy {
        max_count: config.retention_max_count,
        max_age_hours: config.retention_max_age_hours,
    };
    let store = Arc::new(EventStore::new(pool.clone(), retention));
    store.init().await?;
    tracing::info!(
        max_count = ?retention.max_count,
        max_age_hours = ?retention.max_age_hours,
        "EventStore initialized"
    );

    let detector = Arc::new(DetectorClient::with_timeout(
        config.detector_url.clone(),
        Duration::from_secs(config.detector_timeout_sec),
    ));
    if !detector.health_check().await.unwrap_or(false) {
        tracing::warn!(
            detector_url = %config.detector_url,
            "Detector not reachable at startup, detections will fail until it comes up"
        );
    }

    let classifier = Arc::new(CleanupClassifier::new(CleanupPolicy {
        cooldown: chrono::Duration::seconds(config.cleanup_cooldown_sec as i64),
        scope: config.cleanup_cooldown_scope,
    }));

    let zones = match &config.zones_file {
        Some(path) => ZoneResolver::load_zones_file(path)?,
        None => ZoneResolver::seed_zones(),
    };
    let resolver = Arc::new(ZoneResolver::new(zones));

    let content = Arc::new(
        ContentStore::with_timeout(
            config.data_dir.clone(),
            Duration::from_secs(config.io_timeout_sec),
        )
        .await?,
    );
    tracing::info!(data_dir = %config.data_dir.display(), "ContentStore initialized");

    let pipeline = Arc::new(DetectionPipeline::new(
        detector.clone(),
        store.clone(),
        classifier.clone(),
        resolver.clone(),
        content.clone(),
    ));

    // Create application state
    let state = AppState {
        pool,
        config,
        store,
        detector,
        classifier,
        resolver,
        content,
        pipeline,
    };

    // Periodic retention sweep (put() also applies retention inline; this
    // catches age-based expiry on quiet days)
    let sweep_store = state.store.clone();
    let sweep_interval = state.config.retention_sweep_interval_sec;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            if let Err(e) = sweep_store.apply_retention().await {
                tracing::error!(error = %e, "Retention sweep failed");
            }
        }
    });

    // Create router
    let app = web_api::create_router(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
