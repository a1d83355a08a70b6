// Main entry point - dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::analytics_service::AnalyticsService;
use crate::application::history_service::HistoryService;
use crate::application::snapshot_service::SnapshotService;
use crate::application::state_provider::StateProvider;
use crate::application::stats_service::StatsService;
use crate::infrastructure::analytics_store::AnalyticsStore;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::hass_client::HassClient;
use crate::infrastructure::session_tracker::SESSION_WINDOW;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, list_sensors, power_stats, sensor_history, site_stats,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let settings = load_settings()?;

    // Upstream adapter (infrastructure layer)
    let provider: Arc<dyn StateProvider> = Arc::new(HassClient::new(
        settings.upstream.base_url.clone(),
        settings.upstream.token.clone(),
        Duration::from_secs(settings.upstream.timeout_secs),
    )?);

    // Services (application layer)
    let history = Arc::new(HistoryService::new(
        provider.clone(),
        Duration::from_secs(settings.cache.history_ttl_secs),
    ));
    let snapshots = SnapshotService::new(
        provider,
        settings.sensors.tracked.clone(),
        settings.sensors.station_altitude_m,
        Duration::from_secs(settings.cache.snapshot_ttl_secs),
    );
    let stats = StatsService::new(
        history.clone(),
        settings.sensors.power_series.clone(),
        settings.range,
    );
    let analytics = AnalyticsService::load(
        AnalyticsStore::new(settings.analytics.storage_path.clone()),
        SESSION_WINDOW,
    )
    .await;

    let state = Arc::new(AppState { snapshots, history, stats, analytics });

    // Router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/sensors", get(list_sensors))
        .route("/api/sensors/:id/history", get(sensor_history))
        .route("/api/power/stats", get(power_stats))
        .route("/api/stats", get(site_stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods([Method::GET]));

    let addr: SocketAddr = settings.server.bind.parse()?;
    tracing::info!(%addr, "starting station-telemetry service");

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
