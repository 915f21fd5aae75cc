//! CampusSport API Server
//!
//! Production server for the sports-enrollment REST API migration:
//! - Canonical `/api/v2/...` routes and the deprecated `/api/...` surface
//! - Deprecation headers and usage telemetry for migration tracking
//! - Prometheus metrics and health probes on a separate port
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CAMPUSSPORT_CONFIG` | - | Path to a TOML config file |
//! | `CAMPUSSPORT_HTTP_PORT` | `8080` | HTTP API port |
//! | `CAMPUSSPORT_METRICS_PORT` | `9090` | Metrics/health port |
//! | `CAMPUSSPORT_SUNSET_DATE` | `2025-12-31` | Legacy API sunset date |
//! | `CAMPUSSPORT_QR_SECRET` | `dev-qr-secret` | QR check-in HMAC secret |
//! | `CAMPUSSPORT_DEV_MODE` | `false` | Seed demo data at startup |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{extract::State, http::HeaderValue, response::Json, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cs_config::ConfigLoader;
use cs_gateway::observe::RequestMetricsLayer;
use cs_gateway::{gateway_router, ApiGateway, DeprecationPolicy, TracingSink};
use cs_platform::{build_gateway, DevSeeder, PlatformOptions, SportStore};

#[tokio::main]
async fn main() -> Result<()> {
    cs_common::logging::init_logging("cs-api-server");

    info!("Starting CampusSport API Server");

    let config = ConfigLoader::new().load()?;

    // Metrics recorder must be installed before the first counter is touched
    let prometheus = PrometheusBuilder::new().install_recorder()?;

    let store = Arc::new(SportStore::new());
    if config.dev_mode {
        DevSeeder::new(&store).seed();
    }

    let gateway = build_gateway(
        store,
        Arc::new(TracingSink),
        PlatformOptions {
            deprecation: DeprecationPolicy {
                sunset_date: config.deprecation.sunset_date.clone(),
                migration_guide_url: config.deprecation.migration_guide_url.clone(),
            },
            telemetry_buffer: config.telemetry.buffer_size,
            qr_secret: config.checkin.qr_secret.clone(),
        },
    )?;
    info!(
        routes = gateway.routes().len(),
        legacy = gateway.legacy().len(),
        "Route tables assembled"
    );

    let cors = build_cors(&config.http.cors_origins);
    let app = gateway_router(gateway.clone())
        .layer(RequestMetricsLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.http.request_timeout_secs,
        )))
        .layer(cors);

    // Start API server
    let api_addr = format!("{}:{}", config.http.host, config.http.port);
    info!("API server listening on http://{}", api_addr);

    let api_listener = TcpListener::bind(&api_addr).await?;
    let api_task = tokio::spawn(async move {
        axum::serve(api_listener, app).await.unwrap();
    });

    // Start metrics server
    let metrics_addr = format!("{}:{}", config.http.host, config.http.metrics_port);
    info!("Metrics server listening on http://{}/metrics", metrics_addr);

    let metrics_app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/telemetry", get(telemetry_handler))
        .with_state((prometheus, gateway));

    let metrics_listener = TcpListener::bind(&metrics_addr).await?;
    let metrics_task = tokio::spawn(async move {
        axum::serve(metrics_listener, metrics_app).await.unwrap();
    });

    info!("CampusSport API Server started");
    info!("Press Ctrl+C to shutdown");

    shutdown_signal().await;
    info!("Shutdown signal received...");

    api_task.abort();
    metrics_task.abort();

    info!("CampusSport API Server shutdown complete");
    Ok(())
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

type MetricsState = (PrometheusHandle, Arc<ApiGateway>);

async fn metrics_handler(State((prometheus, _)): State<MetricsState>) -> String {
    prometheus.render()
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "READY"
    }))
}

/// Usage-recorder counters, for migration-progress dashboards.
async fn telemetry_handler(State((_, gateway)): State<MetricsState>) -> Json<serde_json::Value> {
    let stats = gateway.telemetry_stats();
    Json(serde_json::json!({
        "usage_records": stats.recorded,
        "dropped_records": stats.dropped,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
