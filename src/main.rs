//! FarmGate Security Gateway
//!
//! Backend for an agricultural IoT security demo: it simulates five classes
//! of field sensors, runs rule-based attack detection (flood, replay,
//! spoofing, firmware, drift, hijack, abuse, tamper, side-channel), and
//! feeds an append-only attack log plus a websocket alert stream.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      FARMGATE GATEWAY                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌──────────────────────────┐ │
//! │  │  API      │  │  Auth     │  │  Telemetry Refresh       │ │
//! │  │  (Axum)   │  │  (JWT)    │  │  (Background Task)       │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬─────────────┘ │
//! │        └──────────────┼─────────────────────┘               │
//! │                       ▼                                     │
//! │              ┌─────────────────┐                            │
//! │              │  GatewayStore   │  windows · nonces · log    │
//! │              └─────────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod detect;
mod error;
mod handlers;
mod middleware;
mod models;
mod sim;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tokio::sync::broadcast;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};
use models::AttackLogEntry;
use store::GatewayStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "farmgate=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("FarmGate Security Gateway starting...");
    if config.is_production() {
        tracing::info!("Running in production mode");
    }

    let users = handlers::auth::seed_users(&config)
        .map_err(|e| anyhow::anyhow!("failed to seed accounts: {}", e))?;

    let store = Arc::new(GatewayStore::new(&config, users));
    let (alerts, _) = broadcast::channel(64);

    // Background telemetry refresh
    tokio::spawn(sim::run_refresh(
        store.clone(),
        config.refresh_secs,
        config.sensors_per_class,
    ));

    // Build application state
    let state = AppState {
        store,
        config: config.clone(),
        alerts,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<GatewayStore>,
    pub config: config::Config,
    pub alerts: broadcast::Sender<AttackLogEntry>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    // Push channels (token passed as query parameter)
    let ws_routes = Router::new()
        .route("/ws/alerts", get(handlers::ws::alerts))
        .route("/ws/sensors/:class", get(handlers::ws::sensor_stream));

    // Management routes (user JWT auth)
    let management_routes = Router::new()
        // Telemetry
        .route("/api/v1/sensors/types", get(handlers::sensors::types))
        .route("/api/v1/sensors/averages", get(handlers::sensors::averages))
        .route("/api/v1/sensors/:class", get(handlers::sensors::latest))
        .route("/api/v1/sensors", post(handlers::sensors::ingest))

        // Detection
        .route("/api/v1/detect/ddos", post(handlers::detect::ddos))
        .route("/api/v1/detect/replay", post(handlers::detect::replay))
        .route("/api/v1/detect/spoofing", post(handlers::detect::spoofing))
        .route("/api/v1/detect/firmware", post(handlers::detect::firmware))
        .route("/api/v1/detect/drift", post(handlers::detect::drift))
        .route("/api/v1/detect/hijack", post(handlers::detect::hijack))
        .route("/api/v1/detect/api-abuse", post(handlers::detect::api_abuse))
        .route("/api/v1/detect/tamper", post(handlers::detect::tamper))
        .route("/api/v1/detect/side-channel", post(handlers::detect::side_channel))
        .route("/api/v1/detect/reset/:sensor_id", post(handlers::detect::reset))

        // Attack log
        .route("/api/v1/logs", get(handlers::logs::list))
        .route("/api/v1/alerts", get(handlers::logs::alerts))
        .route("/api/v1/trigger/:attack_type", post(handlers::logs::trigger))
        .route("/api/v1/metrics/connections", get(handlers::logs::connections))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(ws_routes)
        .merge(management_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
