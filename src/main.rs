use axum::{
    routing::{get, patch, post},
    Router,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagos_backend::handlers::{alert, pago_movil, rate};
use pagos_backend::jobs::rate_refresh::start_rate_refresh_job;
use pagos_backend::services::alert_engine::AlertEngine;
use pagos_backend::services::pago_movil::PagoMovilService;
use pagos_backend::services::rate_service::RateService;
use pagos_backend::services::rate_store::RateStore;
use pagos_backend::services::snapshot_service::SnapshotService;
use pagos_backend::sources::{SourceChain, SOURCE_TIMEOUT};
use pagos_backend::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pagos_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Shared HTTP client with the per-source timeout bound
    let client = reqwest::Client::builder()
        .timeout(SOURCE_TIMEOUT)
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
        .expect("Failed to build http client");

    let chain = Arc::new(SourceChain::from_env(client));
    let db = Arc::new(db);
    let store = RateStore::new(db.clone());
    let alerts = AlertEngine::new(db.clone());
    let rates = RateService::new(store, alerts.clone(), chain);
    let snapshots = SnapshotService::new(db.clone(), rates.clone());
    let pago_movil_service = PagoMovilService::new(db.clone(), rates.clone());

    // Optional cache-warming job
    if let Ok(secs) = env::var("RATE_REFRESH_INTERVAL_SECS") {
        match secs.parse::<u64>() {
            Ok(secs) if secs > 0 => {
                tracing::info!("Starting rate refresh job every {}s", secs);
                start_rate_refresh_job(rates.clone(), secs);
            }
            _ => tracing::warn!("Ignoring invalid RATE_REFRESH_INTERVAL_SECS: {}", secs),
        }
    }

    let state = AppState {
        db,
        rates,
        alerts,
        snapshots,
        pago_movil: pago_movil_service,
    };

    // Build router
    let app = Router::new()
        .route("/api/exchange-rate", get(rate::get_current_rate))
        .route("/api/exchange-rate/history", get(rate::get_rate_history))
        .route(
            "/api/exchange-rate/at-timestamp",
            get(rate::get_rate_at_timestamp),
        )
        .route("/api/exchange-rate/convert", post(rate::convert_currency))
        .route("/api/exchange-rate/set-manual", post(rate::set_manual_rate))
        .route("/api/exchange-rate/refresh", post(rate::refresh_rate))
        .route("/api/exchange-rate/stats", get(rate::get_rate_stats))
        .route("/api/exchange-rate/snapshot", post(rate::pin_snapshot))
        .route("/api/exchange-rate/alerts", get(alert::list_alerts))
        .route(
            "/api/exchange-rate/alerts/{id}/acknowledge",
            post(alert::acknowledge_alert),
        )
        .route("/api/pagomovil/verify", post(pago_movil::create_verification))
        .route(
            "/api/pagomovil/status",
            get(pago_movil::get_verification_status),
        )
        .route("/api/pagomovil/admin", get(pago_movil::list_verifications))
        .route(
            "/api/pagomovil/{id}/status",
            patch(pago_movil::update_verification_status),
        )
        .route(
            "/api/pagomovil/{id}/notes",
            patch(pago_movil::update_verification_notes),
        )
        .route(
            "/api/pagomovil/batch-status",
            post(pago_movil::batch_update_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let port = env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
