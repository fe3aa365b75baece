// src/lib.rs

use sea_orm::DatabaseConnection;
use services::alert_engine::AlertEngine;
use services::pago_movil::PagoMovilService;
use services::rate_service::RateService;
use services::snapshot_service::SnapshotService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub rates: RateService,
    pub alerts: AlertEngine,
    pub snapshots: SnapshotService,
    pub pago_movil: PagoMovilService,
}

pub mod entities {
    pub mod prelude;

    pub mod exchange_rate_alerts;
    pub mod exchange_rate_snapshots;
    pub mod exchange_rates;
    pub mod orders;
    pub mod pago_movil_verifications;
}

pub mod services {
    pub mod alert_engine;
    pub mod pago_movil;
    pub mod rate_service;
    pub mod rate_store;
    pub mod snapshot_service;
}

pub mod models {
    pub mod alert;
    pub mod pago_movil;
    pub mod rate;
}

pub mod handlers {
    pub mod alert;
    pub mod pago_movil;
    pub mod rate;
}

pub mod error;
pub mod jobs;
pub mod sources;
