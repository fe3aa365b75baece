pub use sea_orm_migration::prelude::*;

mod m20260601_000001_create_orders;
mod m20260601_000002_create_exchange_rates;
mod m20260601_000003_create_exchange_rate_alerts;
mod m20260601_000004_create_exchange_rate_snapshots;
mod m20260601_000005_create_pago_movil_verifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260601_000001_create_orders::Migration),
            Box::new(m20260601_000002_create_exchange_rates::Migration),
            Box::new(m20260601_000003_create_exchange_rate_alerts::Migration),
            Box::new(m20260601_000004_create_exchange_rate_snapshots::Migration),
            Box::new(m20260601_000005_create_pago_movil_verifications::Migration),
        ]
    }
}
