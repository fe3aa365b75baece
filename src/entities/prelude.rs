pub use super::exchange_rate_alerts::Entity as ExchangeRateAlerts;
pub use super::exchange_rate_snapshots::Entity as ExchangeRateSnapshots;
pub use super::exchange_rates::Entity as ExchangeRates;
pub use super::orders::Entity as Orders;
pub use super::pago_movil_verifications::Entity as PagoMovilVerifications;
