//! Optional warm-cache job: forces a fresh fetch on an interval so request
//! handlers rarely pay the acquisition latency. Correctness does not depend
//! on it; the read-through cache handles a cold start on its own.

use tokio::time::{interval, Duration};

use crate::services::rate_service::RateService;

pub fn start_rate_refresh_job(rates: RateService, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));

        loop {
            ticker.tick().await;
            tracing::info!("Running scheduled exchange rate refresh");

            match rates.get_current(true).await {
                Ok(view) => tracing::info!(
                    "Refreshed rate: {} VES/USD from {}",
                    view.usd_to_ves,
                    view.source
                ),
                Err(err) => tracing::error!("Scheduled rate refresh failed: {}", err),
            }
        }
    });
}
