use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogSource;
use crate::engine::DeliveryEngine;

/// Rebuild the snapshot every `every` until cancelled.
///
/// A zero period disables the refresher. Failures are logged and the
/// previous snapshot stays in service.
pub async fn refresh_periodically<C: CatalogSource>(
    engine: Arc<DeliveryEngine>,
    source: Arc<C>,
    every: Duration,
    cancel: CancellationToken,
) {
    if every.is_zero() {
        return;
    }

    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    log::info!("Periodic refresh every {:?}", every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let rebuilt = tokio::select! {
            _ = cancel.cancelled() => break,
            result = engine.build_snapshot(source.as_ref()) => result,
        };
        if let Err(e) = rebuilt {
            log::error!("Scheduled rebuild failed: {}", e);
        }
    }

    log::info!("Periodic refresh stopped");
}
