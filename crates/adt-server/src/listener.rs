//! Change listener
//!
//! Keeps the snapshot fresh by rebuilding on change notifications. The loop is
//! an explicit state machine:
//!
//! ```text
//! Connecting --ok--> Listening --notify--> (debounce) --> Listening
//!     ^                  |
//!     |                error
//!     |                  v
//!     +---------------Backoff
//! ```
//!
//! Every state also waits on the cancellation token, so the loop stops
//! promptly while subscribing, waiting or sleeping.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogSource;
use crate::engine::DeliveryEngine;
use crate::notify::{ChangeNotifier, ChangeSubscription};

/// Minimum spacing between notification-triggered rebuilds.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);
/// Base reconnect delay before jitter.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerSettings {
    pub debounce: Duration,
    pub base_backoff: Duration,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            base_backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Scale `base` by a uniformly random factor in [0.5, 1.5].
///
/// A zero base falls back to one second so a failing transport is never
/// retried in a hot loop.
pub fn jittered_backoff(base: Duration) -> Duration {
    let base = if base.is_zero() {
        Duration::from_secs(1)
    } else {
        base
    };
    let factor: f64 = rand::thread_rng().gen_range(0.5..=1.5);
    base.mul_f64(factor)
}

enum State<S> {
    Connecting,
    Listening(S),
    Backoff(Duration),
}

/// Run the listener until `cancel` fires.
///
/// Notification errors are logged and retried after a jittered backoff;
/// rebuild errors are logged and the previous snapshot stays in service.
pub async fn listen_and_refresh<C, N>(
    engine: Arc<DeliveryEngine>,
    source: Arc<C>,
    notifier: N,
    settings: ListenerSettings,
    cancel: CancellationToken,
) where
    C: CatalogSource,
    N: ChangeNotifier,
{
    let channel = notifier.channel().to_string();
    let mut last_rebuild: Option<Instant> = None;
    let mut state: State<N::Subscription> = State::Connecting;

    info!("Listening for catalog changes on {}", channel);

    loop {
        state = match state {
            State::Connecting => {
                let subscribed = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = notifier.subscribe() => result,
                };
                match subscribed {
                    Ok(subscription) => {
                        debug!("Subscribed to {}", channel);
                        State::Listening(subscription)
                    }
                    Err(e) => {
                        let delay = jittered_backoff(settings.base_backoff);
                        error!("Subscribe to {} failed: {}, retrying in {:?}", channel, e, delay);
                        State::Backoff(delay)
                    }
                }
            }
            State::Listening(mut subscription) => {
                let received = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = subscription.next_change() => result,
                };
                match received {
                    Ok(notification) => {
                        let recent = last_rebuild
                            .map(|at| at.elapsed() < settings.debounce)
                            .unwrap_or(false);
                        if recent {
                            debug!("Debounced notification on {}", notification.channel);
                        } else {
                            debug!("Change on {}, rebuilding", notification.channel);
                            let rebuilt = tokio::select! {
                                _ = cancel.cancelled() => break,
                                result = engine.build_snapshot(source.as_ref()) => result,
                            };
                            match rebuilt {
                                Ok(_) => last_rebuild = Some(Instant::now()),
                                Err(e) => error!("Rebuild after notification failed: {}", e),
                            }
                        }
                        State::Listening(subscription)
                    }
                    Err(e) => {
                        let delay = jittered_backoff(settings.base_backoff);
                        error!("Notification wait failed: {}, retrying in {:?}", e, delay);
                        State::Backoff(delay)
                    }
                }
            }
            State::Backoff(delay) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => State::Connecting,
                }
            }
        };
    }

    info!("Listener on {} stopped", channel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..1000 {
            let d = jittered_backoff(base);
            assert!(d >= Duration::from_millis(500), "{:?}", d);
            assert!(d <= Duration::from_millis(1500), "{:?}", d);
        }
    }

    #[test]
    fn zero_base_falls_back_to_one_second() {
        let d = jittered_backoff(Duration::ZERO);
        assert!(d >= Duration::from_millis(500));
        assert!(d <= Duration::from_millis(1500));
    }

    #[test]
    fn default_settings() {
        let settings = ListenerSettings::default();
        assert_eq!(settings.debounce, Duration::from_millis(200));
        assert_eq!(settings.base_backoff, Duration::from_secs(5));
    }
}
