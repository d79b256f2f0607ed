//! Change-notification sources
//!
//! A notifier hands out subscriptions; a subscription blocks until the next
//! change on its channel. What the channel is (an in-process broadcast, a
//! watched file) is configuration; the listener only sees the traits.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{Result, ServiceError};

/// One change signal received on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: String,
}

/// Source of change subscriptions.
pub trait ChangeNotifier: Send + Sync {
    type Subscription: ChangeSubscription;

    /// Name of the channel, for logging.
    fn channel(&self) -> &str;

    /// Acquire a subscription. Fails with `NotificationChannelLost` when the
    /// transport is unreachable.
    fn subscribe(&self) -> impl Future<Output = Result<Self::Subscription>> + Send;
}

/// A live subscription to a change channel.
pub trait ChangeSubscription: Send {
    /// Wait for the next change. Fails with `NotificationChannelLost` when the
    /// transport goes away; the subscription should then be discarded.
    fn next_change(&mut self) -> impl Future<Output = Result<Notification>> + Send;
}

// =============================================================================
// Broadcast Notifier
// =============================================================================

/// In-process notifier backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    channel: String,
    sender: broadcast::Sender<()>,
}

impl BroadcastNotifier {
    pub fn new(channel: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            channel: channel.into(),
            sender,
        }
    }

    /// Signal a change. Returns the number of subscriptions that will see it.
    pub fn notify(&self) -> usize {
        self.sender.send(()).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    type Subscription = BroadcastSubscription;

    fn channel(&self) -> &str {
        &self.channel
    }

    async fn subscribe(&self) -> Result<BroadcastSubscription> {
        Ok(BroadcastSubscription {
            channel: self.channel.clone(),
            receiver: self.sender.subscribe(),
        })
    }
}

#[derive(Debug)]
pub struct BroadcastSubscription {
    channel: String,
    receiver: broadcast::Receiver<()>,
}

impl ChangeSubscription for BroadcastSubscription {
    async fn next_change(&mut self) -> Result<Notification> {
        match self.receiver.recv().await {
            Ok(()) => {}
            // Missed signals collapse into the one we are about to report.
            Err(RecvError::Lagged(skipped)) => {
                log::debug!("{} notifications coalesced on {}", skipped, self.channel);
            }
            Err(RecvError::Closed) => {
                return Err(ServiceError::NotificationChannelLost {
                    channel: self.channel.clone(),
                    reason: "sender closed".to_string(),
                });
            }
        }
        Ok(Notification {
            channel: self.channel.clone(),
        })
    }
}

// =============================================================================
// File Watch Notifier
// =============================================================================

/// Notifier that polls a file and signals when its metadata changes.
///
/// Subscriptions share the last signature they reported, so a subscription
/// opened after a channel loss still reports a change made while no one was
/// watching.
#[derive(Debug, Clone)]
pub struct FileWatchNotifier {
    path: PathBuf,
    channel: String,
    poll_interval: Duration,
    seen: Arc<Mutex<Option<FileSignature>>>,
}

impl FileWatchNotifier {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        let path = path.into();
        Self {
            channel: path.display().to_string(),
            path,
            poll_interval,
            seen: Arc::new(Mutex::new(None)),
        }
    }

    /// Record the file as it is now as already seen.
    ///
    /// Call before loading the file: the first subscription then reports any
    /// change made after this point, even one made before it subscribed. A
    /// missing file records nothing.
    pub async fn with_baseline(self) -> Self {
        let signature = file_signature(&self.path, &self.channel).await.ok();
        *lock(&self.seen) = signature;
        self
    }

    /// Report notifications under `channel` instead of the file path.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

impl ChangeNotifier for FileWatchNotifier {
    type Subscription = FileWatchSubscription;

    fn channel(&self) -> &str {
        &self.channel
    }

    async fn subscribe(&self) -> Result<FileWatchSubscription> {
        let current = file_signature(&self.path, &self.channel).await?;
        let last_seen = *lock(&self.seen).get_or_insert(current);
        Ok(FileWatchSubscription {
            path: self.path.clone(),
            channel: self.channel.clone(),
            poll_interval: self.poll_interval,
            seen: Arc::clone(&self.seen),
            last_seen,
        })
    }
}

#[derive(Debug)]
pub struct FileWatchSubscription {
    path: PathBuf,
    channel: String,
    poll_interval: Duration,
    seen: Arc<Mutex<Option<FileSignature>>>,
    last_seen: FileSignature,
}

impl ChangeSubscription for FileWatchSubscription {
    async fn next_change(&mut self) -> Result<Notification> {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let current = file_signature(&self.path, &self.channel).await?;
            if current != self.last_seen {
                self.last_seen = current;
                *lock(&self.seen) = Some(current);
                return Ok(Notification {
                    channel: self.channel.clone(),
                });
            }
        }
    }
}

type FileSignature = (Option<SystemTime>, u64);

fn lock(seen: &Mutex<Option<FileSignature>>) -> MutexGuard<'_, Option<FileSignature>> {
    seen.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn file_signature(path: &std::path::Path, channel: &str) -> Result<FileSignature> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| ServiceError::NotificationChannelLost {
            channel: channel.to_string(),
            reason: e.to_string(),
        })?;
    Ok((metadata.modified().ok(), metadata.len()))
}
