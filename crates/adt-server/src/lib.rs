//! Ad Delivery Targeting Service
//!
//! Runs the matching engine behind an HTTP API and keeps its snapshot fresh:
//! a change listener rebuilds on catalog notifications (debounced, with
//! jittered reconnect backoff) and an optional periodic refresher rebuilds on
//! a fixed interval.

pub mod app;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod listener;
pub mod notify;
pub mod observability;
pub mod refresher;

pub use app::{serve, serve_with};
pub use catalog::{CatalogSource, FileCatalog, MemoryCatalog};
pub use config::Config;
pub use engine::DeliveryEngine;
pub use error::{Result, ServiceError};
pub use http::{build_router, ErrorResponse};
pub use listener::{jittered_backoff, listen_and_refresh, ListenerSettings};
pub use notify::{
    BroadcastNotifier, ChangeNotifier, ChangeSubscription, FileWatchNotifier, Notification,
};
pub use observability::DeliveryMetrics;
pub use refresher::refresh_periodically;
