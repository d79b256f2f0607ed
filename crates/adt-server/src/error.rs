//! Error types for the delivery service.

/// Errors raised by the service's I/O collaborators.
///
/// None of these reach a caller of `match_request`; matching never fails.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The catalog source could not be read. Retried on the next refresh.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
    /// The change-notification transport failed. The listener backs off and reconnects.
    #[error("Notification channel {channel:?} lost: {reason}")]
    NotificationChannelLost { channel: String, reason: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
