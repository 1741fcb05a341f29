use thiserror::Error;

/// Errors reported by a [`ChatPlatform`](crate::ChatPlatform) implementation.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// The named user or channel does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The platform refused or failed to post a message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Transport-level failure talking to the platform.
    #[error("HTTP error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
