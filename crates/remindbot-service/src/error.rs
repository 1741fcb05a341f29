use remindbot_channels::PlatformError;
use remindbot_parser::ParseError;
use remindbot_scheduler::{ScheduleError, StoreError};
use thiserror::Error;

/// Everything that can abort a foreground request.
///
/// The command layer renders all of them as one generic localized message;
/// the detail only goes to the log.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The `@user` or `~channel` named in the request does not exist.
    #[error("Unknown target: {0}")]
    TargetNotFound(String),
}

impl ServiceError {
    /// Short error code string used in logs and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Parse(_) => "PARSE_ERROR",
            ServiceError::Schedule(ScheduleError::PastTime { .. }) => "PAST_TIME",
            ServiceError::Schedule(ScheduleError::InvalidRule(_)) => "INVALID_RULE",
            ServiceError::Store(_) => "STORE_ERROR",
            ServiceError::Platform(_) => "PLATFORM_ERROR",
            ServiceError::TargetNotFound(_) => "TARGET_NOT_FOUND",
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
