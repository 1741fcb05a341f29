use thiserror::Error;

/// Reasons a reminder payload could not be interpreted.
///
/// Every variant is user-visible; none of them leaves state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing after the trigger word.
    #[error("empty reminder request")]
    Empty,

    /// A `@` or `~` sigil with no name after it.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// No complete time phrase could be found.
    #[error("no recognizable time in: {0}")]
    NoTime(String),

    /// A time phrase was found but nothing is left to remind about.
    #[error("reminder has no message")]
    NoMessage,
}

pub type Result<T> = std::result::Result<T, ParseError>;
