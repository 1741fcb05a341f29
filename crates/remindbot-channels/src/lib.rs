//! `remindbot-channels`: the boundary to the host chat platform.
//!
//! The core never talks HTTP itself. It resolves users and channels, posts
//! messages with clickable controls and opens dialogs through
//! [`ChatPlatform`]; the gateway supplies the real implementation.

pub mod error;
pub mod memory;
pub mod platform;
pub mod types;

pub use error::PlatformError;
pub use memory::MemoryPlatform;
pub use platform::ChatPlatform;
pub use types::{Dialog, DialogElement, DialogOption, DialogSubmission, Post, PostAction, Recipient};
