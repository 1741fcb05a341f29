use async_trait::async_trait;
use remindbot_core::{Channel, User};

use crate::{
    error::Result,
    types::{Dialog, Post},
};

/// Operations the reminder core consumes from the host chat platform.
///
/// Implementations must be `Send + Sync`; the dispatcher and request
/// handlers share one instance across Tokio tasks.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Look up a user by username. `NotFound` when no such user exists.
    async fn resolve_user(&self, username: &str) -> Result<User>;

    /// Look up a channel by name within a team.
    async fn resolve_channel(&self, team_id: &str, name: &str) -> Result<Channel>;

    /// Post a message with its controls.
    async fn send_message(&self, post: &Post) -> Result<()>;

    /// Open an interactive dialog in response to `trigger_id`.
    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<()>;
}
