use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use remindbot_core::{Channel, User};
use tracing::info;

use crate::{
    error::{PlatformError, Result},
    platform::ChatPlatform,
    types::{Dialog, Post},
};

/// In-process platform: a fixed directory of users and channels, and a log
/// of everything posted.
///
/// The gateway runs on it when no platform bridge is configured (posts are
/// logged instead of sent). Tests use it to observe side effects.
#[derive(Default)]
pub struct MemoryPlatform {
    users: RwLock<HashMap<String, User>>,
    channels: RwLock<HashMap<(String, String), Channel>>,
    posts: Mutex<Vec<Post>>,
    dialogs: Mutex<Vec<(String, Dialog)>>,
    /// Users not registered resolve to a UTC/`en` default instead of `NotFound`.
    open_directory: bool,
    fail_delivery: AtomicBool,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform that accepts any username.
    pub fn open() -> Self {
        Self {
            open_directory: true,
            ..Self::default()
        }
    }

    pub fn add_user(&self, user: User) {
        write(&self.users).insert(user.username.clone(), user);
    }

    pub fn add_channel(&self, channel: Channel) {
        write(&self.channels).insert((channel.team_id.clone(), channel.name.clone()), channel);
    }

    /// Make every subsequent `send_message` fail (or succeed again).
    pub fn set_fail_delivery(&self, fail: bool) {
        self.fail_delivery.store(fail, Ordering::SeqCst);
    }

    pub fn posts(&self) -> Vec<Post> {
        lock(&self.posts).clone()
    }

    pub fn dialogs(&self) -> Vec<(String, Dialog)> {
        lock(&self.dialogs).clone()
    }
}

#[async_trait]
impl ChatPlatform for MemoryPlatform {
    async fn resolve_user(&self, username: &str) -> Result<User> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        match users.get(username) {
            Some(user) => Ok(user.clone()),
            None if self.open_directory => Ok(User {
                id: username.to_string(),
                username: username.to_string(),
                locale: "en".to_string(),
                utc_offset_secs: 0,
            }),
            None => Err(PlatformError::NotFound(format!("user @{username}"))),
        }
    }

    async fn resolve_channel(&self, team_id: &str, name: &str) -> Result<Channel> {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        match channels.get(&(team_id.to_string(), name.to_string())) {
            Some(channel) => Ok(channel.clone()),
            None if self.open_directory => Ok(Channel {
                id: name.to_string(),
                name: name.to_string(),
                team_id: team_id.to_string(),
            }),
            None => Err(PlatformError::NotFound(format!("channel ~{name}"))),
        }
    }

    async fn send_message(&self, post: &Post) -> Result<()> {
        if self.fail_delivery.load(Ordering::SeqCst) {
            return Err(PlatformError::Delivery("delivery disabled".to_string()));
        }
        info!(recipient = ?post.recipient, actions = post.actions.len(), "{}", post.message);
        lock(&self.posts).push(post.clone());
        Ok(())
    }

    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<()> {
        info!(trigger_id, title = %dialog.title, "dialog opened");
        lock(&self.dialogs).push((trigger_id.to_string(), dialog.clone()));
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Recipient;

    #[tokio::test]
    async fn closed_directory_reports_not_found() {
        let platform = MemoryPlatform::new();
        platform.add_user(User {
            id: "u1".into(),
            username: "alice".into(),
            locale: "en".into(),
            utc_offset_secs: 3_600,
        });
        assert_eq!(
            platform.resolve_user("alice").await.unwrap().utc_offset_secs,
            3_600
        );
        assert!(matches!(
            platform.resolve_user("bob").await,
            Err(PlatformError::NotFound(_))
        ));
        assert!(platform.resolve_channel("t", "team").await.is_err());
    }

    #[tokio::test]
    async fn open_directory_accepts_anyone() {
        let platform = MemoryPlatform::open();
        let user = platform.resolve_user("carol").await.unwrap();
        assert_eq!(user.username, "carol");
        let channel = platform.resolve_channel("t1", "town").await.unwrap();
        assert_eq!(channel.team_id, "t1");
    }

    #[tokio::test]
    async fn records_posts_and_can_fail() {
        let platform = MemoryPlatform::new();
        let post = Post::new(Recipient::Direct("alice".into()), "hello");
        platform.send_message(&post).await.unwrap();
        platform.set_fail_delivery(true);
        assert!(platform.send_message(&post).await.is_err());
        assert_eq!(platform.posts(), vec![post]);
    }
}
