use std::sync::Arc;

use async_trait::async_trait;
use remindbot_channels::{ChatPlatform, Post, Recipient};
use remindbot_core::{Catalog, LifecycleAction, Occurrence, Reminder, Shortcut, Target};
use remindbot_scheduler::{Deliverer, DeliveryError};
use tracing::warn;

use crate::render::controls;
use crate::{translator, ServiceSettings};

/// Posts fired reminders to their target through the chat platform.
///
/// `Me` and `@user` targets get a direct message, `~channel` targets a
/// channel post. Every delivery carries a delete control and the snooze
/// shortcuts.
pub struct PlatformDeliverer {
    platform: Arc<dyn ChatPlatform>,
    catalog: Arc<Catalog>,
    settings: ServiceSettings,
}

impl PlatformDeliverer {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        catalog: Arc<Catalog>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            platform,
            catalog,
            settings,
        }
    }

    /// Locale of whoever reads the post; unknown users get the default.
    async fn locale_of(&self, username: &str) -> String {
        match self.platform.resolve_user(username).await {
            Ok(user) => user.locale,
            Err(e) => {
                warn!(username, "locale lookup failed: {e}");
                String::new()
            }
        }
    }

    /// Build the post for one occurrence.
    pub async fn render(
        &self,
        reminder: &Reminder,
        occurrence: &Occurrence,
    ) -> Result<Post, DeliveryError> {
        let (recipient, reader) = match &reminder.target {
            Target::Me => (Recipient::Direct(reminder.owner.clone()), &reminder.owner),
            Target::User(name) => (Recipient::Direct(name.clone()), name),
            Target::Channel(name) => {
                let channel = self
                    .platform
                    .resolve_channel(&reminder.team_id, name)
                    .await
                    .map_err(|e| DeliveryError(e.to_string()))?;
                (Recipient::Channel(channel.id), &reminder.owner)
            }
        };

        let locale = self.locale_of(reader).await;
        let t = translator(&self.catalog, &self.settings, &locale);
        let text = match &reminder.target {
            Target::Me => t.t_with("reminder.self", &[("Message", &reminder.message)]),
            Target::User(_) => t.t_with(
                "reminder.message",
                &[("Owner", &reminder.owner), ("Message", &reminder.message)],
            ),
            Target::Channel(name) => t.t_with(
                "reminder.channel",
                &[
                    ("Owner", &reminder.owner),
                    ("Channel", name),
                    ("Message", &reminder.message),
                ],
            ),
        };

        let actions = std::iter::once(LifecycleAction::Delete)
            .chain(Shortcut::SNOOZE.map(|until| LifecycleAction::Snooze { until }));
        Ok(Post::new(recipient, text).with_actions(controls(
            &reminder.id,
            &occurrence.id,
            actions,
            &self.settings,
            &t,
        )))
    }
}

#[async_trait]
impl Deliverer for PlatformDeliverer {
    async fn deliver(&self, reminder: &Reminder, occurrence: &Occurrence) -> Result<(), DeliveryError> {
        let post = self.render(reminder, occurrence).await?;
        self.platform
            .send_message(&post)
            .await
            .map_err(|e| DeliveryError(e.to_string()))
    }
}
