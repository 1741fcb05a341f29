use remindbot_channels::{Post, Recipient};
use remindbot_core::{config::COMMAND_TRIGGER, ReminderRequest};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::error::Result;
use crate::ReminderService;

/// A `/remind` invocation as delivered by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub team_id: String,
    pub channel_id: String,
    /// Username of the caller.
    pub user: String,
    /// Everything the user typed, with or without the leading `/remind`.
    #[serde(default)]
    pub text: String,
    /// Present when the platform allows opening a dialog in response.
    #[serde(default)]
    pub trigger_id: Option<String>,
}

impl ReminderService {
    /// Route one command. `None` means a dialog was opened and there is
    /// nothing to reply with. Failures are logged and answered with the
    /// generic `exception.response` text.
    #[instrument(skip(self, cmd), fields(user = %cmd.user, channel = %cmd.channel_id))]
    pub async fn execute_command(&self, cmd: &CommandRequest) -> Option<Post> {
        match self.route(cmd).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(code = e.code(), "command failed: {e}");
                let t = self.translator_for(&cmd.user).await;
                Some(self.reply(cmd, t.t("exception.response")))
            }
        }
    }

    async fn route(&self, cmd: &CommandRequest) -> Result<Option<Post>> {
        let payload = strip_trigger(&cmd.text);
        let t = self.translator_for(&cmd.user).await;
        let word = payload.to_lowercase();

        if payload.is_empty() {
            return match &cmd.trigger_id {
                Some(trigger_id) => {
                    self.schedule_interactive(trigger_id, &cmd.user).await?;
                    Ok(None)
                }
                None => Ok(Some(self.reply(cmd, t.t("help.response")))),
            };
        }
        if word == t.t("help").to_lowercase() {
            return Ok(Some(self.reply(cmd, t.t("help.response"))));
        }
        if word == t.t("list").to_lowercase() {
            let post = self
                .list_reminders(&cmd.user, &cmd.team_id, &cmd.channel_id)
                .await?;
            return Ok(Some(post));
        }
        match payload {
            "__clear" => {
                let text = self.delete_reminders(&cmd.user).await?;
                Ok(Some(self.reply(cmd, text)))
            }
            "__version" => Ok(Some(self.reply(
                cmd,
                format!("remindbot {}", env!("CARGO_PKG_VERSION")),
            ))),
            "__user" => {
                let user = self.acting_user(&cmd.user).await?;
                let text = format!(
                    "@{} locale: {}, location: UTC{}",
                    user.username,
                    user.locale,
                    user.location()
                );
                Ok(Some(self.reply(cmd, text)))
            }
            _ => {
                let request = ReminderRequest {
                    team_id: cmd.team_id.clone(),
                    username: cmd.user.clone(),
                    payload: payload.to_string(),
                };
                Ok(Some(self.schedule(&request, &cmd.channel_id).await?))
            }
        }
    }

    fn reply(&self, cmd: &CommandRequest, text: String) -> Post {
        Post::new(Recipient::Channel(cmd.channel_id.clone()), text)
    }
}

/// Drop a leading `/remind` or `remind` token.
fn strip_trigger(text: &str) -> &str {
    let text = text.trim();
    let (first, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    if first.trim_start_matches('/').eq_ignore_ascii_case(COMMAND_TRIGGER) {
        rest.trim()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_optional() {
        assert_eq!(strip_trigger("/remind me tomorrow x"), "me tomorrow x");
        assert_eq!(strip_trigger("remind list"), "list");
        assert_eq!(strip_trigger("  me in 1 hour x "), "me in 1 hour x");
        assert_eq!(strip_trigger("/remind"), "");
        assert_eq!(strip_trigger("reminders later"), "reminders later");
    }
}
