use chrono::{DateTime, SubsecRound, Utc};
use remindbot_channels::{Dialog, DialogElement, DialogOption, DialogSubmission, Post};
use remindbot_core::{ReminderRequest, Shortcut};
use remindbot_parser::ParseError;
use tracing::{info, instrument};

use crate::error::Result;
use crate::ReminderService;

/// Form field names.
pub const TIME_FIELD: &str = "time";
pub const MESSAGE_FIELD: &str = "message";

impl ReminderService {
    /// Open the scheduling dialog: a shortcut menu plus a message field.
    #[instrument(skip(self))]
    pub async fn schedule_interactive(&self, trigger_id: &str, username: &str) -> Result<()> {
        let t = self.translator_for(username).await;
        let options = Shortcut::DIALOG
            .iter()
            .map(|s| DialogOption {
                text: t.t(&format!("button.snooze.{}", s.as_str())),
                value: s.as_str().to_string(),
            })
            .collect();

        let dialog = Dialog {
            callback_url: self.settings.dialog_url(),
            title: t.t("schedule.reminder"),
            submit_label: t.t("button.schedule"),
            elements: vec![
                DialogElement::Select {
                    name: TIME_FIELD.to_string(),
                    display_name: t.t("schedule.time"),
                    options,
                    default: Some(Shortcut::Tomorrow.as_str().to_string()),
                },
                DialogElement::Textarea {
                    name: MESSAGE_FIELD.to_string(),
                    display_name: t.t("schedule.message"),
                },
            ],
        };
        self.platform.open_dialog(trigger_id, &dialog).await?;
        info!("scheduling dialog opened");
        Ok(())
    }

    /// Turn a dialog submission back into text and schedule it like a command.
    pub async fn submit_dialog(&self, submission: &DialogSubmission) -> Result<Post> {
        self.submit_dialog_at(submission, Utc::now().trunc_subsecs(3))
            .await
    }

    #[instrument(skip(self, submission), fields(user = %submission.user))]
    pub async fn submit_dialog_at(
        &self,
        submission: &DialogSubmission,
        now: DateTime<Utc>,
    ) -> Result<Post> {
        let field = |name: &str| submission.submission.get(name).map(|v| v.trim());

        let shortcut: Shortcut = field(TIME_FIELD)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ParseError::NoTime(field(TIME_FIELD).unwrap_or_default().to_string()))?;
        let message = field(MESSAGE_FIELD)
            .filter(|m| !m.is_empty())
            .ok_or(ParseError::NoMessage)?;

        let t = self.translator_for(&submission.user).await;
        let request = ReminderRequest {
            team_id: submission.team_id.clone(),
            username: submission.user.clone(),
            // Quoted so words in the message are never read as part of the time.
            payload: format!("{} {} \"{}\"", t.t("me"), shortcut.phrase(), message),
        };
        self.schedule_at(&request, &submission.channel_id, now).await
    }
}
