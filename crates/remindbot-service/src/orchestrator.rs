use chrono::{DateTime, SubsecRound, Utc};
use remindbot_channels::{PlatformError, Post, Recipient};
use remindbot_core::{
    new_id, LifecycleAction, Occurrence, Reminder, ReminderRequest, Target,
};
use remindbot_parser::{parse, ParseContext};
use remindbot_scheduler::schedule;
use tracing::{info, instrument};

use crate::error::{Result, ServiceError};
use crate::render::{controls, format_time, target_text, when_text, Confirmation};
use crate::ReminderService;

impl ReminderService {
    /// Parse, persist and confirm a reminder request.
    ///
    /// Nothing is stored unless every step succeeds.
    pub async fn schedule(&self, request: &ReminderRequest, channel_id: &str) -> Result<Post> {
        self.schedule_at(request, channel_id, Utc::now().trunc_subsecs(3))
            .await
    }

    #[instrument(skip(self, request), fields(user = %request.username, team = %request.team_id))]
    pub async fn schedule_at(
        &self,
        request: &ReminderRequest,
        channel_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Post> {
        let user = self.acting_user(&request.username).await?;
        let t = self.translator(&user.locale);
        let location = user.location();

        let me = t.t("me");
        let to = t.t("to");
        let parsed = parse(
            &request.payload,
            &ParseContext {
                now,
                location,
                me: &me,
                to: &to,
            },
        )?;

        self.check_target(&parsed.target, &request.team_id).await?;

        let id = new_id();
        let first = schedule::initial(&parsed.recurrence, now, location)?;
        let reminder = Reminder {
            id: id.clone(),
            team_id: request.team_id.clone(),
            owner: request.username.clone(),
            target: parsed.target,
            message: parsed.message,
            when_expression: parsed.when_expression,
            recurrence: parsed.recurrence,
            utc_offset_secs: user.utc_offset_secs,
            completed: None,
            created_at: now,
            occurrences: vec![Occurrence::new(&id, first)],
        };
        self.store.upsert(&reminder)?;
        info!(reminder_id = %id, first = %first, "reminder scheduled");

        let confirmation = Confirmation {
            target: target_text(&reminder.target, &request.username, &t),
            connector: if parsed.use_to {
                format!(" {to}")
            } else {
                String::new()
            },
            message: reminder.message.clone(),
            when_text: t.t_with(
                "schedule.when",
                &[
                    ("Expression", &reminder.when_expression),
                    ("Time", &format_time(first, location)),
                ],
            ),
        };
        let occurrence_id = &reminder.occurrences[0].id;
        Ok(
            Post::new(Recipient::Channel(channel_id.to_string()), confirmation.render(&t))
                .with_actions(controls(
                    &reminder.id,
                    occurrence_id,
                    [LifecycleAction::Delete, LifecycleAction::View],
                    &self.settings,
                    &t,
                )),
        )
    }

    async fn check_target(&self, target: &Target, team_id: &str) -> Result<()> {
        let lookup = match target {
            Target::Me => return Ok(()),
            Target::User(name) => self.platform.resolve_user(name).await.map(|_| ()),
            Target::Channel(name) => self
                .platform
                .resolve_channel(team_id, name)
                .await
                .map(|_| ()),
        };
        match lookup {
            Err(PlatformError::NotFound(_)) => Err(ServiceError::TargetNotFound(target.to_string())),
            other => Ok(other?),
        }
    }

    /// The user's reminders grouped into upcoming, recurring and past.
    #[instrument(skip(self))]
    pub async fn list_reminders(&self, username: &str, team_id: &str, channel_id: &str) -> Result<Post> {
        let t = self.translator_for(username).await;
        let reminders = self.store.list_for_user(team_id, username)?;

        let mut upcoming = Vec::new();
        let mut recurring = Vec::new();
        let mut past = Vec::new();
        for reminder in &reminders {
            match reminder.next_pending() {
                Some(next) if reminder.is_recurring() => {
                    recurring.push((next.occurrence_time, reminder))
                }
                Some(next) => upcoming.push((next.occurrence_time, reminder)),
                None => {
                    let last = reminder
                        .last_delivered()
                        .map_or(reminder.created_at, |o| o.occurrence_time);
                    past.push((last, reminder))
                }
            }
        }

        let mut sections = Vec::new();
        for (header, mut items) in [
            ("list.upcoming", upcoming),
            ("list.recurring", recurring),
            ("list.past", past),
        ] {
            if items.is_empty() {
                continue;
            }
            items.sort_by_key(|(at, r)| (*at, r.created_at));
            let mut section = vec![t.t(header)];
            section.extend(items.iter().map(|(_, r)| {
                t.t_with(
                    "list.item",
                    &[("Message", &r.message), ("When", &when_text(r, &t))],
                )
            }));
            sections.push(section.join("\n"));
        }

        let text = if sections.is_empty() {
            t.t("list.none")
        } else {
            sections.join("\n\n")
        };
        Ok(Post::new(Recipient::Channel(channel_id.to_string()), text))
    }

    /// Delete every reminder the user owns and report how many there were.
    #[instrument(skip(self))]
    pub async fn delete_reminders(&self, username: &str) -> Result<String> {
        let t = self.translator_for(username).await;
        let count = self.store.delete_all_for_user(username)?;
        Ok(t.t_with("clear.response", &[("Count", &count.to_string())]))
    }
}
