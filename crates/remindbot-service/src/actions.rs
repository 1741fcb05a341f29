//! Lifecycle actions on an existing reminder: delete, view, snooze.
//!
//! Every action is safe to replay. A reminder or occurrence that no longer
//! exists means the action already happened, so it yields
//! [`ActionOutcome::AlreadyHandled`] rather than an error.

use chrono::{DateTime, SubsecRound, Utc};
use remindbot_core::{ActionContext, LifecycleAction, Occurrence, Recurrence, Shortcut};
use remindbot_scheduler::{schedule, SnoozeOutcome};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::render::{format_time, target_text, when_text};
use crate::ReminderService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The occurrence was removed; `reminder_removed` when the whole reminder went with it.
    Deleted { reminder_removed: bool },
    Viewed,
    Snoozed { until: DateTime<Utc> },
    AlreadyHandled,
}

/// Outcome plus the localized text to show the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReply {
    pub outcome: ActionOutcome,
    pub text: String,
}

impl ReminderService {
    pub async fn handle_action(&self, ctx: &ActionContext, acting_user: &str) -> Result<ActionReply> {
        self.handle_action_at(ctx, acting_user, Utc::now().trunc_subsecs(3))
            .await
    }

    #[instrument(
        skip(self, ctx),
        fields(action = ctx.action.name(), reminder_id = %ctx.reminder_id, occurrence_id = %ctx.occurrence_id)
    )]
    pub async fn handle_action_at(
        &self,
        ctx: &ActionContext,
        acting_user: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionReply> {
        let t = self.translator_for(acting_user).await;
        let handled = || ActionReply {
            outcome: ActionOutcome::AlreadyHandled,
            text: t.t("action.handled"),
        };

        let Some(reminder) = self.store.get(&ctx.reminder_id)? else {
            debug!("reminder gone");
            return Ok(handled());
        };

        match &ctx.action {
            LifecycleAction::View => Ok(ActionReply {
                outcome: ActionOutcome::Viewed,
                text: t.t_with(
                    "view.response",
                    &[
                        ("Message", &reminder.message),
                        ("Target", &target_text(&reminder.target, &reminder.owner, &t)),
                        ("When", &when_text(&reminder, &t)),
                    ],
                ),
            }),

            LifecycleAction::Delete => {
                if reminder.occurrence(&ctx.occurrence_id).is_none()
                    || !self.store.delete_occurrence(&ctx.occurrence_id)?
                {
                    return Ok(handled());
                }
                let pending_left = reminder
                    .occurrences
                    .iter()
                    .any(|o| o.id != ctx.occurrence_id && !o.delivered);

                let mut reminder_removed = false;
                if !pending_left {
                    if reminder.is_recurring() {
                        self.store.set_completed(&reminder.id, now)?;
                    } else {
                        reminder_removed = self.store.delete(&reminder.id)?;
                    }
                }
                info!(acting_user, reminder_removed, pending_left, "occurrence deleted");
                let key = if pending_left {
                    "delete.occurrence.response"
                } else {
                    "delete.response"
                };
                Ok(ActionReply {
                    outcome: ActionOutcome::Deleted { reminder_removed },
                    text: t.t_with(key, &[("Message", &reminder.message)]),
                })
            }

            LifecycleAction::Snooze { until } => {
                let location = reminder.location();
                let at = snooze_until(*until, now, location)?;
                let next = Occurrence::snoozed(&reminder.id, at);
                match self.store.snooze(
                    &ctx.action_id,
                    &reminder.id,
                    &ctx.occurrence_id,
                    &next,
                )? {
                    SnoozeOutcome::Snoozed => {
                        info!(acting_user, until = %at, "occurrence snoozed");
                        Ok(ActionReply {
                            outcome: ActionOutcome::Snoozed { until: at },
                            text: t.t_with(
                                "snooze.response",
                                &[
                                    ("Message", &reminder.message),
                                    ("Time", &format_time(at, location)),
                                ],
                            ),
                        })
                    }
                    SnoozeOutcome::Replayed | SnoozeOutcome::NotFound => Ok(handled()),
                }
            }
        }
    }
}

/// Resolve a snooze shortcut through the one-shot path of the generator.
fn snooze_until(
    until: Shortcut,
    now: DateTime<Utc>,
    location: chrono::FixedOffset,
) -> Result<DateTime<Utc>> {
    let once = Recurrence::Once {
        at: until.resolve(now, location),
    };
    Ok(schedule::initial(&once, now, location)?)
}
