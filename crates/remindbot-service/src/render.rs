//! Text and control rendering shared by confirmations, listings and deliveries.

use chrono::{DateTime, FixedOffset, Utc};
use remindbot_channels::PostAction;
use remindbot_core::{ActionContext, LifecycleAction, Reminder, Target, Translator};

use crate::ServiceSettings;

/// Wall-clock rendering of an instant in the user's location.
pub fn format_time(at: DateTime<Utc>, location: FixedOffset) -> String {
    at.with_timezone(&location)
        .format("%a %b %-d %Y %H:%M")
        .to_string()
}

/// "when" text for a reminder: the original phrase plus its next (or last) instant.
pub fn when_text(reminder: &Reminder, t: &Translator<'_>) -> String {
    let location = reminder.location();
    let expression = reminder.when_expression.as_str();
    match reminder.next_pending() {
        Some(next) if reminder.is_recurring() => t.t_with(
            "schedule.next",
            &[
                ("Expression", expression),
                ("Time", &format_time(next.occurrence_time, location)),
            ],
        ),
        Some(next) => t.t_with(
            "schedule.when",
            &[
                ("Expression", expression),
                ("Time", &format_time(next.occurrence_time, location)),
            ],
        ),
        None => match reminder.last_delivered() {
            Some(last) => t.t_with(
                "schedule.when",
                &[
                    ("Expression", expression),
                    ("Time", &format_time(last.occurrence_time, location)),
                ],
            ),
            None => expression.to_string(),
        },
    }
}

/// How a target reads in a sentence addressed to `actor`.
pub fn target_text(target: &Target, actor: &str, t: &Translator<'_>) -> String {
    match target {
        Target::Me => t.t("you"),
        Target::User(name) if name == actor => t.t("you"),
        other => other.to_string(),
    }
}

/// Values for the `schedule.response` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Rendered recipient ("you", "@bob", "~team").
    pub target: String,
    /// `" to"` when the request used it, otherwise empty.
    pub connector: String,
    pub message: String,
    pub when_text: String,
}

impl Confirmation {
    pub fn render(&self, t: &Translator<'_>) -> String {
        t.t_with(
            "schedule.response",
            &[
                ("Target", &self.target),
                ("UseTo", &self.connector),
                ("Message", &self.message),
                ("When", &self.when_text),
            ],
        )
    }
}

/// One control per action, all pointing at the actions endpoint.
pub fn controls(
    reminder_id: &str,
    occurrence_id: &str,
    actions: impl IntoIterator<Item = LifecycleAction>,
    settings: &ServiceSettings,
    t: &Translator<'_>,
) -> Vec<PostAction> {
    let url = settings.actions_url();
    actions
        .into_iter()
        .map(|action| {
            let label = match &action {
                LifecycleAction::Delete => t.t("button.delete"),
                LifecycleAction::View => t.t("button.view.reminders"),
                LifecycleAction::Snooze { until } => {
                    t.t(&format!("button.snooze.{}", until.as_str()))
                }
            };
            PostAction {
                label,
                url: url.clone(),
                context: ActionContext::new(reminder_id, occurrence_id, action),
            }
        })
        .collect()
}
