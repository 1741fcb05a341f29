use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mint a fresh opaque identifier (UUIDv7, time-sortable).
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Who receives a reminder when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Target {
    /// The user who created the reminder.
    Me,
    /// Another user, by username (no leading `@`).
    User(String),
    /// A channel, by name (no leading `~`).
    Channel(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Me => write!(f, "me"),
            Target::User(name) => write!(f, "@{name}"),
            Target::Channel(name) => write!(f, "~{name}"),
        }
    }
}

/// Wall-clock time of day in the owner's location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    /// Used whenever a phrase names a day but no time.
    pub const DEFAULT: TimeOfDay = TimeOfDay { hour: 9, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Unit of an `every N <unit>` cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl IntervalUnit {
    /// Length of one unit in seconds.
    pub fn seconds(self) -> i64 {
        match self {
            IntervalUnit::Seconds => 1,
            IntervalUnit::Minutes => 60,
            IntervalUnit::Hours => 3_600,
            IntervalUnit::Days => 86_400,
            IntervalUnit::Weeks => 604_800,
        }
    }
}

/// Recurrence descriptor: whether and how a reminder repeats.
///
/// `Once` is the non-repeating case and carries the resolved absolute
/// instant. All other variants are evaluated in the reminder's fixed UTC
/// offset so "every weekday at 9am" means 9am where the owner lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Fire exactly once at the given instant.
    Once { at: DateTime<Utc> },

    /// Fire every `every` units. With `at`, the first firing lands on that
    /// wall-clock time; without it, the first firing is one period from now.
    Interval {
        every: u32,
        unit: IntervalUnit,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<TimeOfDay>,
    },

    /// Fire every day at `at`.
    Daily { at: TimeOfDay },

    /// Fire Monday through Friday at `at`.
    Weekdays { at: TimeOfDay },

    /// Fire on each listed weekday at `at`.
    Weekly { days: Vec<Weekday>, at: TimeOfDay },
}

impl Recurrence {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Recurrence::Once { .. })
    }
}

/// One concrete firing instant belonging to a [`Reminder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    /// Back-reference to the owning reminder.
    pub reminder_id: String,
    pub occurrence_time: DateTime<Utc>,
    /// Flips false→true once, when the occurrence is delivered or snoozed.
    pub delivered: bool,
    /// Created by a snooze. Fires once and never advances the cadence.
    #[serde(default)]
    pub snoozed: bool,
}

impl Occurrence {
    pub fn new(reminder_id: &str, occurrence_time: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            reminder_id: reminder_id.to_string(),
            occurrence_time,
            delivered: false,
            snoozed: false,
        }
    }

    pub fn snoozed(reminder_id: &str, occurrence_time: DateTime<Utc>) -> Self {
        Self {
            snoozed: true,
            ..Self::new(reminder_id, occurrence_time)
        }
    }
}

/// A persisted user-created reminder. Owns its occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub team_id: String,
    /// Username of the creator.
    pub owner: String,
    pub target: Target,
    /// Body text, with any leading "to" removed.
    pub message: String,
    /// The original time phrase, kept for display.
    pub when_expression: String,
    pub recurrence: Recurrence,
    /// Owner's resolved location as seconds east of UTC.
    pub utc_offset_secs: i32,
    /// Set when the whole reminder is retired; `None` while active.
    pub completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Ordered by `occurrence_time`.
    pub occurrences: Vec<Occurrence>,
}

impl Reminder {
    /// The owner's location as a chrono offset. Out-of-range values fall back to UTC.
    pub fn location(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(utc)
    }

    /// Earliest occurrence that has not been delivered yet.
    pub fn next_pending(&self) -> Option<&Occurrence> {
        self.occurrences
            .iter()
            .filter(|o| !o.delivered)
            .min_by_key(|o| o.occurrence_time)
    }

    /// Latest occurrence that has already been delivered.
    pub fn last_delivered(&self) -> Option<&Occurrence> {
        self.occurrences
            .iter()
            .filter(|o| o.delivered)
            .max_by_key(|o| o.occurrence_time)
    }

    pub fn occurrence(&self, occurrence_id: &str) -> Option<&Occurrence> {
        self.occurrences.iter().find(|o| o.id == occurrence_id)
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_recurring()
    }
}

/// Transient input to one scheduling call. Never persisted.
#[derive(Debug, Clone)]
pub struct ReminderRequest {
    pub team_id: String,
    pub username: String,
    /// Raw command text with the trigger token already stripped.
    pub payload: String,
}

/// A host-platform user as resolved by the platform boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Resolved location as seconds east of UTC.
    #[serde(default)]
    pub utc_offset_secs: i32,
}

impl User {
    pub fn location(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(utc)
    }
}

/// A host-platform channel as resolved by the platform boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub team_id: String,
}

fn default_locale() -> String {
    "en".to_string()
}

fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reminder_with(occurrences: Vec<Occurrence>) -> Reminder {
        Reminder {
            id: "r1".to_string(),
            team_id: "t1".to_string(),
            owner: "alice".to_string(),
            target: Target::Me,
            message: "stretch".to_string(),
            when_expression: "in 5 minutes".to_string(),
            recurrence: Recurrence::Once {
                at: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
            },
            utc_offset_secs: 0,
            completed: None,
            created_at: Utc.with_ymd_and_hms(2026, 10, 16, 11, 55, 0).unwrap(),
            occurrences,
        }
    }

    #[test]
    fn next_pending_skips_delivered() {
        let early = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let mut first = Occurrence::new("r1", early);
        first.delivered = true;
        let second = Occurrence::new("r1", late);
        let reminder = reminder_with(vec![first.clone(), second.clone()]);

        assert_eq!(reminder.next_pending().map(|o| &o.id), Some(&second.id));
        assert_eq!(reminder.last_delivered().map(|o| &o.id), Some(&first.id));
    }

    #[test]
    fn recurrence_serializes_tagged() {
        let rec = Recurrence::Weekdays {
            at: TimeOfDay::DEFAULT,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains(r#""kind":"weekdays""#));
        let back: Recurrence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn target_display_uses_platform_sigils() {
        assert_eq!(Target::User("bob".into()).to_string(), "@bob");
        assert_eq!(Target::Channel("team".into()).to_string(), "~team");
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            locale: "en".into(),
            utc_offset_secs: 90_000,
        };
        assert_eq!(user.location().local_minus_utc(), 0);
    }
}
