//! Lifecycle action context, carried by every clickable control attached to
//! a reminder post and echoed back by the host platform when it is clicked.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TimeOfDay;

/// Fixed set of relative-time shortcuts offered by the scheduling dialog and
/// by snooze controls. Serialised with the names the host platform sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shortcut {
    #[serde(rename = "tomorrow")]
    Tomorrow,
    #[serde(rename = "nextweek")]
    NextWeek,
    #[serde(rename = "10sec")]
    TenSeconds,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1hr")]
    OneHour,
    #[serde(rename = "2hr")]
    TwoHours,
    #[serde(rename = "3hr")]
    ThreeHours,
    #[serde(rename = "4hr")]
    FourHours,
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "2day")]
    TwoDays,
    #[serde(rename = "3day")]
    ThreeDays,
    #[serde(rename = "4day")]
    FourDays,
}

impl Shortcut {
    /// Options presented by the interactive scheduling dialog, in display order.
    pub const DIALOG: [Shortcut; 12] = [
        Shortcut::Tomorrow,
        Shortcut::NextWeek,
        Shortcut::TenSeconds,
        Shortcut::ThirtyMinutes,
        Shortcut::OneHour,
        Shortcut::TwoHours,
        Shortcut::ThreeHours,
        Shortcut::FourHours,
        Shortcut::OneDay,
        Shortcut::TwoDays,
        Shortcut::ThreeDays,
        Shortcut::FourDays,
    ];

    /// Snooze controls attached to a delivered reminder.
    pub const SNOOZE: [Shortcut; 5] = [
        Shortcut::ThirtyMinutes,
        Shortcut::OneHour,
        Shortcut::ThreeHours,
        Shortcut::Tomorrow,
        Shortcut::NextWeek,
    ];

    /// Wire value, also the suffix of the `button.snooze.*` catalog key.
    pub fn as_str(self) -> &'static str {
        match self {
            Shortcut::Tomorrow => "tomorrow",
            Shortcut::NextWeek => "nextweek",
            Shortcut::TenSeconds => "10sec",
            Shortcut::ThirtyMinutes => "30min",
            Shortcut::OneHour => "1hr",
            Shortcut::TwoHours => "2hr",
            Shortcut::ThreeHours => "3hr",
            Shortcut::FourHours => "4hr",
            Shortcut::OneDay => "1day",
            Shortcut::TwoDays => "2day",
            Shortcut::ThreeDays => "3day",
            Shortcut::FourDays => "4day",
        }
    }

    /// A when-phrase the text parser accepts with the same meaning.
    pub fn phrase(self) -> &'static str {
        match self {
            Shortcut::Tomorrow => "tomorrow",
            Shortcut::NextWeek => "next week",
            Shortcut::TenSeconds => "in 10 seconds",
            Shortcut::ThirtyMinutes => "in 30 minutes",
            Shortcut::OneHour => "in 1 hour",
            Shortcut::TwoHours => "in 2 hours",
            Shortcut::ThreeHours => "in 3 hours",
            Shortcut::FourHours => "in 4 hours",
            Shortcut::OneDay => "in 1 day",
            Shortcut::TwoDays => "in 2 days",
            Shortcut::ThreeDays => "in 3 days",
            Shortcut::FourDays => "in 4 days",
        }
    }

    /// Resolve to an absolute instant relative to `now` in `location`.
    ///
    /// `tomorrow` is 09:00 the next day; `nextweek` is 09:00 on the coming Monday.
    pub fn resolve(self, now: DateTime<Utc>, location: FixedOffset) -> DateTime<Utc> {
        let fixed = |secs: i64| now + Duration::seconds(secs);
        match self {
            Shortcut::TenSeconds => fixed(10),
            Shortcut::ThirtyMinutes => fixed(30 * 60),
            Shortcut::OneHour => fixed(3_600),
            Shortcut::TwoHours => fixed(2 * 3_600),
            Shortcut::ThreeHours => fixed(3 * 3_600),
            Shortcut::FourHours => fixed(4 * 3_600),
            Shortcut::OneDay => fixed(86_400),
            Shortcut::TwoDays => fixed(2 * 86_400),
            Shortcut::ThreeDays => fixed(3 * 86_400),
            Shortcut::FourDays => fixed(4 * 86_400),
            Shortcut::Tomorrow => local_morning(now, location, 1),
            Shortcut::NextWeek => {
                let today = now.with_timezone(&location).weekday();
                let days = 7 - i64::from(today.num_days_from_monday());
                local_morning(now, location, days)
            }
        }
    }
}

impl std::str::FromStr for Shortcut {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown shortcut: {s}"))
    }
}

/// 09:00 local time `days` days after `now`'s local date.
fn local_morning(now: DateTime<Utc>, location: FixedOffset, days: i64) -> DateTime<Utc> {
    let date = now.with_timezone(&location).date_naive() + Duration::days(days);
    let at = TimeOfDay::DEFAULT;
    let time = NaiveTime::from_hms_opt(u32::from(at.hour), u32::from(at.minute), 0)
        .unwrap_or(NaiveTime::MIN);
    match location.from_local_datetime(&date.and_time(time)).single() {
        Some(local) => local.with_timezone(&Utc),
        None => now + Duration::days(days),
    }
}

/// What a clicked control asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LifecycleAction {
    Delete,
    View,
    Snooze { until: Shortcut },
}

impl LifecycleAction {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleAction::Delete => "delete",
            LifecycleAction::View => "view",
            LifecycleAction::Snooze { .. } => "snooze",
        }
    }
}

/// Context bag attached to every control. The host platform echoes it back
/// verbatim on click; `action_id` is the replay key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    pub action_id: String,
    pub reminder_id: String,
    pub occurrence_id: String,
    #[serde(flatten)]
    pub action: LifecycleAction,
}

impl ActionContext {
    pub fn new(reminder_id: &str, occurrence_id: &str, action: LifecycleAction) -> Self {
        Self {
            action_id: crate::types::new_id(),
            reminder_id: reminder_id.to_string(),
            occurrence_id: occurrence_id.to_string(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn context_wire_shape_is_flat() {
        let ctx = ActionContext {
            action_id: "a1".into(),
            reminder_id: "r1".into(),
            occurrence_id: "o1".into(),
            action: LifecycleAction::Snooze {
                until: Shortcut::OneHour,
            },
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["action"], "snooze");
        assert_eq!(json["until"], "1hr");
        assert_eq!(json["reminder_id"], "r1");

        let back: ActionContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let json = r#"{"action_id":"a","reminder_id":"r","occurrence_id":"o","action":"explode"}"#;
        assert!(serde_json::from_str::<ActionContext>(json).is_err());
    }

    #[test]
    fn shortcut_parses_wire_names() {
        assert_eq!("10sec".parse::<Shortcut>().unwrap(), Shortcut::TenSeconds);
        assert_eq!("nextweek".parse::<Shortcut>().unwrap(), Shortcut::NextWeek);
        assert!("5min".parse::<Shortcut>().is_err());
    }

    #[test]
    fn tomorrow_is_nine_local() {
        // 22:30 UTC on Friday is 00:30 Saturday in UTC+2.
        let now = at(2026, 10, 16, 22, 30);
        let plus_two = FixedOffset::east_opt(2 * 3_600).unwrap();
        let resolved = Shortcut::Tomorrow.resolve(now, plus_two);
        // Sunday 09:00 local = 07:00 UTC.
        assert_eq!(resolved, at(2026, 10, 18, 7, 0));
    }

    #[test]
    fn next_week_lands_on_monday_morning() {
        let now = at(2026, 10, 16, 12, 0); // Friday
        let resolved = Shortcut::NextWeek.resolve(now, Utc.fix());
        assert_eq!(resolved.weekday(), Weekday::Mon);
        assert_eq!(resolved, at(2026, 10, 19, 9, 0));
    }

    #[test]
    fn relative_shortcuts_add_fixed_durations() {
        let now = at(2026, 10, 16, 12, 0);
        assert_eq!(
            Shortcut::TenSeconds.resolve(now, Utc.fix()),
            now + Duration::seconds(10)
        );
        assert_eq!(
            Shortcut::TwoDays.resolve(now, Utc.fix()),
            now + Duration::days(2)
        );
    }
}
