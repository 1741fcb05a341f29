//! Occurrence generator.
//!
//! Pure functions of (rule, reference instants, location). Calling either
//! function twice with the same arguments yields the same instant, so the
//! schedule can be re-derived after a restart from persisted state alone.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use remindbot_core::{IntervalUnit, Recurrence, TimeOfDay};

use crate::error::ScheduleError;

type Result<T> = std::result::Result<T, ScheduleError>;

/// Calendar rules never look further ahead than this many days.
const SEARCH_DAYS: i64 = 8;

/// First occurrence for a freshly scheduled reminder.
///
/// One-shot reminders must lie strictly after `now`.
pub fn initial(
    recurrence: &Recurrence,
    now: DateTime<Utc>,
    location: FixedOffset,
) -> Result<DateTime<Utc>> {
    validate(recurrence)?;
    match recurrence {
        Recurrence::Once { at } => {
            if *at <= now {
                Err(ScheduleError::PastTime { at: *at })
            } else {
                Ok(*at)
            }
        }
        // Land on the wall-clock time; the period applies from there on.
        Recurrence::Interval { at: Some(at), .. } => next_calendar(|_| true, *at, now, location),
        Recurrence::Interval {
            every,
            unit,
            at: None,
        } => now
            .checked_add_signed(period(*every, *unit)?)
            .ok_or_else(out_of_range),
        _ => next_after(recurrence, now, now, location)?
            .ok_or_else(|| ScheduleError::InvalidRule("no occurrence".to_string())),
    }
}

/// Next occurrence of a recurring rule.
///
/// `anchor` is the occurrence just fired; interval rules step from it in
/// whole periods so the cadence does not drift. The result is the smallest
/// instant on the rule strictly greater than `after`. Returns `Ok(None)` for
/// one-shot rules.
pub fn next_after(
    recurrence: &Recurrence,
    anchor: DateTime<Utc>,
    after: DateTime<Utc>,
    location: FixedOffset,
) -> Result<Option<DateTime<Utc>>> {
    validate(recurrence)?;
    let next = match recurrence {
        Recurrence::Once { .. } => return Ok(None),
        Recurrence::Interval { every, unit, .. } => {
            let step = period(*every, *unit)?.num_milliseconds();
            let elapsed = (after - anchor).num_milliseconds().max(0);
            (elapsed / step + 1)
                .checked_mul(step)
                .and_then(Duration::try_milliseconds)
                .and_then(|ahead| anchor.checked_add_signed(ahead))
                .ok_or_else(out_of_range)?
        }
        Recurrence::Daily { at } => next_calendar(|_| true, *at, after, location)?,
        Recurrence::Weekdays { at } => next_calendar(
            |d| !matches!(d, Weekday::Sat | Weekday::Sun),
            *at,
            after,
            location,
        )?,
        Recurrence::Weekly { days, at } => {
            next_calendar(|d| days.contains(&d), *at, after, location)?
        }
    };
    Ok(Some(next))
}

fn validate(recurrence: &Recurrence) -> Result<()> {
    match recurrence {
        Recurrence::Interval { every: 0, .. } => {
            Err(ScheduleError::InvalidRule("interval of zero".to_string()))
        }
        Recurrence::Interval {
            unit,
            at: Some(_),
            ..
        } if !matches!(unit, IntervalUnit::Days | IntervalUnit::Weeks) => Err(
            ScheduleError::InvalidRule("time of day needs a unit of days or weeks".to_string()),
        ),
        Recurrence::Weekly { days, .. } if days.is_empty() => {
            Err(ScheduleError::InvalidRule("no weekdays".to_string()))
        }
        _ => Ok(()),
    }
}

fn period(every: u32, unit: IntervalUnit) -> Result<Duration> {
    i64::from(every)
        .checked_mul(unit.seconds())
        .and_then(Duration::try_seconds)
        .ok_or_else(out_of_range)
}

fn out_of_range() -> ScheduleError {
    ScheduleError::InvalidRule("interval out of range".to_string())
}

/// Smallest `at` on a matching local day that is strictly after `after`.
fn next_calendar(
    matches: impl Fn(Weekday) -> bool,
    at: TimeOfDay,
    after: DateTime<Utc>,
    location: FixedOffset,
) -> Result<DateTime<Utc>> {
    let start = after.with_timezone(&location).date_naive();
    (0..=SEARCH_DAYS)
        .map(|offset| start + Duration::days(offset))
        .filter(|date| matches(date.weekday()))
        .filter_map(|date| local_instant(date, at, location))
        .find(|candidate| *candidate > after)
        .ok_or_else(|| ScheduleError::InvalidRule("no matching day".to_string()))
}

fn local_instant(date: NaiveDate, at: TimeOfDay, location: FixedOffset) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(u32::from(at.hour), u32::from(at.minute), 0)?;
    location
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, m, d, h, min, 0).unwrap()
    }

    fn nine() -> TimeOfDay {
        TimeOfDay::DEFAULT
    }

    #[test]
    fn one_shot_must_be_future() {
        let now = at(10, 16, 12, 0);
        let future = Recurrence::Once { at: at(10, 16, 12, 1) };
        assert_eq!(initial(&future, now, utc()), Ok(at(10, 16, 12, 1)));

        let past = Recurrence::Once { at: at(10, 15, 9, 0) };
        assert_eq!(
            initial(&past, now, utc()),
            Err(ScheduleError::PastTime { at: at(10, 15, 9, 0) })
        );
        let same = Recurrence::Once { at: now };
        assert!(initial(&same, now, utc()).is_err());
        assert_eq!(next_after(&future, now, now, utc()), Ok(None));
    }

    #[test]
    fn weekdays_skip_the_weekend() {
        // Friday 2026-10-16 10:00, after the 09:00 slot.
        let rule = Recurrence::Weekdays { at: nine() };
        let first = initial(&rule, at(10, 16, 10, 0), utc()).unwrap();
        assert_eq!(first, at(10, 19, 9, 0));

        let mut current = first;
        for _ in 0..30 {
            let next = next_after(&rule, current, current, utc()).unwrap().unwrap();
            assert!(next > current);
            assert!(!matches!(next.weekday(), Weekday::Sat | Weekday::Sun));
            current = next;
        }
    }

    #[test]
    fn daily_same_day_when_still_ahead() {
        let rule = Recurrence::Daily { at: nine() };
        assert_eq!(initial(&rule, at(10, 16, 8, 0), utc()), Ok(at(10, 16, 9, 0)));
        assert_eq!(initial(&rule, at(10, 16, 9, 0), utc()), Ok(at(10, 17, 9, 0)));
    }

    #[test]
    fn weekly_uses_owner_location() {
        // Tuesday 09:00 in UTC-5 is 14:00 UTC.
        let rule = Recurrence::Weekly {
            days: vec![Weekday::Tue],
            at: nine(),
        };
        let minus_five = FixedOffset::west_opt(5 * 3_600).unwrap();
        assert_eq!(
            initial(&rule, at(10, 16, 12, 0), minus_five),
            Ok(at(10, 20, 14, 0))
        );
    }

    #[test]
    fn interval_steps_from_anchor_without_drift() {
        let rule = Recurrence::Interval {
            every: 2,
            unit: IntervalUnit::Hours,
            at: None,
        };
        let now = at(10, 16, 12, 0);
        assert_eq!(initial(&rule, now, utc()), Ok(at(10, 16, 14, 0)));

        // Delivered late (14:00:07): next still lands on 16:00.
        let anchor = at(10, 16, 14, 0);
        let late = anchor + Duration::seconds(7);
        assert_eq!(
            next_after(&rule, anchor, late, utc()),
            Ok(Some(at(10, 16, 16, 0)))
        );
        // Down for five hours: skip the missed slots, never fire twice.
        assert_eq!(
            next_after(&rule, anchor, at(10, 16, 19, 0), utc()),
            Ok(Some(at(10, 16, 20, 0)))
        );
    }

    #[test]
    fn interval_with_time_lands_on_wall_clock() {
        let rule = Recurrence::Interval {
            every: 2,
            unit: IntervalUnit::Weeks,
            at: TimeOfDay::new(10, 0),
        };
        let first = initial(&rule, at(10, 16, 12, 0), utc()).unwrap();
        assert_eq!(first, at(10, 17, 10, 0));
        assert_eq!(
            next_after(&rule, first, first, utc()),
            Ok(Some(at(10, 31, 10, 0)))
        );
    }

    #[test]
    fn idempotent_for_same_inputs() {
        let rule = Recurrence::Daily { at: nine() };
        let t = at(10, 16, 9, 0);
        assert_eq!(
            next_after(&rule, t, t, utc()),
            next_after(&rule, t, t, utc())
        );
    }

    #[test]
    fn invalid_rules_rejected() {
        let zero = Recurrence::Interval {
            every: 0,
            unit: IntervalUnit::Days,
            at: None,
        };
        assert!(matches!(
            initial(&zero, at(10, 16, 0, 0), utc()),
            Err(ScheduleError::InvalidRule(_))
        ));
        let hourly_at = Recurrence::Interval {
            every: 1,
            unit: IntervalUnit::Hours,
            at: Some(nine()),
        };
        assert!(initial(&hourly_at, at(10, 16, 0, 0), utc()).is_err());
        let no_days = Recurrence::Weekly {
            days: vec![],
            at: nine(),
        };
        assert!(initial(&no_days, at(10, 16, 0, 0), utc()).is_err());
    }

    #[test]
    fn huge_interval_is_an_error_not_a_panic() {
        let rule = Recurrence::Interval {
            every: u32::MAX,
            unit: IntervalUnit::Days,
            at: Some(nine()),
        };
        let now = at(10, 16, 8, 0);
        // The first slot is a plain calendar lookup.
        let first = initial(&rule, now, utc()).unwrap();
        assert!(matches!(
            next_after(&rule, first, first, utc()),
            Err(ScheduleError::InvalidRule(_))
        ));

        let untimed = Recurrence::Interval {
            every: u32::MAX,
            unit: IntervalUnit::Weeks,
            at: None,
        };
        assert!(matches!(
            initial(&untimed, now, utc()),
            Err(ScheduleError::InvalidRule(_))
        ));
    }
}
