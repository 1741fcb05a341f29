//! When-phrase grammar.
//!
//! A phrase either matches completely or not at all: every function here
//! returns `None` unless the whole token slice it was given is consumed.
//! Phrases are resolved against a fixed `now` and the user's UTC offset;
//! whether the result lies in the past is not this module's concern.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use remindbot_core::{IntervalUnit, Recurrence, TimeOfDay};

use crate::lexicon::{self, DateSpec};

/// Default time for `tonight`.
const TONIGHT: TimeOfDay = TimeOfDay { hour: 20, minute: 0 };

/// Reference instant and location used to resolve a phrase.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: DateTime<Utc>,
    pub location: FixedOffset,
}

impl Clock {
    fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.location).date_naive()
    }

    /// Absolute instant of wall-clock `at` on local `date`.
    fn at(&self, date: NaiveDate, at: TimeOfDay) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(u32::from(at.hour), u32::from(at.minute), 0)?;
        self.location
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Parse a complete when-phrase.
pub(crate) fn parse(toks: &[String], clock: &Clock) -> Option<Recurrence> {
    match toks.first().map(String::as_str)? {
        "every" => recurring(&toks[1..]),
        "daily" => {
            let at = trailing_time(&toks[1..])?;
            Some(Recurrence::Daily {
                at: at.unwrap_or(TimeOfDay::DEFAULT),
            })
        }
        "in" => {
            let at = clock.now.checked_add_signed(relative(&toks[1..])?)?;
            Some(Recurrence::Once { at })
        }
        _ => absolute(toks, clock).map(|at| Recurrence::Once { at }),
    }
}

/// `<n> <unit> [and <n> <unit> ...]` → total duration.
fn relative(toks: &[String]) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut i = 0;
    while i < toks.len() {
        if i > 0 && toks[i] == "and" {
            i += 1;
        }
        let (n, unit, used) = lexicon::quantity(&toks[i..])?;
        let step = i64::from(n)
            .checked_mul(unit.seconds())
            .and_then(Duration::try_seconds)?;
        total = total.checked_add(&step)?;
        i += used;
    }
    (i > 0 && total > Duration::zero()).then_some(total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaySpec {
    Today,
    Tonight,
    Tomorrow,
    Yesterday,
    /// `monday`, `on monday`: today if still ahead, otherwise the next one.
    This(Weekday),
    /// `next monday`: strictly after today.
    Next(Weekday),
    NextWeek,
    Date(DateSpec),
}

/// `[day] [at <time>] [day]` in either order; at least one part present.
fn absolute(toks: &[String], clock: &Clock) -> Option<DateTime<Utc>> {
    let mut i = 0;
    let mut day = None;
    let mut time = None;

    if let Some((d, used)) = day_spec(&toks[i..]) {
        day = Some(d);
        i += used;
    }
    if let Some((t, used)) = time_spec(&toks[i..]) {
        time = Some(t);
        i += used;
    }
    if day.is_none() {
        if let Some((d, used)) = day_spec(&toks[i..]) {
            day = Some(d);
            i += used;
        }
    }
    if i != toks.len() {
        return None;
    }

    match (day, time) {
        (None, None) => None,
        (None, Some(t)) => {
            let today = clock.at(clock.today(), t)?;
            if today > clock.now {
                Some(today)
            } else {
                clock.at(clock.today() + Duration::days(1), t)
            }
        }
        (Some(d), t) => resolve_day(d, t, clock),
    }
}

fn resolve_day(day: DaySpec, time: Option<TimeOfDay>, clock: &Clock) -> Option<DateTime<Utc>> {
    let today = clock.today();
    let at = time.unwrap_or(match day {
        DaySpec::Tonight => TONIGHT,
        _ => TimeOfDay::DEFAULT,
    });
    let ahead = |w: Weekday| -> i64 {
        let diff = i64::from(w.num_days_from_monday()) - i64::from(today.weekday().num_days_from_monday());
        diff.rem_euclid(7)
    };

    let date = match day {
        DaySpec::Today | DaySpec::Tonight => today,
        DaySpec::Tomorrow => today + Duration::days(1),
        DaySpec::Yesterday => today - Duration::days(1),
        DaySpec::This(w) => {
            let candidate = today + Duration::days(ahead(w));
            if candidate == today && clock.at(today, at)? <= clock.now {
                today + Duration::days(7)
            } else {
                candidate
            }
        }
        DaySpec::Next(w) => match ahead(w) {
            0 => today + Duration::days(7),
            n => today + Duration::days(n),
        },
        DaySpec::NextWeek => {
            today + Duration::days(7 - i64::from(today.weekday().num_days_from_monday()))
        }
        DaySpec::Date(DateSpec::Full(d)) => d,
        DaySpec::Date(DateSpec::MonthDay { month, day }) => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
            match this_year {
                Some(d) if clock.at(d, at)? > clock.now => d,
                _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day)?,
            }
        }
    };
    clock.at(date, at)
}

fn day_spec(toks: &[String]) -> Option<(DaySpec, usize)> {
    let (on, rest) = match toks.first().map(String::as_str) {
        Some("on") => (1, &toks[1..]),
        _ => (0, toks),
    };
    let first = rest.first()?.as_str();

    let simple = match first {
        "today" => Some(DaySpec::Today),
        "tonight" => Some(DaySpec::Tonight),
        "tomorrow" => Some(DaySpec::Tomorrow),
        "yesterday" => Some(DaySpec::Yesterday),
        _ => lexicon::weekday(first).map(DaySpec::This),
    };
    if let Some(d) = simple {
        return Some((d, on + 1));
    }

    if first == "next" {
        let second = rest.get(1)?;
        if second == "week" {
            return Some((DaySpec::NextWeek, on + 2));
        }
        return lexicon::weekday(second).map(|w| (DaySpec::Next(w), on + 2));
    }

    lexicon::date(rest).map(|(d, used)| (DaySpec::Date(d), on + used))
}

/// `at <time>` (bare hours allowed) or a self-evident clock time.
fn time_spec(toks: &[String]) -> Option<(TimeOfDay, usize)> {
    match toks.first().map(String::as_str)? {
        "at" => lexicon::time_of_day(&toks[1..], true).map(|(t, used)| (t, used + 1)),
        _ => lexicon::time_of_day(toks, false),
    }
}

/// An optional time phrase that must consume `toks` completely.
/// `Some(None)` means there was nothing to consume.
fn trailing_time(toks: &[String]) -> Option<Option<TimeOfDay>> {
    if toks.is_empty() {
        return Some(None);
    }
    match time_spec(toks) {
        Some((t, used)) if used == toks.len() => Some(Some(t)),
        _ => None,
    }
}

/// Everything after `every`.
fn recurring(toks: &[String]) -> Option<Recurrence> {
    let first = toks.first()?.as_str();

    match first {
        "weekday" | "weekdays" => {
            let at = trailing_time(&toks[1..])?.unwrap_or(TimeOfDay::DEFAULT);
            return Some(Recurrence::Weekdays { at });
        }
        "day" | "morning" => {
            let at = trailing_time(&toks[1..])?.unwrap_or(TimeOfDay::DEFAULT);
            return Some(Recurrence::Daily { at });
        }
        "evening" => {
            let at = trailing_time(&toks[1..])?.unwrap_or(TimeOfDay { hour: 18, minute: 0 });
            return Some(Recurrence::Daily { at });
        }
        _ => {}
    }

    if lexicon::weekday(first).is_some() {
        return weekly(toks);
    }

    let (every, unit, used) = match first {
        "other" => (2, lexicon::unit(toks.get(1)?)?, 2),
        _ => match lexicon::quantity(toks) {
            Some(q) => q,
            None => (1, lexicon::unit(first)?, 1),
        },
    };
    if every == 0 {
        return None;
    }
    let at = trailing_time(&toks[used..])?;
    if at.is_some() && !matches!(unit, IntervalUnit::Days | IntervalUnit::Weeks) {
        return None;
    }
    Some(Recurrence::Interval { every, unit, at })
}

/// `monday [and|,] thursday ... [at <time>]`.
fn weekly(toks: &[String]) -> Option<Recurrence> {
    let mut days: Vec<Weekday> = Vec::new();
    let mut i = 0;
    while let Some(tok) = toks.get(i) {
        if let Some(w) = lexicon::weekday(tok) {
            if !days.contains(&w) {
                days.push(w);
            }
            i += 1;
        } else if tok == "and" && !days.is_empty() {
            i += 1;
        } else {
            break;
        }
    }
    if days.is_empty() || toks.get(i.wrapping_sub(1)).map(String::as_str) == Some("and") {
        return None;
    }
    days.sort_by_key(|w| w.num_days_from_monday());
    let at = trailing_time(&toks[i..])?.unwrap_or(TimeOfDay::DEFAULT);
    Some(Recurrence::Weekly { days, at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::normalize;

    /// Friday 2026-10-16 14:30 UTC.
    fn clock() -> Clock {
        Clock {
            now: Utc.with_ymd_and_hms(2026, 10, 16, 14, 30, 0).unwrap(),
            location: FixedOffset::east_opt(0).unwrap(),
        }
    }

    fn when(s: &str) -> Option<Recurrence> {
        let toks: Vec<String> = s.split_whitespace().map(normalize).collect();
        parse(&toks, &clock())
    }

    fn once(s: &str) -> DateTime<Utc> {
        match when(s) {
            Some(Recurrence::Once { at }) => at,
            other => panic!("{s}: expected one-shot, got {other:?}"),
        }
    }

    fn utc(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn relative_phrases() {
        assert_eq!(once("in 10 seconds"), clock().now + Duration::seconds(10));
        assert_eq!(once("in 30 minutes"), clock().now + Duration::minutes(30));
        assert_eq!(once("in an hour"), clock().now + Duration::hours(1));
        assert_eq!(
            once("in 1 hour and 30 minutes"),
            clock().now + Duration::minutes(90)
        );
        assert_eq!(once("in 2 weeks"), clock().now + Duration::weeks(2));
        assert!(when("in 0 minutes").is_none());
        assert!(when("in a while").is_none());
    }

    #[test]
    fn oversized_quantities_are_rejected() {
        assert!(when("in 99999999 weeks").is_none());
        assert!(when("in 4294967295 seconds").is_none());
        assert!(when("every 4294967295 days at 9am").is_none());
        assert!(when("in 10000 weeks").is_some());
        assert!(when("in 10000 weeks and 10000 weeks").is_some());
    }

    #[test]
    fn named_days_default_to_nine() {
        assert_eq!(once("tomorrow"), utc(10, 17, 9, 0));
        assert_eq!(once("tomorrow at 5pm"), utc(10, 17, 17, 0));
        assert_eq!(once("at 5pm tomorrow"), utc(10, 17, 17, 0));
        assert_eq!(once("tonight"), utc(10, 16, 20, 0));
        assert_eq!(once("yesterday"), utc(10, 15, 9, 0));
    }

    #[test]
    fn bare_time_rolls_to_tomorrow_when_passed() {
        assert_eq!(once("at 5pm"), utc(10, 16, 17, 0));
        assert_eq!(once("at 9am"), utc(10, 17, 9, 0));
        assert_eq!(once("at 14"), utc(10, 17, 14, 0));
    }

    #[test]
    fn weekday_tie_breaks() {
        // Today is Friday 14:30.
        assert_eq!(once("friday at 4pm"), utc(10, 16, 16, 0));
        assert_eq!(once("on friday"), utc(10, 23, 9, 0));
        assert_eq!(once("next friday at 4pm"), utc(10, 23, 16, 0));
        assert_eq!(once("monday"), utc(10, 19, 9, 0));
        assert_eq!(once("next monday"), utc(10, 19, 9, 0));
        assert_eq!(once("next week"), utc(10, 19, 9, 0));
    }

    #[test]
    fn dated_phrases() {
        assert_eq!(once("on 2026-12-24 at noon"), utc(12, 24, 12, 0));
        assert_eq!(once("on december 24th"), utc(12, 24, 9, 0));
        assert_eq!(
            once("on 3/1"),
            Utc.with_ymd_and_hms(2027, 3, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn location_shifts_wall_clock() {
        let clock = Clock {
            now: clock().now,
            location: FixedOffset::west_opt(5 * 3_600).unwrap(),
        };
        let toks: Vec<String> = ["tomorrow", "at", "9am"].iter().map(|s| s.to_string()).collect();
        match parse(&toks, &clock) {
            Some(Recurrence::Once { at }) => assert_eq!(at, utc(10, 17, 14, 0)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recurring_phrases() {
        let nine = TimeOfDay::DEFAULT;
        assert_eq!(
            when("every weekday at 9am"),
            Some(Recurrence::Weekdays { at: nine })
        );
        assert_eq!(
            when("every day at 7:30pm"),
            Some(Recurrence::Daily {
                at: TimeOfDay::new(19, 30).unwrap()
            })
        );
        assert_eq!(when("daily"), Some(Recurrence::Daily { at: nine }));
        assert_eq!(
            when("every monday and thursday"),
            Some(Recurrence::Weekly {
                days: vec![Weekday::Mon, Weekday::Thu],
                at: nine
            })
        );
        assert_eq!(
            when("every 2 hours"),
            Some(Recurrence::Interval {
                every: 2,
                unit: IntervalUnit::Hours,
                at: None
            })
        );
        assert_eq!(
            when("every other week at 10am"),
            Some(Recurrence::Interval {
                every: 2,
                unit: IntervalUnit::Weeks,
                at: TimeOfDay::new(10, 0)
            })
        );
    }

    #[test]
    fn incomplete_or_trailing_words_fail() {
        assert!(when("every").is_none());
        assert!(when("every monday and").is_none());
        assert!(when("every 2 hours at 9am").is_none());
        assert!(when("tomorrow to deploy").is_none());
        assert!(when("at").is_none());
        assert!(when("the build").is_none());
    }
}
