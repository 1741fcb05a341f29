//! Single-token vocabulary: numbers, units, weekdays, months, clock times, dates.
//!
//! Every function takes already-normalized tokens (lowercase, trailing
//! punctuation removed) and returns how many tokens it consumed.

use chrono::{NaiveDate, Weekday};
use remindbot_core::{IntervalUnit, TimeOfDay};

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("a", 1),
    ("an", 1),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("fifteen", 15),
    ("twenty", 20),
    ("thirty", 30),
];

/// Largest count accepted in a quantity (`10000 weeks` is about two centuries).
pub(crate) const MAX_QUANTITY: u32 = 10_000;

/// Lowercase and strip trailing sentence punctuation.
pub(crate) fn normalize(token: &str) -> String {
    token
        .trim_end_matches([',', '.', '!', '?', ';'])
        .to_lowercase()
}

pub(crate) fn number(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return (n <= MAX_QUANTITY).then_some(n);
    }
    NUMBER_WORDS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, n)| *n)
}

pub(crate) fn unit(token: &str) -> Option<IntervalUnit> {
    let unit = match token {
        "s" | "sec" | "secs" | "second" | "seconds" => IntervalUnit::Seconds,
        "m" | "min" | "mins" | "minute" | "minutes" => IntervalUnit::Minutes,
        "h" | "hr" | "hrs" | "hour" | "hours" => IntervalUnit::Hours,
        "d" | "day" | "days" => IntervalUnit::Days,
        "w" | "wk" | "wks" | "week" | "weeks" => IntervalUnit::Weeks,
        _ => return None,
    };
    Some(unit)
}

/// `<n> <unit>` or the fused `<n><unit>` form (`10sec`, `2h`).
pub(crate) fn quantity(toks: &[String]) -> Option<(u32, IntervalUnit, usize)> {
    let first = toks.first()?;
    if let (Some(n), Some(u)) = (number(first), toks.get(1).and_then(|t| unit(t))) {
        return Some((n, u, 2));
    }
    let split = first.find(|c: char| !c.is_ascii_digit())?;
    if split == 0 {
        return None;
    }
    let (digits, suffix) = first.split_at(split);
    let n = digits.parse().ok().filter(|n| *n <= MAX_QUANTITY)?;
    Some((n, unit(suffix)?, 1))
}

/// Weekday name, abbreviation, or plural (`mondays`).
pub(crate) fn weekday(token: &str) -> Option<Weekday> {
    let token = token.strip_suffix('s').filter(|t| t.ends_with("day")).unwrap_or(token);
    let day = match token {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

pub(crate) fn month(token: &str) -> Option<u32> {
    let m = match token {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(m)
}

/// Day of month, optionally with an ordinal suffix (`20th`).
fn day_of_month(token: &str) -> Option<u32> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|s| token.strip_suffix(s))
        .unwrap_or(token);
    digits.parse().ok().filter(|d| (1..=31).contains(d))
}

fn year(token: &str) -> Option<i32> {
    (token.len() == 4)
        .then(|| token.parse().ok())
        .flatten()
        .filter(|y| (1970..=9999).contains(y))
}

/// A calendar date. `None` year means "the next time this date comes round".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateSpec {
    Full(NaiveDate),
    MonthDay { month: u32, day: u32 },
}

/// `2026-10-20`, `10/20`, `10/20/2026`, `october 20`, `oct 20th 2026`.
pub(crate) fn date(toks: &[String]) -> Option<(DateSpec, usize)> {
    let first = toks.first()?;

    if let Ok(d) = NaiveDate::parse_from_str(first, "%Y-%m-%d") {
        return Some((DateSpec::Full(d), 1));
    }

    let parts: Vec<&str> = first.split('/').collect();
    match parts.as_slice() {
        [m, d] => {
            let month: u32 = m.parse().ok().filter(|m| (1..=12).contains(m))?;
            let day = day_of_month(d)?;
            return Some((DateSpec::MonthDay { month, day }, 1));
        }
        [m, d, y] => {
            let d = NaiveDate::from_ymd_opt(year(y)?, m.parse().ok()?, day_of_month(d)?)?;
            return Some((DateSpec::Full(d), 1));
        }
        _ => {}
    }

    let month = month(first)?;
    let day = day_of_month(toks.get(1)?)?;
    match toks.get(2).and_then(|t| year(t)) {
        Some(y) => Some((DateSpec::Full(NaiveDate::from_ymd_opt(y, month, day)?), 3)),
        None => Some((DateSpec::MonthDay { month, day }, 2)),
    }
}

/// Clock time: `9am`, `9 am`, `9:30pm`, `21:15`, `noon`, `midnight`.
///
/// A bare hour (`9`) is read on the 24-hour clock and only accepted when
/// `allow_bare` is set, i.e. directly after `at`.
pub(crate) fn time_of_day(toks: &[String], allow_bare: bool) -> Option<(TimeOfDay, usize)> {
    let first = toks.first()?;
    match first.as_str() {
        "noon" | "midday" => return Some((TimeOfDay { hour: 12, minute: 0 }, 1)),
        "midnight" => return Some((TimeOfDay { hour: 0, minute: 0 }, 1)),
        _ => {}
    }

    let (clock, meridiem, used) = match meridiem_suffix(first) {
        Some((clock, pm)) => (clock, Some(pm), 1),
        None => match toks.get(1).and_then(|t| meridiem_word(t)) {
            Some(pm) => (first.as_str(), Some(pm), 2),
            None => (first.as_str(), None, 1),
        },
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) if m.len() == 2 => (h.parse::<u8>().ok()?, m.parse::<u8>().ok()?),
        Some(_) => return None,
        None => (clock.parse::<u8>().ok()?, 0),
    };

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None if clock.contains(':') || allow_bare => hour,
        None => return None,
    };

    TimeOfDay::new(hour, minute).map(|t| (t, used))
}

fn meridiem_word(token: &str) -> Option<bool> {
    match token {
        "am" => Some(false),
        "pm" => Some(true),
        _ => None,
    }
}

fn meridiem_suffix(token: &str) -> Option<(&str, bool)> {
    if let Some(clock) = token.strip_suffix("am") {
        return (!clock.is_empty()).then_some((clock, false));
    }
    if let Some(clock) = token.strip_suffix("pm") {
        return (!clock.is_empty()).then_some((clock, true));
    }
    None
}
