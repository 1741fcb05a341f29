//! `remindbot-parser`: turns the free-form text after `/remind` into a
//! target, a message and a [`Recurrence`].
//!
//! Payload shape: `[target] <message and when-phrase in either order>`.
//! The when-phrase is located by trying the longest complete prefix first,
//! then the leftmost complete suffix. Anything outside the grammar in
//! [`when`] is rejected; a partial match never produces a reminder.

pub mod error;
mod lexicon;
mod when;

use chrono::{DateTime, FixedOffset, Utc};
use remindbot_core::{Recurrence, Target};
use tracing::debug;

pub use error::{ParseError, Result};

/// Everything the parser needs besides the payload itself.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub now: DateTime<Utc>,
    /// Acting user's resolved location.
    pub location: FixedOffset,
    /// The locale's word for "me".
    pub me: &'a str,
    /// The locale's word for "to".
    pub to: &'a str,
}

/// Structured result of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReminder {
    pub target: Target,
    /// Message with a leading "to" removed.
    pub message: String,
    /// Whether the request said "to <message>"; the confirmation re-inserts it.
    pub use_to: bool,
    /// The when-phrase exactly as the user typed it.
    pub when_expression: String,
    pub recurrence: Recurrence,
}

pub fn parse(payload: &str, ctx: &ParseContext<'_>) -> Result<ParsedReminder> {
    let raw: Vec<&str> = payload.split_whitespace().collect();
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }
    let norm: Vec<String> = raw.iter().map(|t| lexicon::normalize(t)).collect();

    let (target, skip) = target(raw[0], &norm[0], ctx)?;
    let raw = &raw[skip..];
    let norm = &norm[skip..];

    let clock = when::Clock {
        now: ctx.now,
        location: ctx.location,
    };
    let (recurrence, when_range, message_range) =
        locate(norm, &clock).ok_or_else(|| ParseError::NoTime(payload.trim().to_string()))?;

    let (message, use_to) = message(&raw[message_range.clone()], &norm[message_range], ctx)?;
    let when_expression = raw[when_range].join(" ");

    debug!(
        reminder_target = %target,
        when = %when_expression,
        recurring = recurrence.is_recurring(),
        "reminder parsed"
    );

    Ok(ParsedReminder {
        target,
        message,
        use_to,
        when_expression,
        recurrence,
    })
}

/// Split off an explicit target. Returns how many tokens it used.
fn target(raw: &str, norm: &str, ctx: &ParseContext<'_>) -> Result<(Target, usize)> {
    let name = |sigil: char| {
        raw.trim_start_matches(sigil)
            .trim_end_matches([',', ':', '.', '!', '?', ';'])
            .to_string()
    };
    if raw.starts_with('@') {
        let user = name('@');
        if user.is_empty() {
            return Err(ParseError::InvalidTarget(raw.to_string()));
        }
        return Ok((Target::User(user), 1));
    }
    if raw.starts_with('~') {
        let channel = name('~');
        if channel.is_empty() {
            return Err(ParseError::InvalidTarget(raw.to_string()));
        }
        return Ok((Target::Channel(channel), 1));
    }
    if norm == "me" || norm == ctx.me.to_lowercase() {
        return Ok((Target::Me, 1));
    }
    Ok((Target::Me, 0))
}

type Range = std::ops::Range<usize>;

/// Find the when-phrase. Returns it with the token ranges of phrase and message.
fn locate(norm: &[String], clock: &when::Clock) -> Option<(Recurrence, Range, Range)> {
    let n = norm.len();
    for len in (1..=n).rev() {
        if let Some(rec) = when::parse(&norm[..len], clock) {
            return Some((rec, 0..len, len..n));
        }
    }
    for start in 1..n {
        if let Some(rec) = when::parse(&norm[start..], clock) {
            return Some((rec, start..n, 0..start));
        }
    }
    None
}

fn message(raw: &[&str], norm: &[String], ctx: &ParseContext<'_>) -> Result<(String, bool)> {
    let to = ctx.to.to_lowercase();
    let use_to = norm
        .first()
        .is_some_and(|first| first == "to" || *first == to);
    let raw = if use_to { &raw[1..] } else { raw };

    let text = raw.join(" ");
    let text = unquote(text.trim()).trim();
    if text.is_empty() {
        return Err(ParseError::NoMessage);
    }
    Ok((text.to_string(), use_to))
}

/// Strip one enclosing pair of straight or curly double quotes.
fn unquote(text: &str) -> &str {
    [('"', '"'), ('\u{201c}', '\u{201d}')]
        .iter()
        .find_map(|(open, close)| {
            text.strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        })
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Weekday};
    use remindbot_core::{IntervalUnit, TimeOfDay};

    fn now() -> DateTime<Utc> {
        // Friday.
        Utc.with_ymd_and_hms(2026, 10, 16, 14, 30, 0).unwrap()
    }

    fn ctx() -> ParseContext<'static> {
        ParseContext {
            now: now(),
            location: FixedOffset::east_opt(0).unwrap(),
            me: "me",
            to: "to",
        }
    }

    fn p(payload: &str) -> Result<ParsedReminder> {
        parse(payload, &ctx())
    }

    #[test]
    fn relative_suffix_with_to() {
        let r = p("me to check the build in 10 seconds").unwrap();
        assert_eq!(r.target, Target::Me);
        assert_eq!(r.message, "check the build");
        assert!(r.use_to);
        assert_eq!(r.when_expression, "in 10 seconds");
        assert_eq!(
            r.recurrence,
            Recurrence::Once {
                at: now() + Duration::seconds(10)
            }
        );
    }

    #[test]
    fn when_phrase_first() {
        let r = p("me in 10 seconds to check the build").unwrap();
        assert_eq!(r.message, "check the build");
        assert!(r.use_to);
        assert_eq!(r.when_expression, "in 10 seconds");
    }

    #[test]
    fn user_target_and_absolute_time() {
        let r = p("@bob to deploy tomorrow at 9am").unwrap();
        assert_eq!(r.target, Target::User("bob".into()));
        assert_eq!(r.message, "deploy");
        assert_eq!(r.when_expression, "tomorrow at 9am");
        assert_eq!(
            r.recurrence,
            Recurrence::Once {
                at: Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap()
            }
        );
    }

    #[test]
    fn channel_target_recurring() {
        let r = p("~team every weekday at 9am to stand up").unwrap();
        assert_eq!(r.target, Target::Channel("team".into()));
        assert_eq!(r.message, "stand up");
        assert_eq!(
            r.recurrence,
            Recurrence::Weekdays {
                at: TimeOfDay::DEFAULT
            }
        );
    }

    #[test]
    fn implicit_me_and_quoted_message() {
        let r = p("\"water the plants\" every monday and thursday").unwrap();
        assert_eq!(r.target, Target::Me);
        assert_eq!(r.message, "water the plants");
        assert!(!r.use_to);
        assert_eq!(
            r.recurrence,
            Recurrence::Weekly {
                days: vec![Weekday::Mon, Weekday::Thu],
                at: TimeOfDay::DEFAULT
            }
        );
    }

    #[test]
    fn only_the_enclosing_quotes_are_stripped() {
        let r = p("me tomorrow \"say \"hi\"\"").unwrap();
        assert_eq!(r.message, "say \"hi\"");
        let r = p("me tomorrow say \"hi\"").unwrap();
        assert_eq!(r.message, "say \"hi\"");
        let r = p("me tomorrow \u{201c}call mum\u{201d}").unwrap();
        assert_eq!(r.message, "call mum");
    }

    #[test]
    fn huge_quantities_fail_to_parse() {
        assert!(matches!(p("me in 99999999 weeks to x"), Err(ParseError::NoTime(_))));
        assert!(matches!(
            p("me every 4294967295 days at 9am to x"),
            Err(ParseError::NoTime(_))
        ));
    }

    #[test]
    fn interval_cadence() {
        let r = p("me every 2 hours drink water").unwrap();
        assert_eq!(r.message, "drink water");
        assert_eq!(
            r.recurrence,
            Recurrence::Interval {
                every: 2,
                unit: IntervalUnit::Hours,
                at: None
            }
        );
    }

    #[test]
    fn past_instant_is_not_a_parse_error() {
        let r = p("me yesterday to X").unwrap();
        assert!(matches!(r.recurrence, Recurrence::Once { at } if at < now()));
    }

    #[test]
    fn localized_me_and_to() {
        let ctx = ParseContext {
            me: "mich",
            to: "zu",
            ..ctx()
        };
        let r = parse("mich zu lesen in 1 hour", &ctx).unwrap();
        assert_eq!(r.target, Target::Me);
        assert_eq!(r.message, "lesen");
        assert!(r.use_to);
    }

    #[test]
    fn failures() {
        assert_eq!(p("   "), Err(ParseError::Empty));
        assert_eq!(p("@ tomorrow x"), Err(ParseError::InvalidTarget("@".into())));
        assert!(matches!(p("me to do something"), Err(ParseError::NoTime(_))));
        assert_eq!(p("me tomorrow"), Err(ParseError::NoMessage));
        assert_eq!(p("me to tomorrow"), Err(ParseError::NoMessage));
    }
}
