//! Localized string catalog with named `{Placeholder}` substitution.
//!
//! The built-in English catalog is always present. Additional locales are
//! loaded from flat JSON objects (`{"key": "text", ...}`), either one at a
//! time or from a directory of `<locale>.json` files. Lookups fall back from
//! the requested locale to English, then to the key itself.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{CoreError, Result};

pub const FALLBACK_LOCALE: &str = "en";

const EN: &[(&str, &str)] = &[
    ("help", "help"),
    (
        "help.response",
        "Remind yourself, a teammate or a channel.\n\
         - `/remind me to check the build in 10 minutes`\n\
         - `/remind @bob to deploy tomorrow at 9am`\n\
         - `/remind ~team every weekday at 10am to stand up`\n\
         - `/remind list`: show your reminders\n\
         - `/remind`: open the scheduling dialog",
    ),
    ("list", "list"),
    ("list.upcoming", "**Upcoming reminders**"),
    ("list.recurring", "**Recurring reminders**"),
    ("list.past", "**Past reminders**"),
    ("list.none", "You have no reminders."),
    ("list.item", "* \"{Message}\" {When}"),
    (
        "schedule.response",
        "I will remind {Target}{UseTo} \"{Message}\" {When}.",
    ),
    ("schedule.reminder", "Schedule a reminder"),
    ("schedule.time", "Time"),
    ("schedule.message", "Message"),
    ("schedule.when", "{Expression} ({Time})"),
    ("schedule.next", "{Expression}, next {Time}"),
    ("reminder.message", "@{Owner} asked me to remind you \"{Message}\"."),
    ("reminder.channel", "@{Owner} asked me to remind ~{Channel} \"{Message}\"."),
    ("reminder.self", "You asked me to remind you \"{Message}\"."),
    ("view.response", "Reminder \"{Message}\" for {Target}, {When}."),
    ("delete.response", "Reminder \"{Message}\" deleted."),
    (
        "delete.occurrence.response",
        "Removed this occurrence of \"{Message}\". The reminder is still scheduled.",
    ),
    ("snooze.response", "Reminder \"{Message}\" snoozed until {Time}."),
    ("action.handled", "That reminder was already handled."),
    ("clear.response", "Deleted {Count} reminder(s)."),
    ("button.schedule", "Schedule"),
    ("button.delete", "Delete"),
    ("button.view.reminders", "View Reminders"),
    ("button.snooze.tomorrow", "Tomorrow"),
    ("button.snooze.nextweek", "Next Week"),
    ("button.snooze.10sec", "10 seconds"),
    ("button.snooze.30min", "30 minutes"),
    ("button.snooze.1hr", "1 hour"),
    ("button.snooze.2hr", "2 hours"),
    ("button.snooze.3hr", "3 hours"),
    ("button.snooze.4hr", "4 hours"),
    ("button.snooze.1day", "1 day"),
    ("button.snooze.2day", "2 days"),
    ("button.snooze.3day", "3 days"),
    ("button.snooze.4day", "4 days"),
    (
        "exception.response",
        "Sorry, I didn't understand that. Try `/remind help` for examples.",
    ),
    ("to", "to"),
    ("me", "me"),
    ("you", "you"),
];

/// All loaded locales, keyed by locale code.
#[derive(Debug, Clone)]
pub struct Catalog {
    locales: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    /// Catalog containing only the built-in English strings.
    pub fn builtin() -> Self {
        let en = EN
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut locales = HashMap::new();
        locales.insert(FALLBACK_LOCALE.to_string(), en);
        Self { locales }
    }

    /// Merge one locale from a flat JSON object. Keys override earlier values.
    pub fn load_json(&mut self, locale: &str, json: &str) -> Result<()> {
        let strings: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| CoreError::Catalog(format!("{locale}: {e}")))?;
        debug!(locale, keys = strings.len(), "catalog locale loaded");
        self.locales
            .entry(locale.to_string())
            .or_default()
            .extend(strings);
        Ok(())
    }

    /// Load every `<locale>.json` file in `dir`. Unreadable files are skipped.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let locale = locale.to_string();
            match std::fs::read_to_string(&path) {
                Ok(json) => {
                    self.load_json(&locale, &json)?;
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), "skipping catalog file: {e}"),
            }
        }
        Ok(loaded)
    }

    /// Translator bound to `locale` (region suffixes like `en-GB` match `en`).
    pub fn translator(&self, locale: &str) -> Translator<'_> {
        let primary = self.locales.get(locale).or_else(|| {
            locale
                .split(['-', '_'])
                .next()
                .and_then(|lang| self.locales.get(lang))
        });
        Translator {
            primary,
            fallback: self.locales.get(FALLBACK_LOCALE),
            locale: locale.to_string(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Locale-bound lookup handle.
#[derive(Debug, Clone)]
pub struct Translator<'a> {
    primary: Option<&'a HashMap<String, String>>,
    fallback: Option<&'a HashMap<String, String>>,
    locale: String,
}

impl Translator<'_> {
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Look up `key`. Missing keys render as the key itself.
    pub fn t(&self, key: &str) -> String {
        self.primary
            .and_then(|m| m.get(key))
            .or_else(|| self.fallback.and_then(|m| m.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Look up `key` and substitute each `{Name}` placeholder.
    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        render(&self.t(key), params)
    }
}

/// Replace `{Name}` placeholders in `template`. Unknown placeholders are left as-is.
pub fn render(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_required_keys() {
        let catalog = Catalog::builtin();
        let t = catalog.translator("en");
        for key in [
            "help",
            "help.response",
            "list",
            "schedule.response",
            "schedule.reminder",
            "schedule.time",
            "schedule.message",
            "button.schedule",
            "button.delete",
            "button.view.reminders",
            "delete.occurrence.response",
            "button.snooze.tomorrow",
            "exception.response",
            "to",
            "me",
            "you",
        ] {
            assert_ne!(t.t(key), key, "missing catalog key {key}");
        }
    }

    #[test]
    fn placeholders_are_substituted_by_name() {
        let out = render(
            "I will remind {Target}{UseTo} \"{Message}\" {When}.",
            &[
                ("Target", "you"),
                ("UseTo", " to"),
                ("Message", "deploy"),
                ("When", "tomorrow"),
            ],
        );
        assert_eq!(out, "I will remind you to \"deploy\" tomorrow.");
    }

    #[test]
    fn region_locale_falls_back_to_language_then_english() {
        let mut catalog = Catalog::builtin();
        catalog
            .load_json("de", r#"{"me": "mich", "you": "dich"}"#)
            .unwrap();
        let t = catalog.translator("de-AT");
        assert_eq!(t.t("me"), "mich");
        // Not translated: English fallback.
        assert_eq!(t.t("button.delete"), "Delete");
    }

    #[test]
    fn missing_key_renders_as_key() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.translator("fr").t("no.such.key"), "no.such.key");
    }

    #[test]
    fn malformed_locale_json_is_an_error() {
        let mut catalog = Catalog::builtin();
        assert!(catalog.load_json("xx", "[1, 2]").is_err());
    }
}
