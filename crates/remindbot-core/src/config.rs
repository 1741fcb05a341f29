use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_TICK_MS: u64 = 1_000; // dispatcher polling interval
pub const COMMAND_TRIGGER: &str = "remind";

/// Top-level config (remindbot.toml + REMINDBOT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemindbotConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret the platform sends as `Authorization: Bearer <token>`.
    /// Callbacks are unauthenticated when unset.
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Background dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Milliseconds between scans for due occurrences.
    /// Override with env var: REMINDBOT_DISPATCHER__INTERVAL_MS=500
    #[serde(default = "default_tick_ms")]
    pub interval_ms: u64,
    /// Start the dispatcher together with the gateway (default: true).
    #[serde(default = "bool_true")]
    pub autostart: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_TICK_MS,
            autostart: true,
        }
    }
}

/// Host chat platform bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform bridge API (without trailing slash).
    /// When unset, the gateway runs without outbound delivery.
    pub base_url: Option<String>,
    /// Bearer token sent on every platform request.
    pub token: Option<String>,
    /// Identity the bot posts as.
    #[serde(default)]
    pub bot_user_id: String,
    /// Public base URL the platform calls back for actions and dialogs.
    #[serde(default)]
    pub callback_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Locale used when a user has none set.
    #[serde(default = "default_locale")]
    pub default: String,
    /// Directory of `<locale>.json` string catalogs merged over the built-in English one.
    pub catalog_dir: Option<String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: default_locale(),
            catalog_dir: None,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}
fn default_locale() -> String {
    crate::i18n::FALLBACK_LOCALE.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.remindbot/remindbot.db", home)
}

impl RemindbotConfig {
    /// Load config from a TOML file with REMINDBOT_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.remindbot/remindbot.toml
    ///
    /// A missing file is not an error; defaults fill every section.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("REMINDBOT_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.remindbot/remindbot.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_file() {
        let config = RemindbotConfig::load(Some("/nonexistent/remindbot.toml")).unwrap();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.dispatcher.interval_ms, DEFAULT_TICK_MS);
        assert!(config.dispatcher.autostart);
        assert_eq!(config.locale.default, "en");
        assert!(config.platform.base_url.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let toml = r#"
            [dispatcher]
            interval_ms = 250

            [platform]
            base_url = "http://localhost:8065/bridge"
            bot_user_id = "remindbot"
        "#;
        let config: RemindbotConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        assert_eq!(config.dispatcher.interval_ms, 250);
        assert_eq!(
            config.platform.base_url.as_deref(),
            Some("http://localhost:8065/bridge")
        );
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
    }
}
