//! `remindbot-service`: the request-facing half of remindbot.
//!
//! [`ReminderService`] ties the parser, generator, store and platform
//! together: it schedules reminders from text or dialogs, lists and clears
//! them, handles lifecycle actions and routes `/remind` commands. The
//! [`PlatformDeliverer`] it hands out is what the dispatcher posts through.

pub mod actions;
pub mod command;
pub mod delivery;
pub mod dialog;
pub mod error;
pub mod orchestrator;
pub mod render;

use std::sync::Arc;

use remindbot_channels::ChatPlatform;
use remindbot_core::{Catalog, Translator, User};
use remindbot_scheduler::ReminderStore;
use tracing::warn;

pub use actions::{ActionOutcome, ActionReply};
pub use command::CommandRequest;
pub use delivery::PlatformDeliverer;
pub use error::{Result, ServiceError};
pub use render::Confirmation;

/// Settings the service needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Public base URL the platform calls back (`{base}/actions`, `{base}/dialog`).
    pub callback_base_url: String,
    /// Locale for users whose own locale is unset.
    pub default_locale: String,
}

impl ServiceSettings {
    pub fn actions_url(&self) -> String {
        format!("{}/actions", self.callback_base_url.trim_end_matches('/'))
    }

    pub fn dialog_url(&self) -> String {
        format!("{}/dialog", self.callback_base_url.trim_end_matches('/'))
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            callback_base_url: String::new(),
            default_locale: remindbot_core::i18n::FALLBACK_LOCALE.to_string(),
        }
    }
}

/// Foreground reminder operations over a shared store and platform.
pub struct ReminderService {
    store: Arc<ReminderStore>,
    platform: Arc<dyn ChatPlatform>,
    catalog: Arc<Catalog>,
    settings: ServiceSettings,
}

impl ReminderService {
    pub fn new(
        store: Arc<ReminderStore>,
        platform: Arc<dyn ChatPlatform>,
        catalog: Arc<Catalog>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            platform,
            catalog,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ReminderStore> {
        &self.store
    }

    /// Deliverer for the dispatcher, sharing this service's platform and strings.
    pub fn deliverer(&self) -> PlatformDeliverer {
        PlatformDeliverer::new(
            Arc::clone(&self.platform),
            Arc::clone(&self.catalog),
            self.settings.clone(),
        )
    }

    fn translator(&self, locale: &str) -> Translator<'_> {
        translator(&self.catalog, &self.settings, locale)
    }

    /// Translator for `username`; falls back to the default locale when the
    /// platform cannot resolve the user.
    async fn translator_for(&self, username: &str) -> Translator<'_> {
        match self.platform.resolve_user(username).await {
            Ok(user) => self.translator(&user.locale),
            Err(e) => {
                warn!(username, "locale lookup failed: {e}");
                self.translator("")
            }
        }
    }

    async fn acting_user(&self, username: &str) -> Result<User> {
        Ok(self.platform.resolve_user(username).await?)
    }
}

pub(crate) fn translator<'a>(
    catalog: &'a Catalog,
    settings: &ServiceSettings,
    locale: &str,
) -> Translator<'a> {
    if locale.is_empty() {
        catalog.translator(&settings.default_locale)
    } else {
        catalog.translator(locale)
    }
}
