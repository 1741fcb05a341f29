//! `remindbot-core`: data model, lifecycle action context, configuration and
//! localized strings shared by every remindbot crate.

pub mod action;
pub mod config;
pub mod error;
pub mod i18n;
pub mod types;

pub use action::{ActionContext, LifecycleAction, Shortcut};
pub use error::{CoreError, Result};
pub use i18n::{Catalog, Translator};
pub use types::{
    new_id, Channel, IntervalUnit, Occurrence, Recurrence, Reminder, ReminderRequest, Target,
    TimeOfDay, User,
};
