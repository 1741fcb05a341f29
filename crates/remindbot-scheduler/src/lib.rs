//! `remindbot-scheduler`: occurrence generation, SQLite persistence and the
//! background dispatcher.
//!
//! # Overview
//!
//! Reminders and their occurrences live in SQLite ([`store::ReminderStore`]).
//! The [`engine::Dispatcher`] polls the store every tick, hands each due
//! occurrence to a [`engine::Deliverer`], marks it delivered and, for
//! recurring reminders, asks [`schedule`] for the next instant.
//!
//! # Recurrence variants
//!
//! | Variant    | Next occurrence                                        |
//! |------------|--------------------------------------------------------|
//! | `Once`     | The resolved instant; nothing after it                 |
//! | `Interval` | Anchor + k periods, first one after the reference time |
//! | `Daily`    | HH:MM local, every day                                 |
//! | `Weekdays` | HH:MM local, Monday to Friday                          |
//! | `Weekly`   | HH:MM local, on each listed weekday                    |

pub mod db;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod store;

pub use engine::{Deliverer, Dispatcher, TickReport};
pub use error::{DeliveryError, Result, ScheduleError, StoreError};
pub use store::{Due, ReminderStore, SnoozeOutcome};
