use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use remindbot_core::{Occurrence, Reminder};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::db::init_db;
use crate::error::{Result, StoreError};

/// Claimed action ids are kept this long. Platform callback retries
/// arrive within seconds, so a week covers every realistic replay.
const ACTION_RETENTION_DAYS: i64 = 7;

/// A due, undelivered occurrence together with its owning reminder.
#[derive(Debug, Clone)]
pub struct Due {
    pub reminder: Reminder,
    pub occurrence: Occurrence,
}

/// Result of [`ReminderStore::snooze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeOutcome {
    Snoozed,
    /// The action id was already claimed by an earlier click.
    Replayed,
    /// The occurrence (or its reminder) no longer exists.
    NotFound,
}

/// Durable reminder store.
///
/// Wraps a single SQLite connection in a `Mutex`; every public method is
/// one lock acquisition, and multi-statement writes run in a transaction,
/// so the dispatcher and foreground handlers can interleave freely.
pub struct ReminderStore {
    db: Mutex<Connection>,
}

impl ReminderStore {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Insert or update a reminder with its full occurrence list.
    ///
    /// Occurrences already marked delivered stay delivered; occurrences no
    /// longer in the list are removed. All or nothing.
    #[instrument(skip(self, reminder), fields(reminder_id = %reminder.id))]
    pub fn upsert(&self, reminder: &Reminder) -> Result<()> {
        let target = serde_json::to_string(&reminder.target)?;
        let recurrence = serde_json::to_string(&reminder.recurrence)?;

        let mut db = self.conn()?;
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO reminders
             (id, team_id, owner, target, message, when_expression, recurrence,
              utc_offset_secs, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                 target          = excluded.target,
                 message         = excluded.message,
                 when_expression = excluded.when_expression,
                 recurrence      = excluded.recurrence,
                 utc_offset_secs = excluded.utc_offset_secs,
                 completed       = excluded.completed",
            params![
                reminder.id,
                reminder.team_id,
                reminder.owner,
                target,
                reminder.message,
                reminder.when_expression,
                recurrence,
                reminder.utc_offset_secs,
                reminder.completed.map(ts),
                ts(reminder.created_at),
            ],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO occurrences (id, reminder_id, occurrence_time, delivered, snoozed)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     delivered = MAX(occurrences.delivered, excluded.delivered)",
            )?;
            for occurrence in &reminder.occurrences {
                insert.execute(params![
                    occurrence.id,
                    reminder.id,
                    ts(occurrence.occurrence_time),
                    occurrence.delivered,
                    occurrence.snoozed,
                ])?;
            }

            let mut stmt = tx.prepare("SELECT id FROM occurrences WHERE reminder_id = ?1")?;
            let stored: Vec<String> = stmt
                .query_map([&reminder.id], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            for id in stored
                .iter()
                .filter(|id| !reminder.occurrences.iter().any(|o| &o.id == *id))
            {
                tx.execute("DELETE FROM occurrences WHERE id = ?1", [id])?;
            }
        }
        tx.commit()?;

        debug!(occurrences = reminder.occurrences.len(), "reminder upserted");
        Ok(())
    }

    /// Fetch one reminder with its occurrences.
    #[instrument(skip(self))]
    pub fn get(&self, reminder_id: &str) -> Result<Option<Reminder>> {
        let db = self.conn()?;
        load(&db, reminder_id)
    }

    /// Undelivered occurrences with `occurrence_time <= now`, oldest first.
    ///
    /// A reminder row that cannot be decoded is logged and its occurrences
    /// skipped, so one bad record never blocks the rest.
    #[instrument(skip(self))]
    pub fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Due>> {
        let db = self.conn()?;
        let occurrences: Vec<Occurrence> = {
            let mut stmt = db.prepare_cached(
                "SELECT id, reminder_id, occurrence_time, delivered, snoozed FROM occurrences
                 WHERE delivered = 0 AND occurrence_time <= ?1
                 ORDER BY occurrence_time, id",
            )?;
            let rows = stmt
                .query_map([ts(now)], row_to_occurrence)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut reminders: HashMap<String, Option<Reminder>> = HashMap::new();
        let mut due = Vec::with_capacity(occurrences.len());
        for occurrence in occurrences {
            let reminder = reminders
                .entry(occurrence.reminder_id.clone())
                .or_insert_with(|| match load(&db, &occurrence.reminder_id) {
                    Ok(reminder) => reminder,
                    Err(e) => {
                        warn!(reminder_id = %occurrence.reminder_id, "skipping unreadable reminder: {e}");
                        None
                    }
                });
            if let Some(reminder) = reminder {
                due.push(Due {
                    reminder: reminder.clone(),
                    occurrence,
                });
            }
        }
        Ok(due)
    }

    /// Number of undelivered occurrences already past `now`.
    pub fn overdue_count(&self, now: DateTime<Utc>) -> Result<usize> {
        let db = self.conn()?;
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM occurrences WHERE delivered = 0 AND occurrence_time <= ?1",
            [ts(now)],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Flip `delivered` to true. Returns `true` only for the call that
    /// performed the transition; repeat calls are a no-op.
    #[instrument(skip(self))]
    pub fn mark_delivered(&self, occurrence_id: &str) -> Result<bool> {
        let db = self.conn()?;
        let n = db.execute(
            "UPDATE occurrences SET delivered = 1 WHERE id = ?1 AND delivered = 0",
            [occurrence_id],
        )?;
        Ok(n == 1)
    }

    /// Add one occurrence to an existing reminder. An occurrence at the same
    /// instant for the same reminder is ignored; returns whether a row was added.
    #[instrument(skip(self, occurrence), fields(reminder_id = %occurrence.reminder_id))]
    pub fn append_occurrence(&self, occurrence: &Occurrence) -> Result<bool> {
        let db = self.conn()?;
        let n = db.execute(
            "INSERT OR IGNORE INTO occurrences
             (id, reminder_id, occurrence_time, delivered, snoozed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                occurrence.id,
                occurrence.reminder_id,
                ts(occurrence.occurrence_time),
                occurrence.delivered,
                occurrence.snoozed,
            ],
        )?;
        Ok(n == 1)
    }

    /// Delete a reminder and its occurrences. Returns whether it existed.
    #[instrument(skip(self))]
    pub fn delete(&self, reminder_id: &str) -> Result<bool> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM occurrences WHERE reminder_id = ?1",
            [reminder_id],
        )?;
        let n = tx.execute("DELETE FROM reminders WHERE id = ?1", [reminder_id])?;
        tx.commit()?;
        Ok(n == 1)
    }

    #[instrument(skip(self))]
    pub fn delete_occurrence(&self, occurrence_id: &str) -> Result<bool> {
        let db = self.conn()?;
        let n = db.execute("DELETE FROM occurrences WHERE id = ?1", [occurrence_id])?;
        Ok(n == 1)
    }

    /// Retire a reminder. Only the first call sets the timestamp.
    #[instrument(skip(self))]
    pub fn set_completed(&self, reminder_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let db = self.conn()?;
        let n = db.execute(
            "UPDATE reminders SET completed = ?2 WHERE id = ?1 AND completed IS NULL",
            params![reminder_id, ts(at)],
        )?;
        Ok(n == 1)
    }

    /// Delete every reminder owned by `username`. Returns how many were removed.
    #[instrument(skip(self))]
    pub fn delete_all_for_user(&self, username: &str) -> Result<usize> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM occurrences
             WHERE reminder_id IN (SELECT id FROM reminders WHERE owner = ?1)",
            [username],
        )?;
        let n = tx.execute("DELETE FROM reminders WHERE owner = ?1", [username])?;
        tx.commit()?;
        info!(count = n, "reminders cleared");
        Ok(n)
    }

    /// All reminders of one user in one team, in creation order.
    #[instrument(skip(self))]
    pub fn list_for_user(&self, team_id: &str, username: &str) -> Result<Vec<Reminder>> {
        let db = self.conn()?;
        let mut reminders: Vec<Reminder> = {
            let mut stmt = db.prepare(
                "SELECT id, team_id, owner, target, message, when_expression, recurrence,
                        utc_offset_secs, completed, created_at
                 FROM reminders
                 WHERE team_id = ?1 AND owner = ?2
                 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map(params![team_id, username], row_to_reminder)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        for reminder in &mut reminders {
            reminder.occurrences = occurrences_of(&db, &reminder.id)?;
        }
        Ok(reminders)
    }

    /// Snooze one occurrence in a single transaction: claim `action_id`,
    /// mark the current occurrence delivered and add `next`. Claims older
    /// than the retention window are dropped in the same transaction.
    #[instrument(skip(self, next), fields(until = %next.occurrence_time))]
    pub fn snooze(
        &self,
        action_id: &str,
        reminder_id: &str,
        occurrence_id: &str,
        next: &Occurrence,
    ) -> Result<SnoozeOutcome> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM occurrences WHERE id = ?1 AND reminder_id = ?2)",
            params![occurrence_id, reminder_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(SnoozeOutcome::NotFound);
        }

        let now = Utc::now();
        let pruned = tx.execute(
            "DELETE FROM handled_actions WHERE handled_at < ?1",
            [ts(now - Duration::days(ACTION_RETENTION_DAYS))],
        )?;
        if pruned > 0 {
            debug!(pruned, "expired action claims removed");
        }

        let claimed = tx.execute(
            "INSERT OR IGNORE INTO handled_actions (action_id, reminder_id, handled_at)
             VALUES (?1, ?2, ?3)",
            params![action_id, reminder_id, ts(now)],
        )?;
        if claimed == 0 {
            return Ok(SnoozeOutcome::Replayed);
        }

        tx.execute(
            "UPDATE occurrences SET delivered = 1 WHERE id = ?1",
            [occurrence_id],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO occurrences
             (id, reminder_id, occurrence_time, delivered, snoozed)
             VALUES (?1, ?2, ?3, 0, 1)",
            params![next.id, reminder_id, ts(next.occurrence_time)],
        )?;
        tx.commit()?;
        Ok(SnoozeOutcome::Snoozed)
    }
}

/// Storage format for instants: RFC 3339, UTC, millisecond precision.
/// Fixed width, so string order is time order.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn load(db: &Connection, reminder_id: &str) -> Result<Option<Reminder>> {
    let reminder = db
        .query_row(
            "SELECT id, team_id, owner, target, message, when_expression, recurrence,
                    utc_offset_secs, completed, created_at
             FROM reminders WHERE id = ?1",
            [reminder_id],
            row_to_reminder,
        )
        .optional()?;
    let Some(mut reminder) = reminder else {
        return Ok(None);
    };
    reminder.occurrences = occurrences_of(db, reminder_id)?;
    Ok(Some(reminder))
}

fn occurrences_of(db: &Connection, reminder_id: &str) -> Result<Vec<Occurrence>> {
    let mut stmt = db.prepare_cached(
        "SELECT id, reminder_id, occurrence_time, delivered, snoozed FROM occurrences
         WHERE reminder_id = ?1 ORDER BY occurrence_time",
    )?;
    let rows = stmt
        .query_map([reminder_id], row_to_occurrence)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        team_id: row.get(1)?,
        owner: row.get(2)?,
        target: json_col(row, 3)?,
        message: row.get(4)?,
        when_expression: row.get(5)?,
        recurrence: json_col(row, 6)?,
        utc_offset_secs: row.get(7)?,
        completed: row
            .get::<_, Option<String>>(8)?
            .map(|s| parse_ts(8, &s))
            .transpose()?,
        created_at: parse_ts(9, &row.get::<_, String>(9)?)?,
        occurrences: Vec::new(),
    })
}

fn row_to_occurrence(row: &Row<'_>) -> rusqlite::Result<Occurrence> {
    Ok(Occurrence {
        id: row.get(0)?,
        reminder_id: row.get(1)?,
        occurrence_time: parse_ts(2, &row.get::<_, String>(2)?)?,
        delivered: row.get(3)?,
        snoozed: row.get(4)?,
    })
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_ts(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
