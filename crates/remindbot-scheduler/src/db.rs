use rusqlite::Connection;

use crate::error::Result;

/// Initialise the reminder schema in `conn`.
///
/// Creates the `reminders`, `occurrences` and `handled_actions` tables
/// (idempotent) plus the two indexes the hot queries rely on: listing by
/// `(team_id, owner)` and the dispatcher's due scan.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS reminders (
            id               TEXT    NOT NULL PRIMARY KEY,
            team_id          TEXT    NOT NULL,
            owner            TEXT    NOT NULL,
            target           TEXT    NOT NULL,   -- JSON-encoded Target
            message          TEXT    NOT NULL,
            when_expression  TEXT    NOT NULL,
            recurrence       TEXT    NOT NULL,   -- JSON-encoded Recurrence
            utc_offset_secs  INTEGER NOT NULL DEFAULT 0,
            completed        TEXT,               -- RFC 3339 or NULL while active
            created_at       TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_reminders_owner ON reminders (team_id, owner);

        CREATE TABLE IF NOT EXISTS occurrences (
            id               TEXT    NOT NULL PRIMARY KEY,
            reminder_id      TEXT    NOT NULL REFERENCES reminders (id) ON DELETE CASCADE,
            occurrence_time  TEXT    NOT NULL,   -- RFC 3339, millisecond precision, UTC
            delivered        INTEGER NOT NULL DEFAULT 0,
            snoozed          INTEGER NOT NULL DEFAULT 0,   -- 1 = one-off, outside the cadence
            UNIQUE (reminder_id, occurrence_time)
        ) STRICT;

        -- Due scan: WHERE delivered = 0 AND occurrence_time <= ? ORDER BY occurrence_time
        CREATE INDEX IF NOT EXISTS idx_occurrences_due ON occurrences (delivered, occurrence_time);

        -- Replay guard for interactive actions. Pruned on every claim.
        CREATE TABLE IF NOT EXISTS handled_actions (
            action_id    TEXT NOT NULL PRIMARY KEY,
            reminder_id  TEXT NOT NULL REFERENCES reminders (id) ON DELETE CASCADE,
            handled_at   TEXT NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
