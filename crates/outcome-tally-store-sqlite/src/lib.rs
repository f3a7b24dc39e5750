use std::path::Path;

use anyhow::{Context, Result};
use outcome_tally_core::{Outcome, OutcomeRecord};
use rusqlite::{params, Connection, OptionalExtension};

// AUTOINCREMENT keeps ids strictly increasing and never reused, even after
// the newest row is deleted.
const CREATE_OUTCOMES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS outcomes (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  value INTEGER NOT NULL CHECK (value IN (0, 1))
);
";

pub struct SqliteTallyStore {
    conn: Connection,
}

impl SqliteTallyStore {
    /// Open a SQLite-backed outcome store and configure runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot
    /// be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Create the outcomes table if it does not exist yet. Safe to call on
    /// every startup.
    ///
    /// # Errors
    /// Returns an error when the schema statement cannot be applied.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_OUTCOMES_SQL)
            .context("failed to ensure outcomes schema")
    }

    /// Append one outcome and return its store-assigned id.
    ///
    /// # Errors
    /// Returns an error when the insert transaction fails; nothing is visible
    /// to later reads in that case.
    pub fn insert(&mut self, value: Outcome) -> Result<i64> {
        let tx = self.conn.transaction().context("failed to start insert transaction")?;

        tx.execute(
            "INSERT INTO outcomes (value) VALUES (?1)",
            params![value_to_sql(value)],
        )
        .context("failed to insert outcome")?;
        let id = tx.last_insert_rowid();

        tx.commit().context("failed to commit outcome insert")?;
        Ok(id)
    }

    /// Return the `limit` most-recently-inserted records in ascending id
    /// order (oldest of the window first).
    ///
    /// The inner query selects the newest rows descending; the outer query
    /// re-orders them ascending. Both ORDER BY clauses are required since
    /// SQLite guarantees no ordering without an explicit clause at each
    /// nesting level.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row holds an invalid value.
    pub fn load_recent(&self, limit: usize) -> Result<Vec<OutcomeRecord>> {
        let limit = i64::try_from(limit).context("recent window limit out of range")?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, value FROM (
                     SELECT id, value FROM outcomes ORDER BY id DESC LIMIT ?1
                 ) ORDER BY id ASC",
            )
            .context("failed to prepare recent outcomes query")?;

        let rows = stmt
            .query_map(params![limit], parse_outcome_row)
            .context("failed to query recent outcomes")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.context("failed to read outcome row")?);
        }
        Ok(records)
    }

    /// Set the value of the record with the given id. Returns `false` when no
    /// row matched (reported no-op, not an error).
    ///
    /// # Errors
    /// Returns an error when the update transaction fails.
    pub fn update_value(&mut self, id: i64, value: Outcome) -> Result<bool> {
        let tx = self.conn.transaction().context("failed to start update transaction")?;

        let affected = tx
            .execute(
                "UPDATE outcomes SET value = ?1 WHERE id = ?2",
                params![value_to_sql(value), id],
            )
            .context("failed to update outcome value")?;

        tx.commit().context("failed to commit outcome update")?;
        Ok(affected > 0)
    }

    /// Delete the record with the given id. Returns `false` when no row
    /// matched (reported no-op, not an error).
    ///
    /// # Errors
    /// Returns an error when the delete transaction fails.
    pub fn delete_by_id(&mut self, id: i64) -> Result<bool> {
        let tx = self.conn.transaction().context("failed to start delete transaction")?;

        let affected = tx
            .execute("DELETE FROM outcomes WHERE id = ?1", params![id])
            .context("failed to delete outcome")?;

        tx.commit().context("failed to commit outcome delete")?;
        Ok(affected > 0)
    }

    /// Return the highest-id record, or `None` when the table is empty.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn most_recent(&self) -> Result<Option<OutcomeRecord>> {
        self.conn
            .query_row(
                "SELECT id, value FROM outcomes ORDER BY id DESC LIMIT 1",
                [],
                parse_outcome_row,
            )
            .optional()
            .context("failed to read most recent outcome")
    }
}

fn value_to_sql(value: Outcome) -> i64 {
    i64::from(value.as_bool())
}

fn parse_outcome_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OutcomeRecord> {
    let id: i64 = row.get(0)?;
    let raw: i64 = row.get(1)?;
    let value = match raw {
        0 => Outcome::A,
        1 => Outcome::B,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Integer,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid outcome value in row: {other}"),
                )),
            ))
        }
    };

    Ok(OutcomeRecord { id, value })
}
