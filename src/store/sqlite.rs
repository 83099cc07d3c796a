//! SQLite lexicon store.
//!
//! The store lives inside the primary repository (`lexicon.db`) and is the
//! durable copy of every lexical entry. All writes go through [`SqliteLexicon::mutate`],
//! which wraps the whole operation in one IMMEDIATE transaction: an import
//! is committed entirely or not at all.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{LexEntry, Relation, Sense};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    guid          TEXT PRIMARY KEY,
    lemma         TEXT NOT NULL,
    morph_type    TEXT,
    senses        TEXT NOT NULL,
    relations     TEXT NOT NULL,
    date_created  TEXT NOT NULL,
    date_modified TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entries_lemma ON entries(lemma);
";

/// SQLite-backed lexicon store.
#[derive(Debug)]
pub struct SqliteLexicon {
    conn: Connection,
    path: PathBuf,
}

impl SqliteLexicon {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing store, failing if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] when the database file is missing.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotInitialized {
                path: path.to_path_buf(),
            });
        }
        Self::open(path)
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a mutation as one all-or-nothing unit of work.
    ///
    /// Begins an IMMEDIATE transaction (write lock up front), runs the
    /// closure, and commits. Any error rolls the whole unit back.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a database error from begin/commit.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tracing::debug!(op, "begin unit of work");
        let result = f(&tx)?;
        tx.commit()?;
        tracing::debug!(op, "committed unit of work");
        Ok(result)
    }

    /// Flush pending WAL frames to the main database file.
    ///
    /// Called while quiescing, before the repository lock is released for
    /// the bridge: the external tool must see a complete on-disk store.
    ///
    /// # Errors
    ///
    /// Returns a database error if the checkpoint fails.
    pub fn flush(&self) -> Result<()> {
        // wal_checkpoint reports (busy, log, checkpointed); the row itself
        // is uninteresting.
        self.conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }

    /// Reload the store from disk, discarding the in-memory connection.
    ///
    /// Used after the bridge rewrote the primary repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reopened.
    pub fn reload(&mut self) -> Result<()> {
        let reopened = Self::open(&self.path)?;
        self.conn = reopened.conn;
        Ok(())
    }

    // ================
    // Entry operations
    // ================

    /// Insert or replace an entry within an open transaction.
    ///
    /// # Errors
    ///
    /// Returns a database or serialization error.
    pub fn tx_upsert(tx: &Transaction, entry: &LexEntry) -> Result<()> {
        tx.execute(
            "INSERT INTO entries (guid, lemma, morph_type, senses, relations, date_created, date_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(guid) DO UPDATE SET
                lemma = excluded.lemma,
                morph_type = excluded.morph_type,
                senses = excluded.senses,
                relations = excluded.relations,
                date_created = excluded.date_created,
                date_modified = excluded.date_modified",
            rusqlite::params![
                entry.guid.to_string(),
                entry.lemma,
                entry.morph_type,
                serde_json::to_string(&entry.senses)?,
                serde_json::to_string(&entry.relations)?,
                entry.date_created.to_rfc3339(),
                entry.date_modified.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete an entry within an open transaction. Returns whether a row
    /// was removed.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn tx_delete(tx: &Transaction, guid: Uuid) -> Result<bool> {
        let n = tx.execute(
            "DELETE FROM entries WHERE guid = ?1",
            rusqlite::params![guid.to_string()],
        )?;
        Ok(n > 0)
    }

    /// Fetch an entry within an open transaction.
    ///
    /// # Errors
    ///
    /// Returns a database or deserialization error.
    pub fn tx_get(tx: &Transaction, guid: Uuid) -> Result<Option<LexEntry>> {
        tx.query_row(
            "SELECT guid, lemma, morph_type, senses, relations, date_created, date_modified
             FROM entries WHERE guid = ?1",
            rusqlite::params![guid.to_string()],
            row_to_entry,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Replace an entry's relations within an open transaction.
    ///
    /// # Errors
    ///
    /// Returns a database or serialization error.
    pub fn tx_set_relations(tx: &Transaction, guid: Uuid, relations: &[Relation]) -> Result<()> {
        tx.execute(
            "UPDATE entries SET relations = ?2 WHERE guid = ?1",
            rusqlite::params![guid.to_string(), serde_json::to_string(relations)?],
        )?;
        Ok(())
    }

    /// All entry guids within an open transaction.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn tx_all_guids(tx: &Transaction) -> Result<Vec<Uuid>> {
        let mut stmt = tx.prepare("SELECT guid FROM entries ORDER BY guid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut guids = Vec::new();
        for row in rows {
            let raw = row?;
            guids.push(parse_uuid(&raw)?);
        }
        Ok(guids)
    }

    /// Fetch an entry by guid.
    ///
    /// # Errors
    ///
    /// Returns a database or deserialization error.
    pub fn get_entry(&self, guid: Uuid) -> Result<Option<LexEntry>> {
        self.conn
            .query_row(
                "SELECT guid, lemma, morph_type, senses, relations, date_created, date_modified
                 FROM entries WHERE guid = ?1",
                rusqlite::params![guid.to_string()],
                row_to_entry,
            )
            .optional()
            .map_err(Error::from)
    }

    /// All entries ordered by guid (the canonical export order).
    ///
    /// # Errors
    ///
    /// Returns a database or deserialization error.
    pub fn all_entries(&self) -> Result<Vec<LexEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT guid, lemma, morph_type, senses, relations, date_created, date_modified
             FROM entries ORDER BY guid",
        )?;
        let rows = stmt.query_map([], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// All entry guids.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn all_guids(&self) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn.prepare("SELECT guid FROM entries ORDER BY guid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut guids = Vec::new();
        for row in rows {
            let raw = row?;
            guids.push(parse_uuid(&raw)?);
        }
        Ok(guids)
    }

    /// Number of entries in the store.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn entry_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Insert or replace a single entry (its own unit of work).
    ///
    /// # Errors
    ///
    /// Returns a database or serialization error.
    pub fn upsert_entry(&mut self, entry: &LexEntry) -> Result<()> {
        self.mutate("upsert_entry", |tx| Self::tx_upsert(tx, entry))
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Other(format!("corrupt guid {raw:?}: {e}")))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LexEntry> {
    let guid: String = row.get(0)?;
    let senses: String = row.get(3)?;
    let relations: String = row.get(4)?;
    let created: String = row.get(5)?;
    let modified: String = row.get(6)?;
    Ok(LexEntry {
        guid: Uuid::parse_str(&guid).map_err(|e| bad_column(0, e))?,
        lemma: row.get(1)?,
        morph_type: row.get(2)?,
        senses: serde_json::from_str::<Vec<Sense>>(&senses).map_err(|e| bad_column(3, e))?,
        relations: serde_json::from_str::<Vec<Relation>>(&relations)
            .map_err(|e| bad_column(4, e))?,
        date_created: parse_rfc3339(&created).map_err(|e| bad_column(5, e))?,
        date_modified: parse_rfc3339(&modified).map_err(|e| bad_column(6, e))?,
    })
}

fn parse_rfc3339(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

fn bad_column<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(err),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LexEntry;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, SqliteLexicon) {
        let tmp = TempDir::new().unwrap();
        let store = SqliteLexicon::open(&tmp.path().join("lexicon.db")).unwrap();
        (tmp, store)
    }

    #[test]
    fn upsert_and_fetch_round_trip() {
        let (_tmp, mut store) = open_temp();
        let entry = LexEntry::new("pintu").with_gloss("door");

        store.upsert_entry(&entry).unwrap();
        let back = store.get_entry(entry.guid).unwrap().unwrap();
        assert_eq!(back.lemma, "pintu");
        assert_eq!(back.senses.len(), 1);
    }

    #[test]
    fn mutate_rolls_back_on_error() {
        let (_tmp, mut store) = open_temp();
        let entry = LexEntry::new("rumah");

        let result: Result<()> = store.mutate("failing_import", |tx| {
            SqliteLexicon::tx_upsert(tx, &entry)?;
            Err(Error::Other("mid-import failure".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[test]
    fn reload_picks_up_on_disk_state() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lexicon.db");
        let mut store = SqliteLexicon::open(&path).unwrap();
        let entry = LexEntry::new("air");
        store.upsert_entry(&entry).unwrap();
        store.flush().unwrap();

        // Simulate the bridge replacing the store: a second connection
        // writes another entry, then the first reloads.
        let mut other = SqliteLexicon::open(&path).unwrap();
        other.upsert_entry(&LexEntry::new("api")).unwrap();
        other.flush().unwrap();

        store.reload().unwrap();
        assert_eq!(store.entry_count().unwrap(), 2);
    }

    #[test]
    fn open_existing_requires_file() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("absent.db");
        assert!(matches!(
            SqliteLexicon::open_existing(&missing),
            Err(Error::NotInitialized { .. })
        ));
    }
}
