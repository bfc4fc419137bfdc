//! SQLite-backed document storage.
//!
//! Every document lives in one row of `documents`, keyed by name. Backups
//! are rows in `document_backups` keyed by `(name, stamp)`, so several
//! stores can share one database file.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::DocumentStore;
use crate::error::StorageError;

pub struct SqliteStore {
    conn: Connection,
    name: String,
    location: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bind to document `name`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, name: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            name: name.to_string(),
            location: format!("{}#{name}", path.display()),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_memory(name: &str) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            name: name.to_string(),
            location: format!(":memory:#{name}"),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "PRAGMA busy_timeout = 5000;

            CREATE TABLE IF NOT EXISTS documents (
                name       TEXT PRIMARY KEY,
                body       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS document_backups (
                name  TEXT NOT NULL,
                stamp TEXT NOT NULL,
                body  TEXT NOT NULL,
                PRIMARY KEY (name, stamp)
            );",
        )?;
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn describe(&self) -> String {
        self.location.clone()
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE name = ?1",
                params![self.name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn save(&self, body: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (name, body, updated_at) VALUES (?1, ?2, ?3)",
            params![self.name, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn backup(&self, stamp: &str) -> Result<bool, StorageError> {
        let copied = self.conn.execute(
            "INSERT OR REPLACE INTO document_backups (name, stamp, body)
             SELECT name, ?2, body FROM documents WHERE name = ?1",
            params![self.name, stamp],
        )?;
        Ok(copied > 0)
    }

    fn backup_stamps(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT stamp FROM document_backups WHERE name = ?1 ORDER BY stamp DESC",
        )?;
        let stamps = stmt
            .query_map(params![self.name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stamps)
    }

    fn load_backup(&self, stamp: &str) -> Result<String, StorageError> {
        let body = self.conn.query_row(
            "SELECT body FROM document_backups WHERE name = ?1 AND stamp = ?2",
            params![self.name, stamp],
            |row| row.get::<_, String>(0),
        )?;
        Ok(body)
    }

    fn remove_backup(&self, stamp: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM document_backups WHERE name = ?1 AND stamp = ?2",
            params![self.name, stamp],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_roundtrip() {
        let store = SqliteStore::open_memory("users").unwrap();
        assert!(store.load().unwrap().is_none());
        store.save("[]").unwrap();
        store.save("[{\"user_id\":1}]").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("[{\"user_id\":1}]"));
    }

    #[test]
    fn backups_are_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questboard.db");
        let users = SqliteStore::open(&path, "users").unwrap();
        let ledger = SqliteStore::open(&path, "ledger").unwrap();

        assert!(!users.backup("20250410_0400").unwrap());
        users.save("[]").unwrap();
        ledger.save("[]").unwrap();
        assert!(users.backup("20250410_0400").unwrap());
        assert!(users.backup("20250411_0400").unwrap());

        assert_eq!(
            users.backup_stamps().unwrap(),
            vec!["20250411_0400".to_string(), "20250410_0400".to_string()]
        );
        assert!(ledger.backup_stamps().unwrap().is_empty());

        users.remove_backup("20250411_0400").unwrap();
        assert_eq!(users.load_backup("20250410_0400").unwrap(), "[]");
        assert!(users.load_backup("20250411_0400").is_err());
    }
}
