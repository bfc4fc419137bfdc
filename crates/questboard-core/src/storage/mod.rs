mod backup;
mod config;
pub mod database;
pub mod json_file;

pub use backup::{backup_stamp, parse_stamp, prune_backups, BACKUP_STAMP_FORMAT};
pub use config::{
    parse_time_of_day, parse_weekday, BackupConfig, Config, NotificationsConfig, ScheduleConfig,
    StorageBackend, StorageConfig,
};
pub use database::SqliteStore;
pub use json_file::JsonFileStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::{CoreError, Result, StorageError};
use crate::ledger::Ledger;
use crate::users::Users;

/// Returns the data directory.
///
/// `QUESTBOARD_DATA_DIR` wins when set. Otherwise `~/.config/questboard[-dev]/`,
/// with the dev variant selected by `QUESTBOARD_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("QUESTBOARD_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("QUESTBOARD_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("questboard-dev")
            } else {
                base_dir.join("questboard")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// A named, durable text document with timestamped backups.
///
/// Backup stamps use [`BACKUP_STAMP_FORMAT`] so they sort chronologically.
pub trait DocumentStore: Send {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// The stored body, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<String>, StorageError>;

    fn save(&self, body: &str) -> Result<(), StorageError>;

    /// Copy the current body aside under `stamp`. Returns false when there
    /// is nothing to back up yet.
    fn backup(&self, stamp: &str) -> Result<bool, StorageError>;

    /// Stamps of existing backups, newest first.
    fn backup_stamps(&self) -> Result<Vec<String>, StorageError>;

    fn load_backup(&self, stamp: &str) -> Result<String, StorageError>;

    fn remove_backup(&self, stamp: &str) -> Result<(), StorageError>;
}

/// A document store holding one serde type.
pub struct TypedStore<T> {
    inner: Box<dyn DocumentStore>,
    _doc: PhantomData<fn() -> T>,
}

pub type CatalogStore = TypedStore<Catalog>;
pub type LedgerStore = TypedStore<Ledger>;
pub type UserStore = TypedStore<Users>;

impl<T> TypedStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(inner: Box<dyn DocumentStore>) -> Self {
        Self {
            inner,
            _doc: PhantomData,
        }
    }

    pub fn document(&self) -> &dyn DocumentStore {
        self.inner.as_ref()
    }

    /// Load the document, restoring the newest parseable backup if the
    /// primary copy is unreadable or corrupt.
    ///
    /// A store that was never written loads as `T::default()`. When neither
    /// the primary nor any backup can be read the result is
    /// [`CoreError::StorageUnavailable`]; the caller decides whether to
    /// start empty or fail closed.
    pub fn load_or_restore(&self) -> Result<T> {
        let primary_failure = match self.inner.load() {
            Ok(None) => return Ok(T::default()),
            Ok(Some(body)) => match serde_json::from_str::<T>(&body) {
                Ok(doc) => return Ok(doc),
                Err(e) => format!("corrupt document: {e}"),
            },
            Err(e) => e.to_string(),
        };
        warn!(store = %self.inner.describe(), error = %primary_failure, "load failed, trying backups");

        let stamps = self.inner.backup_stamps().map_err(|e| {
            CoreError::StorageUnavailable(format!(
                "{}: {primary_failure}; backups unreadable: {e}",
                self.inner.describe()
            ))
        })?;
        for stamp in stamps {
            let body = match self.inner.load_backup(&stamp) {
                Ok(body) => body,
                Err(e) => {
                    warn!(store = %self.inner.describe(), stamp = %stamp, error = %e, "backup unreadable");
                    continue;
                }
            };
            match serde_json::from_str::<T>(&body) {
                Ok(doc) => {
                    if let Err(e) = self.inner.save(&body) {
                        warn!(store = %self.inner.describe(), error = %e, "restored copy not written back");
                    }
                    info!(store = %self.inner.describe(), stamp = %stamp, "restored from backup");
                    return Ok(doc);
                }
                Err(e) => {
                    warn!(store = %self.inner.describe(), stamp = %stamp, error = %e, "backup corrupt");
                }
            }
        }

        Err(CoreError::StorageUnavailable(format!(
            "{}: {primary_failure}; no usable backup",
            self.inner.describe()
        )))
    }

    pub fn save(&self, doc: &T) -> Result<()> {
        let body = serde_json::to_string_pretty(doc)?;
        self.inner.save(&body)?;
        Ok(())
    }
}

/// The three documents the service persists.
pub struct Stores {
    pub catalog: CatalogStore,
    pub ledger: LedgerStore,
    pub users: UserStore,
}

impl Stores {
    /// Open the configured backend inside `dir`.
    pub fn open(dir: &Path, config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        match config.backend {
            StorageBackend::Json => Ok(Self {
                catalog: TypedStore::new(Box::new(JsonFileStore::new(dir.join(&config.catalog_file)))),
                ledger: TypedStore::new(Box::new(JsonFileStore::new(dir.join(&config.ledger_file)))),
                users: TypedStore::new(Box::new(JsonFileStore::new(dir.join(&config.users_file)))),
            }),
            StorageBackend::Sqlite => {
                let path = dir.join(&config.sqlite_file);
                Ok(Self {
                    catalog: TypedStore::new(Box::new(SqliteStore::open(&path, "catalog")?)),
                    ledger: TypedStore::new(Box::new(SqliteStore::open(&path, "ledger")?)),
                    users: TypedStore::new(Box::new(SqliteStore::open(&path, "users")?)),
                })
            }
        }
    }

    pub fn documents(&self) -> [&dyn DocumentStore; 3] {
        [
            self.catalog.document(),
            self.ledger.document(),
            self.users.document(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;

    #[test]
    fn never_written_store_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store: CatalogStore =
            TypedStore::new(Box::new(JsonFileStore::new(dir.path().join("quests.json"))));
        assert!(store.load_or_restore().unwrap().is_empty());
    }

    #[test]
    fn corrupt_document_restores_newest_good_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quests.json");
        let store: CatalogStore = TypedStore::new(Box::new(JsonFileStore::new(path.clone())));

        let mut catalog = Catalog::new();
        catalog.add_game("Foo").unwrap();
        store.save(&catalog).unwrap();
        assert!(store.document().backup("20250401_0400").unwrap());

        catalog
            .add_tasks("Foo", Period::Daily, &["Login".to_string()])
            .unwrap();
        store.save(&catalog).unwrap();
        assert!(store.document().backup("20250402_0400").unwrap());

        std::fs::write(dir.path().join("quests.json.20250403_0400.bak"), "{ broken").unwrap();
        std::fs::write(&path, "{ also broken").unwrap();

        let restored = store.load_or_restore().unwrap();
        assert_eq!(restored, catalog);
        // The primary copy was rewritten from the backup.
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("Login"));
    }

    #[test]
    fn no_backup_means_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checklist.json");
        std::fs::write(&path, "not json").unwrap();
        let store: LedgerStore = TypedStore::new(Box::new(JsonFileStore::new(path)));
        assert!(matches!(
            store.load_or_restore(),
            Err(CoreError::StorageUnavailable(_))
        ));
    }

    /// Primary copy is corrupt and the backup listing itself fails.
    struct UnlistableStore;

    impl DocumentStore for UnlistableStore {
        fn describe(&self) -> String {
            "unlistable".to_string()
        }
        fn load(&self) -> Result<Option<String>, StorageError> {
            Ok(Some("not json".to_string()))
        }
        fn save(&self, _body: &str) -> Result<(), StorageError> {
            Ok(())
        }
        fn backup(&self, _stamp: &str) -> Result<bool, StorageError> {
            Ok(false)
        }
        fn backup_stamps(&self) -> Result<Vec<String>, StorageError> {
            Err(StorageError::ReadFailed {
                path: PathBuf::from("backups"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
        fn load_backup(&self, _stamp: &str) -> Result<String, StorageError> {
            Err(StorageError::Sqlite("unreachable".to_string()))
        }
        fn remove_backup(&self, _stamp: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn unlistable_backups_mean_unavailable() {
        let store: LedgerStore = TypedStore::new(Box::new(UnlistableStore));
        match store.load_or_restore() {
            Err(CoreError::StorageUnavailable(reason)) => {
                assert!(reason.contains("backups unreadable"), "{reason}");
            }
            other => panic!("expected StorageUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn opens_sqlite_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            ..Default::default()
        };
        let stores = Stores::open(dir.path(), &config).unwrap();
        let mut users = Users::new();
        users.add_user(3, chrono::NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        stores.users.save(&users).unwrap();
        assert!(stores.ledger.load_or_restore().unwrap().is_empty());

        let reopened = Stores::open(dir.path(), &config).unwrap();
        assert_eq!(reopened.users.load_or_restore().unwrap(), users);
        assert!(dir.path().join("questboard.db").exists());
    }
}
