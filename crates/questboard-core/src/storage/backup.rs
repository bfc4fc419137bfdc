use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use tracing::{debug, warn};

use super::DocumentStore;
use crate::error::StorageError;

/// Stamp format for backups, e.g. `20250410_0400`.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M";

pub fn backup_stamp(now: &DateTime<FixedOffset>) -> String {
    now.format(BACKUP_STAMP_FORMAT).to_string()
}

pub fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP_FORMAT).ok()
}

/// Delete backups older than `keep_days` before `now`. Unparseable stamps
/// are left alone. Returns the number removed.
pub fn prune_backups(
    store: &dyn DocumentStore,
    now: &DateTime<FixedOffset>,
    keep_days: u32,
) -> Result<usize, StorageError> {
    let cutoff = now.naive_local() - Duration::days(i64::from(keep_days));
    let mut removed = 0;
    for stamp in store.backup_stamps()? {
        let Some(taken) = parse_stamp(&stamp) else {
            warn!(store = %store.describe(), stamp = %stamp, "skipping unrecognized backup");
            continue;
        };
        if taken < cutoff {
            store.remove_backup(&stamp)?;
            debug!(store = %store.describe(), stamp = %stamp, "pruned backup");
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use chrono::TimeZone;

    #[test]
    fn stamps_sort_chronologically() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let a = backup_stamp(&tz.with_ymd_and_hms(2025, 4, 9, 23, 59, 0).unwrap());
        let b = backup_stamp(&tz.with_ymd_and_hms(2025, 4, 10, 4, 0, 0).unwrap());
        assert_eq!(b, "20250410_0400");
        assert!(a < b);
        assert!(parse_stamp(&b).is_some());
        assert!(parse_stamp("latest").is_none());
    }

    #[test]
    fn prunes_only_expired_backups() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2025, 4, 10, 4, 0, 0).unwrap();
        let store = SqliteStore::open_memory("catalog").unwrap();
        store.save("{}").unwrap();
        for stamp in ["20250401_0400", "20250402_0400", "20250404_0400", "20250410_0400"] {
            store.backup(stamp).unwrap();
        }

        assert_eq!(prune_backups(&store, &now, 7).unwrap(), 2);
        assert_eq!(
            store.backup_stamps().unwrap(),
            vec!["20250410_0400".to_string(), "20250404_0400".to_string()]
        );
    }
}
