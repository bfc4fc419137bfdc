//! Completion ledger.
//!
//! A set of presence records: a task is checked for a user in a period iff
//! a record with the current period key exists. Toggling inserts or
//! removes; there is no flag to flip.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::period::{Period, DATE_FORMAT};

/// Chat-side user identifier.
pub type UserId = i64;

/// "User checked task in game during period key."
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CompletionRecord {
    pub user_id: UserId,
    pub period: Period,
    #[serde(rename = "date")]
    pub period_key: String,
    pub game: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub task: String,
}

impl CompletionRecord {
    pub fn recurring(user_id: UserId, game: &str, task: &str, period: Period, key: String) -> Self {
        Self {
            user_id,
            period,
            period_key: key,
            game: game.to_string(),
            event: None,
            task: task.to_string(),
        }
    }

    pub fn event(user_id: UserId, game: &str, event: &str, task: &str, date_key: &str) -> Self {
        Self {
            user_id,
            period: Period::Event,
            period_key: date_key.to_string(),
            game: game.to_string(),
            event: Some(event.to_string()),
            task: task.to_string(),
        }
    }
}

/// Record as found on disk. Rows written by older versions may lack
/// `period`; it is inferred from the event name and key shape.
#[derive(Deserialize)]
struct RawRecord {
    user_id: UserId,
    #[serde(default)]
    period: Option<Period>,
    date: String,
    game: String,
    #[serde(default)]
    event: Option<String>,
    task: String,
}

impl From<RawRecord> for CompletionRecord {
    fn from(raw: RawRecord) -> Self {
        let period = raw.period.unwrap_or(if raw.event.is_some() {
            Period::Event
        } else if raw.date.contains("-W") {
            Period::Weekly
        } else {
            Period::Daily
        });
        Self {
            user_id: raw.user_id,
            period,
            period_key: raw.date,
            game: raw.game,
            event: raw.event,
            task: raw.task,
        }
    }
}

/// Accepts a plain record array or a TinyDB-style `{"_default": {"1": {...}}}` table.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLedger {
    Records(Vec<RawRecord>),
    Tables(BTreeMap<String, BTreeMap<String, RawRecord>>),
}

/// Set of completion records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    records: BTreeSet<CompletionRecord>,
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = match RawLedger::deserialize(deserializer)? {
            RawLedger::Records(rows) => rows.into_iter().map(CompletionRecord::from).collect(),
            RawLedger::Tables(tables) => tables
                .into_values()
                .flat_map(|table| table.into_values())
                .map(CompletionRecord::from)
                .collect(),
        };
        Ok(Ledger { records })
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionRecord> {
        self.records.iter()
    }

    pub fn is_checked(
        &self,
        user: UserId,
        game: &str,
        task: &str,
        period: Period,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        let record = CompletionRecord::recurring(user, game, task, period, period.key(now));
        self.records.contains(&record)
    }

    /// Flip the checked state of a daily or weekly task. Returns the new state.
    pub fn toggle(
        &mut self,
        user: UserId,
        game: &str,
        task: &str,
        period: Period,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        let record = CompletionRecord::recurring(user, game, task, period, period.key(now));
        self.flip(record)
    }

    /// Check every listed task that is not checked yet. Never unchecks.
    /// Returns how many records were inserted.
    pub fn complete_all(
        &mut self,
        user: UserId,
        game: &str,
        tasks: &[String],
        period: Period,
        now: &DateTime<FixedOffset>,
    ) -> usize {
        let key = period.key(now);
        tasks
            .iter()
            .filter(|task| {
                self.records.insert(CompletionRecord::recurring(
                    user,
                    game,
                    task,
                    period,
                    key.clone(),
                ))
            })
            .count()
    }

    pub fn is_event_checked(&self, user: UserId, game: &str, event: &str, task: &str, date_key: &str) -> bool {
        self.records
            .contains(&CompletionRecord::event(user, game, event, task, date_key))
    }

    /// Flip an event task under the `event` namespace. Returns the new state.
    pub fn toggle_event_check(
        &mut self,
        user: UserId,
        game: &str,
        event: &str,
        task: &str,
        date_key: &str,
    ) -> bool {
        self.flip(CompletionRecord::event(user, game, event, task, date_key))
    }

    fn flip(&mut self, record: CompletionRecord) -> bool {
        let checked = if self.records.remove(&record) {
            false
        } else {
            self.records.insert(record.clone());
            true
        };
        debug!(
            user_id = record.user_id,
            game = %record.game,
            task = %record.task,
            period = %record.period,
            key = %record.period_key,
            checked,
            "toggled completion"
        );
        checked
    }

    /// Delete every record of a period. Returns the number removed.
    pub fn purge_period(&mut self, period: Period) -> usize {
        self.purge(|r| r.period == period)
    }

    /// Delete records of a period whose key is not `keep_key`.
    pub fn purge_stale(&mut self, period: Period, keep_key: &str) -> usize {
        self.purge(|r| r.period == period && r.period_key != keep_key)
    }

    /// Delete event records keyed before `today`: past days of daily-kind
    /// tasks and once-kind tasks of finished event runs.
    pub fn purge_event_before(&mut self, today: NaiveDate) -> usize {
        let today_key = today.format(DATE_FORMAT).to_string();
        self.purge(|r| r.period == Period::Event && r.period_key < today_key)
    }

    fn purge<F: Fn(&CompletionRecord) -> bool>(&mut self, matches: F) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !matches(r));
        before - self.records.len()
    }

    pub fn rename_game(&mut self, old: &str, new: &str) -> usize {
        self.migrate(|r| r.game == old, |r| r.game = new.to_string())
    }

    pub fn rename_task(&mut self, game: &str, period: Period, old: &str, new: &str) -> usize {
        self.migrate(
            |r| r.game == game && r.period == period && r.event.is_none() && r.task == old,
            |r| r.task = new.to_string(),
        )
    }

    pub fn rename_event(&mut self, game: &str, old: &str, new: &str) -> usize {
        self.migrate(
            |r| r.game == game && r.event.as_deref() == Some(old),
            |r| r.event = Some(new.to_string()),
        )
    }

    pub fn rename_event_task(&mut self, game: &str, event: &str, old: &str, new: &str) -> usize {
        self.migrate(
            |r| r.game == game && r.event.as_deref() == Some(event) && r.task == old,
            |r| r.task = new.to_string(),
        )
    }

    /// Move once-kind checks of `event` from its old end-date key to the new
    /// one. Only the named `tasks` move; daily-kind rows keyed by the same
    /// date stay put.
    pub fn move_once_checks(
        &mut self,
        game: &str,
        event: &str,
        tasks: &[String],
        old_until: NaiveDate,
        new_until: NaiveDate,
    ) -> usize {
        let old_key = old_until.format(DATE_FORMAT).to_string();
        let new_key = new_until.format(DATE_FORMAT).to_string();
        self.migrate(
            |r| {
                r.game == game
                    && r.event.as_deref() == Some(event)
                    && r.period_key == old_key
                    && tasks.contains(&r.task)
            },
            |r| r.period_key = new_key.clone(),
        )
    }

    /// Rewrite matching records. Returns how many were rewritten.
    fn migrate<M, F>(&mut self, matches: M, rewrite: F) -> usize
    where
        M: Fn(&CompletionRecord) -> bool,
        F: Fn(&mut CompletionRecord),
    {
        let moved: Vec<_> = self.records.iter().filter(|r| matches(r)).cloned().collect();
        for record in &moved {
            self.records.remove(record);
        }
        let count = moved.len();
        for mut record in moved {
            rewrite(&mut record);
            self.records.insert(record);
        }
        count
    }
}

/// Read access to completion state, shared by views and the streak gate.
pub trait CompletionLookup {
    fn is_checked(
        &self,
        user: UserId,
        game: &str,
        task: &str,
        period: Period,
        now: &DateTime<FixedOffset>,
    ) -> bool;

    fn is_event_checked(&self, user: UserId, game: &str, event: &str, task: &str, date_key: &str) -> bool;
}

impl CompletionLookup for Ledger {
    fn is_checked(
        &self,
        user: UserId,
        game: &str,
        task: &str,
        period: Period,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        Ledger::is_checked(self, user, game, task, period, now)
    }

    fn is_event_checked(&self, user: UserId, game: &str, event: &str, task: &str, date_key: &str) -> bool {
        Ledger::is_event_checked(self, user, game, event, task, date_key)
    }
}

/// The ledger as the service sees it: loaded, or unavailable after every
/// restore attempt failed.
///
/// An unavailable ledger answers every lookup with "unchecked" so that
/// checklists still render, and refuses every mutation.
#[derive(Debug)]
pub enum LedgerState {
    Ready(Ledger),
    Unavailable { reason: String },
}

impl LedgerState {
    pub fn is_available(&self) -> bool {
        matches!(self, LedgerState::Ready(_))
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        match self {
            LedgerState::Ready(ledger) => Some(ledger),
            LedgerState::Unavailable { .. } => None,
        }
    }

    pub fn ledger_mut(&mut self) -> Result<&mut Ledger> {
        match self {
            LedgerState::Ready(ledger) => Ok(ledger),
            LedgerState::Unavailable { reason } => {
                Err(CoreError::StorageUnavailable(format!("completion ledger: {reason}")))
            }
        }
    }
}

impl CompletionLookup for LedgerState {
    fn is_checked(
        &self,
        user: UserId,
        game: &str,
        task: &str,
        period: Period,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        match self {
            LedgerState::Ready(ledger) => ledger.is_checked(user, game, task, period, now),
            LedgerState::Unavailable { .. } => {
                debug!(user_id = user, game, task, "ledger unavailable, reporting unchecked");
                false
            }
        }
    }

    fn is_event_checked(&self, user: UserId, game: &str, event: &str, task: &str, date_key: &str) -> bool {
        self.ledger()
            .is_some_and(|ledger| ledger.is_event_checked(user, game, event, task, date_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use indoc::indoc;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, 9, 0, 0)
            .unwrap()
    }

    #[test]
    fn toggle_inserts_then_removes() {
        let mut ledger = Ledger::new();
        let now = at(2025, 4, 10);
        assert!(ledger.toggle(1, "Foo", "Login", Period::Daily, &now));
        assert!(ledger.is_checked(1, "Foo", "Login", Period::Daily, &now));
        assert!(!ledger.toggle(1, "Foo", "Login", Period::Daily, &now));
        assert!(!ledger.is_checked(1, "Foo", "Login", Period::Daily, &now));
        assert!(ledger.is_empty());
    }

    #[test]
    fn once_checks_follow_a_new_end_date() {
        let mut ledger = Ledger::new();
        let until = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();
        let later = NaiveDate::from_ymd_opt(2025, 4, 20).unwrap();
        ledger.toggle_event_check(1, "Foo", "Hunt", "Boss", "2025-04-15");
        // Daily-kind row that happens to share the old end date.
        ledger.toggle_event_check(1, "Foo", "Hunt", "Check in", "2025-04-15");

        let once = vec!["Boss".to_string()];
        assert_eq!(ledger.move_once_checks("Foo", "Hunt", &once, until, later), 1);
        assert!(ledger.is_event_checked(1, "Foo", "Hunt", "Boss", "2025-04-20"));
        assert!(!ledger.is_event_checked(1, "Foo", "Hunt", "Boss", "2025-04-15"));
        assert!(ledger.is_event_checked(1, "Foo", "Hunt", "Check in", "2025-04-15"));
    }

    #[test]
    fn daily_checks_roll_over_without_reset() {
        let mut ledger = Ledger::new();
        ledger.toggle(1, "Foo", "Login", Period::Daily, &at(2025, 4, 10));
        assert!(!ledger.is_checked(1, "Foo", "Login", Period::Daily, &at(2025, 4, 11)));
    }

    #[test]
    fn weekly_checks_hold_within_week() {
        let mut ledger = Ledger::new();
        // 2025-09-01 is a Monday; the 1st..6th share week 1
        ledger.toggle(1, "Foo", "Raid", Period::Weekly, &at(2025, 9, 1));
        assert!(ledger.is_checked(1, "Foo", "Raid", Period::Weekly, &at(2025, 9, 6)));
        assert!(!ledger.is_checked(1, "Foo", "Raid", Period::Weekly, &at(2025, 9, 7)));
        assert!(!ledger.is_checked(1, "Foo", "Raid", Period::Daily, &at(2025, 9, 1)));
    }

    #[test]
    fn complete_all_never_unchecks() {
        let mut ledger = Ledger::new();
        let now = at(2025, 4, 10);
        let tasks = vec!["Login".to_string(), "Dungeon".to_string()];
        ledger.toggle(1, "Foo", "Login", Period::Daily, &now);
        assert_eq!(ledger.complete_all(1, "Foo", &tasks, Period::Daily, &now), 1);
        assert!(tasks
            .iter()
            .all(|t| ledger.is_checked(1, "Foo", t, Period::Daily, &now)));
    }

    #[test]
    fn event_namespace_does_not_collide_with_daily() {
        let mut ledger = Ledger::new();
        let now = at(2025, 4, 10);
        assert!(ledger.toggle_event_check(1, "Foo", "Hunt", "Login", "2025-04-10"));
        assert!(ledger.is_event_checked(1, "Foo", "Hunt", "Login", "2025-04-10"));
        assert!(!ledger.is_checked(1, "Foo", "Login", Period::Daily, &now));
        assert!(!ledger.is_event_checked(1, "Foo", "Other", "Login", "2025-04-10"));
    }

    #[test]
    fn purges_by_period() {
        let mut ledger = Ledger::new();
        ledger.toggle(1, "Foo", "Login", Period::Daily, &at(2025, 4, 9));
        ledger.toggle(1, "Foo", "Login", Period::Daily, &at(2025, 4, 10));
        ledger.toggle(1, "Foo", "Raid", Period::Weekly, &at(2025, 4, 10));
        assert_eq!(ledger.purge_stale(Period::Daily, "2025-04-10"), 1);
        assert!(ledger.is_checked(1, "Foo", "Login", Period::Daily, &at(2025, 4, 10)));
        assert_eq!(ledger.purge_period(Period::Weekly), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn purges_old_event_records() {
        let mut ledger = Ledger::new();
        ledger.toggle_event_check(1, "Foo", "Hunt", "Login", "2025-04-09");
        ledger.toggle_event_check(1, "Foo", "Hunt", "Login", "2025-04-10");
        ledger.toggle_event_check(1, "Foo", "Hunt", "Boss", "2025-04-15");
        let today = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        assert_eq!(ledger.purge_event_before(today), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn renames_carry_checks() {
        let mut ledger = Ledger::new();
        let now = at(2025, 4, 10);
        ledger.toggle(1, "Foo", "Login", Period::Daily, &now);
        ledger.toggle(2, "Foo", "Login", Period::Weekly, &now);
        assert_eq!(ledger.rename_task("Foo", Period::Daily, "Login", "Sign in"), 1);
        assert!(ledger.is_checked(1, "Foo", "Sign in", Period::Daily, &now));
        assert!(ledger.is_checked(2, "Foo", "Login", Period::Weekly, &now));

        assert_eq!(ledger.rename_game("Foo", "Bar"), 2);
        assert!(ledger.is_checked(1, "Bar", "Sign in", Period::Daily, &now));
    }

    #[test]
    fn reads_tinydb_layout() {
        let json = indoc! {r#"
            {"_default": {
              "1": {"user_id": 7, "period": "daily", "date": "2025-04-10", "game": "Foo", "task": "Login"},
              "2": {"user_id": 7, "date": "04-W2", "game": "Foo", "task": "Raid"},
              "3": {"user_id": 7, "period": "event", "date": "2025-04-15", "game": "Foo", "event": "Hunt", "task": "Boss"}
            }}
        "#};
        let ledger: Ledger = serde_json::from_str(json).unwrap();
        assert_eq!(ledger.len(), 3);
        assert!(ledger.is_checked(7, "Foo", "Login", Period::Daily, &at(2025, 4, 10)));
        assert!(ledger.is_checked(7, "Foo", "Raid", Period::Weekly, &at(2025, 4, 10)));
        assert!(ledger.is_event_checked(7, "Foo", "Hunt", "Boss", "2025-04-15"));

        let saved = serde_json::to_string(&ledger).unwrap();
        assert!(saved.starts_with('['));
        let back: Ledger = serde_json::from_str(&saved).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn unavailable_ledger_fails_closed() {
        let mut state = LedgerState::Unavailable {
            reason: "corrupt".into(),
        };
        let now = at(2025, 4, 10);
        assert!(!CompletionLookup::is_checked(&state, 1, "Foo", "Login", Period::Daily, &now));
        assert!(!state.is_event_checked(1, "Foo", "Hunt", "Boss", "2025-04-15"));
        assert!(matches!(
            state.ledger_mut(),
            Err(CoreError::StorageUnavailable(_))
        ));
    }

    proptest! {
        #[test]
        fn toggle_twice_is_identity(
            user in 1i64..5,
            task in "[a-c]",
            weekly in any::<bool>(),
            seeded in proptest::collection::vec(("[a-c]", any::<bool>()), 0..6),
        ) {
            let now = at(2025, 4, 10);
            let mut ledger = Ledger::new();
            for (t, w) in &seeded {
                let p = if *w { Period::Weekly } else { Period::Daily };
                ledger.toggle(user, "Foo", t, p, &now);
            }
            let period = if weekly { Period::Weekly } else { Period::Daily };
            let before = ledger.clone();
            ledger.toggle(user, "Foo", &task, period, &now);
            ledger.toggle(user, "Foo", &task, period, &now);
            prop_assert_eq!(ledger, before);
        }

        #[test]
        fn complete_all_is_idempotent(
            tasks in proptest::collection::vec("[a-e]", 0..6),
            seeded in proptest::collection::vec("[a-e]", 0..4),
        ) {
            let now = at(2025, 4, 10);
            let tasks: Vec<String> = tasks;
            let mut ledger = Ledger::new();
            for t in &seeded {
                ledger.toggle(1, "Foo", t, Period::Daily, &now);
            }
            ledger.complete_all(1, "Foo", &tasks, Period::Daily, &now);
            let once = ledger.clone();
            prop_assert_eq!(ledger.complete_all(1, "Foo", &tasks, Period::Daily, &now), 0);
            prop_assert_eq!(ledger, once);
        }
    }
}
