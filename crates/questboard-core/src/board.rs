//! The `QuestBoard` service facade.
//!
//! Owns the catalog, the completion ledger, the user registry and their
//! stores. Every command is a method here; each mutation is persisted
//! before the method returns.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::catalog::{clean_name, Catalog, Event};
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::ledger::{Ledger, LedgerState, UserId};
use crate::period::{event_key, EventTaskKind, Period};
use crate::storage::{Config, Stores};
use crate::streak::{self, DoneOutcome};
use crate::users::{UserRecord, Users};
use crate::view::{self, EventChecklist, GameChecklist, GameOverview, GameProgress};

pub struct QuestBoard {
    pub(crate) catalog: Catalog,
    pub(crate) ledger: LedgerState,
    pub(crate) users: Users,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) stores: Stores,
    pub(crate) config: Config,
}

impl QuestBoard {
    /// Open the stores in `dir` and load all three documents.
    ///
    /// A catalog or user registry that cannot be recovered starts empty.
    /// An unrecoverable ledger leaves the board running with the ledger
    /// marked unavailable: views show everything unchecked and
    /// check-offs fail.
    pub fn open(dir: &Path, config: Config, clock: Box<dyn Clock>) -> Result<Self> {
        let stores = Stores::open(dir, &config.storage)?;
        let (catalog, users, ledger) = load_documents(&stores)?;

        info!(
            games = catalog.len(),
            users = users.len(),
            ledger_available = ledger.is_available(),
            "questboard opened"
        );
        Ok(Self {
            catalog,
            ledger,
            users,
            clock,
            stores,
            config,
        })
    }

    /// Replace the in-memory documents with what the stores hold now.
    ///
    /// Other processes write the same stores, so a long-lived board must
    /// reload before any read-modify-write.
    pub fn reload(&mut self) -> Result<()> {
        let (catalog, users, ledger) = load_documents(&self.stores)?;
        self.catalog = catalog;
        self.users = users;
        self.ledger = ledger;
        debug!(games = self.catalog.len(), users = self.users.len(), "reloaded documents");
        Ok(())
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub(crate) fn save_catalog(&self) -> Result<()> {
        self.stores.catalog.save(&self.catalog)
    }

    /// Apply `change` to a copy of the ledger and keep the copy only once
    /// it is saved. An unchanged ledger is not written.
    pub(crate) fn commit_ledger<T, F>(&mut self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Ledger) -> T,
    {
        let current = self.ledger.ledger_mut()?;
        let mut next = current.clone();
        let out = change(&mut next);
        if next != *current {
            self.stores.ledger.save(&next)?;
            self.ledger = LedgerState::Ready(next);
        }
        Ok(out)
    }

    fn save_users(&self) -> Result<()> {
        self.stores.users.save(&self.users)
    }

    // ── users ──────────────────────────────────────────────────────────

    /// Register `user` on first interaction. Returns true if new.
    pub fn add_user(&mut self, user: UserId) -> Result<bool> {
        let today = self.today();
        let added = self.users.add_user(user, today);
        if added {
            self.save_users()?;
            info!(user, "registered user");
        }
        Ok(added)
    }

    pub fn user(&self, user: UserId) -> Option<&UserRecord> {
        self.users.get(user)
    }

    pub fn streak(&self, user: UserId) -> u32 {
        self.users.day_streak(user)
    }

    // ── checklists ─────────────────────────────────────────────────────

    pub fn period_view(&self, user: UserId, period: Period) -> Vec<GameChecklist> {
        view::period_view(&self.catalog, &self.ledger, user, period, &self.now())
    }

    pub fn daily_view(&self, user: UserId) -> Vec<GameChecklist> {
        self.period_view(user, Period::Daily)
    }

    pub fn weekly_view(&self, user: UserId) -> Vec<GameChecklist> {
        self.period_view(user, Period::Weekly)
    }

    pub fn event_view(&self, user: UserId) -> Vec<EventChecklist> {
        view::event_view(&self.catalog, &self.ledger, user, &self.now())
    }

    pub fn progress(&self, user: UserId) -> Vec<GameProgress> {
        view::progress(&self.catalog, &self.ledger, user, &self.now())
    }

    pub fn catalog_overview(&self) -> Vec<GameOverview> {
        view::catalog_overview(&self.catalog, self.today())
    }

    /// Flip a daily or weekly task for the current period. Returns the new state.
    pub fn toggle(&mut self, user: UserId, game: &str, task: &str, period: Period) -> Result<bool> {
        if period == Period::Event {
            return Err(CoreError::invalid(
                "period",
                "use toggle_event_task for event tasks",
            ));
        }
        let known = self
            .catalog
            .game(game)
            .ok_or_else(|| CoreError::not_found("game", game))?;
        if !known.tasks(period).iter().any(|t| t == task) {
            return Err(CoreError::not_found("task", task));
        }

        let now = self.now();
        self.commit_ledger(|ledger| ledger.toggle(user, game, task, period, &now))
    }

    /// Flip an event task under today's key (daily kind) or the event's
    /// end date (once kind). Returns the new state.
    pub fn toggle_event_task(&mut self, user: UserId, game: &str, event: &str, task: &str) -> Result<bool> {
        let today = self.today();
        let found = self
            .catalog
            .game(game)
            .ok_or_else(|| CoreError::not_found("game", game))?
            .event(event)
            .ok_or_else(|| CoreError::not_found("event", event))?;
        if found.is_expired(today) {
            return Err(CoreError::invalid("event", format!("'{event}' has ended")));
        }
        let kind = found
            .task(task)
            .ok_or_else(|| CoreError::not_found("event task", task))?
            .kind;
        let date_key = event_key(today, kind, found.until);

        self.commit_ledger(|ledger| ledger.toggle_event_check(user, game, event, task, &date_key))
    }

    /// Check every task of `game` for `period`. Returns how many were newly checked.
    pub fn complete_all(&mut self, user: UserId, game: &str, period: Period) -> Result<usize> {
        let tasks = self
            .catalog
            .game(game)
            .ok_or_else(|| CoreError::not_found("game", game))?
            .tasks(period)
            .to_vec();
        if tasks.is_empty() {
            return Ok(0);
        }

        let now = self.now();
        self.commit_ledger(|ledger| ledger.complete_all(user, game, &tasks, period, &now))
    }

    /// Close out the day: advance the streak if every daily task is checked.
    pub fn done(&mut self, user: UserId) -> Result<DoneOutcome> {
        self.add_user(user)?;
        let now = self.now();
        let ledger = self.ledger.ledger().ok_or_else(|| {
            CoreError::StorageUnavailable("completion ledger unavailable".to_string())
        })?;

        if !streak::all_daily_tasks_complete(&self.catalog, ledger, user, &now) {
            let remaining = streak::remaining_daily_tasks(&self.catalog, ledger, user, &now);
            return Ok(DoneOutcome::Incomplete { remaining });
        }

        let policy = self.config.streak;
        let streak = streak::record_day_complete(&mut self.users, user, now.date_naive(), policy);
        self.save_users()?;
        info!(user, streak, "day complete");
        Ok(DoneOutcome::Completed { streak })
    }

    // ── catalog administration ─────────────────────────────────────────

    pub fn add_game(&mut self, name: &str) -> Result<()> {
        self.catalog.add_game(name)?;
        self.save_catalog()?;
        info!(game = name.trim(), "added game");
        Ok(())
    }

    pub fn delete_game(&mut self, name: &str) -> Result<()> {
        self.catalog.delete_game(name)?;
        self.save_catalog()?;
        info!(game = name, "deleted game");
        Ok(())
    }

    pub fn rename_game(&mut self, old: &str, new: &str) -> Result<()> {
        let new = clean_name("game", new)?;
        self.catalog.rename_game(old, &new)?;
        self.save_catalog()?;
        self.migrate_ledger(|ledger| ledger.rename_game(old, &new))?;
        info!(old, new = %new, "renamed game");
        Ok(())
    }

    pub fn add_tasks(&mut self, game: &str, period: Period, names: &[String]) -> Result<Vec<String>> {
        let added = self.catalog.add_tasks(game, period, names)?;
        if !added.is_empty() {
            self.save_catalog()?;
        }
        Ok(added)
    }

    pub fn delete_tasks(&mut self, game: &str, period: Period, names: &[String]) -> Result<Vec<String>> {
        let removed = self.catalog.delete_tasks(game, period, names)?;
        if !removed.is_empty() {
            self.save_catalog()?;
        }
        Ok(removed)
    }

    pub fn rename_task(&mut self, game: &str, period: Period, old: &str, new: &str) -> Result<()> {
        let new = clean_name("task", new)?;
        self.catalog.rename_task(game, period, old, &new)?;
        self.save_catalog()?;
        self.migrate_ledger(|ledger| ledger.rename_task(game, period, old, &new))?;
        Ok(())
    }

    pub fn add_event(&mut self, game: &str, event: Event) -> Result<()> {
        let name = event.name.clone();
        self.catalog.add_event(game, event)?;
        self.save_catalog()?;
        info!(game, event = name.trim(), "added event");
        Ok(())
    }

    pub fn delete_event(&mut self, game: &str, event: &str) -> Result<()> {
        self.catalog.delete_event(game, event)?;
        self.save_catalog()?;
        Ok(())
    }

    pub fn rename_event(&mut self, game: &str, old: &str, new: &str) -> Result<()> {
        let new = clean_name("event", new)?;
        self.catalog.rename_event(game, old, &new)?;
        self.save_catalog()?;
        self.migrate_ledger(|ledger| ledger.rename_event(game, old, &new))?;
        Ok(())
    }

    pub fn rename_event_task(&mut self, game: &str, event: &str, old: &str, new: &str) -> Result<()> {
        let new = clean_name("task", new)?;
        self.catalog.rename_event_task(game, event, old, &new)?;
        self.save_catalog()?;
        self.migrate_ledger(|ledger| ledger.rename_event_task(game, event, old, &new))?;
        Ok(())
    }

    /// Move an event's end date. Once-kind checks are keyed by that date
    /// and move with it.
    pub fn set_event_until(&mut self, game: &str, event: &str, until: NaiveDate) -> Result<()> {
        let previous = self
            .catalog
            .game(game)
            .and_then(|g| g.event(event))
            .map(|e| {
                let once: Vec<String> = e
                    .tasks
                    .iter()
                    .filter(|t| t.kind == EventTaskKind::Once)
                    .map(|t| t.name.clone())
                    .collect();
                (e.until, once)
            });
        self.catalog.set_event_until(game, event, until)?;
        self.save_catalog()?;
        if let Some((old_until, once)) = previous {
            if old_until != until && !once.is_empty() {
                self.migrate_ledger(|ledger| {
                    ledger.move_once_checks(game, event, &once, old_until, until)
                })?;
            }
        }
        Ok(())
    }

    /// Carry existing checks across a catalog edit. Skipped with a warning
    /// when the ledger is unavailable; the catalog change stands either way.
    fn migrate_ledger<F>(&mut self, migrate: F) -> Result<()>
    where
        F: FnOnce(&mut Ledger) -> usize,
    {
        if let LedgerState::Unavailable { reason } = &self.ledger {
            warn!(%reason, "catalog edit not applied to completion records");
            return Ok(());
        }
        let moved = self.commit_ledger(migrate)?;
        debug!(moved, "migrated completion records");
        Ok(())
    }
}

fn load_documents(stores: &Stores) -> Result<(Catalog, Users, LedgerState)> {
    let catalog = match stores.catalog.load_or_restore() {
        Ok(catalog) => catalog,
        Err(CoreError::StorageUnavailable(reason)) => {
            warn!(%reason, "catalog unavailable, starting empty");
            Catalog::new()
        }
        Err(e) => return Err(e),
    };
    let users = match stores.users.load_or_restore() {
        Ok(users) => users,
        Err(CoreError::StorageUnavailable(reason)) => {
            warn!(%reason, "user registry unavailable, starting empty");
            Users::new()
        }
        Err(e) => return Err(e),
    };
    let ledger = match stores.ledger.load_or_restore() {
        Ok(ledger) => LedgerState::Ready(ledger),
        Err(CoreError::StorageUnavailable(reason)) => {
            warn!(%reason, "completion ledger unavailable, failing closed");
            LedgerState::Unavailable { reason }
        }
        Err(e) => return Err(e),
    };
    Ok((catalog, users, ledger))
}
