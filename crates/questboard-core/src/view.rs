//! Read-side projections of catalog and ledger.
//!
//! Nothing here mutates state. Lookups go through [`CompletionLookup`], so
//! an unavailable ledger yields all-unchecked views instead of errors.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::ledger::{CompletionLookup, UserId};
use crate::period::{event_key, EventTaskKind, Period};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    pub task: String,
    pub checked: bool,
}

/// One game's checklist for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameChecklist {
    pub game: String,
    pub period: Period,
    pub tasks: Vec<TaskStatus>,
}

impl GameChecklist {
    pub fn completed(&self) -> usize {
        self.tasks.iter().filter(|t| t.checked).count()
    }

    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| t.checked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTaskStatus {
    pub task: String,
    pub kind: EventTaskKind,
    /// Ledger key the check is stored under.
    pub date_key: String,
    pub checked: bool,
}

/// One running event's checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventChecklist {
    pub game: String,
    pub event: String,
    pub until: NaiveDate,
    pub days_remaining: i64,
    pub tasks: Vec<EventTaskStatus>,
}

/// Daily completion count for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameProgress {
    pub game: String,
    pub completed: usize,
    pub total: usize,
}

impl GameProgress {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// Checklist of every game with tasks in `period`, in catalog order.
pub fn period_view<L>(
    catalog: &Catalog,
    ledger: &L,
    user: UserId,
    period: Period,
    now: &DateTime<FixedOffset>,
) -> Vec<GameChecklist>
where
    L: CompletionLookup + ?Sized,
{
    catalog
        .games()
        .filter(|game| !game.tasks(period).is_empty())
        .map(|game| GameChecklist {
            game: game.name.clone(),
            period,
            tasks: game
                .tasks(period)
                .iter()
                .map(|task| TaskStatus {
                    task: task.clone(),
                    checked: ledger.is_checked(user, &game.name, task, period, now),
                })
                .collect(),
        })
        .collect()
}

/// Checklist of every event still running today.
pub fn event_view<L>(catalog: &Catalog, ledger: &L, user: UserId, now: &DateTime<FixedOffset>) -> Vec<EventChecklist>
where
    L: CompletionLookup + ?Sized,
{
    let today = now.date_naive();
    catalog
        .games()
        .flat_map(move |game| {
            game.events
                .iter()
                .filter(move |event| !event.is_expired(today))
                .map(move |event| EventChecklist {
                    game: game.name.clone(),
                    event: event.name.clone(),
                    until: event.until,
                    days_remaining: event.days_remaining(today),
                    tasks: event
                        .tasks
                        .iter()
                        .map(|task| {
                            let date_key = event_key(today, task.kind, event.until);
                            EventTaskStatus {
                                checked: ledger.is_event_checked(
                                    user,
                                    &game.name,
                                    &event.name,
                                    &task.name,
                                    &date_key,
                                ),
                                task: task.name.clone(),
                                kind: task.kind,
                                date_key,
                            }
                        })
                        .collect(),
                })
        })
        .collect()
}

/// Daily progress per game with daily tasks.
pub fn progress<L>(catalog: &Catalog, ledger: &L, user: UserId, now: &DateTime<FixedOffset>) -> Vec<GameProgress>
where
    L: CompletionLookup + ?Sized,
{
    period_view(catalog, ledger, user, Period::Daily, now)
        .into_iter()
        .map(|list| GameProgress {
            completed: list.completed(),
            total: list.tasks.len(),
            game: list.game,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOverview {
    pub name: String,
    pub until: NaiveDate,
    pub days_remaining: i64,
    pub tasks: Vec<(String, EventTaskKind)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameOverview {
    pub game: String,
    pub daily: Vec<String>,
    pub weekly: Vec<String>,
    pub events: Vec<EventOverview>,
}

/// Full catalog with countdowns for running events.
pub fn catalog_overview(catalog: &Catalog, today: NaiveDate) -> Vec<GameOverview> {
    catalog
        .games()
        .map(|game| GameOverview {
            game: game.name.clone(),
            daily: game.daily.clone(),
            weekly: game.weekly.clone(),
            events: game
                .events
                .iter()
                .filter(|event| !event.is_expired(today))
                .map(|event| EventOverview {
                    name: event.name.clone(),
                    until: event.until,
                    days_remaining: event.days_remaining(today),
                    tasks: event.tasks.iter().map(|t| (t.name.clone(), t.kind)).collect(),
                })
                .collect(),
        })
        .collect()
}
