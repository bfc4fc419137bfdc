//! Day streaks.
//!
//! A streak advances at most once per calendar day, and only after the
//! caller has confirmed that every daily task of every game is checked.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::ledger::{CompletionLookup, UserId};
use crate::period::Period;
use crate::users::Users;

/// How a streak reacts to skipped days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    /// Restart at 1 when the previous completion is older than yesterday.
    /// Off by default: every completed day adds exactly one.
    #[serde(default)]
    pub reset_on_missed_day: bool,
}

/// Result of asking to close out the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DoneOutcome {
    /// All daily tasks were checked; `streak` is the current day count.
    Completed { streak: u32 },
    /// Some daily tasks are still open, as `(game, task)`.
    Incomplete { remaining: Vec<(String, String)> },
}

/// True iff every daily task of every game is checked for `user` today.
/// Vacuously true when no game has daily tasks.
pub fn all_daily_tasks_complete<L>(catalog: &Catalog, ledger: &L, user: UserId, now: &DateTime<FixedOffset>) -> bool
where
    L: CompletionLookup + ?Sized,
{
    catalog.games().all(|game| {
        game.daily
            .iter()
            .all(|task| ledger.is_checked(user, &game.name, task, Period::Daily, now))
    })
}

/// Daily tasks still open for `user`, as `(game, task)` in catalog order.
pub fn remaining_daily_tasks<L>(
    catalog: &Catalog,
    ledger: &L,
    user: UserId,
    now: &DateTime<FixedOffset>,
) -> Vec<(String, String)>
where
    L: CompletionLookup + ?Sized,
{
    catalog
        .games()
        .flat_map(|game| {
            game.daily
                .iter()
                .filter(|task| !ledger.is_checked(user, &game.name, task, Period::Daily, now))
                .map(|task| (game.name.clone(), task.clone()))
        })
        .collect()
}

/// Advance the streak for `today` and return it.
///
/// Gating on [`all_daily_tasks_complete`] is the caller's job. A second
/// call on the same day returns the stored value unchanged, as does a call
/// dated before the last completion. Unknown users stay at 0.
pub fn record_day_complete(users: &mut Users, user: UserId, today: NaiveDate, policy: StreakPolicy) -> u32 {
    let Some(record) = users.get_mut(user) else {
        return 0;
    };

    if let Some(last) = record.last_day_complete {
        if last >= today {
            return record.day_streak;
        }
        if policy.reset_on_missed_day && (today - last).num_days() > 1 {
            record.day_streak = 0;
        }
    }

    record.day_streak += 1;
    record.last_day_complete = Some(today);
    record.longest_streak = record.longest_streak.max(record.day_streak);
    record.day_streak
}
