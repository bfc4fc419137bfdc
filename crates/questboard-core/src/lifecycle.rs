//! Event lifecycle: expiry and promotion of daily event tasks.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::catalog::Catalog;
use crate::period::EventTaskKind;

/// What a refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// `(game, event)` pairs removed because they ended before today.
    pub expired: Vec<(String, String)>,
    /// `(game, task)` pairs appended to the game's daily list.
    pub promoted: Vec<(String, String)>,
}

impl RefreshReport {
    /// Whether the catalog needs saving.
    pub fn changed(&self) -> bool {
        !self.expired.is_empty() || !self.promoted.is_empty()
    }
}

/// Drop expired events, then promote daily-kind tasks of the surviving
/// events into their game's recurring daily list.
///
/// Promotion is never undone here, even after the event expires.
pub fn refresh_events(catalog: &mut Catalog, today: NaiveDate) -> RefreshReport {
    let expired = catalog.retain_events(|event| !event.is_expired(today));

    let mut promoted = Vec::new();
    for game in catalog.games_mut() {
        let candidates: Vec<String> = game
            .events
            .iter()
            .flat_map(|event| event.tasks.iter())
            .filter(|task| task.kind == EventTaskKind::Daily)
            .map(|task| task.name.clone())
            .collect();
        for name in candidates {
            if !game.daily.contains(&name) {
                game.daily.push(name.clone());
                promoted.push((game.name.clone(), name));
            }
        }
    }

    for (game, event) in &expired {
        info!(game = %game, event = %event, "event expired");
    }
    for (game, task) in &promoted {
        info!(game = %game, task = %task, "event task promoted to daily");
    }

    RefreshReport { expired, promoted }
}

/// An event ending soon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringEvent {
    pub game: String,
    pub event: String,
    pub until: NaiveDate,
    pub days_remaining: i64,
}

/// Non-expired events ending within `within_days` of `today`, soonest first.
pub fn expiring_events(catalog: &Catalog, today: NaiveDate, within_days: i64) -> Vec<ExpiringEvent> {
    let mut soon: Vec<ExpiringEvent> = catalog
        .games()
        .flat_map(|game| {
            game.events.iter().filter_map(move |event| {
                let days_remaining = event.days_remaining(today);
                (0..=within_days)
                    .contains(&days_remaining)
                    .then(|| ExpiringEvent {
                        game: game.name.clone(),
                        event: event.name.clone(),
                        until: event.until,
                        days_remaining,
                    })
            })
        })
        .collect();
    soon.sort_by_key(|e| e.days_remaining);
    soon
}
