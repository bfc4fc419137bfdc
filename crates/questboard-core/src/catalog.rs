//! Quest catalog: games and their daily, weekly and event tasks.
//!
//! The catalog is an explicitly owned value. Everything that needs the
//! list of quests borrows it; admin operations mutate it through `&mut`.
//!
//! On disk the catalog is a JSON object keyed by game name, in display
//! order:
//!
//! ```json
//! {
//!   "Foo": {
//!     "daily": ["Login", "Dungeon"],
//!     "weekly": ["Raid"],
//!     "events": [
//!       { "name": "Hunt", "until": "2025-04-15",
//!         "tasks": [{ "name": "Daily Login", "kind": "daily" }] }
//!     ]
//!   }
//! }
//! ```

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::period::{EventTaskKind, Period};

/// One task inside an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTask {
    pub name: String,
    pub kind: EventTaskKind,
}

impl EventTask {
    pub fn new(name: impl Into<String>, kind: EventTaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A time-bounded set of tasks attached to a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEvent")]
pub struct Event {
    pub name: String,
    /// Last day of the event, inclusive.
    pub until: NaiveDate,
    pub tasks: Vec<EventTask>,
}

impl Event {
    pub fn new(name: impl Into<String>, until: NaiveDate, tasks: Vec<EventTask>) -> Self {
        Self {
            name: name.into(),
            until,
            tasks,
        }
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.until
    }

    /// Days left including today; 0 on the last day.
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.until - today).num_days()
    }

    pub fn task(&self, name: &str) -> Option<&EventTask> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Accepts both the native event shape and the older one where a single
/// `type` applied to a list of plain task names.
#[derive(Deserialize)]
struct RawEvent {
    name: String,
    until: NaiveDate,
    #[serde(rename = "type", default)]
    legacy_kind: Option<EventTaskKind>,
    #[serde(default)]
    tasks: Vec<RawEventTask>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEventTask {
    Plain(String),
    Full {
        name: String,
        #[serde(default)]
        kind: Option<EventTaskKind>,
    },
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        let fallback = raw.legacy_kind.unwrap_or_default();
        let tasks = raw
            .tasks
            .into_iter()
            .map(|task| match task {
                RawEventTask::Plain(name) => EventTask::new(name, fallback),
                RawEventTask::Full { name, kind } => {
                    EventTask::new(name, kind.unwrap_or(fallback))
                }
            })
            .collect();
        Event {
            name: raw.name,
            until: raw.until,
            tasks,
        }
    }
}

/// A game and its recurring and event tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Game {
    pub name: String,
    pub daily: Vec<String>,
    pub weekly: Vec<String>,
    pub events: Vec<Event>,
}

#[derive(Serialize, Deserialize, Default)]
struct GameBody {
    #[serde(default)]
    daily: Vec<String>,
    #[serde(default)]
    weekly: Vec<String>,
    #[serde(default)]
    events: Vec<Event>,
}

impl Game {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Recurring task list for a period. Events have no recurring list.
    pub fn tasks(&self, period: Period) -> &[String] {
        match period {
            Period::Daily => &self.daily,
            Period::Weekly => &self.weekly,
            Period::Event => &[],
        }
    }

    fn tasks_mut(&mut self, period: Period) -> Result<&mut Vec<String>> {
        match period {
            Period::Daily => Ok(&mut self.daily),
            Period::Weekly => Ok(&mut self.weekly),
            Period::Event => Err(CoreError::invalid(
                "period",
                "event tasks are edited through their event",
            )),
        }
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }

    fn event_mut(&mut self, name: &str) -> Result<&mut Event> {
        self.events
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| CoreError::not_found("event", name))
    }
}

/// Ordered collection of games.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    games: Vec<Game>,
}

/// Trim a user-supplied name and reject empty ones.
pub fn clean_name(field: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid(field, "name must not be empty"));
    }
    Ok(trimmed.to_string())
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.iter()
    }

    pub fn games_mut(&mut self) -> impl Iterator<Item = &mut Game> {
        self.games.iter_mut()
    }

    pub fn game(&self, name: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.game(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    fn game_mut(&mut self, name: &str) -> Result<&mut Game> {
        self.games
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| CoreError::not_found("game", name))
    }

    pub fn add_game(&mut self, name: &str) -> Result<()> {
        let name = clean_name("game", name)?;
        if self.contains(&name) {
            return Err(CoreError::conflict("game", name));
        }
        self.games.push(Game::new(name));
        Ok(())
    }

    pub fn delete_game(&mut self, name: &str) -> Result<Game> {
        let idx = self
            .games
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| CoreError::not_found("game", name))?;
        Ok(self.games.remove(idx))
    }

    /// Rename a game, keeping its position and all of its tasks and events.
    pub fn rename_game(&mut self, old: &str, new: &str) -> Result<()> {
        let new = clean_name("game", new)?;
        if !self.contains(old) {
            return Err(CoreError::not_found("game", old));
        }
        if old == new {
            return Ok(());
        }
        if self.contains(&new) {
            return Err(CoreError::conflict("game", new));
        }
        self.game_mut(old)?.name = new;
        Ok(())
    }

    /// Append names not already in the list. Returns the names added.
    pub fn add_tasks(&mut self, game: &str, period: Period, names: &[String]) -> Result<Vec<String>> {
        let names = names
            .iter()
            .map(|n| clean_name("task", n))
            .collect::<Result<Vec<_>>>()?;
        let tasks = self.game_mut(game)?.tasks_mut(period)?;
        let mut added = Vec::new();
        for name in names {
            if !tasks.contains(&name) {
                tasks.push(name.clone());
                added.push(name);
            }
        }
        Ok(added)
    }

    /// Remove matching names; unknown names are ignored. Returns the names removed.
    pub fn delete_tasks(&mut self, game: &str, period: Period, names: &[String]) -> Result<Vec<String>> {
        let tasks = self.game_mut(game)?.tasks_mut(period)?;
        let mut removed = Vec::new();
        tasks.retain(|t| {
            if names.iter().any(|n| n.trim() == t) {
                removed.push(t.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    pub fn rename_task(&mut self, game: &str, period: Period, old: &str, new: &str) -> Result<()> {
        let new = clean_name("task", new)?;
        let tasks = self.game_mut(game)?.tasks_mut(period)?;
        let idx = tasks
            .iter()
            .position(|t| t == old)
            .ok_or_else(|| CoreError::not_found("task", old))?;
        if tasks[idx] == new {
            return Ok(());
        }
        if tasks.contains(&new) {
            return Err(CoreError::conflict("task", new));
        }
        tasks[idx] = new;
        Ok(())
    }

    /// Attach an event. Event names are unique within a game.
    pub fn add_event(&mut self, game: &str, event: Event) -> Result<()> {
        let name = clean_name("event", &event.name)?;
        let mut seen = Vec::with_capacity(event.tasks.len());
        for task in &event.tasks {
            let task_name = clean_name("task", &task.name)?;
            if seen.contains(&task_name) {
                return Err(CoreError::conflict("event task", task_name));
            }
            seen.push(task_name);
        }
        let target = self.game_mut(game)?;
        if target.event(&name).is_some() {
            return Err(CoreError::conflict("event", name));
        }
        let tasks = event
            .tasks
            .into_iter()
            .zip(seen)
            .map(|(task, name)| EventTask::new(name, task.kind))
            .collect();
        target.events.push(Event::new(name, event.until, tasks));
        Ok(())
    }

    pub fn delete_event(&mut self, game: &str, name: &str) -> Result<Event> {
        let target = self.game_mut(game)?;
        let idx = target
            .events
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| CoreError::not_found("event", name))?;
        Ok(target.events.remove(idx))
    }

    pub fn rename_event(&mut self, game: &str, old: &str, new: &str) -> Result<()> {
        let new = clean_name("event", new)?;
        let target = self.game_mut(game)?;
        if target.event(old).is_none() {
            return Err(CoreError::not_found("event", old));
        }
        if old == new {
            return Ok(());
        }
        if target.event(&new).is_some() {
            return Err(CoreError::conflict("event", new));
        }
        target.event_mut(old)?.name = new;
        Ok(())
    }

    pub fn rename_event_task(&mut self, game: &str, event: &str, old: &str, new: &str) -> Result<()> {
        let new = clean_name("task", new)?;
        let target = self.game_mut(game)?.event_mut(event)?;
        let idx = target
            .tasks
            .iter()
            .position(|t| t.name == old)
            .ok_or_else(|| CoreError::not_found("event task", old))?;
        if target.tasks[idx].name == new {
            return Ok(());
        }
        if target.task(&new).is_some() {
            return Err(CoreError::conflict("event task", new));
        }
        target.tasks[idx].name = new;
        Ok(())
    }

    pub fn set_event_until(&mut self, game: &str, event: &str, until: NaiveDate) -> Result<()> {
        self.game_mut(game)?.event_mut(event)?.until = until;
        Ok(())
    }

    /// Keep only events accepted by `keep`. Returns `(game, event)` for each drop.
    pub(crate) fn retain_events<F>(&mut self, mut keep: F) -> Vec<(String, String)>
    where
        F: FnMut(&Event) -> bool,
    {
        let mut dropped = Vec::new();
        for game in &mut self.games {
            let game_name = game.name.clone();
            game.events.retain(|event| {
                if keep(event) {
                    true
                } else {
                    dropped.push((game_name.clone(), event.name.clone()));
                    false
                }
            });
        }
        dropped
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct GameBodyRef<'a> {
            daily: &'a [String],
            weekly: &'a [String],
            events: &'a [Event],
        }

        let mut map = serializer.serialize_map(Some(self.games.len()))?;
        for game in &self.games {
            map.serialize_entry(
                &game.name,
                &GameBodyRef {
                    daily: &game.daily,
                    weekly: &game.weekly,
                    events: &game.events,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = Catalog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of game name to quest lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Catalog, A::Error> {
                let mut games: Vec<Game> = Vec::new();
                while let Some((name, body)) = access.next_entry::<String, GameBody>()? {
                    let game = Game {
                        name,
                        daily: body.daily,
                        weekly: body.weekly,
                        events: body.events,
                    };
                    // Later duplicates win, keeping the first position.
                    match games.iter_mut().find(|g| g.name == game.name) {
                        Some(existing) => *existing = game,
                        None => games.push(game),
                    }
                }
                Ok(Catalog { games })
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_game("Foo").unwrap();
        catalog.add_tasks("Foo", Period::Daily, &names(&["Login", "Dungeon"])).unwrap();
        catalog.add_tasks("Foo", Period::Weekly, &names(&["Raid"])).unwrap();
        catalog
    }

    #[test]
    fn add_tasks_is_set_union_in_input_order() {
        let mut catalog = sample();
        let added = catalog
            .add_tasks("Foo", Period::Daily, &names(&["Shop", "Login", "Arena", "Shop"]))
            .unwrap();
        assert_eq!(added, names(&["Shop", "Arena"]));
        assert_eq!(
            catalog.game("Foo").unwrap().daily,
            names(&["Login", "Dungeon", "Shop", "Arena"])
        );
    }

    #[test]
    fn add_tasks_rejects_event_period_and_unknown_game() {
        let mut catalog = sample();
        assert!(matches!(
            catalog.add_tasks("Foo", Period::Event, &names(&["x"])),
            Err(CoreError::InvalidInput { .. })
        ));
        assert!(matches!(
            catalog.add_tasks("Bar", Period::Daily, &names(&["x"])),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_missing_task_is_noop() {
        let mut catalog = sample();
        let removed = catalog
            .delete_tasks("Foo", Period::Daily, &names(&["Nope", "Login"]))
            .unwrap();
        assert_eq!(removed, names(&["Login"]));
        assert_eq!(catalog.game("Foo").unwrap().daily, names(&["Dungeon"]));
    }

    #[test]
    fn rename_task_substitutes_in_place() {
        let mut catalog = sample();
        catalog.add_tasks("Foo", Period::Daily, &names(&["Shop"])).unwrap();
        catalog.rename_task("Foo", Period::Daily, "Dungeon", "Abyss").unwrap();
        assert_eq!(
            catalog.game("Foo").unwrap().daily,
            names(&["Login", "Abyss", "Shop"])
        );
        assert!(matches!(
            catalog.rename_task("Foo", Period::Daily, "Login", "Shop"),
            Err(CoreError::Conflict { .. })
        ));
    }

    #[test]
    fn rename_game_keeps_position_and_refuses_clobbering() {
        let mut catalog = sample();
        catalog.add_game("Bar").unwrap();
        catalog.rename_game("Foo", "Baz").unwrap();
        let order: Vec<_> = catalog.games().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["Baz", "Bar"]);
        assert_eq!(catalog.game("Baz").unwrap().daily, names(&["Login", "Dungeon"]));

        assert!(matches!(
            catalog.rename_game("Baz", "Bar"),
            Err(CoreError::Conflict { .. })
        ));
        assert!(matches!(
            catalog.rename_game("Missing", "Other"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn event_names_are_unique_per_game() {
        let mut catalog = sample();
        let event = Event::new("Hunt", date("2025-04-15"), vec![]);
        catalog.add_event("Foo", event.clone()).unwrap();
        assert!(matches!(
            catalog.add_event("Foo", event),
            Err(CoreError::Conflict { .. })
        ));
        assert!(matches!(
            catalog.delete_event("Foo", "Spring"),
            Err(CoreError::NotFound { .. })
        ));
        assert_eq!(catalog.delete_event("Foo", "Hunt").unwrap().name, "Hunt");
    }

    #[test]
    fn rename_event_task_in_place() {
        let mut catalog = sample();
        let event = Event::new(
            "Hunt",
            date("2025-04-15"),
            vec![
                EventTask::new("Collect", EventTaskKind::Once),
                EventTask::new("Login", EventTaskKind::Daily),
            ],
        );
        catalog.add_event("Foo", event).unwrap();
        catalog.rename_event_task("Foo", "Hunt", "Collect", "Gather").unwrap();
        let hunt = catalog.game("Foo").unwrap().event("Hunt").unwrap();
        assert_eq!(hunt.tasks[0], EventTask::new("Gather", EventTaskKind::Once));
        assert!(matches!(
            catalog.rename_event_task("Foo", "Hunt", "Missing", "X"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn loads_legacy_event_shape() {
        let json = indoc! {r#"
            {
              "Foo": {
                "daily": ["Login"],
                "events": [
                  { "name": "Spring", "type": "daily", "until": "2025-04-15",
                    "tasks": ["Check in", "Spin"] },
                  { "name": "Hunt", "until": "2025-05-01",
                    "tasks": [{ "name": "Boss", "kind": "once" }, "Collect"] }
                ]
              },
              "Bar": {}
            }
        "#};
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        let order: Vec<_> = catalog.games().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["Foo", "Bar"]);

        let foo = catalog.game("Foo").unwrap();
        assert!(foo.weekly.is_empty());
        let spring = foo.event("Spring").unwrap();
        assert!(spring.tasks.iter().all(|t| t.kind == EventTaskKind::Daily));
        let hunt = foo.event("Hunt").unwrap();
        assert_eq!(hunt.tasks[1], EventTask::new("Collect", EventTaskKind::Once));
    }

    #[test]
    fn saves_native_shape_in_order() {
        let mut catalog = sample();
        catalog.add_game("Alpha").unwrap();
        catalog
            .add_event(
                "Foo",
                Event::new(
                    "Hunt",
                    date("2025-04-15"),
                    vec![EventTask::new("Daily Login", EventTaskKind::Daily)],
                ),
            )
            .unwrap();
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.find("\"Foo\"").unwrap() < json.find("\"Alpha\"").unwrap());
        assert!(json.contains(r#""tasks":[{"name":"Daily Login","kind":"daily"}]"#));

        let back: Catalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn empty_names_are_invalid() {
        let mut catalog = Catalog::new();
        assert!(matches!(
            catalog.add_game("   "),
            Err(CoreError::InvalidInput { .. })
        ));
    }
}
