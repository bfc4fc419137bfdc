//! Conversational add-event flow.
//!
//! Asks for game, event name, end date, task kind and task list, one answer
//! at a time. Bad answers re-ask the same question; `cancel` (or `/cancel`)
//! abandons the flow from any step.

use chrono::NaiveDate;
use questboard_core::period::parse_date;
use questboard_core::{Catalog, Event, EventTask, EventTaskKind};

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    AskGame,
    AskName {
        game: String,
    },
    AskUntil {
        game: String,
        name: String,
    },
    AskKind {
        game: String,
        name: String,
        until: NaiveDate,
    },
    AskTasks {
        game: String,
        name: String,
        until: NaiveDate,
        kind: EventTaskKind,
    },
    Finished,
}

/// What the wizard wants to say after an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Next question.
    Ask(&'static str),
    /// The answer was rejected; the same question stands.
    Retry(String),
    /// All answers collected.
    Complete { game: String, event: Event },
    Cancelled,
}

#[derive(Debug)]
pub struct AddEventWizard {
    state: State,
}

impl Default for AddEventWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl AddEventWizard {
    pub fn new() -> Self {
        Self {
            state: State::AskGame,
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self.state {
            State::AskGame => "🎮 Which game gets the event?",
            State::AskName { .. } => "📛 Event name?",
            State::AskUntil { .. } => "📅 Last day of the event (e.g. 2025-04-15)?",
            State::AskKind { .. } => "📂 Task type (daily / once)?",
            State::AskTasks { .. } => "📝 Tasks, separated by commas (e.g. Collect items, Boss)?",
            State::Finished => "",
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Feed one answer.
    pub fn answer(&mut self, input: &str, catalog: &Catalog) -> Step {
        let input = input.trim();
        if matches!(input, "cancel" | "/cancel") {
            self.state = State::Finished;
            return Step::Cancelled;
        }

        let state = std::mem::replace(&mut self.state, State::Finished);
        let (next, step) = match state {
            State::AskGame => {
                if catalog.contains(input) {
                    (State::AskName { game: input.to_string() }, None)
                } else {
                    (State::AskGame, Some(Step::Retry(format!("❌ Unknown game '{input}'. Try again:"))))
                }
            }
            State::AskName { game } => {
                if input.is_empty() {
                    (State::AskName { game }, Some(Step::Retry("❗ The name cannot be empty.".into())))
                } else if catalog.game(&game).and_then(|g| g.event(input)).is_some() {
                    let retry = format!("❌ '{game}' already has an event '{input}'.");
                    (State::AskName { game }, Some(Step::Retry(retry)))
                } else {
                    (State::AskUntil { game, name: input.to_string() }, None)
                }
            }
            State::AskUntil { game, name } => match parse_date(input) {
                Ok(until) => (State::AskKind { game, name, until }, None),
                Err(_) => (
                    State::AskUntil { game, name },
                    Some(Step::Retry("❗ Dates look like 2025-04-15.".into())),
                ),
            },
            State::AskKind { game, name, until } => match input.parse::<EventTaskKind>() {
                Ok(kind) => (State::AskTasks { game, name, until, kind }, None),
                Err(_) => (
                    State::AskKind { game, name, until },
                    Some(Step::Retry("❌ Choose daily or once.".into())),
                ),
            },
            State::AskTasks { game, name, until, kind } => {
                let tasks: Vec<EventTask> = input
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| EventTask::new(t, kind))
                    .collect();
                if tasks.is_empty() {
                    (
                        State::AskTasks { game, name, until, kind },
                        Some(Step::Retry("❗ List at least one task.".into())),
                    )
                } else {
                    let event = Event::new(name, until, tasks);
                    (State::Finished, Some(Step::Complete { game, event }))
                }
            }
            State::Finished => (State::Finished, Some(Step::Cancelled)),
        };

        self.state = next;
        step.unwrap_or_else(|| Step::Ask(self.prompt()))
    }
}
