//! Event administration commands for CLI.

use clap::Subcommand;
use questboard_core::period::parse_date;
use questboard_core::{Event, EventTask, EventTaskKind};
use std::io::{BufRead, Write};

use super::{open_board, split_names, CmdResult, Ctx};
use crate::wizard::{AddEventWizard, Step};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add an event to a game
    Add {
        game: String,
        name: String,
        /// Last day of the event (YYYY-MM-DD)
        until: String,
        /// Task names; `name:daily` or `name:once` overrides --kind per task
        #[arg(required = true)]
        tasks: Vec<String>,
        /// Kind for tasks without an explicit one
        #[arg(long, default_value = "once")]
        kind: EventTaskKind,
    },
    /// Delete an event
    Delete { game: String, name: String },
    /// Rename an event, keeping its checks
    Rename {
        game: String,
        old: String,
        new: String,
    },
    /// Rename one task of an event, keeping its checks
    RenameTask {
        game: String,
        event: String,
        old: String,
        new: String,
    },
    /// Move an event's last day
    SetUntil {
        game: String,
        event: String,
        until: String,
    },
    /// Add an event by answering questions on stdin
    Wizard,
}

/// `Boss:daily` → (`Boss`, daily); anything else keeps `default`.
fn parse_task(raw: &str, default: EventTaskKind) -> EventTask {
    if let Some((name, kind)) = raw.rsplit_once(':') {
        if let Ok(kind) = kind.trim().parse::<EventTaskKind>() {
            return EventTask::new(name.trim(), kind);
        }
    }
    EventTask::new(raw.trim(), default)
}

pub fn run(ctx: &Ctx, action: EventAction) -> CmdResult {
    let mut board = open_board()?;

    match action {
        EventAction::Add {
            game,
            name,
            until,
            tasks,
            kind,
        } => {
            let until = parse_date(&until)?;
            let tasks = split_names(&tasks)
                .iter()
                .map(|raw| parse_task(raw, kind))
                .collect();
            board.add_event(&game, Event::new(name.trim(), until, tasks))?;
            ctx.ok(&format!("added event '{}' to '{game}' until {until}", name.trim()))
        }
        EventAction::Delete { game, name } => {
            board.delete_event(&game, &name)?;
            ctx.ok(&format!("deleted event '{name}' from '{game}'"))
        }
        EventAction::Rename { game, old, new } => {
            board.rename_event(&game, &old, &new)?;
            ctx.ok(&format!("renamed event '{old}' to '{}'", new.trim()))
        }
        EventAction::RenameTask {
            game,
            event,
            old,
            new,
        } => {
            board.rename_event_task(&game, &event, &old, &new)?;
            ctx.ok(&format!("renamed '{old}' to '{}' in '{event}'", new.trim()))
        }
        EventAction::SetUntil { game, event, until } => {
            let until = parse_date(&until)?;
            board.set_event_until(&game, &event, until)?;
            ctx.ok(&format!("'{event}' now ends on {until}"))
        }
        EventAction::Wizard => {
            let mut wizard = AddEventWizard::new();
            let stdin = std::io::stdin();
            let mut lines = stdin.lock().lines();
            let mut out = std::io::stdout();

            println!("{}", wizard.prompt());
            loop {
                out.flush()?;
                let Some(line) = lines.next() else {
                    return Err("input ended before the event was complete".into());
                };
                match wizard.answer(&line?, board.catalog()) {
                    Step::Ask(question) => println!("{question}"),
                    Step::Retry(message) => println!("{message}"),
                    Step::Complete { game, event } => {
                        let summary = format!("{} ({} tasks, until {})", event.name, event.tasks.len(), event.until);
                        board.add_event(&game, event)?;
                        return ctx.ok(&format!("✅ Event added!\n📌 {summary}"));
                    }
                    Step::Cancelled => return ctx.ok("🚫 Event creation cancelled."),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_kind_suffix_overrides_default() {
        assert_eq!(
            parse_task("Boss:daily", EventTaskKind::Once),
            EventTask::new("Boss", EventTaskKind::Daily)
        );
        assert_eq!(
            parse_task("Time: 10:00", EventTaskKind::Once),
            EventTask::new("Time: 10:00", EventTaskKind::Once)
        );
    }
}
