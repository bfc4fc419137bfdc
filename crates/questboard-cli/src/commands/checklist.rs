//! Checklist commands for CLI.

use clap::Subcommand;
use questboard_core::{render, Period};
use serde_json::json;

use super::{open_board, CmdResult, Ctx};

fn period(weekly: bool) -> Period {
    if weekly {
        Period::Weekly
    } else {
        Period::Daily
    }
}

#[derive(Subcommand)]
pub enum ChecklistAction {
    /// Today's daily checklist
    Daily,
    /// This week's weekly checklist
    Weekly,
    /// Checklists of running events
    Events,
    /// Check or uncheck a task
    Toggle {
        game: String,
        task: String,
        /// Toggle a weekly task instead of a daily one
        #[arg(long)]
        weekly: bool,
    },
    /// Check or uncheck an event task
    ToggleEvent {
        game: String,
        event: String,
        task: String,
    },
    /// Check every task of a game
    Complete {
        game: String,
        #[arg(long)]
        weekly: bool,
    },
    /// Close out the day and advance the streak
    Done,
    /// Daily completion per game
    Progress,
    /// Current streak
    Streak,
}

pub fn run(ctx: &Ctx, action: ChecklistAction) -> CmdResult {
    let mut board = open_board()?;
    board.add_user(ctx.user)?;

    match action {
        ChecklistAction::Daily => {
            let lists = board.daily_view(ctx.user);
            ctx.emit(&lists, || {
                format!("📅 Today's daily checklist\n{}", render::checklist(&lists))
            })?;
        }
        ChecklistAction::Weekly => {
            let lists = board.weekly_view(ctx.user);
            ctx.emit(&lists, || {
                format!("🗓️ This week's checklist\n{}", render::checklist(&lists))
            })?;
        }
        ChecklistAction::Events => {
            let events = board.event_view(ctx.user);
            ctx.emit(&events, || render::events(&events))?;
        }
        ChecklistAction::Toggle { game, task, weekly } => {
            let checked = board.toggle(ctx.user, &game, &task, period(weekly))?;
            let value = json!({ "game": game, "task": task, "checked": checked });
            ctx.emit(&value, || {
                format!("{} {game} / {task}\n", if checked { "✅" } else { "☐" })
            })?;
        }
        ChecklistAction::ToggleEvent { game, event, task } => {
            let checked = board.toggle_event_task(ctx.user, &game, &event, &task)?;
            let value = json!({ "game": game, "event": event, "task": task, "checked": checked });
            ctx.emit(&value, || {
                format!("{} {game} - {event} / {task}\n", if checked { "✅" } else { "☐" })
            })?;
        }
        ChecklistAction::Complete { game, weekly } => {
            let period = period(weekly);
            let total = board
                .catalog()
                .game(&game)
                .map(|g| g.tasks(period).len())
                .unwrap_or(0);
            let inserted = board.complete_all(ctx.user, &game, period)?;
            let value = json!({ "game": game, "period": period, "newly_checked": inserted, "total": total });
            ctx.emit(&value, || {
                if total == 0 {
                    format!("📭 '{game}' has no {period} tasks.\n")
                } else {
                    format!("✅ All {period} tasks of '{game}' checked.\n")
                }
            })?;
        }
        ChecklistAction::Done => {
            let outcome = board.done(ctx.user)?;
            ctx.emit(&outcome, || render::done(&outcome))?;
        }
        ChecklistAction::Progress => {
            let rows = board.progress(ctx.user);
            ctx.emit(&rows, || render::progress(&rows))?;
        }
        ChecklistAction::Streak => {
            let record = board.user(ctx.user).cloned();
            let streak = board.streak(ctx.user);
            ctx.emit(&record, || format!("🔥 Day {streak}\n"))?;
        }
    }
    Ok(())
}
