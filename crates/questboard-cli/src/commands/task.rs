//! Daily and weekly task administration.

use clap::Subcommand;
use questboard_core::Period;
use serde_json::json;

use super::{open_board, split_names, CmdResult, Ctx};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add tasks to a game
    Add {
        game: String,
        /// Task names; commas also separate names
        #[arg(required = true)]
        tasks: Vec<String>,
        /// daily or weekly
        #[arg(long, default_value = "daily")]
        period: Period,
    },
    /// Remove tasks from a game
    Delete {
        game: String,
        #[arg(required = true)]
        tasks: Vec<String>,
        #[arg(long, default_value = "daily")]
        period: Period,
    },
    /// Rename a task, keeping its checks
    Rename {
        game: String,
        old: String,
        new: String,
        #[arg(long, default_value = "daily")]
        period: Period,
    },
}

pub fn run(ctx: &Ctx, action: TaskAction) -> CmdResult {
    let mut board = open_board()?;

    match action {
        TaskAction::Add { game, tasks, period } => {
            let added = board.add_tasks(&game, period, &split_names(&tasks))?;
            let value = json!({ "game": game, "period": period, "added": added });
            ctx.emit(&value, || {
                if added.is_empty() {
                    "nothing new to add\n".to_string()
                } else {
                    format!("added {period} tasks to '{game}': {}\n", added.join(", "))
                }
            })
        }
        TaskAction::Delete { game, tasks, period } => {
            let removed = board.delete_tasks(&game, period, &split_names(&tasks))?;
            let value = json!({ "game": game, "period": period, "removed": removed });
            ctx.emit(&value, || {
                if removed.is_empty() {
                    "no matching tasks\n".to_string()
                } else {
                    format!("removed from '{game}': {}\n", removed.join(", "))
                }
            })
        }
        TaskAction::Rename {
            game,
            old,
            new,
            period,
        } => {
            board.rename_task(&game, period, &old, &new)?;
            ctx.ok(&format!("renamed {period} task '{old}' to '{}'", new.trim()))
        }
    }
}
