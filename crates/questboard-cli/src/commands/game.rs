use clap::Subcommand;

use super::{open_board, CmdResult, Ctx};

#[derive(Subcommand)]
pub enum GameAction {
    /// Add a game with no tasks
    Add { name: String },
    /// Delete a game with all of its tasks and events
    Delete { name: String },
    /// Rename a game, keeping its checks
    Rename { old: String, new: String },
}

pub fn run(ctx: &Ctx, action: GameAction) -> CmdResult {
    let mut board = open_board()?;

    match action {
        GameAction::Add { name } => {
            board.add_game(&name)?;
            ctx.ok(&format!("added game '{}'", name.trim()))
        }
        GameAction::Delete { name } => {
            board.delete_game(&name)?;
            ctx.ok(&format!("deleted game '{name}'"))
        }
        GameAction::Rename { old, new } => {
            board.rename_game(&old, &new)?;
            ctx.ok(&format!("renamed '{old}' to '{}'", new.trim()))
        }
    }
}
