use clap::Subcommand;
use questboard_core::render;

use super::{open_board, CmdResult, Ctx};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// Every game with its tasks and running events
    List,
    /// One game
    Show { game: String },
}

pub fn run(ctx: &Ctx, action: CatalogAction) -> CmdResult {
    let board = open_board()?;
    let overview = board.catalog_overview();

    match action {
        CatalogAction::List => {
            ctx.emit(&overview, || render::catalog(&overview))?;
        }
        CatalogAction::Show { game } => {
            let found: Vec<_> = overview.into_iter().filter(|g| g.game == game).collect();
            if found.is_empty() {
                return Err(format!("game not found: {game}").into());
            }
            ctx.emit(&found[0], || render::catalog(&found))?;
        }
    }
    Ok(())
}
