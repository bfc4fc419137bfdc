use clap::Subcommand;
use std::fmt::Write;

use super::{open_board, CmdResult, Ctx};

#[derive(Subcommand)]
pub enum UserAction {
    /// Registered users with their streaks
    List,
}

pub fn run(ctx: &Ctx, action: UserAction) -> CmdResult {
    let board = open_board()?;

    match action {
        UserAction::List => {
            let users: Vec<_> = board.users().iter().cloned().collect();
            ctx.emit(&users, || {
                let mut out = String::new();
                for user in &users {
                    let last = user
                        .last_day_complete
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let _ = writeln!(
                        out,
                        "{}\tday {}\tbest {}\tlast {last}",
                        user.user_id, user.day_streak, user.longest_streak
                    );
                }
                out
            })
        }
    }
}
