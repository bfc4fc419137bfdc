use clap::Subcommand;
use questboard_core::notify::sink_from_config;
use questboard_core::Job;

use super::{open_board, CmdResult, Ctx};

#[derive(Subcommand)]
pub enum JobAction {
    /// Run one job immediately
    Run {
        /// reset-daily, reset-weekly, refresh-events, send-daily, notify-expiring or backup
        name: Job,
    },
    /// List job names
    List,
}

pub fn run(ctx: &Ctx, action: JobAction) -> CmdResult {
    match action {
        JobAction::Run { name } => {
            let mut board = open_board()?;
            let sink = sink_from_config(&board.config().notifications);
            let report = board.run_job(name, sink.as_ref())?;
            ctx.emit(&report, || format!("{report}\n"))
        }
        JobAction::List => {
            let names: Vec<&str> = Job::ALL.iter().map(Job::as_str).collect();
            ctx.emit(&names, || format!("{}\n", names.join("\n")))
        }
    }
}
