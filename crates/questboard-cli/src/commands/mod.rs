pub mod catalog;
pub mod checklist;
pub mod config;
pub mod daemon;
pub mod event;
pub mod game;
pub mod job;
pub mod task;
pub mod user;

use questboard_core::ledger::UserId;
use questboard_core::storage::data_dir;
use questboard_core::{Config, QuestBoard, SystemClock};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Global flags shared by every command.
pub struct Ctx {
    pub user: UserId,
    pub json: bool,
}

impl Ctx {
    /// Print `value` as JSON with `--json`, otherwise the rendered text.
    pub fn emit<T, F>(&self, value: &T, text: F) -> CmdResult
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> String,
    {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text());
        }
        Ok(())
    }

    /// Print a one-line confirmation, or `{"ok": true, ...}` with `--json`.
    pub fn ok(&self, message: &str) -> CmdResult {
        if self.json {
            println!("{}", serde_json::json!({ "ok": true, "message": message }));
        } else {
            println!("{message}");
        }
        Ok(())
    }
}

/// Open the board in the data directory with the configured timezone.
pub fn open_board() -> Result<QuestBoard, Box<dyn std::error::Error>> {
    let dir = data_dir()?;
    let config = Config::load_from(&dir)?;
    let clock = SystemClock::with_offset_hours(config.timezone_offset_hours);
    Ok(QuestBoard::open(&dir, config, Box::new(clock))?)
}

/// Split `a, b` style arguments into trimmed, non-empty names.
pub fn split_names(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_names_accepts_commas_and_words() {
        let args = vec!["Collect items, Boss".to_string(), "Login".to_string(), " , ".to_string()];
        assert_eq!(split_names(&args), vec!["Collect items", "Boss", "Login"]);
    }
}
