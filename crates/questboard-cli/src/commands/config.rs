use clap::Subcommand;
use questboard_core::storage::data_dir;
use questboard_core::Config;

use super::{CmdResult, Ctx};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timezone_offset_hours", "schedule.send_daily")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
}

pub fn run(ctx: &Ctx, action: ConfigAction) -> CmdResult {
    let dir = data_dir()?;

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_from(&dir)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(&dir)?;
            config.set(&key, &value)?;
            config.save_to(&dir)?;
            ctx.ok("ok")?;
        }
        ConfigAction::List => {
            let config = Config::load_from(&dir)?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            Config::default().save_to(&dir)?;
            ctx.ok("config reset to defaults")?;
        }
        ConfigAction::Path => {
            println!("{}", Config::path_in(&dir).display());
        }
    }
    Ok(())
}
