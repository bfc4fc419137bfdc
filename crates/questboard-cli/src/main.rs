use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod wizard;

use commands::Ctx;

#[derive(Parser)]
#[command(name = "questboard", version, about = "Questboard CLI")]
struct Cli {
    /// Acting user id
    #[arg(long, global = true, env = "QUESTBOARD_USER", default_value_t = 0)]
    user: i64,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily, weekly and event checklists
    Checklist {
        #[command(subcommand)]
        action: commands::checklist::ChecklistAction,
    },
    /// Browse the quest catalog
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Game administration
    Game {
        #[command(subcommand)]
        action: commands::game::GameAction,
    },
    /// Daily and weekly task administration
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Event administration
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Run a maintenance job now
    Job {
        #[command(subcommand)]
        action: commands::job::JobAction,
    },
    /// Run the job scheduler in the foreground
    Daemon,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Registered users
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    let ctx = Ctx {
        user: cli.user,
        json: cli.json,
    };

    let daemon = matches!(cli.command, Commands::Daemon);
    init_tracing(if daemon { "info" } else { "warn" });

    let result = match cli.command {
        Commands::Checklist { action } => commands::checklist::run(&ctx, action),
        Commands::Catalog { action } => commands::catalog::run(&ctx, action),
        Commands::Game { action } => commands::game::run(&ctx, action),
        Commands::Task { action } => commands::task::run(&ctx, action),
        Commands::Event { action } => commands::event::run(&ctx, action),
        Commands::Job { action } => commands::job::run(&ctx, action),
        Commands::Daemon => commands::daemon::run(&ctx),
        Commands::Config { action } => commands::config::run(&ctx, action),
        Commands::User { action } => commands::user::run(&ctx, action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "questboard", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
