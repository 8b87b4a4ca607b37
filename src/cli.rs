//! CLI interface for dolma.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::calendar::{CalendarGateway, GoogleCalendar};
use crate::config::Config;
use crate::goals::GoalStore;

#[derive(Parser)]
#[command(name = "dolma")]
#[command(about = "DOLMA personal assistant backend with calendar and goal tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default when no command given)
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Inspect goals from the terminal
    Goals {
        #[command(subcommand)]
        command: GoalsCommands,
    },
    /// Show configuration and calendar connection status
    Status,
}

#[derive(Subcommand)]
enum GoalsCommands {
    /// List goals, optionally filtered by status
    List {
        /// active, completed, or archived
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one goal as JSON
    Show { id: String },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            crate::server::start(config).await
        }
        Commands::Goals { command } => run_goals(&config, command),
        Commands::Status => show_status(&config).await,
    }
}

fn run_goals(config: &Config, command: GoalsCommands) -> Result<()> {
    let store = GoalStore::new(config.goals.file()?)?;
    match command {
        GoalsCommands::List { status } => {
            let goals = store.list(status.as_deref());
            if goals.is_empty() {
                println!("No goals found.");
                return Ok(());
            }
            for goal in goals {
                println!(
                    "{}  {:<40}  {:>4}  {}",
                    goal.short_id(),
                    goal.title,
                    format!("{}%", goal.progress),
                    goal.status
                );
            }
        }
        GoalsCommands::Show { id } => match store.get(&id) {
            Some(goal) => println!("{}", serde_json::to_string_pretty(&goal)?),
            None => println!("No goal with id '{}'", id),
        },
    }
    Ok(())
}

async fn show_status(config: &Config) -> Result<()> {
    let gateway = GoogleCalendar::new(
        config.calendar.token_path()?,
        config.calendar.timezone.clone(),
    )?;
    println!("model:     {}", config.llm.model);
    println!("timezone:  {}", config.calendar.timezone);
    println!("goals:     {}", config.goals.file()?.display());
    println!(
        "calendar:  {}",
        if gateway.is_connected().await {
            "connected"
        } else {
            "not connected"
        }
    );
    Ok(())
}
