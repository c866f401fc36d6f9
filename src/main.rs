use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use precedent::{cli, config, server};

#[derive(Parser)]
#[command(name = "precedent", version, about = "Task-tracking backend with semantic task recall")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Manage the database
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    /// Manage API keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Create the database schema (idempotent)
    Init {
        /// Also insert dev seed data (test user, project, API key)
        #[arg(long)]
        seed: bool,
    },
    /// Drop all tables and recreate them
    Reset {
        #[arg(long)]
        seed: bool,
    },
    /// Print row counts and task-state breakdown
    Stats,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Issue a new API key and print the raw secret once
    Issue {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        project_id: String,
        /// Days until expiry; omit for a non-expiring key
        #[arg(long)]
        expires_days: Option<i64>,
    },
    /// Deactivate a key by id
    Revoke {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::PrecedentConfig::load()?;

    // Log to stderr so stdout stays clean for CLI output (issued secrets).
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve(config).await?;
        }
        Command::Db { action } => match action {
            DbAction::Init { seed } => cli::db_admin::init(&config, seed)?,
            DbAction::Reset { seed } => cli::db_admin::reset(&config, seed)?,
            DbAction::Stats => cli::db_admin::stats(&config)?,
        },
        Command::Key { action } => match action {
            KeyAction::Issue {
                user_id,
                project_id,
                expires_days,
            } => cli::keys::issue(&config, &user_id, &project_id, expires_days)?,
            KeyAction::Revoke { id } => cli::keys::revoke(&config, &id)?,
        },
    }

    Ok(())
}
