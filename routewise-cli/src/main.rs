//! ROUTEWISE CLI
//!
//! Operator entry point for the assignment decision engine.
//!
//! # Usage
//!
//! ```bash
//! routewise simulate --agents demos/agents.json --ticket demos/ticket.json
//! routewise route --ticket-id T-1001 --config config/routewise.toml
//! routewise sync --config config/routewise.toml --interval-secs 30
//! printf 'T-1001\nT-1002\n' | routewise sync --route-stdin
//! routewise check-config config/routewise.toml
//! ```

use clap::{Parser, Subcommand};
use error::CliResult;
use std::path::PathBuf;

mod commands;
mod error;
mod telemetry;

#[derive(Parser)]
#[command(name = "routewise")]
#[command(version)]
#[command(about = "Ticket-to-agent assignment decisions", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "ROUTEWISE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a ticket against a local agent list
    Simulate {
        /// Engine configuration (TOML); defaults when omitted
        #[arg(long, env = "ROUTEWISE_CONFIG")]
        config: Option<PathBuf>,
        /// JSON array of agents
        #[arg(long)]
        agents: PathBuf,
        /// JSON ticket
        #[arg(long)]
        ticket: PathBuf,
    },
    /// Fetch a ticket upstream, route it, and push the assignment back
    Route {
        #[arg(long, env = "ROUTEWISE_CONFIG")]
        config: Option<PathBuf>,
        #[arg(long)]
        ticket_id: String,
    },
    /// Keep the agent pool in sync and hot-reload the config file
    Sync {
        #[arg(long, env = "ROUTEWISE_CONFIG")]
        config: Option<PathBuf>,
        /// Overrides ROUTEWISE_SYNC_INTERVAL_SECS
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Route ticket ids read from stdin, one per line, against the synced pool
        #[arg(long)]
        route_stdin: bool,
    },
    /// Validate a config file and print it normalized
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json)?;

    match cli.command {
        Commands::Simulate { config, agents, ticket } => {
            commands::run_simulate(config.as_deref(), &agents, &ticket)
        }
        Commands::Route { config, ticket_id } => {
            commands::run_route(config.as_deref(), ticket_id.into()).await
        }
        Commands::Sync {
            config,
            interval_secs,
            route_stdin,
        } => commands::run_sync(config, interval_secs, route_stdin).await,
        Commands::CheckConfig { path } => commands::run_check_config(&path),
    }
}
