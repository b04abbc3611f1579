// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! qrdraft - QR configuration draft engine.
//!
//! This is the binary entry point: operator commands over the local draft,
//! the remote session store and the saved configurations.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod doctor;
mod status;
mod watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qrdraft_config::QrdraftConfig;

/// qrdraft - QR configuration draft engine.
#[derive(Parser, Debug)]
#[command(name = "qrdraft", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current draft and which sections are complete.
    Status {
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Mark a section as configured.
    Touch {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        section: u8,
    },
    /// Replace a section payload with a JSON object.
    SetSection {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        section: u8,
        payload: String,
    },
    /// Add a resource to the draft.
    AddResource {
        name: String,
        /// Link target. Defaults to a render link for the draft.
        #[arg(long)]
        target: Option<String>,
        /// Mark the resource as in use.
        #[arg(long)]
        select: bool,
    },
    /// Merge resources waiting in the inbox once.
    Ingest,
    /// Promote the draft into a named configuration.
    Save {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Discard the draft without saving.
    Clear,
    /// List saved configurations, repairing stale resource links.
    Configs {
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Audit saved configurations and report repairs.
    Audit,
    /// Delete a saved configuration.
    Delete { id: String },
    /// Keep syncing and ingesting until interrupted.
    Watch,
    /// Run diagnostic checks.
    Doctor {
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => qrdraft_config::load_and_validate_path(path),
        None => qrdraft_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            qrdraft_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: QrdraftConfig) -> Result<(), qrdraft_core::DraftError> {
    let Some(command) = command else {
        println!("qrdraft: use --help for available commands");
        return Ok(());
    };

    match command {
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
        Commands::Touch { section } => commands::touch(&config, section).await,
        Commands::SetSection { section, payload } => {
            commands::set_section(&config, section, &payload).await
        }
        Commands::AddResource {
            name,
            target,
            select,
        } => commands::add_resource(&config, &name, target, select).await,
        Commands::Ingest => commands::ingest(&config).await,
        Commands::Save { name, description } => commands::save(&config, &name, &description).await,
        Commands::Clear => commands::clear(&config).await,
        Commands::Configs { json } => commands::list_configurations(&config, json).await,
        Commands::Audit => commands::audit(&config).await,
        Commands::Delete { id } => commands::delete(&config, &id).await,
        Commands::Watch => watch::run_watch(&config).await,
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain).await,
    }
}

/// Logs go to stderr so command output on stdout stays scriptable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qrdraft={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
