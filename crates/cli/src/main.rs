//! Aegis CLI - Catalog seeding and operations tools.
//!
//! # Usage
//!
//! ```bash
//! # Check that the policy backend is reachable
//! aegis-cli ping
//!
//! # Look up the role grants for an account
//! aegis-cli check-role -e admin@example.com
//!
//! # List the first catalog page
//! aegis-cli policy list
//!
//! # Seed the catalog from a YAML file
//! aegis-cli policy seed -f seeds/policies.yaml
//! ```
//!
//! # Commands
//!
//! - `ping` - Probe the policy backend
//! - `check-role` - Resolve an account's role grants
//! - `policy list` - Print a catalog page
//! - `policy seed` - Bulk-create policies from YAML
//!
//! Commands that write (`policy seed`) or read protected records
//! (`check-role`) need an operator bearer token in `AEGIS_OPERATOR_TOKEN`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "aegis-cli")]
#[command(author, version, about = "Aegis portal CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the policy backend
    Ping,
    /// Resolve an account's role grants
    CheckRole {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Manage the policy catalog
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
}

#[derive(Subcommand)]
enum PolicyAction {
    /// Print one catalog page
    List {
        /// Category filter
        #[arg(short, long)]
        category: Option<String>,

        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Page size
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
    /// Bulk-create policies from a YAML file
    Seed {
        /// Path to the YAML seed file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Ping => commands::ops::ping().await?,
        Commands::CheckRole { email } => commands::ops::check_role(&email).await?,
        Commands::Policy { action } => match action {
            PolicyAction::List {
                category,
                page,
                limit,
            } => commands::policy::list(category.as_deref(), page, limit).await?,
            PolicyAction::Seed { file } => commands::policy::seed(&file).await?,
        },
    }
    Ok(())
}
