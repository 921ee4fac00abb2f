//! Plateful CLI - Environment checks, account management, and demo seeding.
//!
//! # Usage
//!
//! ```bash
//! # Validate the local configuration
//! plateful check config
//!
//! # Probe the hosted data platform
//! plateful check platform
//!
//! # Run every check
//! plateful check all
//!
//! # Create an account with a role attached
//! plateful account create -e owner@example.com -n "Owner Name" -r restaurant_owner -p <password>
//!
//! # Promote an existing account to restaurant owner
//! plateful account promote -e diner@example.com
//!
//! # Populate a project with demo content
//! plateful seed --owner-email owner@example.com
//! ```
//!
//! # Commands
//!
//! - `check` - Validate configuration and platform reachability
//! - `account create` - Create platform accounts with role metadata
//! - `account promote` - Rewrite an account's role to restaurant owner
//! - `seed` - Populate demo content under the service-role key

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "plateful")]
#[command(author, version, about = "Plateful CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and platform reachability
    Check {
        #[command(subcommand)]
        target: CheckTarget,
    },
    /// Manage platform accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Populate the platform with demo content
    Seed {
        /// Email of the account that will own the demo restaurant
        #[arg(long)]
        owner_email: String,
    },
}

#[derive(Subcommand)]
enum CheckTarget {
    /// Load and summarize the local configuration
    Config,
    /// Probe the hosted data platform's auth service
    Platform,
    /// Run every check
    All,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create a new account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account role (`customer`, `restaurant_owner`)
        #[arg(short, long, default_value = "customer")]
        role: String,

        /// Initial password (min 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Promote an existing account to restaurant owner
    Promote {
        /// Email address
        #[arg(short, long)]
        email: String,
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
        Commands::Check { target } => match target {
            CheckTarget::Config => {
                commands::check::config()?;
            }
            CheckTarget::Platform => commands::check::platform().await?,
            CheckTarget::All => {
                commands::check::config()?;
                commands::check::platform().await?;
            }
        },
        Commands::Account { action } => match action {
            AccountAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::account::create(&email, &name, &role, &password).await?;
            }
            AccountAction::Promote { email } => {
                commands::account::promote(&email).await?;
            }
        },
        Commands::Seed { owner_email } => {
            commands::seed::run(&owner_email).await?;
        }
    }
    Ok(())
}
