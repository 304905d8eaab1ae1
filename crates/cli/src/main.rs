//! BookVision CLI - Database migrations and payment support tools.
//!
//! # Usage
//!
//! ```bash
//! # Run portal database migrations
//! bv-cli migrate
//!
//! # Payments recorded before the payer signed up
//! bv-cli pending list
//! bv-cli pending show ana@example.com
//! bv-cli pending clear ana@example.com
//!
//! # Fix a subscriber role by hand
//! bv-cli roles grant ana@example.com
//! bv-cli roles revoke ana@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bv-cli")]
#[command(author, version, about = "BookVision portal CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run portal database migrations
    Migrate,
    /// Inspect pending payments
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },
    /// Grant or revoke the subscriber role
    Roles {
        #[command(subcommand)]
        action: RolesAction,
    },
}

#[derive(Subcommand)]
enum PendingAction {
    /// List all pending payments
    List,
    /// Show the pending payment for an email
    Show {
        /// Payer email address
        email: String,
    },
    /// Delete the pending payment for an email
    Clear {
        /// Payer email address
        email: String,
    },
}

#[derive(Subcommand)]
enum RolesAction {
    /// Grant the subscriber role
    Grant {
        /// Account email address
        email: String,
    },
    /// Revoke the subscriber role
    Revoke {
        /// Account email address
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Pending { action } => match action {
            PendingAction::List => commands::pending::list().await?,
            PendingAction::Show { email } => commands::pending::show(&email).await?,
            PendingAction::Clear { email } => commands::pending::clear(&email).await?,
        },
        Commands::Roles { action } => match action {
            RolesAction::Grant { email } => commands::roles::grant(&email).await?,
            RolesAction::Revoke { email } => commands::roles::revoke(&email).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_pending_show() {
        let cli = Cli::try_parse_from(["bv-cli", "pending", "show", "ana@example.com"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Pending {
                action: PendingAction::Show { .. }
            })
        ));
    }
}
