//! Lustre CLI - database setup.
//!
//! # Usage
//!
//! ```bash
//! # Storefront sessions and pending payments
//! lustre-cli migrate storefront
//!
//! # Admin sessions
//! lustre-cli migrate admin
//!
//! # Both
//! lustre-cli migrate all
//! ```
//!
//! Servers never migrate on startup; run this first.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lustre-cli")]
#[command(author, version, about = "Lustre CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Storefront sessions and pending payments
    Storefront,
    /// Admin sessions
    Admin,
    /// Everything
    All,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::migrate::MigrationError> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_migrate_all() {
        let cli = Cli::try_parse_from(["lustre-cli", "migrate", "all"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Migrate {
                target: MigrateTarget::All
            })
        ));
    }
}
