//! Quillhouse CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending migrations
//! qh-cli migrate
//!
//! # Promote an existing account
//! qh-cli user set-role -e editor@quillhouse.in -r admin
//!
//! # Create an admin account (password read from stdin)
//! echo "$ADMIN_PASSWORD" | qh-cli user create-admin -e ops@quillhouse.in -n "Ops"
//!
//! # Load demo catalog data into an empty database
//! qh-cli seed
//!
//! # Mark ended subscriptions as expired (cron-friendly)
//! qh-cli subscriptions expire
//! ```
//!
//! All commands read `DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "qh-cli")]
#[command(author, version, about = "Quillhouse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed an empty database with demo data
    Seed,
    /// Subscription maintenance
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionAction,
    },
}

#[derive(Subcommand)]
enum SubscriptionAction {
    /// Mark subscriptions past their end date as expired
    Expire,
}

#[derive(Subcommand)]
enum UserAction {
    /// Change the role of an existing account
    SetRole {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer`, `author`, `admin`)
        #[arg(short, long)]
        role: String,
    },
    /// Create an admin account, or promote an existing one
    CreateAdmin {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
            UserAction::CreateAdmin { email, name } => {
                commands::user::create_admin(&email, name.as_deref()).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
        Commands::Subscriptions {
            action: SubscriptionAction::Expire,
        } => commands::subscriptions::expire().await?,
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
    fn test_parse_subscriptions_expire() {
        let cli = Cli::try_parse_from(["qh-cli", "subscriptions", "expire"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Subscriptions {
                action: SubscriptionAction::Expire
            }
        ));
    }

    #[test]
    fn test_parse_set_role() {
        let cli = Cli::try_parse_from([
            "qh-cli", "user", "set-role", "-e", "editor@quillhouse.in", "-r", "author",
        ])
        .unwrap();
        let Commands::User {
            action: UserAction::SetRole { email, role },
        } = cli.command
        else {
            panic!("expected user set-role");
        };
        assert_eq!(email, "editor@quillhouse.in");
        assert_eq!(role, "author");
    }
}
