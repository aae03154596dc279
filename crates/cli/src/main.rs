//! Ölföng CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! olfong migrate
//!
//! # Create an admin user
//! olfong admin create -e admin@olfong.is -n "Anna Admin" -p 'long-password'
//!
//! # Create a delivery driver
//! olfong admin create -e bill@olfong.is -n "Bjarni" -p 'long-password' --role delivery
//!
//! # Seed reference data
//! olfong seed defaults
//! olfong seed shipping
//! olfong seed payment-gateways --file seed/payment_gateways.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `OLFONG_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `ENCRYPTION_KEY` - needed only when seeded gateways carry secrets

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use olfong_core::UserRole;

mod commands;

#[derive(Parser)]
#[command(name = "olfong")]
#[command(author, version, about = "Ölföng CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage staff accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Insert reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin or delivery account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Account role
        #[arg(short, long, value_enum, default_value_t = StaffRole::Admin)]
        role: StaffRole,
    },
}

/// Roles the CLI may hand out. Customers register themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StaffRole {
    Admin,
    Delivery,
}

impl From<StaffRole> for UserRole {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Admin => Self::Admin,
            StaffRole::Delivery => Self::Delivery,
        }
    }
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create or refresh the payment gateway catalog
    PaymentGateways {
        /// YAML file to load instead of the bundled catalog
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Create the default delivery and pickup options
    Shipping,
    /// Create the default VAT profiles and base categories
    Defaults,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "olfong=info,olfong_api=info,sqlx=warn".into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "olfong failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::admin::create_user(&email, &name, &password, role.into()).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::PaymentGateways { file } => {
                commands::seed::payment_gateways(file.as_deref()).await?;
            }
            SeedTarget::Shipping => commands::seed::shipping().await?,
            SeedTarget::Defaults => commands::seed::defaults().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_create_role() {
        let cli = Cli::parse_from([
            "olfong", "admin", "create", "-e", "a@olfong.is", "-n", "A", "-p", "password1",
        ]);
        let Commands::Admin {
            action: AdminAction::Create { role, .. },
        } = cli.command
        else {
            panic!("expected admin create");
        };
        assert_eq!(role, StaffRole::Admin);

        let cli = Cli::parse_from([
            "olfong", "admin", "create", "-e", "b@olfong.is", "-n", "B", "-p", "password1",
            "--role", "delivery",
        ]);
        let Commands::Admin {
            action: AdminAction::Create { role, .. },
        } = cli.command
        else {
            panic!("expected admin create");
        };
        assert_eq!(UserRole::from(role), UserRole::Delivery);

        assert!(
            Cli::try_parse_from([
                "olfong", "admin", "create", "-e", "c@olfong.is", "-n", "C", "-p", "password1",
                "--role", "customer",
            ])
            .is_err()
        );
    }
}
