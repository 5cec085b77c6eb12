//! Velvet Haze CLI - Database migrations and order maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! vh-cli migrate storefront
//!
//! # Run admin database migrations
//! vh-cli migrate admin
//!
//! # Run all database migrations
//! vh-cli migrate all
//!
//! # Cancel unpaid orders past the payment timeout, once
//! vh-cli orders sweep --timeout-minutes 60
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `orders sweep` - Run the payment-timeout sweep (for cron when the admin sweeper is off)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vh-cli")]
#[command(author, version, about = "Velvet Haze CLI tools")]
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
    /// Order maintenance
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
    /// Run admin database migrations
    Admin,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Cancel unpaid orders past the payment timeout and restore their stock
    Sweep {
        /// Payment timeout in minutes (default: `ADMIN_ORDER_PAYMENT_TIMEOUT_MINUTES` or 30)
        #[arg(short, long)]
        timeout_minutes: Option<i64>,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::Orders { action } => match action {
            OrdersAction::Sweep { timeout_minutes } => {
                commands::orders::sweep(timeout_minutes).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_orders_sweep() {
        let cli = Cli::try_parse_from(["vh-cli", "orders", "sweep", "--timeout-minutes", "45"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Orders {
                action: OrdersAction::Sweep {
                    timeout_minutes: Some(45)
                }
            })
        ));
    }
}
