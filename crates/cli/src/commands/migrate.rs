//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront migrations
//! vh-cli migrate storefront
//!
//! # Run admin migrations
//! vh-cli migrate admin
//!
//! # Run all migrations
//! vh-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin
//!
//! Both fall back to `DATABASE_URL`, so one database can hold both schemas.
//!
//! # Migration Files
//!
//! Storefront migrations: `crates/storefront/migrations/`
//! Admin migrations: `crates/admin/migrations/`

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use thiserror::Error;

use super::database_url;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the database is unreachable
/// or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let mut migrator = sqlx::migrate!("../storefront/migrations");
    run("storefront", "STOREFRONT_DATABASE_URL", &mut migrator).await
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the database is unreachable
/// or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    let mut migrator = sqlx::migrate!("../admin/migrations");
    run("admin", "ADMIN_DATABASE_URL", &mut migrator).await
}

async fn run(
    name: &str,
    url_key: &'static str,
    migrator: &mut Migrator,
) -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let url = database_url(url_key).ok_or(MigrationError::MissingEnvVar(url_key))?;

    tracing::info!("Connecting to {name} database...");
    let pool = PgPool::connect(&url).await?;

    // The other set may already be recorded in the same _sqlx_migrations table
    migrator.set_ignore_missing(true);

    tracing::info!(count = migrator.iter().count(), "Running {name} migrations...");
    migrator.run(&pool).await?;

    tracing::info!("{name} migrations complete!");
    Ok(())
}
