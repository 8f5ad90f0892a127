//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! lustre-cli migrate storefront
//! lustre-cli migrate admin
//! lustre-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - storefront `PostgreSQL` (falls back to `DATABASE_URL`)
//! - `ADMIN_DATABASE_URL` - admin `PostgreSQL` (falls back to `DATABASE_URL`)
//!
//! # What Gets Created
//!
//! Storefront: the `tower_sessions.session` table and everything under
//! `crates/storefront/migrations/` (the `storefront.pending_payment` table).
//!
//! Admin: the `admin.session` table. The admin console keeps no other data.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors from a migration run.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn database_url(primary_key: &'static str) -> Result<SecretString, MigrationError> {
    let _ = dotenvy::dotenv();
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar(primary_key))
}

async fn connect(primary_key: &'static str) -> Result<PgPool, MigrationError> {
    let url = database_url(primary_key)?;
    Ok(PgPool::connect(url.expose_secret()).await?)
}

/// Create the storefront session table and run the storefront migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    tracing::info!("Connecting to storefront database...");
    let pool = connect("STOREFRONT_DATABASE_URL").await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}

/// Create the admin session table.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the table cannot be
/// created.
pub async fn admin() -> Result<(), MigrationError> {
    tracing::info!("Connecting to admin database...");
    let pool = connect("ADMIN_DATABASE_URL").await?;

    tracing::info!("Creating admin session table...");
    lustre_admin::middleware::session::session_store(&pool)
        .migrate()
        .await?;

    tracing::info!("Admin migrations complete");
    Ok(())
}
