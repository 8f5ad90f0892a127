//! Session middleware configuration for admin.
//!
//! Stricter than the storefront: `SameSite=Strict` and a 24 hour expiry.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "lustre_admin_session";

/// Postgres schema holding the admin session table.
pub const SESSION_SCHEMA: &str = "admin";

/// Admin session table name.
pub const SESSION_TABLE: &str = "session";

const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Session store in the `admin` schema.
///
/// # Panics
///
/// Panics if the hardcoded schema or table name is rejected by the store.
#[must_use]
pub fn session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
        .with_schema_name(SESSION_SCHEMA)
        .expect("valid schema name")
        .with_table_name(SESSION_TABLE)
        .expect("valid table name")
}

/// Create the session layer with `PostgreSQL` store.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> SessionManagerLayer<PostgresStore> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(session_store(pool))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
