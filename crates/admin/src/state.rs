//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::{AdminBackendClient, AdminBackendError};
use crate::config::AdminConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    backend: AdminBackendClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, AdminBackendError> {
        let backend =
            AdminBackendClient::new(config.backend_url.clone(), config.backend_timeout)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backend,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Session store pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn backend(&self) -> &AdminBackendClient {
        &self.inner.backend
    }
}
