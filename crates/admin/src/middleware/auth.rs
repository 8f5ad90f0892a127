//! Authentication extractor and session helpers for admin.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::backend::AdminBackendError;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentAdmin, session_keys};

/// Extractor that requires a signed-in admin.
///
/// Rejects with `401` when nobody is signed in.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))?;

        session
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }
}

/// Store the signed-in admin. The session ID is cycled first so a cookie
/// issued before sign-in cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await?;
    set_sentry_user(admin.id.as_str(), admin.email.as_deref());
    Ok(())
}

/// Sign the admin out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    clear_sentry_user();
    Ok(())
}

/// Convert a backend result, signing the admin out when the backend no
/// longer accepts their token.
///
/// # Errors
///
/// Returns the backend error as an `AppError`.
pub async fn guard_admin<T>(
    session: &Session,
    result: Result<T, AdminBackendError>,
) -> Result<T, AppError> {
    match result {
        Err(err @ AdminBackendError::Unauthorized(_)) => {
            tracing::info!(error = %err, "Backend rejected admin token, signing out");
            clear_admin(session).await?;
            Err(err.into())
        }
        other => other.map_err(AppError::from),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use lustre_core::UserId;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn admin() -> CurrentAdmin {
        CurrentAdmin {
            id: UserId::new("admin-1"),
            name: "Meera".to_string(),
            email: Some("meera@lustrejewels.in".to_string()),
            access_token: "jwt".to_string(),
        }
    }

    #[tokio::test]
    async fn test_expired_token_signs_admin_out() {
        let session = session();
        set_admin(&session, &admin()).await.unwrap();

        let result: Result<(), _> = guard_admin(
            &session,
            Err(AdminBackendError::Unauthorized("jwt expired".to_string())),
        )
        .await;

        assert!(matches!(
            result,
            Err(AppError::Backend(AdminBackendError::Unauthorized(_)))
        ));
        let stored: Option<CurrentAdmin> =
            session.get(session_keys::CURRENT_ADMIN).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_rejection_keeps_admin_signed_in() {
        let session = session();
        set_admin(&session, &admin()).await.unwrap();

        let result: Result<(), _> = guard_admin(
            &session,
            Err(AdminBackendError::Api {
                status: 400,
                message: "Duplicate name".to_string(),
            }),
        )
        .await;

        assert!(result.is_err());
        let stored: Option<CurrentAdmin> =
            session.get(session_keys::CURRENT_ADMIN).await.unwrap();
        assert_eq!(stored.unwrap().name, "Meera");
    }
}
