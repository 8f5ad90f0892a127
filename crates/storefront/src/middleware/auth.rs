//! Authentication extractors and session credential helpers.
//!
//! A shopper is authenticated when the session holds both a [`CurrentUser`]
//! and backend [`SessionTokens`]. Guests get tokens too (via guest login), so
//! `RequireAuth` admits them; routes that need a registered account check
//! [`CurrentUser::is_guest`].

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::backend::{AuthPayload, BackendError};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, SessionTokens, session_keys};

/// Extractor that requires a signed-in user (registered or guest).
///
/// Rejects with `401 {"error":"auth_required"}` so the client opens its
/// login modal.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user, tokens): RequireAuth) -> impl IntoResponse {
///     // tokens.access_token is the backend bearer token
/// }
/// ```
pub struct RequireAuth(pub CurrentUser, pub SessionTokens);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AppError::AuthRequired)?;

        let user: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await?;
        let tokens: Option<SessionTokens> = session.get(session_keys::TOKENS).await?;

        match (user, tokens) {
            (Some(user), Some(tokens)) => Ok(Self(user, tokens)),
            _ => Err(AppError::AuthRequired),
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the user and tokens from a successful backend sign-in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_credentials(
    session: &Session,
    auth: &AuthPayload,
) -> Result<CurrentUser, tower_sessions::session::Error> {
    let user = CurrentUser::from(&auth.user);
    let tokens = SessionTokens {
        access_token: auth.access_token.clone(),
        refresh_token: auth.refresh_token.clone(),
    };

    session.insert(session_keys::CURRENT_USER, &user).await?;
    session.insert(session_keys::TOKENS, &tokens).await?;
    set_sentry_user(&user.id, user.email.as_deref());

    Ok(user)
}

/// Remove the user and tokens from the session (logout, expired token).
///
/// The cart and wishlist stay so a shopper who signs in again keeps them.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_credentials(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session
        .remove::<SessionTokens>(session_keys::TOKENS)
        .await?;
    clear_sentry_user();
    Ok(())
}

/// Convert a backend result, signing the shopper out when the backend
/// rejected their token.
///
/// # Errors
///
/// Returns `AppError::AuthRequired` on a backend 401 (after clearing the
/// session credentials), or the backend error otherwise.
pub async fn guard_auth<T>(
    session: &Session,
    result: Result<T, BackendError>,
) -> Result<T, AppError> {
    match result {
        Err(err) if err.is_unauthorized() => {
            tracing::info!(error = %err, "Backend rejected token, clearing credentials");
            clear_credentials(session).await?;
            Err(AppError::AuthRequired)
        }
        other => other.map_err(AppError::from),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use lustre_core::{UserId, UserRole};

    use super::*;
    use crate::backend::BackendUser;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn payload() -> AuthPayload {
        AuthPayload {
            user: BackendUser {
                id: UserId::new("u-1"),
                name: "Asha".to_string(),
                email: Some("asha@example.in".to_string()),
                mobile_no: None,
                role: UserRole::Customer,
            },
            access_token: "access".to_string(),
            refresh_token: None,
        }
    }

    #[tokio::test]
    async fn test_guard_auth_clears_credentials_on_401() {
        let session = session();
        set_credentials(&session, &payload()).await.unwrap();

        let result: Result<(), _> = guard_auth(
            &session,
            Err(BackendError::Unauthorized("jwt expired".to_string())),
        )
        .await;

        assert!(matches!(result, Err(AppError::AuthRequired)));
        let tokens: Option<SessionTokens> = session.get(session_keys::TOKENS).await.unwrap();
        assert!(tokens.is_none());
    }

    #[tokio::test]
    async fn test_guard_auth_keeps_credentials_on_other_errors() {
        let session = session();
        set_credentials(&session, &payload()).await.unwrap();

        let result: Result<(), _> = guard_auth(
            &session,
            Err(BackendError::NotFound("Order not found".to_string())),
        )
        .await;

        assert!(matches!(result, Err(AppError::Backend(BackendError::NotFound(_)))));
        let user: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await.unwrap();
        assert_eq!(user.unwrap().id.as_str(), "u-1");
    }
}
