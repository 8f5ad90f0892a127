//! Authentication route handlers.
//!
//! Credentials are checked by the commerce backend. On success the returned
//! tokens are kept in the server-side session; the browser only ever sees
//! the session cookie.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lustre_core::Email;

use crate::backend::BackendError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, clear_credentials, set_credentials};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Minimum password length accepted before calling the backend.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub mobile_no: Option<String>,
}

/// Response for a successful sign-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: CurrentUser,
}

/// Response for `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: Option<CurrentUser>,
}

// =============================================================================
// Login / Register
// =============================================================================

/// Sign in with email and password.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<AuthResponse>> {
    let email = Email::parse(&form.email).map_err(|e| AppError::Validation(e.to_string()))?;
    if form.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let auth = match state.backend().login(email.as_str(), &form.password).await {
        Ok(auth) => auth,
        Err(BackendError::Unauthorized(_) | BackendError::NotFound(_)) => {
            tracing::info!("Login rejected");
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let user = set_credentials(&session, &auth).await?;
    add_breadcrumb("auth", "Signed in", None);
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(AuthResponse { user }))
}

/// Create an account and sign in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    let email = Email::parse(&form.email).map_err(|e| AppError::Validation(e.to_string()))?;
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let mobile_no = form
        .mobile_no
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let auth = state
        .backend()
        .register(name, email.as_str(), &form.password, mobile_no)
        .await?;

    let user = set_credentials(&session, &auth).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { user })))
}

/// Continue as a guest.
///
/// The backend issues a guest account so the checkout can save an address
/// and place an order without registration.
#[instrument(skip(state, session))]
pub async fn guest(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
) -> Result<Json<AuthResponse>> {
    if let Some(user) = current {
        return Ok(Json(AuthResponse { user }));
    }

    let auth = state.backend().guest_login().await?;
    let user = set_credentials(&session, &auth).await?;
    tracing::info!(user_id = %user.id, "Guest session started");

    Ok(Json(AuthResponse { user }))
}

// =============================================================================
// Session
// =============================================================================

/// Sign out.
///
/// Drops the credentials and the whole session, cart included.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_credentials(&session).await {
        tracing::error!("Failed to clear credentials: {}", e);
    }

    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }

    StatusCode::NO_CONTENT.into_response()
}

/// The signed-in user, if any.
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<MeResponse> {
    Json(MeResponse {
        authenticated: user.is_some(),
        user,
    })
}
