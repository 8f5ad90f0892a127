//! Admin sign-in.
//!
//! Credentials are checked by the commerce backend; only users whose role is
//! `admin` may open a console session.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lustre_core::{Email, UserId, UserRole};

use crate::backend::AdminBackendError;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, clear_admin, set_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// The signed-in admin, as shown to the console.
#[derive(Debug, Serialize)]
pub struct AdminView {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
}

impl From<&CurrentAdmin> for AdminView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            id: admin.id.clone(),
            name: admin.name.clone(),
            email: admin.email.clone(),
        }
    }
}

/// `POST /api/auth/login`
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<AdminView>> {
    let email = Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if form.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }

    let response = match state.backend().login(email.as_str(), &form.password).await {
        Ok(response) => response,
        Err(AdminBackendError::Unauthorized(_) | AdminBackendError::NotFound(_)) => {
            tracing::info!("Admin sign-in rejected by backend");
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    if response.user.role != UserRole::Admin {
        tracing::warn!(user_id = %response.user.id.as_str(), "Non-admin attempted console sign-in");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let admin = CurrentAdmin::new(&response.user, response.access_token);
    set_admin(&session, &admin).await?;
    tracing::info!(admin_id = %admin.id.as_str(), "Admin signed in");

    Ok(Json(AdminView::from(&admin)))
}

/// `POST /api/auth/logout`
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_admin(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`
pub async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<AdminView> {
    Json(AdminView::from(&admin))
}
