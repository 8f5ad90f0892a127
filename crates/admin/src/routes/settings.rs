//! Site settings.

use axum::{Json, extract::State};
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{RequireAdminAuth, guard_admin};
use crate::models::{SettingsInput, Validate};
use crate::state::AppState;

/// `GET /api/settings`
#[instrument(skip(state, session, admin))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<Value>> {
    let settings = state.backend().settings(&admin.access_token).await;
    Ok(Json(guard_admin(&session, settings).await?))
}

/// `PUT /api/settings`
#[instrument(skip(state, session, admin, input))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(input): Json<SettingsInput>,
) -> Result<Json<Value>> {
    input.validate()?;
    let settings = state
        .backend()
        .update_settings(&admin.access_token, &input)
        .await;
    let settings = guard_admin(&session, settings).await?;
    tracing::info!(admin_id = %admin.id.as_str(), "Settings updated");
    Ok(Json(settings))
}
