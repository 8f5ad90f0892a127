//! Catalog CRUD: products, categories, payment methods, shipping methods.
//!
//! One set of handlers serves every resource. The router picks the
//! [`Resource`] with an `Extension` layer and the form type with a type
//! parameter, so each resource validates its own input before the backend
//! sees it.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::Resource;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, guard_admin};
use crate::models::{StatusToggle, Validate};
use crate::state::AppState;

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest("Record ID is required".to_string()));
    }
    Ok(id)
}

/// `GET /api/{resource}`
#[instrument(skip(state, session, admin))]
pub async fn list(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<Value>> {
    let records = state.backend().list(&admin.access_token, resource).await;
    Ok(Json(guard_admin(&session, records).await?))
}

/// `GET /api/{resource}/{id}`
#[instrument(skip(state, session, admin))]
pub async fn show(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = require_id(&id)?;
    let record = state.backend().get(&admin.access_token, resource, id).await;
    Ok(Json(guard_admin(&session, record).await?))
}

/// `POST /api/{resource}`
#[instrument(skip(state, session, admin, input))]
pub async fn create<I>(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(input): Json<I>,
) -> Result<(StatusCode, Json<Value>)>
where
    I: Validate + Serialize + DeserializeOwned + Send + Sync,
{
    input.validate()?;
    let created = state
        .backend()
        .create(&admin.access_token, resource, &input)
        .await;
    let created = guard_admin(&session, created).await?;
    tracing::info!(resource = resource.label(), admin_id = %admin.id.as_str(), "Record created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/{resource}/{id}`
#[instrument(skip(state, session, admin, input))]
pub async fn update<I>(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
    Json(input): Json<I>,
) -> Result<Json<Value>>
where
    I: Validate + Serialize + DeserializeOwned + Send + Sync,
{
    let id = require_id(&id)?;
    input.validate()?;
    let updated = state
        .backend()
        .update(&admin.access_token, resource, id, &input)
        .await;
    let updated = guard_admin(&session, updated).await?;
    tracing::info!(resource = resource.label(), record_id = %id, "Record updated");
    Ok(Json(updated))
}

/// `PATCH /api/{resource}/{id}/status`
///
/// Sends only the status, leaving the other fields as the backend has them.
#[instrument(skip(state, session, admin))]
pub async fn set_status(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
    Json(toggle): Json<StatusToggle>,
) -> Result<Json<Value>> {
    let id = require_id(&id)?;
    let updated = state
        .backend()
        .update(&admin.access_token, resource, id, &toggle)
        .await;
    Ok(Json(guard_admin(&session, updated).await?))
}

/// `DELETE /api/{resource}/{id}`
#[instrument(skip(state, session, admin))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = require_id(&id)?;
    let deleted = state
        .backend()
        .delete(&admin.access_token, resource, id)
        .await;
    guard_admin(&session, deleted).await?;
    tracing::info!(resource = resource.label(), record_id = %id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}
