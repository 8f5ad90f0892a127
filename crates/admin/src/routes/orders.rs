//! Order list and status changes.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, guard_admin};
use crate::models::{OrderStatusUpdate, Validate};
use crate::state::AppState;

/// `GET /api/orders`
#[instrument(skip(state, session, admin))]
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<Value>> {
    let orders = state.backend().orders(&admin.access_token).await;
    Ok(Json(guard_admin(&session, orders).await?))
}

/// `GET /api/order-statuses`
#[instrument(skip(state, session, admin))]
pub async fn statuses(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<Value>> {
    let statuses = state.backend().order_statuses(&admin.access_token).await;
    Ok(Json(guard_admin(&session, statuses).await?))
}

/// `PUT /api/orders/{id}/status`
#[instrument(skip(state, session, admin, update))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
    Json(update): Json<OrderStatusUpdate>,
) -> Result<Json<Value>> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Order ID is required".to_string()));
    }
    update.validate()?;

    let order = state
        .backend()
        .update_order_status(&admin.access_token, id.trim(), &update)
        .await;
    let order = guard_admin(&session, order).await?;
    tracing::info!(
        order_id = %id,
        order_status = %update.order_status.as_str(),
        "Order status changed"
    );
    Ok(Json(order))
}
