//! Order history for the signed-in shopper.

use axum::{
    Json,
    extract::{Path, State},
};
use tower_sessions::Session;
use tracing::instrument;

use lustre_core::OrderId;

use crate::backend::Order;
use crate::error::Result;
use crate::middleware::{RequireAuth, guard_auth};
use crate::state::AppState;

/// The shopper's orders, newest first.
#[instrument(skip(state, session, user, tokens), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let mut orders = guard_auth(&session, state.backend().my_orders(&tokens.access_token).await)
        .await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(orders))
}

/// One order.
#[instrument(skip(state, session, user, tokens), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let order = guard_auth(
        &session,
        state
            .backend()
            .order(&tokens.access_token, &OrderId::new(id))
            .await,
    )
    .await?;
    Ok(Json(order))
}
