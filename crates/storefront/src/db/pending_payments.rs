//! Database operations for payments handed off to an external provider.
//!
//! The order request is snapshotted before the shopper is redirected, so the
//! return callback can place exactly the order that was approved. Claiming a
//! row is a conditional update on `status = 'pending'`; a repeated callback
//! finds nothing to claim.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use lustre_core::order::OrderRequest;
use lustre_core::{OrderId, PendingPaymentStatus, UserId};

use super::RepositoryError;

/// A checkout waiting on the payment provider.
#[derive(Debug, Clone)]
pub struct PendingPayment {
    pub id: Uuid,
    /// Backend provider code (`PAYPAL`).
    pub provider: String,
    /// The provider's order reference (PayPal's `token`).
    pub provider_reference: String,
    pub user_id: UserId,
    pub order_request: OrderRequest,
    pub status: PendingPaymentStatus,
    pub backend_order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PendingPaymentRow {
    id: Uuid,
    provider: String,
    provider_reference: String,
    user_id: UserId,
    order_request: Json<OrderRequest>,
    status: String,
    backend_order_id: Option<OrderId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PendingPaymentRow> for PendingPayment {
    type Error = RepositoryError;

    fn try_from(row: PendingPaymentRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid pending payment status: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            provider: row.provider,
            provider_reference: row.provider_reference,
            user_id: row.user_id,
            order_request: row.order_request.0,
            status,
            backend_order_id: row.backend_order_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, provider, provider_reference, user_id, order_request, status, \
                       backend_order_id, created_at, updated_at";

/// Parameters for recording a hand-off.
pub struct NewPendingPayment<'a> {
    pub provider: &'a str,
    pub provider_reference: &'a str,
    pub user_id: &'a UserId,
    pub order_request: &'a OrderRequest,
}

/// Record a checkout handed off to a provider.
///
/// # Errors
///
/// Returns error if the database insert fails (including a duplicate
/// provider reference).
pub async fn create_pending_payment(
    pool: &PgPool,
    params: NewPendingPayment<'_>,
) -> Result<PendingPayment, RepositoryError> {
    let row: PendingPaymentRow = sqlx::query_as(&format!(
        r"
        INSERT INTO storefront.pending_payment (
            id, provider, provider_reference, user_id, order_request
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "
    ))
    .bind(Uuid::new_v4())
    .bind(params.provider)
    .bind(params.provider_reference)
    .bind(params.user_id)
    .bind(Json(params.order_request))
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Get a pending payment by provider reference.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_pending_payment(
    pool: &PgPool,
    provider: &str,
    provider_reference: &str,
) -> Result<Option<PendingPayment>, RepositoryError> {
    let row: Option<PendingPaymentRow> = sqlx::query_as(&format!(
        r"
        SELECT {COLUMNS}
        FROM storefront.pending_payment
        WHERE provider = $1 AND provider_reference = $2
        "
    ))
    .bind(provider)
    .bind(provider_reference)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Claim a pending payment for completion.
///
/// Moves the row from `pending` to `completed` and returns it. Returns `None`
/// when there is no such row for this user, or it was already claimed or
/// cancelled.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn claim_pending_payment(
    pool: &PgPool,
    provider: &str,
    provider_reference: &str,
    user_id: &UserId,
) -> Result<Option<PendingPayment>, RepositoryError> {
    let row: Option<PendingPaymentRow> = sqlx::query_as(&format!(
        r"
        UPDATE storefront.pending_payment
        SET status = 'completed', updated_at = NOW()
        WHERE provider = $1
          AND provider_reference = $2
          AND user_id = $3
          AND status = 'pending'
        RETURNING {COLUMNS}
        "
    ))
    .bind(provider)
    .bind(provider_reference)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Return a claimed payment to `pending` after order creation failed, so
/// the shopper can retry the callback.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn release_pending_payment(pool: &PgPool, id: Uuid) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.pending_payment
        SET status = 'pending', updated_at = NOW()
        WHERE id = $1 AND status = 'completed' AND backend_order_id IS NULL
        ",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store the backend order ID on a completed payment.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn record_backend_order(
    pool: &PgPool,
    id: Uuid,
    order_id: &OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.pending_payment
        SET backend_order_id = $2, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(order_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a pending payment cancelled.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if there is no pending row to cancel.
pub async fn cancel_pending_payment(
    pool: &PgPool,
    provider: &str,
    provider_reference: &str,
    user_id: &UserId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.pending_payment
        SET status = 'cancelled', updated_at = NOW()
        WHERE provider = $1
          AND provider_reference = $2
          AND user_id = $3
          AND status = 'pending'
        ",
    )
    .bind(provider)
    .bind(provider_reference)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
