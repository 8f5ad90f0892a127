//! GST number lookup for the address form.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use lustre_core::gst::{GstAutofill, Gstin};

use crate::backend::BackendError;
use crate::error::Result;
use crate::state::AppState;

/// Validate a GSTIN and return the address fields it fills in.
///
/// The number is checked locally before the registry is asked. If the
/// registry has no record, the fields derivable from the number are still
/// returned.
#[instrument(skip(state))]
pub async fn lookup(
    State(state): State<AppState>,
    Path(gstin): Path<String>,
) -> Result<Json<GstAutofill>> {
    let gstin = Gstin::parse(&gstin)?;
    let autofill = GstAutofill::from_gstin(&gstin);

    let registration = match state.backend().verify_gst(&gstin).await {
        Ok(registration) => registration,
        Err(BackendError::NotFound(_)) => {
            tracing::info!(state = gstin.state(), "GSTIN not found in registry");
            return Ok(Json(autofill));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(autofill.with_registration(
        registration.legal_name.as_deref(),
        registration.address.as_deref(),
        registration.city.as_deref(),
        registration.state.as_deref(),
        registration.pincode.as_deref(),
    )))
}
