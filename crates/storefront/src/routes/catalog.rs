//! Catalog and content pass-through routes.
//!
//! Products, categories, settings, SEO content and media are read from the
//! backend and returned as they are. Only inactive records are filtered.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use lustre_core::ProductId;

use crate::backend::{Category, Product, ProductPage, ProductQuery, Settings};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Largest page size a client may ask for.
const MAX_PAGE_SIZE: u32 = 100;

/// Product listing with optional category, search, paging and sort.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(mut query): Query<ProductQuery>,
) -> Result<Json<ProductPage>> {
    query.limit = query.limit.map(|limit| limit.clamp(1, MAX_PAGE_SIZE));
    query.search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut page = state.backend().products(&query).await?;
    page.products.retain(|p| p.status.is_active());
    Ok(Json(page))
}

/// One product. Inactive products are reported as missing.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let product = state.backend().product(&ProductId::new(id)).await?;
    if !product.status.is_active() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(Json(product))
}

/// Active categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.backend().categories().await?;
    Ok(Json(
        categories
            .iter()
            .filter(|c| c.status.is_active())
            .cloned()
            .collect(),
    ))
}

/// Public site settings.
#[instrument(skip(state))]
pub async fn settings(State(state): State<AppState>) -> Result<Json<Arc<Settings>>> {
    Ok(Json(state.backend().settings().await?))
}

/// SEO content entries.
#[instrument(skip(state))]
pub async fn seo_content(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    Ok(Json(state.backend().seo_content().await?))
}

/// Media library entries.
#[instrument(skip(state))]
pub async fn media(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    Ok(Json(state.backend().media().await?))
}
