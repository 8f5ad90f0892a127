//! Cart and wishlist route handlers.
//!
//! The cart lives in the session. Adding a product always re-reads it from
//! the backend so price, limits and stock are the server's, never the
//! client's. A rejected quantity leaves the cart untouched and comes back as
//! a 422 with the message as `toast`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lustre_core::cart::LineKey;
use lustre_core::{ColorId, ProductId, SizeId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::cart::{
    CartView, load_cart, load_wishlist, save_cart, save_wishlist, set_direct_item,
};
use crate::state::AppState;

/// Body of `POST /api/cart/add` and `POST /api/checkout/buy-now`.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub color_id: Option<ColorId>,
    #[serde(default)]
    pub size_id: Option<SizeId>,
}

/// Body of `POST /api/cart/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    #[serde(flatten)]
    pub line: LineKey,
    pub quantity: u32,
}

/// Body of `POST /api/cart/remove`.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    #[serde(flatten)]
    pub line: LineKey,
}

/// Cart badge count.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u32,
}

/// Cart mutation result with a confirmation toast.
#[derive(Debug, Serialize)]
pub struct CartUpdated {
    pub cart: CartView,
    pub toast: &'static str,
}

/// Body of `POST /api/wishlist`.
#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_id: ProductId,
}

/// The wishlist.
#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub product_ids: Vec<ProductId>,
}

// =============================================================================
// Cart
// =============================================================================

/// Show the cart.
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartView::from(&cart)))
}

/// Number of units in the cart.
pub async fn count(session: Session) -> Result<Json<CartCount>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartCount {
        count: cart.item_count(),
    }))
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<CartUpdated>> {
    let product = state.backend().product(&form.product_id).await?;
    if !product.status.is_active() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let quantity = form.quantity.unwrap_or(product.min_order_limit).max(1);
    let item = product.to_cart_item(quantity, form.color_id, form.size_id);

    let mut cart = load_cart(&session).await?;
    cart.add(item)?;
    save_cart(&session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", form.product_id.as_str())]),
    );

    Ok(Json(CartUpdated {
        cart: CartView::from(&cart),
        toast: "Added to cart",
    }))
}

/// Change a line's quantity.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Json(form): Json<UpdateCartForm>,
) -> Result<Json<CartUpdated>> {
    let mut cart = load_cart(&session).await?;
    cart.update_quantity(&form.line, form.quantity)?;
    save_cart(&session, &cart).await?;

    Ok(Json(CartUpdated {
        cart: CartView::from(&cart),
        toast: "Cart updated",
    }))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Json(form): Json<RemoveFromCartForm>,
) -> Result<Json<CartUpdated>> {
    let mut cart = load_cart(&session).await?;
    if cart.remove(&form.line).is_none() {
        return Err(lustre_core::cart::CartError::LineNotFound.into());
    }
    save_cart(&session, &cart).await?;

    Ok(Json(CartUpdated {
        cart: CartView::from(&cart),
        toast: "Item removed from cart",
    }))
}

/// Empty the cart.
pub async fn clear(session: Session) -> Result<Json<CartUpdated>> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;

    Ok(Json(CartUpdated {
        cart: CartView::from(&cart),
        toast: "Cart cleared",
    }))
}

/// Check out a single product without touching the cart.
#[instrument(skip(state, session))]
pub async fn buy_now(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<AddToCartForm>,
) -> Result<StatusCode> {
    let product = state.backend().product(&form.product_id).await?;
    if !product.status.is_active() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let quantity = form
        .quantity
        .unwrap_or(product.min_order_limit)
        .max(product.min_order_limit.max(1));
    let item = product.to_cart_item(quantity, form.color_id, form.size_id);
    item.validate_quantity(quantity)?;

    set_direct_item(&session, &item).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Wishlist
// =============================================================================

/// Show the wishlist.
pub async fn wishlist(session: Session) -> Result<Json<WishlistView>> {
    Ok(Json(WishlistView {
        product_ids: load_wishlist(&session).await?,
    }))
}

/// Add a product to the wishlist. Adding twice is a no-op.
#[instrument(skip(session))]
pub async fn add_to_wishlist(
    session: Session,
    Json(form): Json<WishlistForm>,
) -> Result<Json<WishlistView>> {
    let mut product_ids = load_wishlist(&session).await?;
    if !product_ids.contains(&form.product_id) {
        product_ids.push(form.product_id);
        save_wishlist(&session, &product_ids).await?;
    }
    Ok(Json(WishlistView { product_ids }))
}

/// Remove a product from the wishlist.
#[instrument(skip(session))]
pub async fn remove_from_wishlist(
    session: Session,
    Path(product_id): Path<String>,
) -> Result<Json<WishlistView>> {
    let mut product_ids = load_wishlist(&session).await?;
    product_ids.retain(|id| id.as_str() != product_id);
    save_wishlist(&session, &product_ids).await?;
    Ok(Json(WishlistView { product_ids }))
}

/// Move a wishlisted product into the cart at its minimum quantity.
///
/// The product stays on the wishlist if the cart rejects it.
#[instrument(skip(state, session))]
pub async fn move_to_cart(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<String>,
) -> Result<Json<CartUpdated>> {
    let product_id = ProductId::new(product_id);
    let mut product_ids = load_wishlist(&session).await?;
    if !product_ids.contains(&product_id) {
        return Err(AppError::NotFound("Product is not on the wishlist".to_string()));
    }

    let product = state.backend().product(&product_id).await?;
    if !product.status.is_active() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let mut cart = load_cart(&session).await?;
    cart.add(product.to_cart_item(product.min_order_limit, None, None))?;
    save_cart(&session, &cart).await?;

    product_ids.retain(|id| *id != product_id);
    save_wishlist(&session, &product_ids).await?;

    Ok(Json(CartUpdated {
        cart: CartView::from(&cart),
        toast: "Moved to cart",
    }))
}
