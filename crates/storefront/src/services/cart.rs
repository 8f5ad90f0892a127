//! Session-stored cart, wishlist and direct checkout item.

use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use lustre_core::ProductId;
use lustre_core::cart::{Cart, CartItem};

use crate::models::session_keys;

/// Load the cart, empty if the session has none.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart, SessionError> {
    Ok(session.get(session_keys::CART).await?.unwrap_or_default())
}

/// Persist the cart.
///
/// A changed cart ends any "buy now" flow, so the direct item is dropped.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), SessionError> {
    clear_direct_item(session).await?;
    session.insert(session_keys::CART, cart).await
}

/// Load the wishlisted product IDs, oldest first.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_wishlist(session: &Session) -> Result<Vec<ProductId>, SessionError> {
    Ok(session.get(session_keys::WISHLIST).await?.unwrap_or_default())
}

/// Persist the wishlist.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_wishlist(session: &Session, wishlist: &[ProductId]) -> Result<(), SessionError> {
    session.insert(session_keys::WISHLIST, wishlist).await
}

/// The "buy now" item, if one is set.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_direct_item(session: &Session) -> Result<Option<CartItem>, SessionError> {
    session.get(session_keys::DIRECT_ITEM).await
}

/// Replace the "buy now" item.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_direct_item(session: &Session, item: &CartItem) -> Result<(), SessionError> {
    session.insert(session_keys::DIRECT_ITEM, item).await
}

/// Drop the "buy now" item so the checkout orders the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_direct_item(session: &Session) -> Result<(), SessionError> {
    session.remove::<CartItem>(session_keys::DIRECT_ITEM).await?;
    Ok(())
}

/// Lines the checkout will order: the "buy now" item when set, else the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn checkout_lines(session: &Session) -> Result<Vec<CartItem>, SessionError> {
    match load_direct_item(session).await? {
        Some(item) => Ok(vec![item]),
        None => Ok(load_cart(session).await?.items().to_vec()),
    }
}

/// Empty whatever the checkout just ordered.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_ordered_lines(session: &Session) -> Result<(), SessionError> {
    if session
        .remove::<CartItem>(session_keys::DIRECT_ITEM)
        .await?
        .is_none()
    {
        save_cart(session, &Cart::new()).await?;
    }
    Ok(())
}

/// JSON view of the cart.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub discount: Decimal,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            discount: cart.items().iter().map(CartItem::line_discount).sum(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn bangle() -> CartItem {
        CartItem {
            id: ProductId::new("bangle-1"),
            name: "Gold Bangle".to_string(),
            price: Decimal::new(18_000, 0),
            mrp: Some(Decimal::new(20_000, 0)),
            quantity: 1,
            min_order_limit: 1,
            max_order_limit: None,
            stock: 4,
            color_id: None,
            size_id: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_direct_item_replaces_cart_for_checkout() {
        let session = session();
        let mut cart = Cart::new();
        let mut two = bangle();
        two.id = ProductId::new("bangle-2");
        cart.add(two).unwrap();
        save_cart(&session, &cart).await.unwrap();

        set_direct_item(&session, &bangle()).await.unwrap();
        let lines = checkout_lines(&session).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().unwrap().id.as_str(), "bangle-1");

        // Ordering the direct item leaves the cart alone
        clear_ordered_lines(&session).await.unwrap();
        assert_eq!(load_cart(&session).await.unwrap().items().len(), 1);
        assert!(load_direct_item(&session).await.unwrap().is_none());

        // Without a direct item the cart is what gets cleared
        clear_ordered_lines(&session).await.unwrap();
        assert!(load_cart(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cart_change_drops_stale_direct_item() {
        let session = session();
        let mut direct = bangle();
        direct.id = ProductId::new("buy-now-A");
        set_direct_item(&session, &direct).await.unwrap();

        let mut cart = Cart::new();
        for id in ["cart-B", "cart-C"] {
            let mut item = bangle();
            item.id = ProductId::new(id);
            cart.add(item).unwrap();
        }
        save_cart(&session, &cart).await.unwrap();

        let lines = checkout_lines(&session).await.unwrap();
        let ids: Vec<&str> = lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["cart-B", "cart-C"]);
        assert!(load_direct_item(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_direct_item_restores_cart_checkout() {
        let session = session();
        let mut cart = Cart::new();
        let mut two = bangle();
        two.id = ProductId::new("bangle-2");
        cart.add(two).unwrap();
        save_cart(&session, &cart).await.unwrap();
        set_direct_item(&session, &bangle()).await.unwrap();

        clear_direct_item(&session).await.unwrap();
        let lines = checkout_lines(&session).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().unwrap().id.as_str(), "bangle-2");
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::new();
        let mut item = bangle();
        item.quantity = 2;
        cart.add(item).unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, Decimal::new(36_000, 0));
        assert_eq!(view.discount, Decimal::new(4_000, 0));
    }
}
