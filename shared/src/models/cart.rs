//! Cart Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cart entity (购物车)
///
/// One active cart per customer. Created implicitly on the first cart-item
/// request and consumed (deleted together with its items) when the cart is
/// converted into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cart item entity
///
/// At most one per (cart, menu item). The quantity was validated against the
/// menu stock when the item was added; the stock is already reserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: u32,
}

/// Cart item joined with its menu item, for client display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemDetail {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Full cart view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartDetail {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub items: Vec<CartItemDetail>,
}
