//! Menu Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 菜品分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Beverages,
    Appetizers,
    MainCourse,
    Desserts,
}

/// Menu item entity (菜品)
///
/// `quantity_available` is the inventory ledger: it is decremented when a
/// cart item reserves stock and must never go negative. `available` is kept
/// in sync with the counter on every stock write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Category,
    /// Estimated preparation time in minutes
    pub estimated_prep_minutes: u32,
    pub quantity_available: u32,
    pub available: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MenuItem {
    /// 设置库存数量并同步可用标志
    pub fn set_stock(&mut self, quantity: u32, now: i64) {
        self.quantity_available = quantity;
        self.available = quantity > 0;
        self.updated_at = now;
    }
}
