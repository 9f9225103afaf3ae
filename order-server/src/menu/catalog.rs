//! Menu Catalog
//!
//! Create/read surface for menu items plus the inventory counter update.
//! Content editing beyond the stock counter is deliberately out of scope.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Actor;
use crate::core::{Result, ServerError};
use crate::db::OrderStore;
use crate::utils::Clock;
use shared::models::{Category, MenuItem};

/// Create menu item payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MenuItemCreate {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Category,
    #[validate(range(min = 1, max = 480))]
    pub estimated_prep_minutes: u32,
    pub quantity_available: u32,
}

/// Stock counter update payload
#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdate {
    pub quantity_available: u32,
}

/// 菜单目录服务
#[derive(Clone)]
pub struct MenuCatalog {
    store: OrderStore,
    clock: Arc<dyn Clock>,
}

impl MenuCatalog {
    pub fn new(store: OrderStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 创建菜品 (manager|admin)
    pub fn create_item(&self, actor: &Actor, payload: MenuItemCreate) -> Result<MenuItem> {
        if !(actor.is_manager() || actor.is_admin()) {
            return Err(ServerError::Forbidden);
        }
        payload
            .validate()
            .map_err(|e| ServerError::Validation(e.to_string()))?;
        if payload.price <= Decimal::ZERO {
            return Err(ServerError::Validation(
                "price must be greater than zero".into(),
            ));
        }

        let now = self.clock.now_millis();
        let item = MenuItem {
            id: Uuid::new_v4(),
            name: payload.name,
            description: payload.description,
            price: payload.price,
            category: payload.category,
            estimated_prep_minutes: payload.estimated_prep_minutes,
            quantity_available: payload.quantity_available,
            available: payload.quantity_available > 0,
            created_at: now,
            updated_at: now,
        };

        let txn = self.store.begin_write()?;
        self.store.store_menu_item(&txn, &item)?;
        txn.commit().map_err(crate::db::StorageError::from)?;

        tracing::info!(menu_item = %item.id, name = %item.name, "Menu item created");
        Ok(item)
    }

    pub fn list_items(&self) -> Result<Vec<MenuItem>> {
        Ok(self.store.list_menu_items()?)
    }

    pub fn get_item(&self, id: Uuid) -> Result<MenuItem> {
        self.store
            .menu_item(id)?
            .ok_or_else(|| ServerError::NotFound(format!("menu item {} not found", id)))
    }

    /// 调整库存计数 (manager|admin|chef)
    pub fn update_stock(&self, actor: &Actor, id: Uuid, payload: StockUpdate) -> Result<MenuItem> {
        if !(actor.is_manager() || actor.is_admin() || actor.is_chef()) {
            return Err(ServerError::Forbidden);
        }

        let txn = self.store.begin_write()?;
        let mut item = self
            .store
            .menu_item_txn(&txn, id)?
            .ok_or_else(|| ServerError::NotFound(format!("menu item {} not found", id)))?;

        item.set_stock(payload.quantity_available, self.clock.now_millis());
        self.store.store_menu_item(&txn, &item)?;
        txn.commit().map_err(crate::db::StorageError::from)?;

        tracing::info!(
            menu_item = %item.id,
            stock = item.quantity_available,
            "Stock updated"
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::utils::SystemClock;

    fn catalog() -> MenuCatalog {
        MenuCatalog::new(OrderStore::open_in_memory().unwrap(), Arc::new(SystemClock))
    }

    fn manager() -> Actor {
        Actor::new(Uuid::new_v4(), "M", vec![Role::Manager])
    }

    fn customer() -> Actor {
        Actor::new(Uuid::new_v4(), "C", vec![Role::Customer])
    }

    fn create_payload() -> MenuItemCreate {
        MenuItemCreate {
            name: "Ramen".into(),
            description: None,
            price: Decimal::new(1250, 2),
            category: Category::MainCourse,
            estimated_prep_minutes: 10,
            quantity_available: 4,
        }
    }

    #[test]
    fn customer_cannot_create_items() {
        let catalog = catalog();
        let err = catalog.create_item(&customer(), create_payload()).unwrap_err();
        assert!(matches!(err, ServerError::Forbidden));
    }

    #[test]
    fn create_and_fetch_item() {
        let catalog = catalog();
        let item = catalog.create_item(&manager(), create_payload()).unwrap();

        let fetched = catalog.get_item(item.id).unwrap();
        assert_eq!(fetched.name, "Ramen");
        assert!(fetched.available);
        assert_eq!(catalog.list_items().unwrap().len(), 1);
    }

    #[test]
    fn zero_price_is_rejected() {
        let catalog = catalog();
        let mut payload = create_payload();
        payload.price = Decimal::ZERO;
        let err = catalog.create_item(&manager(), payload).unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn stock_update_syncs_availability() {
        let catalog = catalog();
        let item = catalog.create_item(&manager(), create_payload()).unwrap();

        let updated = catalog
            .update_stock(&manager(), item.id, StockUpdate { quantity_available: 0 })
            .unwrap();
        assert!(!updated.available);

        let err = catalog
            .update_stock(&customer(), item.id, StockUpdate { quantity_available: 9 })
            .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden));
    }
}
