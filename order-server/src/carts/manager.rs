//! Cart / Inventory Manager
//!
//! Adding an item to a cart reserves menu stock: the quantity is checked
//! against the current counter and decremented in the same transaction that
//! persists the cart item. Removing an item (or shrinking its quantity)
//! releases the reservation back to the counter.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Actor;
use crate::core::{Result, ServerError};
use crate::db::{OrderStore, StorageError};
use crate::utils::Clock;
use shared::models::{Cart, CartDetail, CartItem, CartItemDetail, Customer};

/// Add cart item payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CartItemRequest {
    pub menu_item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

/// Update cart item payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CartItemUpdate {
    #[validate(range(min = 1))]
    pub quantity: u32,
}

/// 购物车服务
#[derive(Clone)]
pub struct CartManager {
    store: OrderStore,
    clock: Arc<dyn Clock>,
}

impl CartManager {
    pub fn new(store: OrderStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 加入购物车
    ///
    /// 首次调用时隐式创建客户记录和购物车。库存检查与扣减、
    /// 购物车项写入在同一事务内完成。
    pub fn add_item(&self, actor: &Actor, payload: CartItemRequest) -> Result<CartItem> {
        payload
            .validate()
            .map_err(|e| ServerError::Validation(e.to_string()))?;

        let now = self.clock.now_millis();
        let txn = self.store.begin_write()?;

        let mut menu = self
            .store
            .menu_item_txn(&txn, payload.menu_item_id)?
            .ok_or_else(|| {
                ServerError::NotFound(format!("menu item {} not found", payload.menu_item_id))
            })?;

        if payload.quantity > menu.quantity_available {
            return Err(ServerError::Conflict(format!(
                "not enough available quantity of {}",
                menu.name
            )));
        }

        // 客户记录镜像自已验证的调用者
        if self.store.customer_txn(&txn, actor.user_id)?.is_none() {
            let customer = Customer {
                id: actor.user_id,
                name: actor.name.clone(),
                created_at: now,
            };
            self.store.store_customer(&txn, &customer)?;
        }

        let mut cart = match self.store.cart_by_customer_txn(&txn, actor.user_id)? {
            Some(cart) => cart,
            None => Cart {
                id: Uuid::new_v4(),
                customer_id: actor.user_id,
                created_at: now,
                updated_at: now,
            },
        };

        if self
            .store
            .cart_item_for_menu_txn(&txn, cart.id, menu.id)?
            .is_some()
        {
            return Err(ServerError::Conflict(format!(
                "{} is already in the cart",
                menu.name
            )));
        }

        menu.set_stock(menu.quantity_available - payload.quantity, now);
        self.store.store_menu_item(&txn, &menu)?;

        let item = CartItem {
            id: Uuid::new_v4(),
            cart_id: cart.id,
            menu_item_id: menu.id,
            quantity: payload.quantity,
        };
        self.store.store_cart_item(&txn, &item)?;

        cart.updated_at = now;
        self.store.store_cart(&txn, &cart)?;

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            cart = %cart.id,
            menu_item = %menu.id,
            quantity = item.quantity,
            "Cart item added"
        );
        Ok(item)
    }

    /// 更新购物车项数量
    ///
    /// 增量部分按当前库存重新校验；减量部分归还库存。
    pub fn update_item(
        &self,
        actor: &Actor,
        item_id: Uuid,
        payload: CartItemUpdate,
    ) -> Result<CartItem> {
        payload
            .validate()
            .map_err(|e| ServerError::Validation(e.to_string()))?;

        let now = self.clock.now_millis();
        let txn = self.store.begin_write()?;

        let (mut cart, mut item) = self.owned_item_txn(&txn, actor, item_id)?;

        let mut menu = self
            .store
            .menu_item_txn(&txn, item.menu_item_id)?
            .ok_or_else(|| {
                ServerError::NotFound(format!("menu item {} not found", item.menu_item_id))
            })?;

        if payload.quantity > item.quantity {
            let increase = payload.quantity - item.quantity;
            if increase > menu.quantity_available {
                return Err(ServerError::Conflict(format!(
                    "not enough available quantity of {}",
                    menu.name
                )));
            }
            menu.set_stock(menu.quantity_available - increase, now);
        } else {
            let release = item.quantity - payload.quantity;
            menu.set_stock(menu.quantity_available + release, now);
        }
        self.store.store_menu_item(&txn, &menu)?;

        item.quantity = payload.quantity;
        self.store.store_cart_item(&txn, &item)?;

        cart.updated_at = now;
        self.store.store_cart(&txn, &cart)?;

        txn.commit().map_err(StorageError::from)?;
        Ok(item)
    }

    /// 移除购物车项，归还预留库存
    pub fn remove_item(&self, actor: &Actor, item_id: Uuid) -> Result<()> {
        let now = self.clock.now_millis();
        let txn = self.store.begin_write()?;

        let (mut cart, item) = self.owned_item_txn(&txn, actor, item_id)?;

        if let Some(mut menu) = self.store.menu_item_txn(&txn, item.menu_item_id)? {
            menu.set_stock(menu.quantity_available + item.quantity, now);
            self.store.store_menu_item(&txn, &menu)?;
        }

        self.store.remove_cart_item(&txn, item.id)?;
        cart.updated_at = now;
        self.store.store_cart(&txn, &cart)?;

        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }

    /// 当前客户的购物车（含菜品明细）
    pub fn get_cart(&self, actor: &Actor) -> Result<CartDetail> {
        let cart = self
            .store
            .cart_by_customer(actor.user_id)?
            .ok_or_else(|| ServerError::NotFound("no cart for this customer".into()))?;

        let mut details = Vec::new();
        for item in self.store.cart_items(cart.id)? {
            let menu = self.store.menu_item(item.menu_item_id)?.ok_or_else(|| {
                ServerError::NotFound(format!("menu item {} not found", item.menu_item_id))
            })?;
            details.push(CartItemDetail {
                id: item.id,
                menu_item_id: menu.id,
                name: menu.name,
                unit_price: menu.price,
                quantity: item.quantity,
            });
        }

        Ok(CartDetail {
            id: cart.id,
            customer_id: cart.customer_id,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
            items: details,
        })
    }

    /// 所有购物车 (chef|manager|admin)
    pub fn list_carts(&self, actor: &Actor) -> Result<Vec<Cart>> {
        if !(actor.is_staff() || actor.is_admin()) {
            return Err(ServerError::Forbidden);
        }
        Ok(self.store.list_carts()?)
    }

    /// 删除购物车及其所有项，归还预留库存
    pub fn delete_cart(&self, actor: &Actor) -> Result<()> {
        let now = self.clock.now_millis();
        let txn = self.store.begin_write()?;

        let cart = self
            .store
            .cart_by_customer_txn(&txn, actor.user_id)?
            .ok_or_else(|| ServerError::NotFound("no cart for this customer".into()))?;

        for item in self.store.cart_items_txn(&txn, cart.id)? {
            if let Some(mut menu) = self.store.menu_item_txn(&txn, item.menu_item_id)? {
                menu.set_stock(menu.quantity_available + item.quantity, now);
                self.store.store_menu_item(&txn, &menu)?;
            }
            self.store.remove_cart_item(&txn, item.id)?;
        }
        self.store.remove_cart(&txn, &cart)?;

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(cart = %cart.id, "Cart deleted");
        Ok(())
    }

    /// 查找属于调用者的购物车项（事务内）
    fn owned_item_txn(
        &self,
        txn: &redb::WriteTransaction,
        actor: &Actor,
        item_id: Uuid,
    ) -> Result<(Cart, CartItem)> {
        let cart = self
            .store
            .cart_by_customer_txn(txn, actor.user_id)?
            .ok_or_else(|| ServerError::NotFound("no cart for this customer".into()))?;

        let item = self
            .store
            .cart_item_txn(txn, item_id)?
            .ok_or_else(|| ServerError::NotFound(format!("cart item {} not found", item_id)))?;

        if item.cart_id != cart.id {
            return Err(ServerError::Forbidden);
        }
        Ok((cart, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::menu::{MenuCatalog, MenuItemCreate};
    use crate::utils::SystemClock;
    use rust_decimal::Decimal;
    use shared::models::Category;

    struct Fixture {
        store: OrderStore,
        carts: CartManager,
        catalog: MenuCatalog,
        manager: Actor,
    }

    fn fixture() -> Fixture {
        let store = OrderStore::open_in_memory().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Fixture {
            carts: CartManager::new(store.clone(), clock.clone()),
            catalog: MenuCatalog::new(store.clone(), clock),
            manager: Actor::new(Uuid::new_v4(), "M", vec![Role::Manager]),
            store,
        }
    }

    fn customer() -> Actor {
        Actor::new(Uuid::new_v4(), "Ana", vec![Role::Customer])
    }

    impl Fixture {
        fn seed_menu(&self, name: &str, stock: u32) -> shared::models::MenuItem {
            self.catalog
                .create_item(
                    &self.manager,
                    MenuItemCreate {
                        name: name.into(),
                        description: None,
                        price: Decimal::new(900, 2),
                        category: Category::MainCourse,
                        estimated_prep_minutes: 10,
                        quantity_available: stock,
                    },
                )
                .unwrap()
        }
    }

    #[test]
    fn add_item_reserves_stock_and_creates_cart() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 5);

        let item = fx
            .carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: menu.id,
                    quantity: 2,
                },
            )
            .unwrap();

        assert_eq!(item.quantity, 2);
        let menu = fx.store.menu_item(menu.id).unwrap().unwrap();
        assert_eq!(menu.quantity_available, 3);

        let detail = fx.carts.get_cart(&ana).unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].name, "Ramen");
    }

    #[test]
    fn add_item_rejects_insufficient_stock() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 1);

        let err = fx
            .carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: menu.id,
                    quantity: 2,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));

        // 事务回滚，库存未被扣减
        assert_eq!(
            fx.store.menu_item(menu.id).unwrap().unwrap().quantity_available,
            1
        );
        assert!(fx.store.cart_by_customer(ana.user_id).unwrap().is_none());
    }

    #[test]
    fn duplicate_menu_item_in_cart_is_conflict() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 5);
        let req = CartItemRequest {
            menu_item_id: menu.id,
            quantity: 1,
        };

        fx.carts.add_item(&ana, req.clone()).unwrap();
        let err = fx.carts.add_item(&ana, req).unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[test]
    fn missing_menu_item_is_not_found() {
        let fx = fixture();
        let err = fx
            .carts
            .add_item(
                &customer(),
                CartItemRequest {
                    menu_item_id: Uuid::new_v4(),
                    quantity: 1,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn update_item_adjusts_stock_by_delta() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 5);

        let item = fx
            .carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: menu.id,
                    quantity: 2,
                },
            )
            .unwrap();

        // 2 -> 4: 再扣 2
        fx.carts
            .update_item(&ana, item.id, CartItemUpdate { quantity: 4 })
            .unwrap();
        assert_eq!(
            fx.store.menu_item(menu.id).unwrap().unwrap().quantity_available,
            1
        );

        // 4 -> 1: 归还 3
        fx.carts
            .update_item(&ana, item.id, CartItemUpdate { quantity: 1 })
            .unwrap();
        assert_eq!(
            fx.store.menu_item(menu.id).unwrap().unwrap().quantity_available,
            4
        );

        // 超出库存的增量被拒绝
        let err = fx
            .carts
            .update_item(&ana, item.id, CartItemUpdate { quantity: 6 })
            .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[test]
    fn remove_item_releases_reservation() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 5);

        let item = fx
            .carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: menu.id,
                    quantity: 3,
                },
            )
            .unwrap();

        fx.carts.remove_item(&ana, item.id).unwrap();
        assert_eq!(
            fx.store.menu_item(menu.id).unwrap().unwrap().quantity_available,
            5
        );
        assert!(fx.carts.get_cart(&ana).unwrap().items.is_empty());
    }

    #[test]
    fn foreign_cart_item_is_forbidden() {
        let fx = fixture();
        let ana = customer();
        let bob = customer();
        let menu = fx.seed_menu("Ramen", 5);

        let item = fx
            .carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: menu.id,
                    quantity: 1,
                },
            )
            .unwrap();
        // bob 也有购物车，但不拥有该项
        fx.carts
            .add_item(
                &bob,
                CartItemRequest {
                    menu_item_id: menu.id,
                    quantity: 1,
                },
            )
            .unwrap();

        let err = fx.carts.remove_item(&bob, item.id).unwrap_err();
        assert!(matches!(err, ServerError::Forbidden));
    }

    #[test]
    fn delete_cart_releases_all_items() {
        let fx = fixture();
        let ana = customer();
        let ramen = fx.seed_menu("Ramen", 5);
        let soda = fx.seed_menu("Soda", 2);

        fx.carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: ramen.id,
                    quantity: 2,
                },
            )
            .unwrap();
        fx.carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: soda.id,
                    quantity: 2,
                },
            )
            .unwrap();

        fx.carts.delete_cart(&ana).unwrap();

        assert!(fx.store.cart_by_customer(ana.user_id).unwrap().is_none());
        assert_eq!(
            fx.store.menu_item(ramen.id).unwrap().unwrap().quantity_available,
            5
        );
        assert_eq!(
            fx.store.menu_item(soda.id).unwrap().unwrap().quantity_available,
            2
        );
    }

    #[test]
    fn list_carts_requires_staff() {
        let fx = fixture();
        let err = fx.carts.list_carts(&customer()).unwrap_err();
        assert!(matches!(err, ServerError::Forbidden));

        let chef = Actor::new(Uuid::new_v4(), "Chef", vec![Role::Chef]);
        assert!(fx.carts.list_carts(&chef).unwrap().is_empty());
    }
}
