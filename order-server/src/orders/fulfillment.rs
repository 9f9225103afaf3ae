//! Order Fulfillment
//!
//! Converts a customer's cart into an order, order items and (for
//! kitchen-bound orders) a ticket, inside one write transaction. The ticket
//! message is published only after the transaction commits, so a ticket is
//! never announced for an order that failed to persist.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::core::{Result, ServerError};
use crate::db::{OrderStore, StorageError};
use crate::tickets::TicketPublisher;
use crate::utils::Clock;
use shared::models::{Order, OrderDetail, OrderItem, OrderStatus, OrderType, Ticket};

/// Create order payload
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub table_number: Option<u8>,
}

/// 订单履约服务
#[derive(Clone)]
pub struct OrderFulfillment {
    store: OrderStore,
    publisher: TicketPublisher,
    clock: Arc<dyn Clock>,
}

impl OrderFulfillment {
    pub fn new(store: OrderStore, publisher: TicketPublisher, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            publisher,
            clock,
        }
    }

    /// 创建订单
    ///
    /// 校验顺序（每条独立报错）：订单类型 → 桌号规则 → 购物车存在 →
    /// 无未完结订单。全部写入在同一事务内提交；任何一步出错即整体回滚。
    ///
    /// 库存在加入购物车时已预留，下单不再检查或扣减库存。
    pub fn create_order(&self, actor: &Actor, request: OrderRequest) -> Result<OrderDetail> {
        let order_type = request
            .order_type
            .ok_or_else(|| ServerError::Validation("the type of order cannot be empty".into()))?;

        match order_type {
            OrderType::InHouse => {
                if !matches!(request.table_number, Some(t) if t <= 10) {
                    return Err(ServerError::Validation(
                        "table number must be between 0 and 10".into(),
                    ));
                }
            }
            OrderType::Online | OrderType::Delivery => {
                if request.table_number.is_some() {
                    return Err(ServerError::Validation(
                        "this order cannot have a table number".into(),
                    ));
                }
            }
        }

        let now = self.clock.now_millis();
        let txn = self.store.begin_write()?;

        let cart = self
            .store
            .cart_by_customer_txn(&txn, actor.user_id)?
            .ok_or_else(|| ServerError::NotFound("cannot order without a cart".into()))?;

        if self
            .store
            .active_order_for_customer_txn(&txn, actor.user_id)?
            .is_some()
        {
            return Err(ServerError::Conflict(
                "this customer has already ordered".into(),
            ));
        }

        let order = Order {
            id: Uuid::new_v4(),
            customer_id: actor.user_id,
            order_type,
            table_number: request.table_number,
            status: order_type.initial_status(),
            created_at: now,
            updated_at: now,
        };
        self.store.store_order(&txn, &order)?;

        let ticket = if order.status == OrderStatus::Preparing {
            let ticket = Ticket::waiting(order.id, now);
            self.store.store_ticket(&txn, &ticket)?;
            Some(ticket)
        } else {
            None
        };

        let mut items = Vec::new();
        let mut total_price = Decimal::ZERO;
        let mut prep_minutes: u32 = 0;

        for cart_item in self.store.cart_items_txn(&txn, cart.id)? {
            // 幂等防御：同一 (order, menu) 只生成一条订单项
            if self
                .store
                .order_item_for_menu_txn(&txn, order.id, cart_item.menu_item_id)?
                .is_some()
            {
                continue;
            }

            let menu = self
                .store
                .menu_item_txn(&txn, cart_item.menu_item_id)?
                .ok_or_else(|| {
                    ServerError::NotFound(format!(
                        "menu item {} not found",
                        cart_item.menu_item_id
                    ))
                })?;

            let item = OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                menu_item_id: menu.id,
                quantity: cart_item.quantity,
                // 价格快照：后续菜单调价不影响历史订单
                price: menu.price,
            };
            self.store.store_order_item(&txn, &item)?;

            total_price += item.price * Decimal::from(item.quantity);
            prep_minutes += item.quantity * menu.estimated_prep_minutes;
            items.push(item);

            self.store.remove_cart_item(&txn, cart_item.id)?;
        }

        // 购物车在下单时被消费
        self.store.remove_cart(&txn, &cart)?;

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order = %order.id,
            customer = %actor.user_id,
            order_type = ?order.order_type,
            status = ?order.status,
            items = items.len(),
            "Order created"
        );

        // 发布发生在事务提交之后；失败仅记录日志
        if let Some(ref ticket) = ticket {
            self.publisher.publish(ticket);
        }

        Ok(OrderDetail {
            order,
            items,
            total_price,
            estimated_prep_minutes: prep_minutes,
        })
    }

    /// 删除当前客户的未完结订单（订单项、工单、订单同事务删除）
    pub fn delete_order(&self, actor: &Actor) -> Result<()> {
        let txn = self.store.begin_write()?;

        let order = self
            .store
            .active_order_for_customer_txn(&txn, actor.user_id)?
            .ok_or_else(|| ServerError::NotFound("there is no order for this customer".into()))?;

        self.store.remove_order_items(&txn, order.id)?;
        if let Some(ticket) = self.store.ticket_by_order_txn(&txn, order.id)? {
            self.store.remove_ticket(&txn, &ticket)?;
        }
        self.store.remove_order(&txn, order.id)?;

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order = %order.id, customer = %actor.user_id, "Order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::carts::{CartItemRequest, CartManager};
    use crate::menu::{MenuCatalog, MenuItemCreate};
    use crate::message::MessageBus;
    use crate::utils::SystemClock;
    use shared::models::{Category, TicketStatus};
    use shared::TICKET_TOPIC;

    struct Fixture {
        store: OrderStore,
        bus: Arc<MessageBus>,
        carts: CartManager,
        catalog: MenuCatalog,
        fulfillment: OrderFulfillment,
        manager: Actor,
    }

    fn fixture() -> Fixture {
        let store = OrderStore::open_in_memory().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let bus = Arc::new(MessageBus::new());
        Fixture {
            carts: CartManager::new(store.clone(), clock.clone()),
            catalog: MenuCatalog::new(store.clone(), clock.clone()),
            fulfillment: OrderFulfillment::new(
                store.clone(),
                TicketPublisher::new(bus.clone()),
                clock,
            ),
            manager: Actor::new(Uuid::new_v4(), "M", vec![Role::Manager]),
            bus,
            store,
        }
    }

    fn customer() -> Actor {
        Actor::new(Uuid::new_v4(), "Ana", vec![Role::Customer])
    }

    impl Fixture {
        fn seed_menu(&self, name: &str, prep: u32, stock: u32) -> shared::models::MenuItem {
            self.catalog
                .create_item(
                    &self.manager,
                    MenuItemCreate {
                        name: name.into(),
                        description: None,
                        price: Decimal::new(1000, 2),
                        category: Category::MainCourse,
                        estimated_prep_minutes: prep,
                        quantity_available: stock,
                    },
                )
                .unwrap()
        }

        fn fill_cart(&self, actor: &Actor, menu_id: Uuid, quantity: u32) {
            self.carts
                .add_item(
                    actor,
                    CartItemRequest {
                        menu_item_id: menu_id,
                        quantity,
                    },
                )
                .unwrap();
        }

        fn in_house_request(&self, table: u8) -> OrderRequest {
            OrderRequest {
                order_type: Some(OrderType::InHouse),
                table_number: Some(table),
            }
        }
    }

    #[test]
    fn missing_order_type_is_rejected() {
        let fx = fixture();
        let err = fx
            .fulfillment
            .create_order(
                &customer(),
                OrderRequest {
                    order_type: None,
                    table_number: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn in_house_table_number_bounds() {
        let fx = fixture();
        let ana = customer();

        let err = fx
            .fulfillment
            .create_order(&ana, fx.in_house_request(15))
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(ref m) if m.contains("between 0 and 10")));

        let err = fx
            .fulfillment
            .create_order(
                &ana,
                OrderRequest {
                    order_type: Some(OrderType::InHouse),
                    table_number: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn delivery_cannot_have_table_number() {
        let fx = fixture();
        let err = fx
            .fulfillment
            .create_order(
                &customer(),
                OrderRequest {
                    order_type: Some(OrderType::Delivery),
                    table_number: Some(2),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(ref m) if m.contains("table number")));
    }

    #[test]
    fn order_without_cart_is_not_found() {
        let fx = fixture();
        let err = fx
            .fulfillment
            .create_order(&customer(), fx.in_house_request(5))
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn in_house_order_creates_waiting_ticket_and_publishes() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 10, 5);
        fx.fill_cart(&ana, menu.id, 2);

        let mut rx = fx.bus.subscribe(TICKET_TOPIC);

        let detail = fx
            .fulfillment
            .create_order(&ana, fx.in_house_request(5))
            .unwrap();

        assert_eq!(detail.order.status, OrderStatus::Preparing);
        assert_eq!(detail.total_price, Decimal::new(2000, 2));
        assert_eq!(detail.estimated_prep_minutes, 20);
        assert_eq!(detail.items.len(), 1);

        let ticket = fx.store.ticket_by_order(detail.order.id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Waiting);
        assert!(!ticket.is_flagged);

        // 工单消息已发布
        let delivery = rx.try_recv().unwrap();
        let msg = shared::TicketMessage::from_bytes(&delivery.payload).unwrap();
        assert_eq!(msg.ticket_id, ticket.id);
        assert_eq!(msg.order_id, detail.order.id);

        // 购物车被消费
        assert!(fx.store.cart_by_customer(ana.user_id).unwrap().is_none());
    }

    #[test]
    fn online_order_starts_pending_without_ticket() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 10, 5);
        fx.fill_cart(&ana, menu.id, 1);

        let detail = fx
            .fulfillment
            .create_order(
                &ana,
                OrderRequest {
                    order_type: Some(OrderType::Online),
                    table_number: None,
                },
            )
            .unwrap();

        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert!(fx.store.ticket_by_order(detail.order.id).unwrap().is_none());
        assert_eq!(fx.bus.pending_count(), 0);
    }

    #[test]
    fn second_active_order_is_conflict() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 10, 5);

        fx.fill_cart(&ana, menu.id, 1);
        fx.fulfillment
            .create_order(
                &ana,
                OrderRequest {
                    order_type: Some(OrderType::Online),
                    table_number: None,
                },
            )
            .unwrap();

        fx.fill_cart(&ana, menu.id, 1);
        let err = fx
            .fulfillment
            .create_order(&ana, fx.in_house_request(3))
            .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(ref m) if m.contains("already ordered")));

        // 没有第二个订单或工单产生
        let orders: Vec<_> = fx
            .store
            .list_orders()
            .unwrap()
            .into_iter()
            .filter(|o| o.customer_id == ana.user_id)
            .collect();
        assert_eq!(orders.len(), 1);
        assert!(fx.store.orders_with_tickets().unwrap().is_empty());
    }

    #[test]
    fn one_order_item_per_distinct_menu_id() {
        let fx = fixture();
        let ana = customer();
        let ramen = fx.seed_menu("Ramen", 10, 5);
        let soda = fx.seed_menu("Soda", 1, 5);
        fx.fill_cart(&ana, ramen.id, 2);
        fx.fill_cart(&ana, soda.id, 1);

        let detail = fx
            .fulfillment
            .create_order(&ana, fx.in_house_request(1))
            .unwrap();

        assert_eq!(detail.items.len(), 2);
        let mut menu_ids: Vec<_> = detail.items.iter().map(|i| i.menu_item_id).collect();
        menu_ids.sort();
        menu_ids.dedup();
        assert_eq!(menu_ids.len(), 2);

        // 快照价格与派生合计
        assert_eq!(detail.total_price, Decimal::new(3000, 2));
        assert_eq!(detail.estimated_prep_minutes, 21);
    }

    #[test]
    fn terminal_order_frees_the_customer() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 10, 9);

        fx.fill_cart(&ana, menu.id, 1);
        let detail = fx
            .fulfillment
            .create_order(&ana, fx.in_house_request(2))
            .unwrap();

        // 完结订单
        let txn = fx.store.begin_write().unwrap();
        let mut order = fx.store.order_txn(&txn, detail.order.id).unwrap().unwrap();
        order.status = OrderStatus::Completed;
        fx.store.store_order(&txn, &order).unwrap();
        txn.commit().unwrap();

        fx.fill_cart(&ana, menu.id, 1);
        assert!(fx.fulfillment.create_order(&ana, fx.in_house_request(2)).is_ok());
    }

    #[test]
    fn delete_order_removes_items_and_ticket() {
        let fx = fixture();
        let ana = customer();
        let menu = fx.seed_menu("Ramen", 10, 5);
        fx.fill_cart(&ana, menu.id, 2);

        let detail = fx
            .fulfillment
            .create_order(&ana, fx.in_house_request(4))
            .unwrap();

        fx.fulfillment.delete_order(&ana).unwrap();

        assert!(fx.store.order(detail.order.id).unwrap().is_none());
        assert!(fx.store.order_items(detail.order.id).unwrap().is_empty());
        assert!(fx.store.ticket_by_order(detail.order.id).unwrap().is_none());

        let err = fx.fulfillment.delete_order(&ana).unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }
}
