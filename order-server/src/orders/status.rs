//! Order Status Transition Handler
//!
//! Applies a status change to an order and cascades the matching side effect
//! onto its ticket. The effect is computed by the pure transition table
//! [`shared::models::ticket_effect`] and both writes commit in the same
//! transaction.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::core::{Result, ServerError};
use crate::db::{OrderStore, StorageError};
use crate::utils::Clock;
use shared::models::{ticket_effect, Order, OrderStatus, TicketEffect, TicketStatus};

/// Update order payload
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// 订单状态变更服务
#[derive(Clone)]
pub struct OrderStatusHandler {
    store: OrderStore,
    clock: Arc<dyn Clock>,
}

impl OrderStatusHandler {
    pub fn new(store: OrderStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 变更订单状态
    ///
    /// 状态迁移是宽松的（任意状态可达任意状态）。工单副作用先于
    /// 订单状态覆写执行，两者同事务提交。
    pub fn update_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<Order> {
        let new_status = request
            .status
            .ok_or_else(|| ServerError::Validation("the order status cannot be empty".into()))?;

        let now = self.clock.now_millis();
        let txn = self.store.begin_write()?;

        let mut order = self
            .store
            .order_txn(&txn, order_id)?
            .ok_or_else(|| ServerError::NotFound(format!("there is no order {}", order_id)))?;

        // 本人或后厨/管理人员
        if order.customer_id != actor.user_id && !actor.is_staff() {
            return Err(ServerError::Forbidden);
        }

        if let Some(mut ticket) = self.store.ticket_by_order_txn(&txn, order.id)? {
            match ticket_effect(order.status, new_status) {
                TicketEffect::NoOp => {}
                TicketEffect::MarkServed => {
                    ticket.status = TicketStatus::Served;
                    self.store.store_ticket(&txn, &ticket)?;
                }
                TicketEffect::Delete => {
                    self.store.remove_ticket(&txn, &ticket)?;
                }
                TicketEffect::MarkDelayed => {
                    ticket.mark_delayed();
                    self.store.store_ticket(&txn, &ticket)?;
                }
            }
        }

        let old_status = order.status;
        order.status = new_status;
        order.updated_at = now;
        self.store.store_order(&txn, &order)?;

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order = %order.id,
            from = ?old_status,
            to = ?new_status,
            "Order status updated"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::carts::{CartItemRequest, CartManager};
    use crate::menu::{MenuCatalog, MenuItemCreate};
    use crate::message::MessageBus;
    use crate::orders::fulfillment::{OrderFulfillment, OrderRequest};
    use crate::tickets::TicketPublisher;
    use crate::utils::SystemClock;
    use rust_decimal::Decimal;
    use shared::models::{Category, OrderType};

    struct Fixture {
        store: OrderStore,
        handler: OrderStatusHandler,
        ana: Actor,
        order_id: Uuid,
    }

    /// 开一单 InHouse 订单（带工单）
    fn fixture() -> Fixture {
        let store = OrderStore::open_in_memory().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let bus = Arc::new(MessageBus::new());
        let catalog = MenuCatalog::new(store.clone(), clock.clone());
        let carts = CartManager::new(store.clone(), clock.clone());
        let fulfillment =
            OrderFulfillment::new(store.clone(), TicketPublisher::new(bus), clock.clone());

        let manager = Actor::new(Uuid::new_v4(), "M", vec![Role::Manager]);
        let ana = Actor::new(Uuid::new_v4(), "Ana", vec![Role::Customer]);

        let menu = catalog
            .create_item(
                &manager,
                MenuItemCreate {
                    name: "Ramen".into(),
                    description: None,
                    price: Decimal::new(900, 2),
                    category: Category::MainCourse,
                    estimated_prep_minutes: 10,
                    quantity_available: 5,
                },
            )
            .unwrap();
        carts
            .add_item(
                &ana,
                CartItemRequest {
                    menu_item_id: menu.id,
                    quantity: 1,
                },
            )
            .unwrap();
        let detail = fulfillment
            .create_order(
                &ana,
                OrderRequest {
                    order_type: Some(OrderType::InHouse),
                    table_number: Some(5),
                },
            )
            .unwrap();

        Fixture {
            handler: OrderStatusHandler::new(store.clone(), clock),
            store,
            ana,
            order_id: detail.order.id,
        }
    }

    fn set_status(fx: &Fixture, status: OrderStatus) -> Order {
        fx.handler
            .update_order(
                &fx.ana,
                fx.order_id,
                UpdateOrderRequest {
                    status: Some(status),
                },
            )
            .unwrap()
    }

    #[test]
    fn completed_marks_ticket_served() {
        let fx = fixture();
        let order = set_status(&fx, OrderStatus::Completed);

        assert_eq!(order.status, OrderStatus::Completed);
        let ticket = fx.store.ticket_by_order(fx.order_id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Served);
        assert!(!ticket.is_flagged);
    }

    #[test]
    fn delivered_marks_ticket_served() {
        let fx = fixture();
        set_status(&fx, OrderStatus::Delivered);

        let ticket = fx.store.ticket_by_order(fx.order_id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Served);
    }

    #[test]
    fn cancelled_deletes_ticket() {
        let fx = fixture();
        set_status(&fx, OrderStatus::Cancelled);

        assert!(fx.store.ticket_by_order(fx.order_id).unwrap().is_none());
        let order = fx.store.order(fx.order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn delayed_flags_ticket() {
        let fx = fixture();
        set_status(&fx, OrderStatus::Delayed);

        let ticket = fx.store.ticket_by_order(fx.order_id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Delayed);
        assert!(ticket.is_flagged);
    }

    #[test]
    fn pending_leaves_ticket_untouched() {
        let fx = fixture();
        set_status(&fx, OrderStatus::Pending);

        let ticket = fx.store.ticket_by_order(fx.order_id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Waiting);
        assert!(!ticket.is_flagged);
    }

    #[test]
    fn missing_status_is_rejected() {
        let fx = fixture();
        let err = fx
            .handler
            .update_order(&fx.ana, fx.order_id, UpdateOrderRequest { status: None })
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn stranger_cannot_update_order() {
        let fx = fixture();
        let bob = Actor::new(Uuid::new_v4(), "Bob", vec![Role::Customer]);
        let err = fx
            .handler
            .update_order(
                &bob,
                fx.order_id,
                UpdateOrderRequest {
                    status: Some(OrderStatus::Completed),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden));

        // 后厨可以
        let chef = Actor::new(Uuid::new_v4(), "Chef", vec![Role::Chef]);
        fx.handler
            .update_order(
                &chef,
                fx.order_id,
                UpdateOrderRequest {
                    status: Some(OrderStatus::Completed),
                },
            )
            .unwrap();
    }

    #[test]
    fn unknown_order_is_not_found() {
        let fx = fixture();
        let err = fx
            .handler
            .update_order(
                &fx.ana,
                Uuid::new_v4(),
                UpdateOrderRequest {
                    status: Some(OrderStatus::Completed),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }
}
