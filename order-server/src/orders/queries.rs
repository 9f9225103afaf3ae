//! Order Queries
//!
//! Read paths with derived totals, plus the inline delay check on the ticket
//! read path: a ticket whose elapsed time exceeds the order's estimated
//! preparation time is flagged at read time, without waiting for the delay
//! monitor. Both mechanisms share the same arithmetic.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::auth::Actor;
use crate::core::{Result, ServerError};
use crate::db::{OrderStore, StorageError, StorageResult};
use crate::utils::Clock;
use shared::models::{Order, OrderDetail, Ticket};
use shared::util::minutes_to_millis;

/// Derived totals of an order: Σ(price × qty) and Σ(qty × prep minutes).
///
/// Returns the items alongside so callers do not re-read them. Orders with
/// no items derive zero totals.
pub(crate) fn derived_totals(
    store: &OrderStore,
    order_id: Uuid,
) -> StorageResult<(Decimal, u32, Vec<shared::models::OrderItem>)> {
    let items = store.order_items(order_id)?;
    let mut total_price = Decimal::ZERO;
    let mut prep_minutes: u32 = 0;

    for item in &items {
        total_price += item.price * Decimal::from(item.quantity);
        if let Some(menu) = store.menu_item(item.menu_item_id)? {
            prep_minutes += item.quantity * menu.estimated_prep_minutes;
        }
    }
    Ok((total_price, prep_minutes, items))
}

/// 订单查询服务
#[derive(Clone)]
pub struct OrderQueries {
    store: OrderStore,
    clock: Arc<dyn Clock>,
}

impl OrderQueries {
    pub fn new(store: OrderStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn detail(&self, order: Order) -> Result<OrderDetail> {
        let (total_price, estimated_prep_minutes, items) =
            derived_totals(&self.store, order.id)?;
        Ok(OrderDetail {
            order,
            items,
            total_price,
            estimated_prep_minutes,
        })
    }

    /// 全量订单列表 (chef|manager)
    pub fn get_orders(&self, actor: &Actor) -> Result<Vec<OrderDetail>> {
        if !actor.is_staff() {
            return Err(ServerError::Forbidden);
        }

        let orders = self.store.list_orders()?;
        if orders.is_empty() {
            return Err(ServerError::NotFound("there are no orders".into()));
        }

        orders.into_iter().map(|o| self.detail(o)).collect()
    }

    /// 当前客户的最新订单
    pub fn get_order(&self, actor: &Actor) -> Result<OrderDetail> {
        let order = self
            .store
            .order_for_customer(actor.user_id)?
            .ok_or_else(|| {
                ServerError::NotFound("there are no orders for this customer".into())
            })?;
        self.detail(order)
    }

    /// 按 ID 查询订单（本人或后厨/管理人员）
    pub fn get_order_by_id(&self, actor: &Actor, order_id: Uuid) -> Result<OrderDetail> {
        let order = self
            .store
            .order(order_id)?
            .ok_or_else(|| ServerError::NotFound(format!("there is no order {}", order_id)))?;

        if order.customer_id != actor.user_id && !actor.is_staff() {
            return Err(ServerError::Forbidden);
        }
        self.detail(order)
    }

    /// 当前客户订单的工单，读取时内联判定延迟
    ///
    /// elapsed = now − created_on；threshold = Σ(qty × prep)。超时则当场
    /// 标记并持久化，不等待延迟监控。
    pub fn get_ticket(&self, actor: &Actor) -> Result<Ticket> {
        let order = self
            .store
            .order_for_customer(actor.user_id)?
            .ok_or_else(|| {
                ServerError::NotFound("there are no orders for this customer".into())
            })?;

        let ticket = self
            .store
            .ticket_by_order(order.id)?
            .ok_or_else(|| ServerError::NotFound("there is no ticket for this order".into()))?;

        if ticket.is_flagged {
            return Ok(ticket);
        }

        let (_, prep_minutes, items) = derived_totals(&self.store, order.id)?;
        if items.is_empty() {
            // 无订单项的订单没有可判定的阈值
            return Ok(ticket);
        }

        let deadline = ticket.created_on + minutes_to_millis(prep_minutes);
        if self.clock.now_millis() > deadline {
            let txn = self.store.begin_write()?;
            let mut flagged = self
                .store
                .ticket_by_order_txn(&txn, order.id)?
                .unwrap_or_else(|| ticket.clone());
            flagged.mark_delayed();
            self.store.store_ticket(&txn, &flagged)?;
            txn.commit().map_err(StorageError::from)?;

            tracing::info!(
                ticket = %flagged.id,
                order = %order.id,
                prep_minutes,
                "Ticket flagged as delayed on read"
            );
            return Ok(flagged);
        }

        Ok(ticket)
    }
}
