//! Order Models and the order/ticket transition table

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 订单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Online,
    InHouse,
    Delivery,
}

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Delayed,
    Completed,
    Cancelled,
    Delivered,
}

impl OrderStatus {
    /// Terminal states free the customer to place a new order.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Delivered
        )
    }
}

impl OrderType {
    /// Initial order status derived from the order type.
    ///
    /// InHouse orders go straight to the kitchen; Online/Delivery orders
    /// start pending.
    pub fn initial_status(self) -> OrderStatus {
        match self {
            OrderType::Delivery | OrderType::Online => OrderStatus::Pending,
            OrderType::InHouse => OrderStatus::Preparing,
        }
    }
}

/// Order entity (订单)
///
/// Total price and estimated preparation time are not stored; they are
/// derived sums over the order items, computed at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_type: OrderType,
    /// Required and within 0..=10 for InHouse orders, absent otherwise
    #[serde(default)]
    pub table_number: Option<u8>,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order item entity
///
/// `price` is the menu price snapshotted at order time and never updated,
/// so historical order value is decoupled from future menu price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

/// Order joined with items and derived totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
    pub estimated_prep_minutes: u32,
}

/// Side effect a status change has on the order's ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketEffect {
    NoOp,
    MarkServed,
    Delete,
    MarkDelayed,
}

/// Transition table: order status change ⇒ ticket side effect.
///
/// Transitions are permissive (any status is reachable from any status);
/// the effect applies only when the order has a ticket. Re-applying the
/// current status is a no-op.
pub fn ticket_effect(from: OrderStatus, to: OrderStatus) -> TicketEffect {
    if from == to {
        return TicketEffect::NoOp;
    }
    match to {
        OrderStatus::Completed | OrderStatus::Delivered => TicketEffect::MarkServed,
        OrderStatus::Cancelled => TicketEffect::Delete,
        OrderStatus::Delayed => TicketEffect::MarkDelayed,
        OrderStatus::Pending | OrderStatus::Preparing => TicketEffect::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_by_type() {
        assert_eq!(OrderType::Online.initial_status(), OrderStatus::Pending);
        assert_eq!(OrderType::Delivery.initial_status(), OrderStatus::Pending);
        assert_eq!(OrderType::InHouse.initial_status(), OrderStatus::Preparing);
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Preparing.is_terminal());
        assert!(!OrderStatus::Delayed.is_terminal());
    }

    #[test]
    fn transition_table_ticket_effects() {
        use OrderStatus::*;

        assert_eq!(ticket_effect(Preparing, Completed), TicketEffect::MarkServed);
        assert_eq!(ticket_effect(Preparing, Delivered), TicketEffect::MarkServed);
        assert_eq!(ticket_effect(Preparing, Cancelled), TicketEffect::Delete);
        assert_eq!(ticket_effect(Preparing, Delayed), TicketEffect::MarkDelayed);
        assert_eq!(ticket_effect(Delayed, Preparing), TicketEffect::NoOp);
        assert_eq!(ticket_effect(Pending, Preparing), TicketEffect::NoOp);
    }

    #[test]
    fn reapplying_status_is_noop() {
        use OrderStatus::*;

        assert_eq!(ticket_effect(Delayed, Delayed), TicketEffect::NoOp);
        assert_eq!(ticket_effect(Completed, Completed), TicketEffect::NoOp);
    }
}
