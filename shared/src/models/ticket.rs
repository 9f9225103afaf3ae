//! Ticket Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 工单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Waiting,
    Served,
    Delayed,
}

/// Kitchen ticket entity (后厨工单)
///
/// 1:1 with a kitchen-bound order. `is_flagged` marks a ticket that has
/// exceeded its estimated preparation time; it is set either by the delay
/// monitor or by the inline check on the ticket read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub created_on: i64,
    pub status: TicketStatus,
    pub is_flagged: bool,
}

impl Ticket {
    /// 新建 Waiting 工单
    pub fn waiting(order_id: Uuid, now: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            created_on: now,
            status: TicketStatus::Waiting,
            is_flagged: false,
        }
    }

    /// 标记为延迟
    pub fn mark_delayed(&mut self) {
        self.status = TicketStatus::Delayed;
        self.is_flagged = true;
    }
}
