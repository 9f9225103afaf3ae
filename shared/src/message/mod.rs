//! 消息总线消息类型定义
//!
//! 服务端发布、延迟监控消费的工单消息。载荷使用 JSON 序列化。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Ticket, TicketStatus};

/// Topic new kitchen tickets are published on
pub const TICKET_TOPIC: &str = "tickets.created";

/// Ticket message published after the order transaction commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub ticket_id: Uuid,
    pub order_id: Uuid,
    pub status: TicketStatus,
    pub is_flagged: bool,
    pub created_on: i64,
}

impl TicketMessage {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id,
            order_id: ticket.order_id,
            status: ticket.status,
            is_flagged: ticket.is_flagged,
            created_on: ticket.created_on,
        }
    }

    /// 序列化为二进制
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// 从二进制解析
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
