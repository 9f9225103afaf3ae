//! Ticket Publisher
//!
//! Publishes newly created tickets on the message bus. Publishing happens
//! strictly after the order transaction commits, so a failure here must not
//! (and cannot) invalidate the order — it is logged and swallowed.

use std::sync::Arc;

use crate::message::MessageBus;
use shared::models::Ticket;
use shared::{TicketMessage, TICKET_TOPIC};

/// 工单消息发布者
#[derive(Clone)]
pub struct TicketPublisher {
    bus: Arc<MessageBus>,
}

impl TicketPublisher {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self { bus }
    }

    /// 发布工单消息（失败仅记录日志）
    pub fn publish(&self, ticket: &Ticket) {
        match TicketMessage::from_ticket(ticket).to_bytes() {
            Ok(payload) => {
                let message_id = self.bus.publish(TICKET_TOPIC, payload);
                tracing::debug!(
                    ticket = %ticket.id,
                    order = %ticket.order_id,
                    message_id = %message_id,
                    "Ticket published"
                );
            }
            Err(e) => {
                tracing::error!(
                    ticket = %ticket.id,
                    error = %e,
                    "Failed to serialize ticket message"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn published_ticket_reaches_subscriber() {
        let bus = Arc::new(MessageBus::new());
        let mut rx = bus.subscribe(TICKET_TOPIC);

        let ticket = Ticket::waiting(Uuid::new_v4(), 5_000);
        TicketPublisher::new(bus).publish(&ticket);

        let delivery = rx.try_recv().unwrap();
        let msg = TicketMessage::from_bytes(&delivery.payload).unwrap();
        assert_eq!(msg.ticket_id, ticket.id);
        assert_eq!(msg.created_on, 5_000);
    }
}
