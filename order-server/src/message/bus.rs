//! 消息总线核心实现
//!
//! # 消息流
//!
//! ```text
//! Publisher ──▶ publish(topic, payload) ──▶ broadcast channel ──▶ Subscribers
//!                      │                                              │
//!                      └──▶ pending ledger ◀── ack(message_id) ◀──────┘
//! ```
//!
//! 每条消息进入 pending 账本直到消费者显式 `ack`。订阅者可在启动时
//! 通过 [`MessageBus::pending_for`] 补扫未确认的消息，实现进程内的
//! 至少一次投递语义。

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default capacity of each topic channel
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A published message as seen by consumers
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: Uuid,
    pub topic: String,
    pub payload: Vec<u8>,
    pub published_at: i64,
}

/// 消息总线 - 发布/订阅 + 手动确认
#[derive(Debug)]
pub struct MessageBus {
    /// 每个 topic 一个广播通道
    topics: DashMap<String, broadcast::Sender<Delivery>>,
    /// 未确认消息账本 (message_id -> Delivery)
    pending: DashMap<Uuid, Delivery>,
    capacity: usize,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            pending: DashMap::new(),
            capacity,
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Delivery> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// 发布消息，返回消息 ID
    ///
    /// 无订阅者时消息仍进入 pending 账本，订阅者可稍后补扫。
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Uuid {
        let delivery = Delivery {
            message_id: Uuid::new_v4(),
            topic: topic.to_string(),
            payload,
            published_at: shared::util::now_millis(),
        };
        let message_id = delivery.message_id;

        self.pending.insert(message_id, delivery.clone());

        // send 仅在无接收者时失败；消息已在账本中，忽略该错误
        let _ = self.sender(topic).send(delivery);

        tracing::debug!(topic = %topic, message_id = %message_id, "Message published");
        message_id
    }

    /// 订阅指定 topic
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Delivery> {
        self.sender(topic).subscribe()
    }

    /// 确认消息，从 pending 账本移除
    ///
    /// 返回 false 表示消息不存在或已被确认。
    pub fn ack(&self, message_id: Uuid) -> bool {
        let acked = self.pending.remove(&message_id).is_some();
        if acked {
            tracing::debug!(message_id = %message_id, "Message acked");
        }
        acked
    }

    /// 指定 topic 的未确认消息（按发布时间排序）
    ///
    /// 消费者启动时调用，补扫错过的消息。
    pub fn pending_for(&self, topic: &str) -> Vec<Delivery> {
        let mut deliveries: Vec<Delivery> = self
            .pending
            .iter()
            .filter(|entry| entry.value().topic == topic)
            .map(|entry| entry.value().clone())
            .collect();
        deliveries.sort_by_key(|d| d.published_at);
        deliveries
    }

    /// 未确认消息总数
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe("tickets.created");

        let id = bus.publish("tickets.created", b"hello".to_vec());

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.message_id, id);
        assert_eq!(delivery.payload, b"hello");
        assert_eq!(delivery.topic, "tickets.created");
    }

    #[tokio::test]
    async fn ack_clears_pending() {
        let bus = MessageBus::new();
        let id = bus.publish("tickets.created", vec![1]);

        assert_eq!(bus.pending_count(), 1);
        assert!(bus.ack(id));
        assert_eq!(bus.pending_count(), 0);
        // 二次确认返回 false
        assert!(!bus.ack(id));
    }

    #[tokio::test]
    async fn pending_survives_without_subscriber() {
        let bus = MessageBus::new();
        bus.publish("tickets.created", vec![1]);
        bus.publish("tickets.created", vec![2]);
        bus.publish("other", vec![3]);

        let pending = bus.pending_for("tickets.created");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payload, vec![1]);
        assert_eq!(pending[1].payload, vec![2]);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe("a");
        bus.publish("b", vec![9]);
        bus.publish("a", vec![1]);

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.payload, vec![1]);
    }
}
