//! Ticket Delay Monitor
//!
//! Long-running consumer of the ticket topic. Each received message starts a
//! monitoring session keyed by ticket id:
//!
//! 1. Sleep one poll interval before the first check — a deliberate grace
//!    period; a ticket is never delayed within the first interval.
//! 2. Ack the message. Acknowledgment is decoupled from the polling outcome,
//!    so a crash mid-poll does not redeliver.
//! 3. Poll until an overdue ticket can be flagged: scan all orders that have
//!    tickets, recompute each order's threshold from its items, flag the
//!    first one past its deadline and end the session; otherwise sleep the
//!    interval and retry. No backoff, no retry cap.
//!
//! Sessions are child tokens of the monitor's shutdown token, so cancelling
//! the monitor interrupts every in-flight sleep. Wall-clock time comes from
//! the injected [`Clock`]; sleeps use `tokio::time`, which paused-time tests
//! drive deterministically.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::{OrderStore, StorageError, StorageResult};
use crate::message::{Delivery, MessageBus};
use crate::orders::queries::derived_totals;
use crate::utils::Clock;
use shared::util::minutes_to_millis;
use shared::{TicketMessage, TICKET_TOPIC};

/// 延迟监控
pub struct DelayMonitor {
    store: OrderStore,
    bus: Arc<MessageBus>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    shutdown: CancellationToken,
    /// 进行中的监控会话 (ticket_id -> 会话取消令牌)
    sessions: Arc<DashMap<Uuid, CancellationToken>>,
}

impl DelayMonitor {
    pub fn new(
        store: OrderStore,
        bus: Arc<MessageBus>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            poll_interval,
            shutdown,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// 主循环：补扫未确认消息 → 持续消费
    pub async fn run(self) {
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Delay monitor started"
        );

        let mut rx = self.bus.subscribe(TICKET_TOPIC);

        // 启动补扫：处理订阅前已发布、尚未确认的消息
        for delivery in self.bus.pending_for(TICKET_TOPIC) {
            self.start_session(delivery);
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Delay monitor received shutdown signal");
                    break;
                }
                result = rx.recv() => match result {
                    Ok(delivery) => self.start_session(delivery),
                    Err(RecvError::Lagged(skipped)) => {
                        // 落后的消息仍在 pending 账本中，补扫兜底
                        tracing::warn!(skipped, "Delay monitor lagged behind the bus");
                        for delivery in self.bus.pending_for(TICKET_TOPIC) {
                            self.start_session(delivery);
                        }
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!("Ticket topic closed, delay monitor exiting");
                        break;
                    }
                },
            }
        }

        tracing::info!("Delay monitor stopped");
    }

    /// 为一条工单消息启动监控会话
    ///
    /// 同一工单的重复消息只确认不重复监控。
    fn start_session(&self, delivery: Delivery) {
        let message = match TicketMessage::from_bytes(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    message_id = %delivery.message_id,
                    error = %e,
                    "Discarding malformed ticket message"
                );
                self.bus.ack(delivery.message_id);
                return;
            }
        };

        if self.sessions.contains_key(&message.ticket_id) {
            tracing::debug!(ticket = %message.ticket_id, "Session already running, acking duplicate");
            self.bus.ack(delivery.message_id);
            return;
        }

        let token = self.shutdown.child_token();
        self.sessions.insert(message.ticket_id, token.clone());

        let store = self.store.clone();
        let bus = self.bus.clone();
        let clock = self.clock.clone();
        let interval = self.poll_interval;
        let sessions = self.sessions.clone();

        tokio::spawn(async move {
            tracing::debug!(ticket = %message.ticket_id, "Monitoring session started");

            // 宽限期：首个间隔内不判定延迟
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = token.cancelled() => {
                    sessions.remove(&message.ticket_id);
                    return;
                }
            }

            // 确认与轮询结果解耦
            bus.ack(delivery.message_id);

            loop {
                match flag_first_overdue(&store, clock.as_ref()) {
                    Ok(Some(ticket_id)) => {
                        tracing::info!(
                            session = %message.ticket_id,
                            flagged = %ticket_id,
                            "Ticket flagged as delayed"
                        );
                        break;
                    }
                    Ok(None) => {
                        tracing::debug!(ticket = %message.ticket_id, "No ticket delayed yet");
                    }
                    Err(e) => {
                        tracing::error!(
                            ticket = %message.ticket_id,
                            error = %e,
                            "Delay check failed, retrying"
                        );
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = token.cancelled() => break,
                }
            }

            sessions.remove(&message.ticket_id);
            tracing::debug!(ticket = %message.ticket_id, "Monitoring session ended");
        });
    }

    /// 进行中的会话数（测试与健康检查用）
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// 扫描所有带工单的订单，标记第一个超时的工单
///
/// 返回被标记的工单 ID；没有超时工单时返回 `None`。已标记的工单与
/// 没有订单项的订单不参与判定。
fn flag_first_overdue(store: &OrderStore, clock: &dyn Clock) -> StorageResult<Option<Uuid>> {
    let now = clock.now_millis();

    for (order, ticket) in store.orders_with_tickets()? {
        if ticket.is_flagged {
            continue;
        }

        let (_, prep_minutes, items) = derived_totals(store, order.id)?;
        if items.is_empty() {
            continue;
        }

        let deadline = ticket.created_on + minutes_to_millis(prep_minutes);
        if now > deadline {
            let txn = store.begin_write()?;
            // 会话轮询与状态变更并发，重读后再写
            if let Some(mut current) = store.ticket_by_order_txn(&txn, order.id)? {
                current.mark_delayed();
                store.store_ticket(&txn, &current)?;
                txn.commit().map_err(StorageError::from)?;
                return Ok(Some(current.id));
            }
        }
    }

    Ok(None)
}
