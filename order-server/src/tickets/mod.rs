//! 工单模块
//!
//! - [`publisher`] - 工单消息发布（事务提交后）
//! - [`monitor`] - 延迟监控后台任务

pub mod monitor;
pub mod publisher;

pub use monitor::DelayMonitor;
pub use publisher::TicketPublisher;
