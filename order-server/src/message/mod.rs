//! 消息总线
//!
//! 进程内发布/订阅通道，带手动确认账本，用于工单消息的
//! 至少一次投递。

pub mod bus;

pub use bus::{Delivery, MessageBus};
