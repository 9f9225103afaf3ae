//! 订单模块
//!
//! - [`fulfillment`] - 购物车 → 订单的原子转换
//! - [`status`] - 订单状态变更与工单联动
//! - [`queries`] - 订单/工单查询（含派生合计与内联延迟判定）

pub mod fulfillment;
pub mod queries;
pub mod status;

pub use fulfillment::{OrderFulfillment, OrderRequest};
pub use queries::OrderQueries;
pub use status::{OrderStatusHandler, UpdateOrderRequest};
