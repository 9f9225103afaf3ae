//! Order Server - 餐厅点餐后端
//!
//! # 架构概述
//!
//! 顾客将菜品加入购物车（加入即预留库存），下单时购物车在一个
//! 事务内转换为订单、订单项和（堂食订单的）后厨工单；工单消息
//! 发布到进程内消息总线，延迟监控后台任务轮询未完结工单并标记
//! 超时。
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── auth/          # JWT 验证、调用者身份
//! ├── db/            # redb 实体存储（显式事务）
//! ├── menu/          # 菜单与库存计数
//! ├── carts/         # 购物车与库存台账
//! ├── orders/        # 订单履约、状态机、查询
//! ├── tickets/       # 工单发布与延迟监控
//! ├── message/       # 进程内消息总线（手动确认）
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、时钟
//! ```

pub mod api;
pub mod auth;
pub mod carts;
pub mod core;
pub mod db;
pub mod menu;
pub mod message;
pub mod orders;
pub mod tickets;
pub mod utils;

// Re-export 公共类型
pub use auth::{Actor, JwtService, Role};
pub use core::{Config, Server, ServerError, ServerState};
pub use db::OrderStore;
pub use message::MessageBus;
pub use orders::{OrderFulfillment, OrderQueries, OrderStatusHandler};
pub use tickets::{DelayMonitor, TicketPublisher};
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv, 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}
