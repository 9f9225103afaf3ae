//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`menu`] - 菜单与库存接口
//! - [`carts`] - 购物车接口
//! - [`orders`] - 订单与工单接口
//!
//! 所有受保护接口通过 [`crate::auth::Actor`] 提取器验证调用者，
//! 角色检查在各服务内部完成。

pub mod carts;
pub mod health;
pub mod menu;
pub mod orders;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build the application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(menu::routes())
        .merge(carts::routes())
        .merge(orders::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
