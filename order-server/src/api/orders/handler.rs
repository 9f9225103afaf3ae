//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::core::{Result, ServerState};
use crate::orders::{OrderRequest, UpdateOrderRequest};
use shared::models::{Order, OrderDetail, Ticket};

/// POST /api/orders - 从购物车创建订单
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<OrderRequest>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(state.fulfillment().create_order(&actor, payload)?))
}

/// GET /api/orders - 全量订单 (chef|manager)
pub async fn list(
    State(state): State<ServerState>,
    actor: Actor,
) -> Result<Json<Vec<OrderDetail>>> {
    Ok(Json(state.order_queries().get_orders(&actor)?))
}

/// GET /api/orders/me - 当前客户的最新订单
pub async fn get_own(
    State(state): State<ServerState>,
    actor: Actor,
) -> Result<Json<OrderDetail>> {
    Ok(Json(state.order_queries().get_order(&actor)?))
}

/// DELETE /api/orders/me - 删除当前客户的未完结订单
pub async fn delete_own(State(state): State<ServerState>, actor: Actor) -> Result<StatusCode> {
    state.fulfillment().delete_order(&actor)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/orders/me/ticket - 当前订单的工单（读取时内联判定延迟）
pub async fn get_ticket(State(state): State<ServerState>, actor: Actor) -> Result<Json<Ticket>> {
    Ok(Json(state.order_queries().get_ticket(&actor)?))
}

/// GET /api/orders/:id - 按 ID 查询订单
pub async fn get_by_id(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(state.order_queries().get_order_by_id(&actor, id)?))
}

/// PUT /api/orders/:id/status - 变更订单状态（工单联动）
pub async fn update_status(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    Ok(Json(state.order_status().update_order(&actor, id, payload)?))
}
