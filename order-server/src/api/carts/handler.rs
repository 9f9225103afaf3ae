//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::carts::{CartItemRequest, CartItemUpdate};
use crate::core::{Result, ServerState};
use shared::models::{Cart, CartDetail, CartItem};

/// GET /api/cart - 当前客户的购物车
pub async fn get_cart(
    State(state): State<ServerState>,
    actor: Actor,
) -> Result<Json<CartDetail>> {
    Ok(Json(state.carts().get_cart(&actor)?))
}

/// DELETE /api/cart - 删除购物车，归还预留库存
pub async fn delete_cart(State(state): State<ServerState>, actor: Actor) -> Result<StatusCode> {
    state.carts().delete_cart(&actor)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/cart/items - 加入购物车
pub async fn add_item(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<CartItemRequest>,
) -> Result<Json<CartItem>> {
    Ok(Json(state.carts().add_item(&actor, payload)?))
}

/// PUT /api/cart/items/:id - 更新数量
pub async fn update_item(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CartItemUpdate>,
) -> Result<Json<CartItem>> {
    Ok(Json(state.carts().update_item(&actor, id, payload)?))
}

/// DELETE /api/cart/items/:id - 移除购物车项
pub async fn remove_item(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.carts().remove_item(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/carts - 所有购物车 (chef|manager|admin)
pub async fn list_carts(
    State(state): State<ServerState>,
    actor: Actor,
) -> Result<Json<Vec<Cart>>> {
    Ok(Json(state.carts().list_carts(&actor)?))
}
