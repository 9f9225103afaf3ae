//! Menu API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::core::{Result, ServerState};
use crate::menu::{MenuItemCreate, StockUpdate};
use shared::models::MenuItem;

/// POST /api/menu - 创建菜品 (manager|admin)
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<MenuItemCreate>,
) -> Result<Json<MenuItem>> {
    let item = state.catalog().create_item(&actor, payload)?;
    Ok(Json(item))
}

/// GET /api/menu - 菜单列表
pub async fn list(
    State(state): State<ServerState>,
    _actor: Actor,
) -> Result<Json<Vec<MenuItem>>> {
    Ok(Json(state.catalog().list_items()?))
}

/// GET /api/menu/:id - 单个菜品
pub async fn get_by_id(
    State(state): State<ServerState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<MenuItem>> {
    Ok(Json(state.catalog().get_item(id)?))
}

/// PUT /api/menu/:id/stock - 调整库存计数 (manager|admin|chef)
pub async fn update_stock(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockUpdate>,
) -> Result<Json<MenuItem>> {
    Ok(Json(state.catalog().update_stock(&actor, id, payload)?))
}
