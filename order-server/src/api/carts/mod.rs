//! Cart API

pub mod handler;

use axum::routing::{get, post, put};
use axum::Router;

use crate::core::ServerState;

pub fn routes() -> Router<ServerState> {
    Router::new()
        .route("/api/cart", get(handler::get_cart).delete(handler::delete_cart))
        .route("/api/cart/items", post(handler::add_item))
        .route(
            "/api/cart/items/{id}",
            put(handler::update_item).delete(handler::remove_item),
        )
        .route("/api/carts", get(handler::list_carts))
}
