//! Menu API

pub mod handler;

use axum::routing::{get, post, put};
use axum::Router;

use crate::core::ServerState;

pub fn routes() -> Router<ServerState> {
    Router::new()
        .route("/api/menu", post(handler::create).get(handler::list))
        .route("/api/menu/{id}", get(handler::get_by_id))
        .route("/api/menu/{id}/stock", put(handler::update_stock))
}
