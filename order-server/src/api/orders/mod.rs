//! Order API

pub mod handler;

use axum::routing::{get, post, put};
use axum::Router;

use crate::core::ServerState;

pub fn routes() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", post(handler::create).get(handler::list))
        .route(
            "/api/orders/me",
            get(handler::get_own).delete(handler::delete_own),
        )
        .route("/api/orders/me/ticket", get(handler::get_ticket))
        .route("/api/orders/{id}", get(handler::get_by_id))
        .route("/api/orders/{id}/status", put(handler::update_status))
}
