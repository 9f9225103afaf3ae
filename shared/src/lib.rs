//! Shared types for the ordering backend
//!
//! Common types used by the server and its clients: domain models,
//! message-bus payloads and small utility helpers.

pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{TicketMessage, TICKET_TOPIC};
pub use models::{
    Cart, CartItem, Category, Customer, MenuItem, Order, OrderItem, OrderStatus, OrderType,
    Ticket, TicketEffect, TicketStatus,
};
