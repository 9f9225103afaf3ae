//! Domain Models
//!
//! Entity types shared between the server and clients. All timestamps are
//! Unix millis (see [`crate::util::now_millis`]); money uses
//! [`rust_decimal::Decimal`].

pub mod cart;
pub mod customer;
pub mod menu_item;
pub mod order;
pub mod ticket;

pub use cart::{Cart, CartDetail, CartItem, CartItemDetail};
pub use customer::Customer;
pub use menu_item::{Category, MenuItem};
pub use order::{ticket_effect, Order, OrderDetail, OrderItem, OrderStatus, OrderType, TicketEffect};
pub use ticket::{Ticket, TicketStatus};
