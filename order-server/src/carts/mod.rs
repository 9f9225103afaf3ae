//! 购物车模块
//!
//! 购物车与库存台账：加入购物车即预留库存。

pub mod manager;

pub use manager::{CartItemRequest, CartItemUpdate, CartManager};
