//! 菜单模块
//!
//! 菜单项的最小管理面（创建/查询）与库存计数器调整。

pub mod catalog;

pub use catalog::{MenuCatalog, MenuItemCreate, StockUpdate};
