//! 数据库层
//!
//! redb 嵌入式存储。所有多实体写入都在显式写事务内完成，
//! 事务未提交即被丢弃时自动回滚。

pub mod storage;

pub use storage::{OrderStore, StorageError, StorageResult};
