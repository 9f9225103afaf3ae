//! 认证授权模块
//!
//! 提供 JWT 验证和调用者身份：
//! - [`JwtService`] - JWT 令牌服务
//! - [`Actor`] - 调用者身份（用户 ID + 角色），显式传入每个核心调用
//!
//! 身份与角色由外部认证服务签发；本模块只负责验证令牌并提取
//! [`Actor`]，核心代码通过角色谓词做能力检查。

pub mod actor;
pub mod extractor;
pub mod jwt;

pub use actor::{Actor, Role};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
