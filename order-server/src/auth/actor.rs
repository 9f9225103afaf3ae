//! Caller identity

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Manager,
    Chef,
    Customer,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "chef" => Ok(Role::Chef),
            "customer" => Ok(Role::Customer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Chef => write!(f, "chef"),
            Role::Customer => write!(f, "customer"),
        }
    }
}

/// 调用者身份
///
/// 从已验证的 JWT 提取，作为显式参数传入每个核心调用。
/// 角色检查是纯谓词，身份来源对核心代码不可见。
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(user_id: Uuid, name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            name: name.into(),
            roles,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn is_manager(&self) -> bool {
        self.roles.contains(&Role::Manager)
    }

    pub fn is_chef(&self) -> bool {
        self.roles.contains(&Role::Chef)
    }

    /// 后厨/管理人员（可查看全量订单）
    pub fn is_staff(&self) -> bool {
        self.is_chef() || self.is_manager()
    }
}
