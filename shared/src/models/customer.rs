//! Customer Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer entity
///
/// Identity lives in the auth provider; this record only mirrors the id and
/// display name so carts and orders can reference a local row. Upserted from
/// the authenticated actor on first cart activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub created_at: i64,
}
