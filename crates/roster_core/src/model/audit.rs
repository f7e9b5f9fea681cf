//! Creation/update timestamps carried by stored records.

use serde::{Deserialize, Serialize};

/// Epoch-millisecond audit pair.
///
/// `created_at` is written once on insert; `updated_at` on insert and on
/// every later mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub created_at: i64,
    pub updated_at: i64,
}
