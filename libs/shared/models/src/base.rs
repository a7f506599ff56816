use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit trail fields shared by every persisted record. Embedded by value
/// (serde flatten) rather than inherited; stamping is an explicit call
/// made by the persistence path, not a hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

impl AuditFields {
    /// Stamp a freshly created record.
    pub fn on_create(actor: Uuid) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
        }
    }

    /// Stamp an update in place.
    pub fn on_update(&mut self, actor: Uuid) {
        self.updated_at = Utc::now();
        self.updated_by = actor;
    }
}
