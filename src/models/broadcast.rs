use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named recipient list. Not itself a message channel: sending fans out
/// into one direct conversation per recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub recipients: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}
