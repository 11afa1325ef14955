use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

/// Immutable identity sourced from the external Identity Resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
}

impl Participant {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }
}
