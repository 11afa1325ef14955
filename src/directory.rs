//! Identity Resolver boundary. The portal's auth service owns credentials and
//! sessions; the messaging core only maps an opaque credential to a stable
//! participant identity and role.

use crate::error::AppError;
use crate::models::{Participant, Role};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Maps an authenticated caller's credential to a participant.
    async fn resolve(&self, credential: &str) -> Result<Participant, AppError>;

    /// Point lookup used by membership validation and fan-out.
    async fn get(&self, id: Uuid) -> Option<Participant>;
}

/// In-process resolver backed by a fixed roster. Stands in for the external
/// identity service; seeded from `PORTAL_DIRECTORY` in deployment and built
/// directly in tests.
#[derive(Default)]
pub struct StaticDirectory {
    by_credential: HashMap<String, Uuid>,
    by_id: HashMap<Uuid, Participant>,
}

#[derive(Deserialize)]
struct DirectoryEntry {
    credential: String,
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    display_name: String,
    role: Role,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, credential: impl Into<String>, participant: Participant) {
        self.by_credential.insert(credential.into(), participant.id);
        self.by_id.insert(participant.id, participant);
    }

    /// Parses `PORTAL_DIRECTORY` (a JSON array of entries). An absent variable
    /// yields an empty roster so the service still boots in a bare environment.
    pub fn from_env() -> Result<Self, AppError> {
        let mut directory = Self::new();
        let raw = match std::env::var("PORTAL_DIRECTORY") {
            Ok(raw) => raw,
            Err(_) => {
                tracing::warn!("PORTAL_DIRECTORY not set; starting with an empty roster");
                return Ok(directory);
            }
        };
        let entries: Vec<DirectoryEntry> = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("PORTAL_DIRECTORY invalid: {e}")))?;
        for entry in entries {
            directory.register(
                entry.credential,
                Participant {
                    id: entry.id,
                    display_name: entry.display_name,
                    role: entry.role,
                },
            );
        }
        Ok(directory)
    }
}

#[async_trait]
impl IdentityResolver for StaticDirectory {
    async fn resolve(&self, credential: &str) -> Result<Participant, AppError> {
        self.by_credential
            .get(credential)
            .and_then(|id| self.by_id.get(id))
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }

    async fn get(&self, id: Uuid) -> Option<Participant> {
        self.by_id.get(&id).cloned()
    }
}
