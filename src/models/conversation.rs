use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Conversation ids are strings: direct chats use a deterministic key derived
/// from the participant pair, groups get a random uuid string.
pub type ConversationId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversationKind {
    Direct,
    Group,
    /// A direct conversation first materialized by a broadcast fan-out leg.
    /// Shares the direct id space, so re-opening the pair resolves here.
    BroadcastLeaf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub kind: ConversationKind,
    pub title: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub members: BTreeSet<Uuid>,
}

impl Conversation {
    pub fn is_member(&self, participant_id: Uuid) -> bool {
        self.members.contains(&participant_id)
    }

    /// Direct chats (including fan-out legs) are permanent.
    pub fn is_deletable(&self) -> bool {
        self.kind == ConversationKind::Group
    }
}

/// Deterministic direct-conversation key: the sorted display-name pair joined
/// with an underscore, so re-opening a chat between the same two parties
/// always resolves to the same conversation.
pub fn direct_conversation_id(a: &str, b: &str) -> ConversationId {
    let mut names = [a, b];
    names.sort();
    names.join("_")
}
