use crate::directory::IdentityResolver;
use crate::error::AppError;
use crate::models::{
    direct_conversation_id, Conversation, ConversationKind, Participant,
};
use crate::store::Store;
use chrono::Utc;
use std::collections::BTreeSet;
use uuid::Uuid;

pub struct ConversationService;

impl ConversationService {
    /// Opens (or resolves) the direct conversation between the caller and a
    /// peer. The id is deterministic over the pair, so repeat calls are
    /// idempotent and side-effect-free.
    pub async fn open_direct(
        store: &Store,
        directory: &dyn IdentityResolver,
        caller: &Participant,
        peer_id: Uuid,
    ) -> Result<Conversation, AppError> {
        Self::open_direct_with_kind(store, directory, caller, peer_id, ConversationKind::Direct)
            .await
    }

    /// Same resolution as `open_direct`, but a conversation first materialized
    /// through this path keeps the requested kind (fan-out legs are tagged
    /// `broadcast-leaf`). An existing conversation keeps its original kind.
    pub async fn open_direct_with_kind(
        store: &Store,
        directory: &dyn IdentityResolver,
        caller: &Participant,
        peer_id: Uuid,
        kind: ConversationKind,
    ) -> Result<Conversation, AppError> {
        if peer_id == caller.id {
            return Err(AppError::InvalidArgument(
                "cannot open a conversation with yourself".into(),
            ));
        }
        let peer = directory
            .get(peer_id)
            .await
            .ok_or(AppError::NotFound("participant"))?;
        let id = direct_conversation_id(&caller.display_name, &peer.display_name);
        let now = Utc::now();
        let conversation = Conversation {
            id,
            kind,
            title: None,
            created_by: caller.id,
            created_at: now,
            last_activity_at: now,
            members: BTreeSet::from([caller.id, peer.id]),
        };
        Ok(store.insert_conversation_if_absent(conversation).await)
    }

    /// Staff-only group creation. Unknown member ids are dropped (best-effort
    /// membership), the creator is always included exactly once.
    pub async fn create_group(
        store: &Store,
        directory: &dyn IdentityResolver,
        creator: &Participant,
        name: &str,
        member_ids: &[Uuid],
    ) -> Result<Conversation, AppError> {
        if !creator.is_staff() {
            return Err(AppError::Forbidden("only staff can create groups".into()));
        }
        if name.trim().is_empty() {
            return Err(AppError::InvalidArgument("group name cannot be empty".into()));
        }

        let mut members = BTreeSet::from([creator.id]);
        let mut validated = 0usize;
        for id in member_ids {
            if directory.get(*id).await.is_some() {
                members.insert(*id);
                validated += 1;
            } else {
                tracing::warn!(member_id = %id, "dropping unknown group member");
            }
        }
        if validated == 0 {
            return Err(AppError::InvalidArgument(
                "group needs at least one known member".into(),
            ));
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            kind: ConversationKind::Group,
            title: Some(name.trim().to_string()),
            created_by: creator.id,
            created_at: now,
            last_activity_at: now,
            members,
        };
        Ok(store.insert_conversation_if_absent(conversation).await)
    }

    /// Additive-only membership change; there is no removal path.
    pub async fn add_group_members(
        store: &Store,
        directory: &dyn IdentityResolver,
        conversation_id: &str,
        caller: &Participant,
        new_member_ids: &[Uuid],
    ) -> Result<Conversation, AppError> {
        let conversation = store
            .get_conversation(conversation_id)
            .await
            .ok_or(AppError::NotFound("conversation"))?;
        if conversation.kind != ConversationKind::Group {
            return Err(AppError::Unsupported(
                "members can only be added to groups".into(),
            ));
        }
        if conversation.created_by != caller.id && !caller.is_staff() {
            return Err(AppError::Forbidden(
                "only the group creator or staff can add members".into(),
            ));
        }

        let mut validated = Vec::new();
        for id in new_member_ids {
            if directory.get(*id).await.is_some() {
                validated.push(*id);
            } else {
                tracing::warn!(member_id = %id, "dropping unknown group member");
            }
        }
        store.add_members(conversation_id, &validated).await
    }

    /// Moderated removal of a group. Direct chats (and fan-out legs) are
    /// permanent and reject this entirely.
    pub async fn delete_conversation(
        store: &Store,
        conversation_id: &str,
        caller: &Participant,
    ) -> Result<(), AppError> {
        let conversation = store
            .get_conversation(conversation_id)
            .await
            .ok_or(AppError::NotFound("conversation"))?;
        if !conversation.is_deletable() {
            return Err(AppError::Unsupported(
                "direct conversations cannot be deleted".into(),
            ));
        }
        if conversation.created_by != caller.id && !caller.is_staff() {
            return Err(AppError::Forbidden(
                "only the creator or staff can delete a group".into(),
            ));
        }
        store.remove_conversation(conversation_id).await
    }

    pub async fn list_for(store: &Store, caller: &Participant) -> Vec<Conversation> {
        store.list_conversations_for(caller.id).await
    }

    /// Membership-checked conversation fetch shared by the read paths.
    pub async fn get_checked(
        store: &Store,
        conversation_id: &str,
        caller: &Participant,
    ) -> Result<Conversation, AppError> {
        let conversation = store
            .get_conversation(conversation_id)
            .await
            .ok_or(AppError::NotFound("conversation"))?;
        if !conversation.is_member(caller.id) {
            return Err(AppError::Forbidden(
                "not a member of this conversation".into(),
            ));
        }
        Ok(conversation)
    }
}
