use crate::error::AppError;
use crate::models::{ConversationKind, Message, Participant};
use crate::services::conversation_service::ConversationService;
use crate::store::Store;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct ReadTracker;

impl ReadTracker {
    /// Advances the caller's per-conversation marker monotonically. Returns
    /// whether the marker actually moved (older timestamps are no-ops).
    pub async fn mark_read(
        store: &Store,
        conversation_id: &str,
        caller: &Participant,
        upto: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        ConversationService::get_checked(store, conversation_id, caller).await?;
        Ok(store.mark_read(conversation_id, caller.id, upto).await)
    }

    /// Idempotently records that the caller observed one specific message.
    /// Used by 1:1 clients to render double-check receipts.
    pub async fn record_message_read(
        store: &Store,
        message_id: Uuid,
        caller: &Participant,
    ) -> Result<Message, AppError> {
        let message = store
            .find_message(message_id)
            .await
            .ok_or(AppError::NotFound("message"))?;
        ConversationService::get_checked(store, &message.conversation_id, caller).await?;
        store
            .update_message(message_id, |m| {
                m.read_by.insert(caller.id);
            })
            .await
            .ok_or(AppError::NotFound("message"))
    }

    pub async fn unread_count(
        store: &Store,
        conversation_id: &str,
        caller: &Participant,
    ) -> Result<u64, AppError> {
        ConversationService::get_checked(store, conversation_id, caller).await?;
        Ok(store.unread_count(conversation_id, caller.id).await)
    }

    /// "Read" means "rendered": applied after a client fetches a message list.
    /// Advances the marker to now and, on 1:1 chats, records per-message
    /// receipts for every message from the other party.
    pub async fn note_rendered(
        store: &Store,
        conversation_id: &str,
        caller: &Participant,
        messages: &[Message],
    ) -> Result<bool, AppError> {
        let conversation =
            ConversationService::get_checked(store, conversation_id, caller).await?;
        if conversation.kind != ConversationKind::Group {
            for message in messages {
                if message.sender_id != caller.id && !message.read_by.contains(&caller.id) {
                    store
                        .update_message(message.id, |m| {
                            m.read_by.insert(caller.id);
                        })
                        .await;
                }
            }
        }
        Ok(store.mark_read(conversation_id, caller.id, Utc::now()).await)
    }
}
