use crate::directory::IdentityResolver;
use crate::error::AppError;
use crate::models::{AttachmentRef, Message, MessageContent, Participant, ReplySnapshot};
use crate::services::conversation_service::ConversationService;
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub struct MessageService;

/// The edit capability lapses once `max_minutes` have passed since creation.
/// Strict comparison: 14:59 is inside the window, 15:00 is not.
pub fn edit_window_open(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    max_minutes: i64,
) -> bool {
    now.signed_duration_since(created_at) < Duration::minutes(max_minutes)
}

impl MessageService {
    /// Appends a message to the conversation. The reply snapshot is frozen
    /// here: a later edit or delete of the quoted message does not change it.
    /// The sender's own read marker advances to the new message so their own
    /// sends never inflate their badge.
    #[allow(clippy::too_many_arguments)]
    pub async fn send(
        store: &Store,
        directory: &dyn IdentityResolver,
        conversation_id: &str,
        sender: &Participant,
        body: Option<String>,
        attachment: Option<AttachmentRef>,
        reply_to: Option<Uuid>,
        reply_preview_chars: usize,
    ) -> Result<Message, AppError> {
        let conversation = store
            .get_conversation(conversation_id)
            .await
            .ok_or(AppError::NotFound("conversation"))?;
        if !conversation.is_member(sender.id) {
            return Err(AppError::Forbidden(
                "sender is not a member of this conversation".into(),
            ));
        }
        let content = MessageContent::from_parts(body, attachment)?;

        // Best effort: a reply to a vanished message simply carries no quote.
        let snapshot = match reply_to {
            Some(original_id) => match store.find_message(original_id).await {
                Some(original) if original.conversation_id == conversation_id => {
                    let sender_name = directory
                        .get(original.sender_id)
                        .await
                        .map(|p| p.display_name)
                        .unwrap_or_else(|| "unknown".to_string());
                    Some(ReplySnapshot::capture(
                        sender_name,
                        &original.content,
                        reply_preview_chars,
                    ))
                }
                _ => None,
            },
            None => None,
        };

        let message = store
            .append_message(conversation_id, sender.id, content, snapshot)
            .await?;
        store
            .mark_read(conversation_id, sender.id, message.created_at)
            .await;
        Ok(message)
    }

    /// Sender-only, time-boxed edit. Attachments are immutable; only the body
    /// changes and `edited` flips to true.
    pub async fn edit(
        store: &Store,
        message_id: Uuid,
        editor: &Participant,
        new_body: String,
        max_edit_minutes: i64,
    ) -> Result<Message, AppError> {
        if new_body.trim().is_empty() {
            return Err(AppError::InvalidArgument("edited body cannot be empty".into()));
        }
        let message = store
            .find_message(message_id)
            .await
            .ok_or(AppError::NotFound("message"))?;
        if message.sender_id != editor.id {
            return Err(AppError::Forbidden("only the sender can edit a message".into()));
        }
        if !edit_window_open(message.created_at, Utc::now(), max_edit_minutes) {
            return Err(AppError::EditWindowExpired { max_edit_minutes });
        }
        store
            .update_message(message_id, |m| {
                m.content = m.content.with_body(new_body);
                m.edited = true;
            })
            .await
            .ok_or(AppError::NotFound("message"))
    }

    /// Moderation-only deletion: students cannot delete even their own sent
    /// messages. Physical removal, no tombstone.
    pub async fn delete(
        store: &Store,
        message_id: Uuid,
        caller: &Participant,
    ) -> Result<Message, AppError> {
        if !caller.is_staff() {
            return Err(AppError::Forbidden("only staff can delete messages".into()));
        }
        store.remove_message(message_id).await
    }

    /// Ordered, restartable read of the conversation ledger.
    pub async fn list(
        store: &Store,
        conversation_id: &str,
        caller: &Participant,
    ) -> Result<Vec<Message>, AppError> {
        ConversationService::get_checked(store, conversation_id, caller).await?;
        store
            .messages_snapshot(conversation_id)
            .await
            .ok_or(AppError::NotFound("conversation"))
    }
}
