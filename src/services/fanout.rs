use crate::directory::IdentityResolver;
use crate::error::AppError;
use crate::models::{Broadcast, ConversationKind, Message, Participant};
use crate::services::conversation_service::ConversationService;
use crate::services::message_service::MessageService;
use crate::store::Store;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct FanoutFailure {
    pub recipient_id: Uuid,
    pub reason: String,
}

/// Partial-success report for one broadcast attempt. Legs are independent:
/// one failed recipient never aborts the rest.
#[derive(Debug, Serialize)]
pub struct BroadcastReport {
    pub broadcast_id: Uuid,
    pub delivered: Vec<Message>,
    pub failures: Vec<FanoutFailure>,
}

pub struct FanoutService;

impl FanoutService {
    /// Staff-only broadcast definition, mirroring group creation authority.
    /// Unknown recipient ids are dropped at creation time.
    pub async fn create_broadcast(
        store: &Store,
        directory: &dyn IdentityResolver,
        creator: &Participant,
        name: &str,
        recipient_ids: &[Uuid],
    ) -> Result<Broadcast, AppError> {
        if !creator.is_staff() {
            return Err(AppError::Forbidden("only staff can create broadcasts".into()));
        }
        if name.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "broadcast name cannot be empty".into(),
            ));
        }
        let mut recipients = Vec::new();
        for id in recipient_ids {
            if directory.get(*id).await.is_none() {
                tracing::warn!(recipient_id = %id, "dropping unknown broadcast recipient");
            } else if !recipients.contains(id) {
                recipients.push(*id);
            }
        }
        if recipients.is_empty() {
            return Err(AppError::InvalidArgument(
                "broadcast needs at least one known recipient".into(),
            ));
        }
        let broadcast = Broadcast {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            created_by: creator.id,
            recipients,
            created_at: Utc::now(),
        };
        Ok(store.insert_broadcast(broadcast).await)
    }

    /// Recipients can be appended after creation but never removed.
    pub async fn add_recipients(
        store: &Store,
        directory: &dyn IdentityResolver,
        broadcast_id: Uuid,
        caller: &Participant,
        recipient_ids: &[Uuid],
    ) -> Result<Broadcast, AppError> {
        let broadcast = store
            .get_broadcast(broadcast_id)
            .await
            .ok_or(AppError::NotFound("broadcast"))?;
        if broadcast.created_by != caller.id && !caller.is_staff() {
            return Err(AppError::Forbidden(
                "only the creator or staff can modify a broadcast".into(),
            ));
        }
        let mut validated = Vec::new();
        for id in recipient_ids {
            if directory.get(*id).await.is_some() {
                validated.push(*id);
            } else {
                tracing::warn!(recipient_id = %id, "dropping unknown broadcast recipient");
            }
        }
        store
            .update_broadcast(broadcast_id, |b| {
                for id in validated {
                    if !b.recipients.contains(&id) {
                        b.recipients.push(id);
                    }
                }
            })
            .await
    }

    pub async fn delete_broadcast(
        store: &Store,
        broadcast_id: Uuid,
        caller: &Participant,
    ) -> Result<(), AppError> {
        let broadcast = store
            .get_broadcast(broadcast_id)
            .await
            .ok_or(AppError::NotFound("broadcast"))?;
        if broadcast.created_by != caller.id && !caller.is_staff() {
            return Err(AppError::Forbidden(
                "only the creator or staff can delete a broadcast".into(),
            ));
        }
        store.remove_broadcast(broadcast_id).await
    }

    pub async fn get_checked(
        store: &Store,
        broadcast_id: Uuid,
        caller: &Participant,
    ) -> Result<Broadcast, AppError> {
        let broadcast = store
            .get_broadcast(broadcast_id)
            .await
            .ok_or(AppError::NotFound("broadcast"))?;
        if broadcast.created_by != caller.id && !caller.is_staff() {
            return Err(AppError::Forbidden(
                "only the creator or staff can view a broadcast".into(),
            ));
        }
        Ok(broadcast)
    }

    /// Expands one logical send into independent per-recipient direct writes.
    /// Best effort, not a transaction: per-leg failures are collected into the
    /// report and never abort the remaining recipients. There is no
    /// idempotency key, so resending the same body duplicates the legs.
    pub async fn send_broadcast(
        store: &Store,
        directory: &dyn IdentityResolver,
        broadcast_id: Uuid,
        sender: &Participant,
        body: &str,
        reply_preview_chars: usize,
    ) -> Result<BroadcastReport, AppError> {
        let broadcast = store
            .get_broadcast(broadcast_id)
            .await
            .ok_or(AppError::NotFound("broadcast"))?;
        if broadcast.created_by != sender.id && !sender.is_staff() {
            return Err(AppError::Forbidden(
                "only the creator or staff can send a broadcast".into(),
            ));
        }
        if body.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "broadcast body cannot be empty".into(),
            ));
        }

        let mut delivered = Vec::new();
        let mut failures = Vec::new();
        for recipient_id in &broadcast.recipients {
            match Self::deliver_leg(
                store,
                directory,
                sender,
                *recipient_id,
                body,
                reply_preview_chars,
            )
            .await
            {
                Ok(message) => delivered.push(message),
                Err(e) => {
                    tracing::warn!(
                        broadcast_id = %broadcast_id,
                        recipient_id = %recipient_id,
                        error = %e,
                        "broadcast leg failed; continuing with remaining recipients"
                    );
                    failures.push(FanoutFailure {
                        recipient_id: *recipient_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(BroadcastReport {
            broadcast_id,
            delivered,
            failures,
        })
    }

    async fn deliver_leg(
        store: &Store,
        directory: &dyn IdentityResolver,
        sender: &Participant,
        recipient_id: Uuid,
        body: &str,
        reply_preview_chars: usize,
    ) -> Result<Message, AppError> {
        if recipient_id == sender.id {
            return Err(AppError::InvalidArgument(
                "cannot broadcast to the sender".into(),
            ));
        }
        let conversation = ConversationService::open_direct_with_kind(
            store,
            directory,
            sender,
            recipient_id,
            ConversationKind::BroadcastLeaf,
        )
        .await?;
        MessageService::send(
            store,
            directory,
            &conversation.id,
            sender,
            Some(body.to_string()),
            None,
            None,
            reply_preview_chars,
        )
        .await
    }
}
