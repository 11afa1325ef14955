use crate::models::{ConversationId, Message};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames pushed to subscribed clients. The contract is at-least-once
/// delivery of current state; a reconnecting client re-renders the
/// idempotent list plus unread counts instead of replaying events.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutboundEvent {
    Message {
        conversation_id: ConversationId,
        message: Message,
    },
    MessageEdited {
        conversation_id: ConversationId,
        message: Message,
    },
    MessageDeleted {
        conversation_id: ConversationId,
        message_id: Uuid,
    },
    MessageRead {
        conversation_id: ConversationId,
        message_id: Uuid,
        participant_id: Uuid,
    },
    ReadReceipt {
        conversation_id: ConversationId,
        participant_id: Uuid,
        up_to: DateTime<Utc>,
    },
    Unread {
        conversation_id: ConversationId,
        unread: u64,
    },
    ConversationDeleted {
        conversation_id: ConversationId,
    },
}

/// Commands a connected client may push over the socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsInboundEvent {
    MarkRead {
        #[serde(default)]
        up_to: Option<DateTime<Utc>>,
    },
}

pub async fn emit_to_conversation(state: &AppState, conversation_id: &str, event: &WsOutboundEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            state
                .registry
                .broadcast(conversation_id, axum::extract::ws::Message::Text(payload))
                .await;
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize websocket event"),
    }
}

pub async fn emit_to_participant(state: &AppState, participant_id: Uuid, event: &WsOutboundEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            state
                .registry
                .notify_participant(participant_id, axum::extract::ws::Message::Text(payload))
                .await;
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize websocket event"),
    }
}

/// Relays fresh unread badges to every member of the conversation except the
/// actor whose write caused the change.
pub async fn push_unread_updates(state: &AppState, conversation_id: &str, except: Uuid) {
    let Some(conversation) = state.store.get_conversation(conversation_id).await else {
        return;
    };
    for member in conversation.members {
        if member == except {
            continue;
        }
        let unread = state.store.unread_count(conversation_id, member).await;
        emit_to_participant(
            state,
            member,
            &WsOutboundEvent::Unread {
                conversation_id: conversation_id.to_string(),
                unread,
            },
        )
        .await;
    }
}
