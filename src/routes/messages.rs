use crate::middleware::guards::User;
use crate::models::{AttachmentRef, Message};
use crate::routes::conversations::note_rendered;
use crate::services::{message_service::MessageService, read_tracker::ReadTracker};
use crate::state::AppState;
use crate::websocket::events::{self, WsOutboundEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub body: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub reply_to: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateMessageRequest {
    pub body: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), crate::error::AppError> {
    let message = MessageService::send(
        &state.store,
        state.directory.as_ref(),
        &id,
        &caller,
        body.body,
        body.attachment,
        body.reply_to,
        state.config.reply_preview_chars,
    )
    .await?;
    events::emit_to_conversation(
        &state,
        &id,
        &WsOutboundEvent::Message {
            conversation_id: id.clone(),
            message: message.clone(),
        },
    )
    .await;
    events::push_unread_updates(&state, &id, caller.id).await;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Returning the history counts as rendering it, so the caller's unread
/// counter drops to zero as a side effect.
pub async fn get_message_history(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, crate::error::AppError> {
    let messages = MessageService::list(&state.store, &id, &caller).await?;
    note_rendered(&state, &id, &caller, &messages).await?;
    Ok(Json(messages))
}

pub async fn update_message(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMessageRequest>,
) -> Result<Json<Message>, crate::error::AppError> {
    let message = MessageService::edit(
        &state.store,
        id,
        &caller,
        body.body,
        state.config.max_edit_minutes,
    )
    .await?;
    events::emit_to_conversation(
        &state,
        &message.conversation_id,
        &WsOutboundEvent::MessageEdited {
            conversation_id: message.conversation_id.clone(),
            message: message.clone(),
        },
    )
    .await;
    Ok(Json(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, crate::error::AppError> {
    let removed = MessageService::delete(&state.store, id, &caller).await?;
    events::emit_to_conversation(
        &state,
        &removed.conversation_id,
        &WsOutboundEvent::MessageDeleted {
            conversation_id: removed.conversation_id.clone(),
            message_id: removed.id,
        },
    )
    .await;
    // Deleting an unread message shrinks other members' counters.
    events::push_unread_updates(&state, &removed.conversation_id, caller.id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Per-message receipt, used by clients that confirm individual bubbles.
pub async fn record_message_read(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, crate::error::AppError> {
    let message = ReadTracker::record_message_read(&state.store, id, &caller).await?;
    events::emit_to_conversation(
        &state,
        &message.conversation_id,
        &WsOutboundEvent::MessageRead {
            conversation_id: message.conversation_id.clone(),
            message_id: message.id,
            participant_id: caller.id,
        },
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
