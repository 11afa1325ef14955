use crate::middleware::guards::{StaffUser, User};
use crate::models::{Conversation, ConversationId};
use crate::services::{conversation_service::ConversationService, read_tracker::ReadTracker};
use crate::state::AppState;
use crate::websocket::events::{self, WsOutboundEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct OpenDirectRequest {
    pub peer_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub member_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct AddMembersRequest {
    pub member_ids: Vec<Uuid>,
}

#[derive(Deserialize, Default)]
pub struct MarkReadRequest {
    pub up_to: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
pub struct UnreadEntry {
    pub conversation_id: ConversationId,
    pub unread: u64,
}

/// Open (or resolve) the direct conversation with a peer. Idempotent: the
/// same pair always lands in the same conversation.
pub async fn open_direct(
    State(state): State<AppState>,
    User(caller): User,
    Json(body): Json<OpenDirectRequest>,
) -> Result<Json<Conversation>, crate::error::AppError> {
    let conversation =
        ConversationService::open_direct(&state.store, state.directory.as_ref(), &caller, body.peer_id)
            .await?;
    Ok(Json(conversation))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    User(caller): User,
) -> Json<Vec<Conversation>> {
    Json(ConversationService::list_for(&state.store, &caller).await)
}

pub async fn get_conversation(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, crate::error::AppError> {
    let conversation = ConversationService::get_checked(&state.store, &id, &caller).await?;
    Ok(Json(conversation))
}

/// Staff-only group creation.
pub async fn create_group(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Conversation>), crate::error::AppError> {
    let conversation = ConversationService::create_group(
        &state.store,
        state.directory.as_ref(),
        &caller,
        &body.name,
        &body.member_ids,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn add_members(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<String>,
    Json(body): Json<AddMembersRequest>,
) -> Result<Json<Conversation>, crate::error::AppError> {
    let conversation = ConversationService::add_group_members(
        &state.store,
        state.directory.as_ref(),
        &id,
        &caller,
        &body.member_ids,
    )
    .await?;
    Ok(Json(conversation))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<String>,
) -> Result<StatusCode, crate::error::AppError> {
    ConversationService::delete_conversation(&state.store, &id, &caller).await?;
    events::emit_to_conversation(
        &state,
        &id,
        &WsOutboundEvent::ConversationDeleted {
            conversation_id: id.clone(),
        },
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Explicit marker advance for polling clients; push clients usually send the
/// same command over the socket.
pub async fn mark_read(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<String>,
    body: Option<Json<MarkReadRequest>>,
) -> Result<StatusCode, crate::error::AppError> {
    let up_to = body
        .and_then(|Json(b)| b.up_to)
        .unwrap_or_else(Utc::now);
    let advanced = ReadTracker::mark_read(&state.store, &id, &caller, up_to).await?;
    if advanced {
        events::emit_to_conversation(
            &state,
            &id,
            &WsOutboundEvent::ReadReceipt {
                conversation_id: id.clone(),
                participant_id: caller.id,
                up_to,
            },
        )
        .await;
        let unread = state.store.unread_count(&id, caller.id).await;
        events::emit_to_participant(
            &state,
            caller.id,
            &WsOutboundEvent::Unread {
                conversation_id: id.clone(),
                unread,
            },
        )
        .await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unread(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<String>,
) -> Result<Json<UnreadEntry>, crate::error::AppError> {
    let unread = ReadTracker::unread_count(&state.store, &id, &caller).await?;
    Ok(Json(UnreadEntry {
        conversation_id: id,
        unread,
    }))
}

/// One round-trip unread map for the polling dashboard client.
pub async fn unread_summary(
    State(state): State<AppState>,
    User(caller): User,
) -> Json<Vec<UnreadEntry>> {
    let entries = state
        .store
        .unread_summary(caller.id)
        .await
        .into_iter()
        .map(|(conversation_id, unread)| UnreadEntry {
            conversation_id,
            unread,
        })
        .collect();
    Json(entries)
}

// Shared with the messages module: listing a history advances the caller's
// read marker and may push a fresh badge back to them.
pub(crate) async fn note_rendered(
    state: &AppState,
    conversation_id: &str,
    caller: &crate::models::Participant,
    messages: &[crate::models::Message],
) -> Result<(), crate::error::AppError> {
    let advanced = ReadTracker::note_rendered(&state.store, conversation_id, caller, messages).await?;
    if advanced {
        let unread = state.store.unread_count(conversation_id, caller.id).await;
        events::emit_to_participant(
            state,
            caller.id,
            &WsOutboundEvent::Unread {
                conversation_id: conversation_id.to_string(),
                unread,
            },
        )
        .await;
    }
    Ok(())
}
