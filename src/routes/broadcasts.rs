use crate::middleware::guards::{StaffUser, User};
use crate::models::Broadcast;
use crate::services::fanout::{BroadcastReport, FanoutService};
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
pub struct CreateBroadcastRequest {
    pub name: String,
    pub recipient_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct AddRecipientsRequest {
    pub recipient_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct SendBroadcastRequest {
    pub body: String,
}

pub async fn create_broadcast(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    Json(body): Json<CreateBroadcastRequest>,
) -> Result<(StatusCode, Json<Broadcast>), crate::error::AppError> {
    let broadcast = FanoutService::create_broadcast(
        &state.store,
        state.directory.as_ref(),
        &caller,
        &body.name,
        &body.recipient_ids,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(broadcast)))
}

pub async fn get_broadcast(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<Uuid>,
) -> Result<Json<Broadcast>, crate::error::AppError> {
    let broadcast = FanoutService::get_checked(&state.store, id, &caller).await?;
    Ok(Json(broadcast))
}

pub async fn add_recipients(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<Uuid>,
    Json(body): Json<AddRecipientsRequest>,
) -> Result<Json<Broadcast>, crate::error::AppError> {
    let broadcast = FanoutService::add_recipients(
        &state.store,
        state.directory.as_ref(),
        id,
        &caller,
        &body.recipient_ids,
    )
    .await?;
    Ok(Json(broadcast))
}

/// Deleting the roster leaves every already-materialized leg conversation in
/// place; it only stops future sends.
pub async fn delete_broadcast(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, crate::error::AppError> {
    FanoutService::delete_broadcast(&state.store, id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fan out one message per recipient and report partial success. Each
/// delivered leg gets the same push treatment as a direct send.
pub async fn send_broadcast(
    State(state): State<AppState>,
    User(caller): User,
    Path(id): Path<Uuid>,
    Json(body): Json<SendBroadcastRequest>,
) -> Result<Json<BroadcastReport>, crate::error::AppError> {
    let report = FanoutService::send_broadcast(
        &state.store,
        state.directory.as_ref(),
        id,
        &caller,
        &body.body,
        state.config.reply_preview_chars,
    )
    .await?;
    for message in &report.delivered {
        events::emit_to_conversation(
            &state,
            &message.conversation_id,
            &WsOutboundEvent::Message {
                conversation_id: message.conversation_id.clone(),
                message: message.clone(),
            },
        )
        .await;
        events::push_unread_updates(&state, &message.conversation_id, caller.id).await;
    }
    Ok(Json(report))
}
