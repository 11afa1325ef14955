use crate::models::Participant;
use crate::services::read_tracker::ReadTracker;
use crate::state::AppState;
use crate::websocket::events::{self, WsInboundEvent, WsOutboundEvent};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub conversation_id: String,
    pub token: Option<String>,
}

/// Browser websocket clients cannot always set headers, so the credential is
/// accepted as a query parameter with the Authorization header as fallback.
async fn authenticate(
    state: &AppState,
    params: &WsParams,
    headers: &HeaderMap,
) -> Result<Participant, StatusCode> {
    let credential = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });
    match credential {
        None => Err(StatusCode::UNAUTHORIZED),
        Some(token) => state
            .directory
            .resolve(&token)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED),
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let participant = match authenticate(&state, &params, &headers).await {
        Ok(participant) => participant,
        Err(status) => return status.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(state, params, participant, socket))
}

async fn handle_socket(
    state: AppState,
    params: WsParams,
    participant: Participant,
    mut socket: WebSocket,
) {
    let member = match state.store.get_conversation(&params.conversation_id).await {
        Some(conversation) => conversation.is_member(participant.id),
        None => false,
    };
    if !member {
        warn!(
            participant_id = %participant.id,
            conversation_id = %params.conversation_id,
            "websocket rejected: not a member"
        );
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let mut conversation_rx = state
        .registry
        .subscribe_conversation(&params.conversation_id)
        .await;
    let mut badge_rx = state.registry.subscribe_participant(participant.id).await;

    let (mut sender, mut receiver) = socket.split();

    // Forward pushes until the client goes away; the registry prunes our
    // senders on its next broadcast after we drop the receivers.
    loop {
        tokio::select! {
            maybe = conversation_rx.recv() => {
                match maybe {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() { break; }
                    }
                    None => break,
                }
            }
            maybe = badge_rx.recv() => {
                match maybe {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() { break; }
                    }
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(event) = serde_json::from_str::<WsInboundEvent>(&text) {
                            handle_inbound(&state, &params, &participant, event).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

async fn handle_inbound(
    state: &AppState,
    params: &WsParams,
    participant: &Participant,
    event: WsInboundEvent,
) {
    match event {
        WsInboundEvent::MarkRead { up_to } => {
            let up_to = up_to.unwrap_or_else(Utc::now);
            match ReadTracker::mark_read(&state.store, &params.conversation_id, participant, up_to)
                .await
            {
                Ok(true) => {
                    events::emit_to_conversation(
                        state,
                        &params.conversation_id,
                        &WsOutboundEvent::ReadReceipt {
                            conversation_id: params.conversation_id.clone(),
                            participant_id: participant.id,
                            up_to,
                        },
                    )
                    .await;
                    let unread = state
                        .store
                        .unread_count(&params.conversation_id, participant.id)
                        .await;
                    events::emit_to_participant(
                        state,
                        participant.id,
                        &WsOutboundEvent::Unread {
                            conversation_id: params.conversation_id.clone(),
                            unread,
                        },
                    )
                    .await;
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "mark-read over websocket failed"),
            }
        }
    }
}
