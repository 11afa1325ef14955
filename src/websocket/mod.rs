use crate::models::ConversationId;
use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod handlers;

/// Live subscriptions. A client subscribes to one conversation's event stream
/// plus its own identity channel for unread badge changes. Senders whose
/// receiving task has gone away are pruned on the next broadcast, so a
/// dropped connection stops receiving pushes without explicit teardown.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    conversations: Arc<RwLock<HashMap<ConversationId, Vec<UnboundedSender<Message>>>>>,
    participants: Arc<RwLock<HashMap<Uuid, Vec<UnboundedSender<Message>>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe_conversation(
        &self,
        conversation_id: &str,
    ) -> UnboundedReceiver<Message> {
        let (tx, rx) = unbounded_channel();
        let mut guard = self.conversations.write().await;
        guard
            .entry(conversation_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    pub async fn subscribe_participant(&self, participant_id: Uuid) -> UnboundedReceiver<Message> {
        let (tx, rx) = unbounded_channel();
        let mut guard = self.participants.write().await;
        guard.entry(participant_id).or_default().push(tx);
        rx
    }

    pub async fn broadcast(&self, conversation_id: &str, msg: Message) {
        let mut guard = self.conversations.write().await;
        if let Some(list) = guard.get_mut(conversation_id) {
            list.retain(|sender| sender.send(msg.clone()).is_ok());
        }
    }

    pub async fn notify_participant(&self, participant_id: Uuid, msg: Message) {
        let mut guard = self.participants.write().await;
        if let Some(list) = guard.get_mut(&participant_id) {
            list.retain(|sender| sender.send(msg.clone()).is_ok());
        }
    }
}
