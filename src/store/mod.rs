//! Single writer of truth for conversations, the per-conversation message
//! ledger, read markers, and broadcast definitions.
//!
//! Lock ordering: a conversation's log mutex may be held while touching
//! `message_index` or `read_states`, never while acquiring `conversations` or
//! `broadcasts`. The `conversations` map is never held across a log lock.
//! Appends to one conversation serialize on that conversation's mutex;
//! appends to different conversations are independent.

use crate::error::AppError;
use crate::models::{Broadcast, Conversation, ConversationId, Message, MessageContent, ReplySnapshot};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct ReadState {
    marker: DateTime<Utc>,
    unread: u64,
}

impl ReadState {
    fn initial() -> Self {
        ReadState {
            marker: DateTime::<Utc>::MIN_UTC,
            unread: 0,
        }
    }
}

fn count_unread(messages: &[Message], marker: DateTime<Utc>, participant: Uuid) -> u64 {
    messages
        .iter()
        .filter(|m| m.created_at > marker && m.sender_id != participant)
        .count() as u64
}

type Log = Arc<Mutex<Vec<Message>>>;

#[derive(Default)]
pub struct Store {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    logs: RwLock<HashMap<ConversationId, Log>>,
    message_index: RwLock<HashMap<Uuid, ConversationId>>,
    read_states: RwLock<HashMap<(ConversationId, Uuid), ReadState>>,
    broadcasts: RwLock<HashMap<Uuid, Broadcast>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // --- conversations ---

    /// Inserts the conversation on first call, returns the existing record
    /// otherwise. Side-effect-free on repeat calls.
    pub async fn insert_conversation_if_absent(&self, conversation: Conversation) -> Conversation {
        let mut conversations = self.conversations.write().await;
        if let Some(existing) = conversations.get(&conversation.id) {
            return existing.clone();
        }
        let members: Vec<Uuid> = conversation.members.iter().copied().collect();
        let id = conversation.id.clone();
        conversations.insert(id.clone(), conversation.clone());
        drop(conversations);

        self.logs
            .write()
            .await
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())));

        let mut read_states = self.read_states.write().await;
        for member in members {
            read_states
                .entry((id.clone(), member))
                .or_insert_with(ReadState::initial);
        }
        conversation
    }

    pub async fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations.read().await.get(id).cloned()
    }

    /// Caller's conversations, most recently active first.
    pub async fn list_conversations_for(&self, participant: Uuid) -> Vec<Conversation> {
        let conversations = self.conversations.read().await;
        let mut out: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.is_member(participant))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        out
    }

    /// Additive membership update. New members start with everything already
    /// in the log counted as unread (their marker is at the epoch).
    pub async fn add_members(
        &self,
        id: &str,
        new_members: &[Uuid],
    ) -> Result<Conversation, AppError> {
        let (updated, added) = {
            let mut conversations = self.conversations.write().await;
            let conversation = conversations
                .get_mut(id)
                .ok_or(AppError::NotFound("conversation"))?;
            let mut added = Vec::new();
            for member in new_members {
                if conversation.members.insert(*member) {
                    added.push(*member);
                }
            }
            (conversation.clone(), added)
        };

        if !added.is_empty() {
            let log = self.logs.read().await.get(id).cloned();
            match log {
                Some(log) => {
                    // Hold the log so an append cannot land between the count
                    // and the counter write.
                    let messages = log.lock().await;
                    let mut read_states = self.read_states.write().await;
                    for member in added {
                        read_states
                            .entry((id.to_string(), member))
                            .or_insert_with(|| ReadState {
                                marker: DateTime::<Utc>::MIN_UTC,
                                unread: count_unread(
                                    messages.as_slice(),
                                    DateTime::<Utc>::MIN_UTC,
                                    member,
                                ),
                            });
                    }
                }
                None => {
                    let mut read_states = self.read_states.write().await;
                    for member in added {
                        read_states
                            .entry((id.to_string(), member))
                            .or_insert_with(ReadState::initial);
                    }
                }
            }
        }
        Ok(updated)
    }

    pub async fn remove_conversation(&self, id: &str) -> Result<(), AppError> {
        let removed = self.conversations.write().await.remove(id);
        if removed.is_none() {
            return Err(AppError::NotFound("conversation"));
        }
        let log = self.logs.write().await.remove(id);
        if let Some(log) = log {
            let messages = log.lock().await;
            let mut index = self.message_index.write().await;
            for message in messages.iter() {
                index.remove(&message.id);
            }
        }
        self.read_states
            .write()
            .await
            .retain(|(conversation_id, _), _| conversation_id != id);
        Ok(())
    }

    // --- message ledger ---

    /// Appends to the conversation's ordered log. The server timestamp is
    /// strictly greater than the previous message's, giving a total order per
    /// conversation even under concurrent sends.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        sender_id: Uuid,
        content: MessageContent,
        reply_to: Option<ReplySnapshot>,
    ) -> Result<Message, AppError> {
        let members: Vec<Uuid> = {
            let conversations = self.conversations.read().await;
            let conversation = conversations
                .get(conversation_id)
                .ok_or(AppError::NotFound("conversation"))?;
            conversation.members.iter().copied().collect()
        };

        let log = self
            .logs
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .ok_or(AppError::NotFound("conversation"))?;
        let mut messages = log.lock().await;

        let now = Utc::now();
        let created_at = match messages.last() {
            Some(prev) if prev.created_at >= now => prev.created_at + Duration::microseconds(1),
            _ => now,
        };
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.to_string(),
            sender_id,
            content,
            reply_to,
            created_at,
            edited: false,
            read_by: Default::default(),
        };
        messages.push(message.clone());

        self.message_index
            .write()
            .await
            .insert(message.id, conversation_id.to_string());

        {
            let mut read_states = self.read_states.write().await;
            for member in &members {
                let state = read_states
                    .entry((conversation_id.to_string(), *member))
                    .or_insert_with(ReadState::initial);
                if *member != sender_id {
                    state.unread += 1;
                }
            }
        }
        drop(messages);

        if let Some(conversation) = self.conversations.write().await.get_mut(conversation_id) {
            if created_at > conversation.last_activity_at {
                conversation.last_activity_at = created_at;
            }
        }
        Ok(message)
    }

    pub async fn messages_snapshot(&self, conversation_id: &str) -> Option<Vec<Message>> {
        let log = self.logs.read().await.get(conversation_id).cloned()?;
        let messages = log.lock().await;
        Some(messages.clone())
    }

    pub async fn find_message(&self, message_id: Uuid) -> Option<Message> {
        let conversation_id = self.message_index.read().await.get(&message_id).cloned()?;
        let log = self.logs.read().await.get(&conversation_id).cloned()?;
        let messages = log.lock().await;
        messages.iter().find(|m| m.id == message_id).cloned()
    }

    /// Point mutation of one ledger entry. Callers must not touch ordering
    /// fields outside of tests.
    pub async fn update_message<F>(&self, message_id: Uuid, f: F) -> Option<Message>
    where
        F: FnOnce(&mut Message),
    {
        let conversation_id = self.message_index.read().await.get(&message_id).cloned()?;
        let log = self.logs.read().await.get(&conversation_id).cloned()?;
        let mut messages = log.lock().await;
        let message = messages.iter_mut().find(|m| m.id == message_id)?;
        f(message);
        Some(message.clone())
    }

    /// Physical removal from the ledger; no tombstone. Unread counters for the
    /// conversation are recomputed since the removed message may have been
    /// inside someone's unread window.
    pub async fn remove_message(&self, message_id: Uuid) -> Result<Message, AppError> {
        let conversation_id = self
            .message_index
            .write()
            .await
            .remove(&message_id)
            .ok_or(AppError::NotFound("message"))?;
        let log = self
            .logs
            .read()
            .await
            .get(&conversation_id)
            .cloned()
            .ok_or(AppError::NotFound("message"))?;
        let removed = {
            let mut messages = log.lock().await;
            let pos = messages
                .iter()
                .position(|m| m.id == message_id)
                .ok_or(AppError::NotFound("message"))?;
            messages.remove(pos)
        };
        self.recompute_unread(&conversation_id).await;
        Ok(removed)
    }

    // --- read tracking ---

    /// Advances the participant's marker monotonically. Returns whether it
    /// moved; a call with an older timestamp is a no-op. The recount happens
    /// under the conversation's log mutex, so a concurrent append cannot slip
    /// between the count and the counter write and be lost to a stale total.
    pub async fn mark_read(
        &self,
        conversation_id: &str,
        participant: Uuid,
        upto: DateTime<Utc>,
    ) -> bool {
        let log = self.logs.read().await.get(conversation_id).cloned();
        match log {
            Some(log) => {
                let messages = log.lock().await;
                self.apply_marker(conversation_id, participant, upto, messages.as_slice())
                    .await
            }
            None => self.apply_marker(conversation_id, participant, upto, &[]).await,
        }
    }

    async fn apply_marker(
        &self,
        conversation_id: &str,
        participant: Uuid,
        upto: DateTime<Utc>,
        messages: &[Message],
    ) -> bool {
        let mut read_states = self.read_states.write().await;
        let state = read_states
            .entry((conversation_id.to_string(), participant))
            .or_insert_with(|| ReadState {
                marker: DateTime::<Utc>::MIN_UTC,
                unread: count_unread(messages, DateTime::<Utc>::MIN_UTC, participant),
            });
        if upto <= state.marker {
            return false;
        }
        state.marker = upto;
        state.unread = count_unread(messages, upto, participant);
        true
    }

    pub async fn unread_count(&self, conversation_id: &str, participant: Uuid) -> u64 {
        if let Some(state) = self
            .read_states
            .read()
            .await
            .get(&(conversation_id.to_string(), participant))
        {
            return state.unread;
        }
        let snapshot = self
            .messages_snapshot(conversation_id)
            .await
            .unwrap_or_default();
        count_unread(&snapshot, DateTime::<Utc>::MIN_UTC, participant)
    }

    pub async fn unread_summary(&self, participant: Uuid) -> Vec<(ConversationId, u64)> {
        let ids: Vec<ConversationId> = {
            let conversations = self.conversations.read().await;
            conversations
                .values()
                .filter(|c| c.is_member(participant))
                .map(|c| c.id.clone())
                .collect()
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let unread = self.unread_count(&id, participant).await;
            out.push((id, unread));
        }
        out
    }

    async fn recompute_unread(&self, conversation_id: &str) {
        let log = self.logs.read().await.get(conversation_id).cloned();
        let Some(log) = log else {
            return;
        };
        let messages = log.lock().await;
        let mut read_states = self.read_states.write().await;
        for ((cid, participant), state) in read_states.iter_mut() {
            if cid == conversation_id {
                state.unread = count_unread(messages.as_slice(), state.marker, *participant);
            }
        }
    }

    // --- broadcasts ---

    pub async fn insert_broadcast(&self, broadcast: Broadcast) -> Broadcast {
        self.broadcasts
            .write()
            .await
            .insert(broadcast.id, broadcast.clone());
        broadcast
    }

    pub async fn get_broadcast(&self, id: Uuid) -> Option<Broadcast> {
        self.broadcasts.read().await.get(&id).cloned()
    }

    pub async fn update_broadcast<F>(&self, id: Uuid, f: F) -> Result<Broadcast, AppError>
    where
        F: FnOnce(&mut Broadcast),
    {
        let mut broadcasts = self.broadcasts.write().await;
        let broadcast = broadcasts.get_mut(&id).ok_or(AppError::NotFound("broadcast"))?;
        f(broadcast);
        Ok(broadcast.clone())
    }

    pub async fn remove_broadcast(&self, id: Uuid) -> Result<(), AppError> {
        self.broadcasts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound("broadcast"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationKind;
    use std::collections::BTreeSet;

    fn conversation(id: &str, members: &[Uuid]) -> Conversation {
        Conversation {
            id: id.to_string(),
            kind: ConversationKind::Direct,
            title: None,
            created_by: members[0],
            created_at: Utc::now(),
            last_activity_at: Utc::now(),
            members: BTreeSet::from_iter(members.iter().copied()),
        }
    }

    fn text(body: &str) -> MessageContent {
        MessageContent::Text { body: body.into() }
    }

    #[tokio::test]
    async fn append_assigns_strictly_increasing_timestamps() {
        let store = Arc::new(Store::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .insert_conversation_if_absent(conversation("c", &[a, b]))
            .await;

        let mut handles = Vec::new();
        for i in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for j in 0..25 {
                    store
                        .append_message("c", a, text(&format!("{i}-{j}")), None)
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let messages = store.messages_snapshot("c").await.unwrap();
        assert_eq!(messages.len(), 100);
        for pair in messages.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn unread_counts_exclude_own_messages_and_markers_never_regress() {
        let store = Store::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .insert_conversation_if_absent(conversation("c", &[a, b]))
            .await;

        let first = store.append_message("c", a, text("bonjour"), None).await.unwrap();
        store.append_message("c", a, text("encore"), None).await.unwrap();

        assert_eq!(store.unread_count("c", b).await, 2);
        assert_eq!(store.unread_count("c", a).await, 0);

        assert!(store.mark_read("c", b, first.created_at).await);
        assert_eq!(store.unread_count("c", b).await, 1);

        // older timestamp is a no-op
        assert!(!store.mark_read("c", b, first.created_at - Duration::seconds(5)).await);
        assert_eq!(store.unread_count("c", b).await, 1);

        assert!(store.mark_read("c", b, Utc::now()).await);
        assert_eq!(store.unread_count("c", b).await, 0);
    }

    #[tokio::test]
    async fn late_members_see_prior_messages_as_unread() {
        let store = Store::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut group = conversation("g", &[a, b]);
        group.kind = ConversationKind::Group;
        store.insert_conversation_if_absent(group).await;

        store.append_message("g", a, text("hello"), None).await.unwrap();
        store.add_members("g", &[c]).await.unwrap();
        assert_eq!(store.unread_count("g", c).await, 1);
    }

    #[tokio::test]
    async fn counters_survive_interleaved_sends_and_mark_reads() {
        let store = Arc::new(Store::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .insert_conversation_if_absent(conversation("c", &[a, b]))
            .await;

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..200 {
                    store
                        .append_message("c", a, text(&format!("m{i}")), None)
                        .await
                        .unwrap();
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut marker = DateTime::<Utc>::MIN_UTC;
                for _ in 0..200 {
                    let snapshot = store.messages_snapshot("c").await.unwrap_or_default();
                    if let Some(last) = snapshot.last() {
                        if store.mark_read("c", b, last.created_at).await {
                            marker = last.created_at;
                        }
                    }
                    tokio::task::yield_now().await;
                }
                marker
            })
        };
        writer.await.unwrap();
        let marker = reader.await.unwrap();

        // The incremental counter must agree with a recount from the final
        // ledger at the final marker; a marker update losing a concurrent
        // append would leave it short.
        let messages = store.messages_snapshot("c").await.unwrap();
        let expected = count_unread(&messages, marker, b);
        assert_eq!(store.unread_count("c", b).await, expected);
    }

    #[tokio::test]
    async fn removing_a_message_shrinks_unread_windows() {
        let store = Store::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .insert_conversation_if_absent(conversation("c", &[a, b]))
            .await;

        let message = store.append_message("c", a, text("oops"), None).await.unwrap();
        assert_eq!(store.unread_count("c", b).await, 1);
        store.remove_message(message.id).await.unwrap();
        assert_eq!(store.unread_count("c", b).await, 0);
        assert!(store.find_message(message.id).await.is_none());
    }
}
