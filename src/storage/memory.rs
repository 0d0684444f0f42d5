use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::common::{Conversation, Message};
use crate::error::StoreError;

use super::feed::{ChangeFeed, snapshot_stream};
use super::{DocumentStore, SnapshotStream, sort_snapshot};

/// In-process document store.
///
/// Records are kept as JSON documents so reads go through the same
/// permissive decoding as a remote store. Faults can be injected to exercise
/// rollback and reconnect paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: Mutex<HashMap<String, Value>>,
    conversations: Mutex<HashMap<String, Value>>,
    feed: ChangeFeed,
    failing_writes: AtomicUsize,
    failing_subscriptions: AtomicUsize,
    write_latency: Mutex<Duration>,
    message_writes: AtomicUsize,
    read_updates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` message writes fail with [`StoreError::Unavailable`].
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.failing_writes.store(count, Ordering::SeqCst);
    }

    /// The next `count` subscription attempts fail.
    pub fn fail_next_subscriptions(&self, count: usize) {
        self.inner.failing_subscriptions.store(count, Ordering::SeqCst);
    }

    /// Delay applied to every write before it takes effect.
    pub fn set_write_latency(&self, latency: Duration) {
        *self
            .inner
            .write_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Ends every open subscription on the conversation, as a dropped
    /// connection would.
    pub fn disconnect_listeners(&self, conversation_id: &str) {
        log::debug!("Dropping listeners on conversation {conversation_id}");
        self.inner.feed.disconnect(conversation_id);
    }

    pub fn listener_count(&self, conversation_id: &str) -> usize {
        self.inner.feed.listener_count(conversation_id)
    }

    /// Successful `put_message` calls so far.
    pub fn message_writes(&self) -> usize {
        self.inner.message_writes.load(Ordering::SeqCst)
    }

    /// Successful `mark_read` calls so far.
    pub fn read_updates(&self) -> usize {
        self.inner.read_updates.load(Ordering::SeqCst)
    }

    /// Stores a raw document as if another client had written it.
    pub fn insert_document(&self, message_id: &str, doc: Value) {
        let conversation_id = doc
            .get("conversationId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.lock_messages().insert(message_id.to_string(), doc);
        self.inner.feed.notify(&conversation_id);
    }

    /// Current ordered contents of a conversation.
    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        load_conversation(&self.inner, conversation_id)
    }

    fn lock_messages(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.inner
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_conversations(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.inner
            .conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_network(&self) -> Result<(), StoreError> {
        let latency = *self
            .inner
            .write_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if take_one(&self.inner.failing_writes) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn load_conversation(inner: &Inner, conversation_id: &str) -> Vec<Message> {
    let messages = inner.messages.lock().unwrap_or_else(PoisonError::into_inner);
    let mut snapshot: Vec<Message> = messages
        .iter()
        .filter(|(_, doc)| {
            doc.get("conversationId").and_then(Value::as_str) == Some(conversation_id)
        })
        .map(|(id, doc)| Message::from_document(id, doc))
        .collect();
    sort_snapshot(&mut snapshot);
    snapshot
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn watch_messages(&self, conversation_id: &str) -> Result<SnapshotStream, StoreError> {
        if take_one(&self.inner.failing_subscriptions) {
            return Err(StoreError::Unavailable("injected subscription failure".into()));
        }
        let inner = self.inner.clone();
        let conversation_id = conversation_id.to_string();
        let changes = self.inner.feed.subscribe(&conversation_id);
        Ok(snapshot_stream(changes, move || {
            Ok(load_conversation(&inner, &conversation_id))
        }))
    }

    async fn put_message(&self, message: &Message) -> Result<(), StoreError> {
        self.simulate_network().await?;
        self.lock_messages()
            .insert(message.id.clone(), message.to_document());
        self.inner.message_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.feed.notify(&message.conversation_id);
        Ok(())
    }

    async fn mark_read(&self, conversation_id: &str, message_id: &str) -> Result<(), StoreError> {
        {
            let mut messages = self.lock_messages();
            let doc = messages
                .get_mut(message_id)
                .ok_or_else(|| StoreError::MessageNotFound(message_id.to_string()))?;
            if let Some(fields) = doc.as_object_mut() {
                fields.insert("isRead".into(), Value::Bool(true));
            }
        }
        self.inner.read_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.feed.notify(conversation_id);
        Ok(())
    }

    async fn update_last_message(
        &self,
        conversation_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conversations = self.lock_conversations();
        let doc = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_string()))?;
        if let Some(fields) = doc.as_object_mut() {
            fields.insert("lastMessage".into(), Value::String(text.to_string()));
            fields.insert("lastMessageAt".into(), at.timestamp_millis().into());
        }
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.lock_conversations();
        let Some(doc) = conversations.get(conversation_id) else {
            return Ok(None);
        };
        match Conversation::from_document(conversation_id, doc) {
            Ok(conversation) => Ok(Some(conversation)),
            Err(err) => {
                log::warn!("Skipping malformed conversation {conversation_id}: {err}");
                Ok(None)
            }
        }
    }

    async fn put_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.lock_conversations()
            .insert(conversation.id.clone(), conversation.to_document());
        Ok(())
    }
}
