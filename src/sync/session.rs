use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::{Conversation, DeliveryState, Message, SyncCommand, SyncEvent};
use crate::error::{SendError, SessionError};
use crate::identity::IdentityProvider;
use crate::storage::DocumentStore;

use super::SyncConfig;
use super::timeline::LocalTimeline;
use super::worker::SyncWorker;

/// What applying one worker event did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Subscribed,
    /// A snapshot changed the visible list.
    MessagesChanged,
    /// A snapshot matched the visible list; nothing was replaced.
    SnapshotUnchanged,
    MessageSent { message_id: String },
    /// The write failed and the optimistic copy was rolled back.
    SendFailed { message_id: String, error: String },
    ReadMarked { message_id: String },
    ReadFailed { message_id: String, error: String },
    SubscriptionLost {
        error: String,
        retry_in: Option<Duration>,
    },
}

/// One open conversation screen.
///
/// All visible state lives here and only changes inside `&mut self` calls,
/// so the owner (a UI frame loop or a test) decides when remote results are
/// applied. Dropping the session stops its worker and releases the store
/// subscription.
pub struct ChatSession {
    conversation: Conversation,
    current_user_id: String,
    timeline: LocalTimeline,
    input: String,
    last_seen: Option<DateTime<Utc>>,
    /// Newest incoming message `last_seen` was recorded for.
    seen_message_id: Option<String>,
    read_in_flight: HashSet<String>,
    connected: bool,
    command_sender: mpsc::UnboundedSender<SyncCommand>,
    event_receiver: mpsc::UnboundedReceiver<SyncEvent>,
    worker: JoinHandle<()>,
}

impl ChatSession {
    /// Opens the conversation and its live subscription. Must be called from
    /// within a tokio runtime.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
        conversation: Conversation,
        config: &SyncConfig,
    ) -> Result<Self, SessionError> {
        let current_user_id = identity
            .current_user_id()
            .ok_or(SessionError::NotSignedIn)?;
        if !conversation.has_participant(&current_user_id) {
            return Err(SessionError::NotParticipant {
                conversation_id: conversation.id.clone(),
                user_id: current_user_id,
            });
        }

        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let worker = SyncWorker::new(
            store,
            conversation.id.clone(),
            command_receiver,
            event_sender,
            config.reconnect.clone(),
        );
        let worker = tokio::spawn(worker.run());

        Ok(Self {
            conversation,
            current_user_id,
            timeline: LocalTimeline::new(config.rollback),
            input: String::new(),
            last_seen: None,
            seen_message_id: None,
            read_in_flight: HashSet::new(),
            connected: false,
            command_sender,
            event_receiver,
            worker,
        })
    }

    /// Looks the conversation up in the store, then opens it.
    pub async fn open_by_id(
        store: Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
        conversation_id: &str,
        config: &SyncConfig,
    ) -> Result<Self, SessionError> {
        let conversation = store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| SessionError::ConversationNotFound(conversation_id.to_string()))?;
        Self::open(store, identity, conversation, config)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn current_user_id(&self) -> &str {
        &self.current_user_id
    }

    pub fn messages(&self) -> Arc<Vec<Message>> {
        self.timeline.messages()
    }

    pub fn is_outgoing(&self, message: &Message) -> bool {
        message.sender_id == self.current_user_id
    }

    pub fn delivery_state(&self, message_id: &str) -> Option<DeliveryState> {
        self.timeline.delivery_state(message_id)
    }

    pub fn failed_messages(&self) -> &[Message] {
        self.timeline.failed_messages()
    }

    /// Local time at which the latest incoming message was seen as read.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Appends the message to the visible list immediately and queues the
    /// write. The outcome of the write arrives later through [`Self::poll`].
    pub fn send_message(&mut self, text: &str) -> Result<Message, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyText);
        }
        let receiver_id = self
            .conversation
            .other_participant(&self.current_user_id)
            .ok_or_else(|| SendError::NoReceiver {
                conversation_id: self.conversation.id.clone(),
                user_id: self.current_user_id.clone(),
            })?
            .to_string();

        let message = Message::new(
            self.conversation.id.clone(),
            self.current_user_id.clone(),
            receiver_id,
            text,
        );
        self.timeline.append_optimistic(message.clone());
        self.input.clear();

        if self
            .command_sender
            .send(SyncCommand::Persist(message.clone()))
            .is_err()
        {
            log::warn!("Sync worker gone; rolling back message {}", message.id);
            self.timeline.rollback(&message.id);
            return Err(SendError::WorkerGone);
        }
        Ok(message)
    }

    /// Sends whatever is in the input buffer.
    pub fn send_input(&mut self) -> Result<Message, SendError> {
        let text = std::mem::take(&mut self.input);
        let result = self.send_message(&text);
        if result.is_err() {
            self.input = text;
        }
        result
    }

    /// Issues one read update per unread incoming message that is not
    /// already being marked. Returns the number of updates issued.
    pub fn mark_read(&mut self) -> usize {
        let messages = self.timeline.messages();

        if let Some(latest) = messages.last() {
            let newly_seen = latest.receiver_id == self.current_user_id
                && latest.is_read
                && self.seen_message_id.as_deref() != Some(latest.id.as_str());
            if newly_seen {
                self.last_seen = Some(Utc::now());
                self.seen_message_id = Some(latest.id.clone());
            }
        }

        let unread: Vec<String> = messages
            .iter()
            .filter(|m| m.receiver_id == self.current_user_id && !m.is_read)
            .filter(|m| !self.read_in_flight.contains(&m.id))
            .map(|m| m.id.clone())
            .collect();
        if unread.is_empty() {
            return 0;
        }

        let count = unread.len();
        if self
            .command_sender
            .send(SyncCommand::MarkRead(unread.clone()))
            .is_err()
        {
            log::warn!("Sync worker gone; cannot mark {count} messages read");
            return 0;
        }
        self.read_in_flight.extend(unread);
        count
    }

    /// Applies every event the worker has queued so far without waiting.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut applied = Vec::new();
        while let Ok(event) = self.event_receiver.try_recv() {
            applied.push(self.apply(event));
        }
        applied
    }

    /// Waits for the next worker event and applies it. `None` once the
    /// worker has stopped.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.event_receiver.recv().await?;
        Some(self.apply(event))
    }

    /// Stops the worker and waits for the subscription to be released.
    pub async fn close(self) {
        let Self {
            command_sender,
            worker,
            conversation,
            ..
        } = self;
        drop(command_sender);
        if let Err(err) = worker.await {
            log::warn!("Sync worker for {} ended abnormally: {err}", conversation.id);
        }
    }

    fn apply(&mut self, event: SyncEvent) -> SessionEvent {
        match event {
            SyncEvent::Subscribed => {
                self.connected = true;
                SessionEvent::Subscribed
            }
            SyncEvent::Snapshot(snapshot) => {
                let changed = self.timeline.apply_snapshot(snapshot);
                let timeline = &self.timeline;
                self.read_in_flight.retain(|id| {
                    timeline
                        .as_slice()
                        .iter()
                        .any(|m| &m.id == id && !m.is_read)
                });
                if changed {
                    SessionEvent::MessagesChanged
                } else {
                    SessionEvent::SnapshotUnchanged
                }
            }
            SyncEvent::Persisted { message_id } => {
                self.timeline.mark_written(&message_id);
                SessionEvent::MessageSent { message_id }
            }
            SyncEvent::PersistFailed { message_id, error } => {
                if self.timeline.rollback(&message_id).is_some() {
                    log::info!("Rolled back message {message_id}: {error}");
                }
                SessionEvent::SendFailed { message_id, error }
            }
            SyncEvent::ReadMarked { message_id } => SessionEvent::ReadMarked { message_id },
            SyncEvent::ReadFailed { message_id, error } => {
                self.read_in_flight.remove(&message_id);
                SessionEvent::ReadFailed { message_id, error }
            }
            SyncEvent::SubscriptionLost { error, retry_in } => {
                self.connected = false;
                SessionEvent::SubscriptionLost { error, retry_in }
            }
        }
    }
}
