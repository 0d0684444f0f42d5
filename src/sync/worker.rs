use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::common::{Message, SyncCommand, SyncEvent};
use crate::storage::DocumentStore;

use super::ReconnectPolicy;
use super::backoff::Backoff;

/// Background half of a chat session: owns the live subscription and runs
/// store writes. Stops when the session drops its command sender.
pub(crate) struct SyncWorker {
    store: Arc<dyn DocumentStore>,
    conversation_id: String,
    command_receiver: mpsc::UnboundedReceiver<SyncCommand>,
    event_sender: mpsc::UnboundedSender<SyncEvent>,
    reconnect: ReconnectPolicy,
}

impl SyncWorker {
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        conversation_id: String,
        command_receiver: mpsc::UnboundedReceiver<SyncCommand>,
        event_sender: mpsc::UnboundedSender<SyncEvent>,
        reconnect: ReconnectPolicy,
    ) -> Self {
        Self {
            store,
            conversation_id,
            command_receiver,
            event_sender,
            reconnect,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut backoff = Backoff::new(self.reconnect.clone());
        log::info!("Sync worker started for conversation {}", self.conversation_id);

        loop {
            let lost = match self.store.watch_messages(&self.conversation_id).await {
                Ok(mut stream) => {
                    self.emit(SyncEvent::Subscribed);
                    loop {
                        tokio::select! {
                            command = self.command_receiver.recv() => {
                                match command {
                                    Some(command) => self.handle_command(command),
                                    None => {
                                        log::info!(
                                            "Closing subscription for conversation {}",
                                            self.conversation_id
                                        );
                                        return;
                                    }
                                }
                            }
                            item = stream.next() => {
                                match item {
                                    Some(Ok(snapshot)) => {
                                        backoff.reset();
                                        log::debug!(
                                            "Snapshot of {} messages for {}",
                                            snapshot.len(),
                                            self.conversation_id
                                        );
                                        self.emit(SyncEvent::Snapshot(snapshot));
                                    }
                                    Some(Err(err)) => break err.to_string(),
                                    None => break "subscription closed by store".to_string(),
                                }
                            }
                        }
                    }
                }
                Err(err) => err.to_string(),
            };

            log::warn!(
                "Subscription for conversation {} lost: {lost}",
                self.conversation_id
            );
            if !self.wait_before_retry(&mut backoff, lost).await {
                break;
            }
        }

        log::info!("Sync worker stopped for conversation {}", self.conversation_id);
    }

    /// Sleeps out the backoff while still serving commands. Returns `false`
    /// when the worker should stop.
    async fn wait_before_retry(&mut self, backoff: &mut Backoff, error: String) -> bool {
        let Some(delay) = backoff.next_delay() else {
            log::error!(
                "Giving up on subscription for conversation {} after {} attempts",
                self.conversation_id,
                backoff.attempt()
            );
            self.emit(SyncEvent::SubscriptionLost {
                error,
                retry_in: None,
            });
            while let Some(command) = self.command_receiver.recv().await {
                self.handle_command(command);
            }
            return false;
        };

        self.emit(SyncEvent::SubscriptionLost {
            error,
            retry_in: Some(delay),
        });
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => return false,
                    }
                }
            }
        }
    }

    /// Writes are detached so a slow store never blocks snapshot delivery.
    fn handle_command(&self, command: SyncCommand) {
        match command {
            SyncCommand::Persist(message) => {
                let store = self.store.clone();
                let events = self.event_sender.clone();
                tokio::spawn(persist_message(store, events, message));
            }
            SyncCommand::MarkRead(message_ids) => {
                for message_id in message_ids {
                    let store = self.store.clone();
                    let events = self.event_sender.clone();
                    let conversation_id = self.conversation_id.clone();
                    tokio::spawn(async move {
                        let event = match store.mark_read(&conversation_id, &message_id).await {
                            Ok(()) => SyncEvent::ReadMarked { message_id },
                            Err(err) => {
                                log::warn!("Failed to mark message {message_id} read: {err}");
                                SyncEvent::ReadFailed {
                                    message_id,
                                    error: err.to_string(),
                                }
                            }
                        };
                        let _ = events.send(event);
                    });
                }
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        if self.event_sender.send(event).is_err() {
            log::debug!(
                "Session for conversation {} is gone; dropping event",
                self.conversation_id
            );
        }
    }
}

async fn persist_message(
    store: Arc<dyn DocumentStore>,
    events: mpsc::UnboundedSender<SyncEvent>,
    message: Message,
) {
    match store.put_message(&message).await {
        Ok(()) => {
            let _ = events.send(SyncEvent::Persisted {
                message_id: message.id.clone(),
            });
            if let Err(err) = store
                .update_last_message(&message.conversation_id, &message.text, message.timestamp)
                .await
            {
                log::warn!(
                    "Message {} stored but last-message cache not updated: {err}",
                    message.id
                );
            }
        }
        Err(err) => {
            log::warn!("Failed to persist message {}: {err}", message.id);
            let _ = events.send(SyncEvent::PersistFailed {
                message_id: message.id,
                error: err.to_string(),
            });
        }
    }
}
