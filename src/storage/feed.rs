use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use futures::StreamExt;
use tokio::sync::watch;

use crate::common::Message;
use crate::error::StoreError;

use super::SnapshotStream;

/// Per-conversation change notifications shared by the store backends.
///
/// Each write bumps a version counter; every live subscription holds a
/// receiver and re-reads the whole conversation when the counter moves.
#[derive(Default)]
pub struct ChangeFeed {
    channels: Mutex<HashMap<String, watch::Sender<u64>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, conversation_id: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(conversation_id) else {
            return;
        };
        if sender.receiver_count() == 0 {
            channels.remove(conversation_id);
        } else {
            sender.send_modify(|version| *version += 1);
        }
    }

    pub fn subscribe(&self, conversation_id: &str) -> watch::Receiver<u64> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        // Conversations nobody watches any more are not kept around.
        channels.retain(|_, sender| sender.receiver_count() > 0);
        channels
            .entry(conversation_id.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    /// Number of open subscriptions on a conversation.
    pub fn listener_count(&self, conversation_id: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(conversation_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drops the conversation's channel; open streams end after their
    /// current item.
    pub fn disconnect(&self, conversation_id: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.remove(conversation_id);
    }
}

/// Turns a change receiver into a stream of full snapshots. The first
/// snapshot is produced immediately, later ones after each change.
pub fn snapshot_stream<F>(changes: watch::Receiver<u64>, load: F) -> SnapshotStream
where
    F: Fn() -> Result<Vec<Message>, StoreError> + Send + Sync + 'static,
{
    futures::stream::unfold(
        (changes, load, true),
        |(mut changes, load, first)| async move {
            if first {
                changes.mark_unchanged();
            } else if changes.changed().await.is_err() {
                return None;
            }
            let snapshot = load();
            Some((snapshot, (changes, load, false)))
        },
    )
    .boxed()
}
