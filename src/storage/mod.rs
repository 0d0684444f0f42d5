pub mod database;
pub mod feed;
pub mod memory;
pub mod sqlite_store;

pub use memory::MemoryStore;
pub use sqlite_store::SqliteStore;

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::common::{Conversation, Message};
use crate::error::StoreError;

/// Live sequence of full, timestamp-ordered message lists.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Message>, StoreError>>;

/// Document store the chat core talks to: a live query per conversation,
/// point writes keyed by message id and field-level updates.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Opens a standing subscription. The stream yields the current snapshot
    /// right away and again after every change. Dropping the stream releases
    /// the listener.
    async fn watch_messages(&self, conversation_id: &str) -> Result<SnapshotStream, StoreError>;

    async fn put_message(&self, message: &Message) -> Result<(), StoreError>;

    async fn mark_read(&self, conversation_id: &str, message_id: &str) -> Result<(), StoreError>;

    /// Refreshes the denormalized last-message cache on the conversation.
    async fn update_last_message(
        &self,
        conversation_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn get_conversation(&self, conversation_id: &str)
    -> Result<Option<Conversation>, StoreError>;

    async fn put_conversation(&self, conversation: &Conversation) -> Result<(), StoreError>;
}

/// Ensure the parent directory of a store file exists
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub(crate) fn sort_snapshot(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}
