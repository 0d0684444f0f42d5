use super::types::Message;

/// Work the chat session hands to its background sync worker.
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Write an optimistically displayed message, then refresh the
    /// conversation's last-message cache.
    Persist(Message),
    /// Flag these messages as read in the store.
    MarkRead(Vec<String>),
}
