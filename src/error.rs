use thiserror::Error;

/// Failures reported by a [`crate::storage::DocumentStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("conversation `{0}` not found")]
    ConversationNotFound(String),
    #[error("message `{0}` not found")]
    MessageNotFound(String),
    #[error(transparent)]
    InvalidConversation(#[from] ConversationError),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("a conversation needs exactly two distinct, non-empty participants")]
    InvalidParticipants,
}

/// Why a message was refused before it ever reached the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("message text is empty")]
    EmptyText,
    #[error("conversation `{conversation_id}` has no participant other than `{user_id}`")]
    NoReceiver {
        conversation_id: String,
        user_id: String,
    },
    #[error("sync worker has shut down")]
    WorkerGone,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("user `{user_id}` is not a participant of conversation `{conversation_id}`")]
    NotParticipant {
        conversation_id: String,
        user_id: String,
    },
    #[error("conversation `{0}` not found")]
    ConversationNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode config: {0}")]
    Json(#[from] serde_json::Error),
}
