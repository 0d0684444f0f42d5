use std::time::Duration;

use super::types::Message;

/// Results the sync worker sends back to the owning session.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The live subscription is (re)established.
    Subscribed,
    /// Full ordered message list for the conversation.
    Snapshot(Vec<Message>),
    Persisted {
        message_id: String,
    },
    PersistFailed {
        message_id: String,
        error: String,
    },
    ReadMarked {
        message_id: String,
    },
    ReadFailed {
        message_id: String,
        error: String,
    },
    /// The subscription dropped. `retry_in` is `None` once reconnect
    /// attempts are exhausted.
    SubscriptionLost {
        error: String,
        retry_in: Option<Duration>,
    },
}
