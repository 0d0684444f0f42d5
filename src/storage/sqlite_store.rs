use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::types::now_millis;
use crate::common::{Conversation, Message};
use crate::error::StoreError;

use super::database;
use super::feed::{ChangeFeed, snapshot_stream};
use super::{DocumentStore, SnapshotStream, ensure_parent_dir};

/// Persistent local store backed by SQLite. Live subscriptions are served
/// from an in-process change feed, so only writes made through this handle
/// (or its clones) wake listeners.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
    feed: Arc<ChangeFeed>,
}

impl SqliteStore {
    /// Open (or create) the store file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        ensure_parent_dir(path).map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self::from_connection(database::open_file(path)?))
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(database::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            feed: Arc::new(ChangeFeed::new()),
        }
    }

    pub fn listener_count(&self, conversation_id: &str) -> usize {
        self.feed.listener_count(conversation_id)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Nullable columns decode to the same defaults as a sparse document.
fn load_messages(conn: &Connection, conversation_id: &str) -> SqlResult<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_id, receiver_id, text, timestamp, is_read
         FROM messages
         WHERE conversation_id = ?1
         ORDER BY timestamp ASC, id ASC",
    )?;

    let messages = stmt
        .query_map(params![conversation_id], |row| {
            let timestamp: Option<i64> = row.get(5)?;
            Ok(Message {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                sender_id: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                receiver_id: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                text: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                timestamp: timestamp
                    .and_then(DateTime::from_timestamp_millis)
                    .unwrap_or_else(now_millis),
                is_read: row.get::<_, i64>(6)? != 0,
            })
        })?
        .collect::<SqlResult<Vec<_>>>()?;

    Ok(messages)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn watch_messages(&self, conversation_id: &str) -> Result<SnapshotStream, StoreError> {
        let db = self.db.clone();
        let conversation_id = conversation_id.to_string();
        let changes = self.feed.subscribe(&conversation_id);
        Ok(snapshot_stream(changes, move || {
            let conn = db.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(load_messages(&conn, &conversation_id)?)
        }))
    }

    async fn put_message(&self, message: &Message) -> Result<(), StoreError> {
        self.lock().execute(
            "INSERT OR REPLACE INTO messages
             (id, conversation_id, sender_id, receiver_id, text, timestamp, is_read)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id,
                message.conversation_id,
                message.sender_id,
                message.receiver_id,
                message.text,
                message.timestamp.timestamp_millis(),
                message.is_read as i64
            ],
        )?;
        self.feed.notify(&message.conversation_id);
        Ok(())
    }

    async fn mark_read(&self, conversation_id: &str, message_id: &str) -> Result<(), StoreError> {
        let updated = self.lock().execute(
            "UPDATE messages SET is_read = 1 WHERE id = ?1 AND conversation_id = ?2",
            params![message_id, conversation_id],
        )?;
        if updated == 0 {
            return Err(StoreError::MessageNotFound(message_id.to_string()));
        }
        self.feed.notify(conversation_id);
        Ok(())
    }

    async fn update_last_message(
        &self,
        conversation_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let updated = self.lock().execute(
            "UPDATE conversations SET last_message = ?1, last_message_at = ?2 WHERE id = ?3",
            params![text, at.timestamp_millis(), conversation_id],
        )?;
        if updated == 0 {
            return Err(StoreError::ConversationNotFound(conversation_id.to_string()));
        }
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = self
            .lock()
            .query_row(
                "SELECT participant_a, participant_b, listing_id, last_message, last_message_at
                 FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((first, second, listing_id, last_message, last_message_at)) = row else {
            return Ok(None);
        };
        match Conversation::new(conversation_id, first, second) {
            Ok(mut conversation) => {
                conversation.listing_id = listing_id;
                conversation.last_message = last_message;
                conversation.last_message_at =
                    last_message_at.and_then(DateTime::from_timestamp_millis);
                Ok(Some(conversation))
            }
            Err(err) => {
                log::warn!("Skipping malformed conversation {conversation_id}: {err}");
                Ok(None)
            }
        }
    }

    async fn put_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        let [first, second] = conversation.participants();
        self.lock().execute(
            "INSERT OR REPLACE INTO conversations
             (id, participant_a, participant_b, listing_id, last_message, last_message_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                conversation.id,
                first,
                second,
                conversation.listing_id,
                conversation.last_message,
                conversation.last_message_at.map(|at| at.timestamp_millis())
            ],
        )?;
        Ok(())
    }
}
