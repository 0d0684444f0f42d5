use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ConversationError;

/// A chat message between the two participants of a conversation.
///
/// Only `is_read` changes after creation; everything else is fixed the
/// moment the sender builds the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// Builds an unsent message with a client-generated id and the current time.
    pub fn new(
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            text: text.into(),
            timestamp: now_millis(),
            is_read: false,
        }
    }

    pub fn to_document(&self) -> Value {
        json!({
            "id": self.id,
            "conversationId": self.conversation_id,
            "senderId": self.sender_id,
            "receiverId": self.receiver_id,
            "text": self.text,
            "timestamp": self.timestamp.timestamp_millis(),
            "isRead": self.is_read,
        })
    }

    /// Decodes a store document. Missing or mistyped fields fall back to
    /// empty strings, `false` and the current time instead of failing.
    pub fn from_document(id: &str, doc: &Value) -> Self {
        let id = if id.is_empty() {
            str_field(doc, "id")
        } else {
            id.to_string()
        };
        Self {
            id,
            conversation_id: str_field(doc, "conversationId"),
            sender_id: str_field(doc, "senderId"),
            receiver_id: str_field(doc, "receiverId"),
            text: str_field(doc, "text"),
            timestamp: doc
                .get("timestamp")
                .and_then(parse_timestamp)
                .unwrap_or_else(now_millis),
            is_read: doc.get("isRead").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// A two-party conversation, optionally about a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    participants: [String; 2],
    pub listing_id: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn new(
        id: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Result<Self, ConversationError> {
        let (first, second) = (first.into(), second.into());
        if first.is_empty() || second.is_empty() || first == second {
            return Err(ConversationError::InvalidParticipants);
        }
        Ok(Self {
            id: id.into(),
            participants: [first, second],
            listing_id: None,
            last_message: None,
            last_message_at: None,
        })
    }

    pub fn with_listing(mut self, listing_id: impl Into<String>) -> Self {
        self.listing_id = Some(listing_id.into());
        self
    }

    pub fn participants(&self) -> &[String; 2] {
        &self.participants
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// The participant that is not `user_id`, or `None` when `user_id` is
    /// not part of this conversation.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        match &self.participants {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }

    pub fn to_document(&self) -> Value {
        json!({
            "id": self.id,
            "participants": self.participants,
            "listingId": self.listing_id,
            "lastMessage": self.last_message,
            "lastMessageAt": self.last_message_at.map(|at| at.timestamp_millis()),
        })
    }

    /// Participants are the one field that cannot be defaulted, so a document
    /// without exactly two of them is rejected.
    pub fn from_document(id: &str, doc: &Value) -> Result<Self, ConversationError> {
        let participants: Vec<&str> = doc
            .get("participants")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let [first, second] = participants.as_slice() else {
            return Err(ConversationError::InvalidParticipants);
        };
        let mut conversation = Self::new(id, *first, *second)?;
        conversation.listing_id = opt_str_field(doc, "listingId");
        conversation.last_message = opt_str_field(doc, "lastMessage");
        conversation.last_message_at = doc.get("lastMessageAt").and_then(parse_timestamp);
        Ok(conversation)
    }
}

/// Where a locally visible message stands relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Appended locally, write not acknowledged yet.
    Pending,
    /// Write acknowledged, not yet seen in a subscription snapshot.
    Sent,
    /// Present in the latest snapshot.
    Confirmed,
    /// Write failed and the message was kept visible.
    Failed,
}

/// Current time truncated to the millisecond precision the store keeps.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn str_field(doc: &Value, key: &str) -> String {
    doc.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str_field(doc: &Value, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_document_keeps_every_field() {
        let mut message = Message::new("c1", "alice", "bob", "is the bike still available?");
        message.is_read = true;
        let decoded = Message::from_document(&message.id, &message.to_document());
        assert_eq!(decoded, message);
    }

    #[test]
    fn malformed_message_document_decodes_permissively() {
        let doc = json!({ "senderId": 42, "timestamp": "yesterday" });
        let before = Utc::now() - chrono::Duration::seconds(1);
        let decoded = Message::from_document("m1", &doc);

        assert_eq!(decoded.id, "m1");
        assert_eq!(decoded.sender_id, "");
        assert_eq!(decoded.text, "");
        assert!(!decoded.is_read);
        assert!(decoded.timestamp >= before);
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let doc = json!({ "timestamp": "2024-05-01T10:00:00Z" });
        let decoded = Message::from_document("m1", &doc);
        assert_eq!(decoded.timestamp.timestamp(), 1_714_557_600);
    }

    #[test]
    fn conversation_requires_two_distinct_participants() {
        assert!(Conversation::new("c1", "alice", "bob").is_ok());
        assert_eq!(
            Conversation::new("c1", "alice", "alice"),
            Err(ConversationError::InvalidParticipants)
        );
        assert_eq!(
            Conversation::new("c1", "", "bob"),
            Err(ConversationError::InvalidParticipants)
        );
    }

    #[test]
    fn other_participant_resolves_both_directions() {
        let conversation = Conversation::new("c1", "alice", "bob").unwrap();
        assert_eq!(conversation.other_participant("alice"), Some("bob"));
        assert_eq!(conversation.other_participant("bob"), Some("alice"));
        assert_eq!(conversation.other_participant("carol"), None);
    }

    #[test]
    fn conversation_document_without_participants_is_rejected() {
        let doc = json!({ "participants": ["alice"] });
        assert!(Conversation::from_document("c1", &doc).is_err());

        let doc = json!({ "participants": ["alice", "bob"], "listingId": "l9" });
        let conversation = Conversation::from_document("c1", &doc).unwrap();
        assert_eq!(conversation.listing_id.as_deref(), Some("l9"));
        assert_eq!(conversation.last_message, None);
    }
}
