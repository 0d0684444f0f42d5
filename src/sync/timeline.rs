use std::collections::HashSet;
use std::sync::Arc;

use crate::common::{DeliveryState, Message};

use super::RollbackPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    InFlight,
    Written,
    Failed,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    message: Message,
    state: WriteState,
}

/// The visible message list plus the journal of writes the store has not
/// echoed back yet.
///
/// Snapshots are authoritative for every id they contain. Journal entries
/// missing from a snapshot stay visible after it, in send order, until a
/// later snapshot carries them or their write fails.
#[derive(Debug, Default)]
pub struct LocalTimeline {
    messages: Arc<Vec<Message>>,
    journal: Vec<PendingWrite>,
    failed: Vec<Message>,
    policy: RollbackPolicy,
}

impl LocalTimeline {
    pub fn new(policy: RollbackPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Shared handle to the current list. The handle is only swapped when
    /// the list content actually changes.
    pub fn messages(&self) -> Arc<Vec<Message>> {
        self.messages.clone()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages dropped from the list by a failed write, oldest first.
    pub fn failed_messages(&self) -> &[Message] {
        &self.failed
    }

    pub fn append_optimistic(&mut self, message: Message) {
        self.journal.push(PendingWrite {
            message: message.clone(),
            state: WriteState::InFlight,
        });
        let mut next = self.messages.as_ref().clone();
        next.push(message);
        self.messages = Arc::new(next);
    }

    /// Records a write acknowledgement. Returns `false` when the message is
    /// no longer journaled, e.g. because a snapshot already confirmed it.
    pub fn mark_written(&mut self, message_id: &str) -> bool {
        match self.entry_mut(message_id) {
            Some(entry) if entry.state == WriteState::InFlight => {
                entry.state = WriteState::Written;
                true
            }
            _ => false,
        }
    }

    /// Undoes an optimistic append whose write failed. A message the store
    /// already echoed back is left alone.
    pub fn rollback(&mut self, message_id: &str) -> Option<Message> {
        let index = self
            .journal
            .iter()
            .position(|entry| {
                entry.message.id == message_id && entry.state == WriteState::InFlight
            })?;

        match self.policy {
            RollbackPolicy::Remove => {
                let entry = self.journal.remove(index);
                let remaining: Vec<Message> = self
                    .messages
                    .iter()
                    .filter(|message| message.id != message_id)
                    .cloned()
                    .collect();
                self.messages = Arc::new(remaining);
                self.failed.push(entry.message.clone());
                Some(entry.message)
            }
            RollbackPolicy::MarkFailed => {
                let entry = &mut self.journal[index];
                entry.state = WriteState::Failed;
                Some(entry.message.clone())
            }
        }
    }

    /// Merges an authoritative snapshot. Returns whether the visible list
    /// changed; an identical result keeps the previous `Arc`.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Message>) -> bool {
        let confirmed: HashSet<&str> = snapshot.iter().map(|m| m.id.as_str()).collect();
        self.journal
            .retain(|entry| !confirmed.contains(entry.message.id.as_str()));

        let mut merged = snapshot;
        merged.extend(self.journal.iter().map(|entry| entry.message.clone()));

        if *self.messages == merged {
            return false;
        }
        self.messages = Arc::new(merged);
        true
    }

    pub fn delivery_state(&self, message_id: &str) -> Option<DeliveryState> {
        if let Some(entry) = self.journal.iter().find(|e| e.message.id == message_id) {
            return Some(match entry.state {
                WriteState::InFlight => DeliveryState::Pending,
                WriteState::Written => DeliveryState::Sent,
                WriteState::Failed => DeliveryState::Failed,
            });
        }
        self.messages
            .iter()
            .any(|m| m.id == message_id)
            .then_some(DeliveryState::Confirmed)
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    fn entry_mut(&mut self, message_id: &str) -> Option<&mut PendingWrite> {
        self.journal
            .iter_mut()
            .find(|entry| entry.message.id == message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn remote(id: &str, millis: i64) -> Message {
        let mut message = Message::new("c1", "bob", "alice", id);
        message.id = id.to_string();
        message.timestamp = DateTime::from_timestamp_millis(millis).unwrap();
        message
    }

    #[test]
    fn optimistic_message_sits_after_snapshot_until_confirmed() {
        let mut timeline = LocalTimeline::new(RollbackPolicy::Remove);
        timeline.apply_snapshot(vec![remote("r1", 1_000)]);

        let mine = Message::new("c1", "alice", "bob", "hello");
        timeline.append_optimistic(mine.clone());
        assert_eq!(timeline.delivery_state(&mine.id), Some(DeliveryState::Pending));

        // A snapshot that does not yet include the write keeps it at the end.
        timeline.apply_snapshot(vec![remote("r1", 1_000), remote("r2", 9_999_999_999_999)]);
        assert_eq!(timeline.as_slice().last().unwrap().id, mine.id);

        timeline.apply_snapshot(vec![remote("r1", 1_000), mine.clone()]);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.delivery_state(&mine.id), Some(DeliveryState::Confirmed));
    }

    #[test]
    fn confirmed_message_moves_into_timestamp_order() {
        let mut timeline = LocalTimeline::new(RollbackPolicy::Remove);
        timeline.apply_snapshot(vec![remote("r1", 1_000)]);
        let mine = Message::new("c1", "alice", "bob", "hello");
        timeline.append_optimistic(mine.clone());

        let later = remote("r2", 9_999_999_999_999);
        timeline.apply_snapshot(vec![remote("r1", 1_000), later.clone()]);
        let ids: Vec<&str> = timeline.as_slice().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["r1", "r2", mine.id.as_str()]);

        // The store orders by timestamp, so the echo lands before `r2`.
        assert!(timeline.apply_snapshot(vec![remote("r1", 1_000), mine.clone(), later]));
        let ids: Vec<&str> = timeline.as_slice().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["r1", mine.id.as_str(), "r2"]);
        assert_eq!(timeline.delivery_state(&mine.id), Some(DeliveryState::Confirmed));
    }

    #[test]
    fn confirmation_never_duplicates() {
        let mut timeline = LocalTimeline::new(RollbackPolicy::Remove);
        let mine = Message::new("c1", "alice", "bob", "T");
        timeline.append_optimistic(mine.clone());
        timeline.mark_written(&mine.id);
        timeline.apply_snapshot(vec![mine.clone()]);

        let copies = timeline.as_slice().iter().filter(|m| m.id == mine.id).count();
        assert_eq!(copies, 1);
        assert_eq!(timeline.as_slice()[0].text, "T");
    }

    #[test]
    fn rollback_removes_and_records_failure() {
        let mut timeline = LocalTimeline::new(RollbackPolicy::Remove);
        timeline.apply_snapshot(vec![remote("r1", 1_000)]);
        let mine = Message::new("c1", "alice", "bob", "hello");
        timeline.append_optimistic(mine.clone());

        assert_eq!(timeline.rollback(&mine.id), Some(mine.clone()));
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.failed_messages(), [mine.clone()]);
        assert_eq!(timeline.rollback(&mine.id), None);
    }

    #[test]
    fn mark_failed_policy_keeps_message_visible() {
        let mut timeline = LocalTimeline::new(RollbackPolicy::MarkFailed);
        let mine = Message::new("c1", "alice", "bob", "hello");
        timeline.append_optimistic(mine.clone());
        timeline.rollback(&mine.id);

        assert!(timeline.contains(&mine.id));
        assert_eq!(timeline.delivery_state(&mine.id), Some(DeliveryState::Failed));
        timeline.apply_snapshot(Vec::new());
        assert!(timeline.contains(&mine.id));
    }

    #[test]
    fn confirmed_message_is_not_rolled_back() {
        let mut timeline = LocalTimeline::new(RollbackPolicy::Remove);
        let mine = Message::new("c1", "alice", "bob", "hello");
        timeline.append_optimistic(mine.clone());
        timeline.apply_snapshot(vec![mine.clone()]);

        assert_eq!(timeline.rollback(&mine.id), None);
        assert!(timeline.contains(&mine.id));
    }

    #[test]
    fn identical_snapshot_keeps_list_identity() {
        let mut timeline = LocalTimeline::new(RollbackPolicy::Remove);
        assert!(timeline.apply_snapshot(vec![remote("r1", 1_000)]));
        let before = timeline.messages();

        assert!(!timeline.apply_snapshot(vec![remote("r1", 1_000)]));
        assert!(Arc::ptr_eq(&before, &timeline.messages()));
    }
}
