//! Optimistic message synchronization.
//!
//! A [`ChatSession`] owns the visible message list for one conversation and
//! is only mutated from its owner's context. A background worker task owns the
//! live subscription and performs writes, reporting back over a channel.

pub mod backoff;
pub mod session;
pub mod timeline;
mod worker;

pub use backoff::Backoff;
pub use session::{ChatSession, SessionEvent};
pub use timeline::LocalTimeline;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to an optimistic message whose write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// Drop it from the visible list; it stays available in the session's
    /// failed list.
    #[default]
    Remove,
    /// Keep it visible with [`crate::common::DeliveryState::Failed`].
    MarkFailed,
}

/// Exponential backoff for re-opening a dropped subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub reconnect: ReconnectPolicy,
    pub rollback: RollbackPolicy,
}
