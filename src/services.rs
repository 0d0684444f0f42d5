use std::path::Path;
use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::error::{SessionError, StoreError};
use crate::identity::{IdentityProvider, StaticIdentity};
use crate::storage::{DocumentStore, MemoryStore, SqliteStore};
use crate::sync::ChatSession;

/// Process-wide handles, built once at startup and passed to whatever needs
/// them.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: AppConfig,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            identity,
            config,
        }
    }

    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => {
                log::info!("Using in-memory document store");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Sqlite => {
                log::info!("Using SQLite document store at {}", config.store.sqlite_path);
                Arc::new(SqliteStore::open(Path::new(&config.store.sqlite_path))?)
            }
        };
        let identity: Arc<dyn IdentityProvider> = match &config.user_id {
            Some(user_id) => Arc::new(StaticIdentity::signed_in(user_id.clone())),
            None => Arc::new(StaticIdentity::signed_out()),
        };
        Ok(Self::new(store, identity, config))
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.identity.current_user_id()
    }

    pub async fn open_chat(&self, conversation_id: &str) -> Result<ChatSession, SessionError> {
        ChatSession::open_by_id(
            Arc::clone(&self.store),
            self.identity.as_ref(),
            conversation_id,
            &self.config.sync,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Conversation;

    #[tokio::test]
    async fn open_chat_requires_sign_in() {
        let services = AppServices::from_config(AppConfig::default()).unwrap();
        let conversation = Conversation::new("c1", "alice", "bob").unwrap();
        services.store.put_conversation(&conversation).await.unwrap();

        let err = services.open_chat("c1").await.err().unwrap();
        assert!(matches!(err, SessionError::NotSignedIn));
    }

    #[tokio::test]
    async fn open_chat_reports_missing_conversation() {
        let config = AppConfig {
            user_id: Some("alice".into()),
            ..AppConfig::default()
        };
        let services = AppServices::from_config(config).unwrap();
        let err = services.open_chat("nope").await.err().unwrap();
        assert!(matches!(err, SessionError::ConversationNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn sqlite_backend_is_selected_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig {
            user_id: Some("alice".into()),
            ..AppConfig::default()
        };
        config.store.backend = StoreBackend::Sqlite;
        config.store.sqlite_path = dir.path().join("db").join("chat.db").display().to_string();

        let services = AppServices::from_config(config).unwrap();
        let conversation = Conversation::new("c1", "alice", "bob").unwrap();
        services.store.put_conversation(&conversation).await.unwrap();

        let session = services.open_chat("c1").await.unwrap();
        assert_eq!(session.current_user_id(), "alice");
        session.close().await;
    }
}
