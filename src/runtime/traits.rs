//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the dispatcher with mock implementations.

use super::InboundEvent;
use crate::db::{Database, DbError, RegistrationRecord};
use crate::notify::NotifyError;
use crate::state_machine::{ConversationState, UserIdentity};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Keyed storage of paused conversations, shared by every dispatch
#[async_trait]
pub trait ConversationCache: Send + Sync {
    /// Get the live state, `None` if absent or expired
    async fn get(&self, identity: UserIdentity) -> Result<Option<ConversationState>, String>;

    /// Store the state for `ttl`, overwriting any previous entry
    async fn put(&self, state: &ConversationState, ttl: Duration) -> Result<(), String>;

    /// Remove the state
    async fn delete(&self, identity: UserIdentity) -> Result<(), String>;
}

/// Failure from the user record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User already registered: {0}")]
    DuplicateIdentity(UserIdentity),
    #[error("{0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateIdentity(identity) => StoreError::DuplicateIdentity(identity),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Durable storage of registrations, one per identity
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists(&self, identity: UserIdentity) -> Result<bool, StoreError>;

    /// Insert a record; [`StoreError::DuplicateIdentity`] if one already exists
    async fn insert(&self, record: &RegistrationRecord) -> Result<i64, StoreError>;

    async fn find_by_identity(
        &self,
        identity: UserIdentity,
    ) -> Result<Option<RegistrationRecord>, StoreError>;
}

/// One-way delivery to the broadcast destination
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message, as HTML when `rich_text` is set
    async fn send(&self, message: &str, rich_text: bool) -> Result<(), NotifyError>;
}

/// Replies to the user who sent the inbound event
#[async_trait]
pub trait ChatOutbox: Send + Sync {
    async fn send(&self, identity: UserIdentity, text: &str) -> Result<(), NotifyError>;
}

/// Entry point the transport adapter hands inbound events to
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle_inbound(&self, event: &InboundEvent);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationCache + ?Sized> ConversationCache for Arc<T> {
    async fn get(&self, identity: UserIdentity) -> Result<Option<ConversationState>, String> {
        (**self).get(identity).await
    }

    async fn put(&self, state: &ConversationState, ttl: Duration) -> Result<(), String> {
        (**self).put(state, ttl).await
    }

    async fn delete(&self, identity: UserIdentity) -> Result<(), String> {
        (**self).delete(identity).await
    }
}

#[async_trait]
impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    async fn exists(&self, identity: UserIdentity) -> Result<bool, StoreError> {
        (**self).exists(identity).await
    }

    async fn insert(&self, record: &RegistrationRecord) -> Result<i64, StoreError> {
        (**self).insert(record).await
    }

    async fn find_by_identity(
        &self,
        identity: UserIdentity,
    ) -> Result<Option<RegistrationRecord>, StoreError> {
        (**self).find_by_identity(identity).await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send(&self, message: &str, rich_text: bool) -> Result<(), NotifyError> {
        (**self).send(message, rich_text).await
    }
}

#[async_trait]
impl<T: ChatOutbox + ?Sized> ChatOutbox for Arc<T> {
    async fn send(&self, identity: UserIdentity, text: &str) -> Result<(), NotifyError> {
        (**self).send(identity, text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as both conversation cache and user store
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationCache for DatabaseStorage {
    async fn get(&self, identity: UserIdentity) -> Result<Option<ConversationState>, String> {
        self.db
            .get_cached_state(identity, Utc::now())
            .map_err(|e| e.to_string())
    }

    async fn put(&self, state: &ConversationState, ttl: Duration) -> Result<(), String> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| format!("conversation TTL out of range: {ttl:?}"))?;
        self.db
            .put_cached_state(state, expires_at)
            .map_err(|e| e.to_string())
    }

    async fn delete(&self, identity: UserIdentity) -> Result<(), String> {
        self.db
            .delete_cached_state(identity)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl UserStore for DatabaseStorage {
    async fn exists(&self, identity: UserIdentity) -> Result<bool, StoreError> {
        Ok(self.db.user_exists(identity)?)
    }

    async fn insert(&self, record: &RegistrationRecord) -> Result<i64, StoreError> {
        Ok(self.db.insert_user(record)?)
    }

    async fn find_by_identity(
        &self,
        identity: UserIdentity,
    ) -> Result<Option<RegistrationRecord>, StoreError> {
        Ok(self.db.get_user_by_identity(identity)?)
    }
}
