//! Mock implementations for testing
//!
//! These mocks enable dispatcher testing without real I/O.

use super::executor::Dispatcher;
use super::traits::*;
use crate::db::RegistrationRecord;
use crate::notify::NotifyError;
use crate::state_machine::{ConversationState, UserIdentity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

// ============================================================================
// Mock Conversation Cache
// ============================================================================

/// In-memory cache with a manually advanced clock
pub struct MockCache {
    entries: Mutex<HashMap<UserIdentity, (ConversationState, DateTime<Utc>)>>,
    now: Mutex<DateTime<Utc>>,
    failing: AtomicBool,
    /// Fail writes only; reads and deletes still work
    put_failing: AtomicBool,
}

#[allow(dead_code)]
impl MockCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            now: Mutex::new(Utc::now()),
            failing: AtomicBool::new(false),
            put_failing: AtomicBool::new(false),
        }
    }

    /// Move the cache clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_put_failing(&self, failing: bool) {
        self.put_failing.store(failing, Ordering::SeqCst);
    }

    /// Live state for an identity, ignoring failure injection
    pub fn peek(&self, identity: UserIdentity) -> Option<ConversationState> {
        let now = *self.now.lock().unwrap();
        self.entries
            .lock()
            .unwrap()
            .get(&identity)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(state, _)| state.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            Err("cache unavailable".to_string())
        } else {
            Ok(())
        }
    }
}

impl Default for MockCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationCache for MockCache {
    async fn get(&self, identity: UserIdentity) -> Result<Option<ConversationState>, String> {
        self.check()?;
        let now = *self.now.lock().unwrap();
        let mut entries = self.entries.lock().unwrap();
        let expired = matches!(entries.get(&identity), Some((_, expires_at)) if *expires_at <= now);
        if expired {
            entries.remove(&identity);
            return Ok(None);
        }
        Ok(entries.get(&identity).map(|(state, _)| state.clone()))
    }

    async fn put(&self, state: &ConversationState, ttl: Duration) -> Result<(), String> {
        self.check()?;
        if self.put_failing.load(Ordering::SeqCst) {
            return Err("cache write rejected".to_string());
        }
        let expires_at = *self.now.lock().unwrap() + chrono::Duration::from_std(ttl).unwrap();
        self.entries
            .lock()
            .unwrap()
            .insert(state.identity, (state.clone(), expires_at));
        Ok(())
    }

    async fn delete(&self, identity: UserIdentity) -> Result<(), String> {
        self.check()?;
        self.entries.lock().unwrap().remove(&identity);
        Ok(())
    }
}

// ============================================================================
// Mock User Store
// ============================================================================

/// In-memory user store enforcing one record per identity
#[derive(Default)]
pub struct MockUserStore {
    records: Mutex<Vec<RegistrationRecord>>,
    failing: AtomicBool,
    /// Report "not registered" from `exists` regardless of contents, as a
    /// worker that lost a race would observe
    stale_exists: AtomicBool,
    /// When set, every `exists` call waits here before answering
    exists_gate: Mutex<Option<Arc<Barrier>>>,
}

#[allow(dead_code)]
impl MockUserStore {
    pub fn seed(&self, record: RegistrationRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn records(&self) -> Vec<RegistrationRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_stale_exists(&self, stale: bool) {
        self.stale_exists.store(stale, Ordering::SeqCst);
    }

    /// Hold `parties` concurrent `exists` calls until all have answered, so
    /// each has loaded its conversation state and will attempt the insert
    pub fn gate_exists(&self, parties: usize) {
        *self.exists_gate.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Backend("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn exists(&self, identity: UserIdentity) -> Result<bool, StoreError> {
        self.check()?;
        let registered = !self.stale_exists.load(Ordering::SeqCst)
            && self
                .records
                .lock()
                .unwrap()
                .iter()
                .any(|r| r.identity == identity);
        // Answer is fixed before waiting, so every gated caller goes on to insert
        let gate = self.exists_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        Ok(registered)
    }

    async fn insert(&self, record: &RegistrationRecord) -> Result<i64, StoreError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.identity == record.identity) {
            return Err(StoreError::DuplicateIdentity(record.identity));
        }
        records.push(record.clone());
        Ok(i64::try_from(records.len()).unwrap())
    }

    async fn find_by_identity(
        &self,
        identity: UserIdentity,
    ) -> Result<Option<RegistrationRecord>, StoreError> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.identity == identity)
            .cloned())
    }
}

// ============================================================================
// Recording Notifier / Outbox
// ============================================================================

/// Notifier that records delivered messages
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, bool)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    /// Delivered messages with their rich-text flag
    pub fn sent(&self) -> Vec<(String, bool)> {
        self.sent.lock().unwrap().clone()
    }

    /// Every call, delivered or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str, rich_text: bool) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Api("Forbidden: bot is not a member".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.to_string(), rich_text));
        Ok(())
    }
}

/// Outbox that records chat replies (even when reporting failure)
#[derive(Default)]
pub struct RecordingOutbox {
    messages: Mutex<Vec<(UserIdentity, String)>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingOutbox {
    pub fn messages_for(&self, identity: UserIdentity) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == identity)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatOutbox for RecordingOutbox {
    async fn send(&self, identity: UserIdentity, text: &str) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .unwrap()
            .push((identity, text.to_string()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Api("Forbidden: bot was blocked by the user".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Test Dispatcher
// ============================================================================

pub type MockDispatcher = Dispatcher<
    Arc<MockCache>,
    Arc<MockUserStore>,
    Arc<RecordingNotifier>,
    Arc<RecordingOutbox>,
>;

/// Dispatcher wired to mocks, with handles to inspect them
pub struct TestDispatcher {
    pub dispatcher: MockDispatcher,
    pub cache: Arc<MockCache>,
    pub users: Arc<MockUserStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub outbox: Arc<RecordingOutbox>,
}

/// Dispatcher with a 120 second conversation TTL
pub fn test_dispatcher() -> TestDispatcher {
    let cache = Arc::new(MockCache::new());
    let users = Arc::new(MockUserStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let outbox = Arc::new(RecordingOutbox::default());
    TestDispatcher {
        dispatcher: Dispatcher::new(
            Arc::clone(&cache),
            Arc::clone(&users),
            Arc::clone(&notifier),
            Arc::clone(&outbox),
            Duration::from_secs(120),
        ),
        cache,
        users,
        notifier,
        outbox,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_cache_expiry() {
        let cache = MockCache::new();
        let state = ConversationState::new(UserIdentity(1));
        cache.put(&state, Duration::from_secs(10)).await.unwrap();

        cache.advance(Duration::from_secs(9));
        assert_eq!(cache.get(UserIdentity(1)).await.unwrap(), Some(state));

        cache.advance(Duration::from_secs(1));
        assert_eq!(cache.get(UserIdentity(1)).await.unwrap(), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_mock_user_store_uniqueness() {
        let store = MockUserStore::default();
        let record = RegistrationRecord::new(UserIdentity(1), "Ada", "Rust", Utc::now());
        store.insert(&record).await.unwrap();
        assert!(matches!(
            store.insert(&record).await,
            Err(StoreError::DuplicateIdentity(UserIdentity(1)))
        ));
        assert_eq!(store.records().len(), 1);
    }
}
