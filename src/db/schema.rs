//! Database schema and types

pub use crate::state_machine::state::UserIdentity;
use chrono::{DateTime, Utc};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    programming_language TEXT NOT NULL,
    registered_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS conversation_cache (
    identity INTEGER PRIMARY KEY,
    state TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversation_cache_expires ON conversation_cache(expires_at);
";

/// A registered user. Written once per identity, never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub identity: UserIdentity,
    pub display_name: String,
    pub programming_language: String,
    pub registered_at: DateTime<Utc>,
}

impl RegistrationRecord {
    pub fn new(
        identity: UserIdentity,
        display_name: impl Into<String>,
        programming_language: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            programming_language: programming_language.into(),
            registered_at,
        }
    }
}
