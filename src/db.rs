//! Database module for the registration bot
//!
//! Provides persistence for registered users and for the conversation cache
//! that carries paused conversations between webhook deliveries.

mod schema;

pub use schema::*;

use crate::state_machine::ConversationState;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("User already registered: {0}")]
    DuplicateIdentity(UserIdentity),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle.
///
/// Built once by the process and handed to whatever needs it; clones share
/// the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== User Operations ====================

    /// Check if a user is already registered
    pub fn user_exists(&self, identity: UserIdentity) -> DbResult<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE telegram_id = ?1",
            params![identity.0],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a registration, returning the new row id.
    ///
    /// The UNIQUE constraint on `telegram_id` is what keeps two racing
    /// completions from both landing; a violation of it maps to
    /// [`DbError::DuplicateIdentity`]. Other constraint failures stay
    /// [`DbError::Sqlite`].
    pub fn insert_user(&self, record: &RegistrationRecord) -> DbResult<i64> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO users (telegram_id, name, programming_language, registered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.identity.0,
                record.display_name,
                record.programming_language,
                record.registered_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(DbError::DuplicateIdentity(record.identity))
            }
            Err(e) => Err(DbError::Sqlite(e)),
        }
    }

    /// Get a registered user by identity
    pub fn get_user_by_identity(
        &self,
        identity: UserIdentity,
    ) -> DbResult<Option<RegistrationRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT telegram_id, name, programming_language, registered_at
             FROM users WHERE telegram_id = ?1 LIMIT 1",
            params![identity.0],
            |row| {
                Ok(RegistrationRecord {
                    identity: UserIdentity(row.get(0)?),
                    display_name: row.get(1)?,
                    programming_language: row.get(2)?,
                    registered_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(DbError::from)
    }

    // ==================== Conversation Cache Operations ====================

    /// Get the live conversation state for an identity.
    ///
    /// Entries whose expiry is at or before `now` are treated as absent and
    /// removed. An entry that no longer deserializes is dropped the same way.
    pub fn get_cached_state(
        &self,
        identity: UserIdentity,
        now: DateTime<Utc>,
    ) -> DbResult<Option<ConversationState>> {
        let conn = self.conn()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT state, expires_at FROM conversation_cache WHERE identity = ?1",
                params![identity.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((state_json, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= now.timestamp_millis() {
            conn.execute(
                "DELETE FROM conversation_cache WHERE identity = ?1 AND expires_at <= ?2",
                params![identity.0, now.timestamp_millis()],
            )?;
            tracing::debug!(%identity, "Dropped expired conversation state");
            return Ok(None);
        }

        match ConversationState::from_json(&state_json) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(%identity, error = %e, "Dropping unreadable conversation state");
                conn.execute(
                    "DELETE FROM conversation_cache WHERE identity = ?1",
                    params![identity.0],
                )?;
                Ok(None)
            }
        }
    }

    /// Write the conversation state, replacing any previous entry
    pub fn put_cached_state(
        &self,
        state: &ConversationState,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let state_json = state.to_json()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO conversation_cache (identity, state, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(identity) DO UPDATE SET state = excluded.state, expires_at = excluded.expires_at",
            params![state.identity.0, state_json, expires_at.timestamp_millis()],
        )?;
        Ok(())
    }

    /// Remove the conversation state for an identity
    pub fn delete_cached_state(&self, identity: UserIdentity) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM conversation_cache WHERE identity = ?1",
            params![identity.0],
        )?;
        Ok(())
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired_states(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM conversation_cache WHERE expires_at <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(removed)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
