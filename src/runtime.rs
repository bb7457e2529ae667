//! Runtime for executing conversations
//!
//! Every inbound event is handled by an independent, short-lived dispatch:
//! load the cached state, run the pure transition, execute its effects. The
//! conversation cache is the only continuity between dispatches.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{Dispatcher, RegistrationOutcome};
pub use traits::*;

use crate::notify::{TelegramNotifier, TelegramOutbox};
use crate::state_machine::{Event, UserIdentity};

/// Type alias for production dispatcher with concrete implementations
pub type ProductionDispatcher =
    Dispatcher<DatabaseStorage, DatabaseStorage, TelegramNotifier, TelegramOutbox>;

/// Command that begins (or resumes) a conversation
pub const START_COMMAND: &str = "/start";

/// A message delivered by the chat transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub identity: UserIdentity,
    pub text: String,
    /// Leading `/command` token, without any `@botname` suffix
    pub command: Option<String>,
}

impl InboundEvent {
    /// Build from raw message text, extracting a leading command if present
    pub fn from_text(identity: UserIdentity, text: impl Into<String>) -> Self {
        let text = text.into();
        let command = text
            .starts_with('/')
            .then(|| text.split_whitespace().next())
            .flatten()
            .and_then(|token| token.split('@').next())
            .filter(|c| c.len() > 1)
            .map(str::to_string);
        Self {
            identity,
            text,
            command,
        }
    }

    /// State machine event for this message. `/start` begins or resumes;
    /// everything else, other commands included, answers the pending prompt.
    pub fn to_event(&self) -> Event {
        match self.command.as_deref() {
            Some(START_COMMAND) => Event::Start,
            _ => Event::answer(self.text.clone()),
        }
    }
}
