//! Conversation state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompt asking for the display name
pub const ASK_NAME: &str = "What is your name?";

/// Prompt asking for the programming language
pub const ASK_LANGUAGE: &str = "Do you know any programming language?";

/// Stable chat user handle issued by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(pub i64);

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserIdentity {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Step of an in-progress conversation, carrying what has been collected so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Name prompt sent, waiting for the answer
    AwaitingName,

    /// Name collected, language prompt sent
    AwaitingLanguage { display_name: String },
}

impl Step {
    /// The prompt the user is currently expected to answer
    pub fn pending_prompt(&self) -> &'static str {
        match self {
            Step::AwaitingName => ASK_NAME,
            Step::AwaitingLanguage { .. } => ASK_LANGUAGE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::AwaitingName => "awaiting_name",
            Step::AwaitingLanguage { .. } => "awaiting_language",
        }
    }
}

/// Paused state of one live conversation.
///
/// This is the only thing that survives between two inbound events: it is
/// written to the conversation cache after every step and read back on the
/// next dispatch. Absence of a cached value is the idle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub identity: UserIdentity,
    pub step: Step,
}

impl ConversationState {
    /// Fresh conversation waiting for the name
    pub fn new(identity: UserIdentity) -> Self {
        Self {
            identity,
            step: Step::AwaitingName,
        }
    }

    /// Serialize for the conversation cache
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a cached value
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Answers collected by a finished conversation, handed to the record store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub identity: UserIdentity,
    pub display_name: String,
    pub programming_language: String,
}
