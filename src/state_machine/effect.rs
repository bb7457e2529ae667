//! Effects produced by state transitions

use super::state::{ConversationState, NewRegistration};

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a chat message to the user
    Say { text: String },

    /// Write the state to the conversation cache (refreshes the TTL)
    PersistState(ConversationState),

    /// Remove the state from the conversation cache
    ClearState,

    /// Store the registration, notify the broadcast channel, report the outcome
    Register(NewRegistration),
}

impl Effect {
    pub fn say(text: impl Into<String>) -> Self {
        Effect::Say { text: text.into() }
    }
}
