//! Events that can occur in a conversation

/// Inbound events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User sent `/start`
    Start,

    /// User sent free text answering the pending prompt
    Answer { text: String },
}

impl Event {
    pub fn answer(text: impl Into<String>) -> Self {
        Event::Answer { text: text.into() }
    }
}
