//! Telegram webhook payload types
//!
//! Only the fields the bot reads; everything else in an update is ignored.

use crate::runtime::InboundEvent;
use crate::state_machine::UserIdentity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Incoming update delivered to the webhook
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Why an update cannot be turned into an inbound event
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed update: {0}")]
    Malformed(String),
    #[error("Update {0} carries no message")]
    NoMessage(i64),
    #[error("Message has no sender")]
    NoSender,
    #[error("Message sent by a bot")]
    FromBot,
    #[error("Message is not in a private chat ({0})")]
    NotPrivateChat(String),
    #[error("Message has no text")]
    NoText,
}

impl Update {
    /// Extract the sender and text. Replies go to the sender's identity,
    /// so only private chats qualify.
    pub fn into_inbound(self) -> Result<InboundEvent, ValidationError> {
        let message = self.message.ok_or(ValidationError::NoMessage(self.update_id))?;
        let from = message.from.ok_or(ValidationError::NoSender)?;
        if from.is_bot {
            return Err(ValidationError::FromBot);
        }
        if message.chat.kind != "private" {
            return Err(ValidationError::NotPrivateChat(message.chat.kind));
        }
        let text = message.text.ok_or(ValidationError::NoText)?;
        Ok(InboundEvent::from_text(UserIdentity(from.id), text))
    }
}

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub ok: bool,
    /// Whether the update reached the conversation
    pub handled: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
