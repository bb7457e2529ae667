//! Outbound Telegram messaging
//!
//! Formatting of the broadcast announcement plus the Bot API client used for
//! both the broadcast channel and replies to users.

mod telegram;

pub use telegram::{TelegramClient, TelegramNotifier, TelegramOutbox};

use crate::db::RegistrationRecord;
use thiserror::Error;

/// Why a message could not be delivered
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {description}")]
    Status { status: u16, description: String },
    #[error("Telegram API error: {0}")]
    Api(String),
    #[error("Malformed response body: {0}")]
    MalformedBody(String),
}

/// Build the HTML announcement for a completed registration
pub fn format_registration_message(record: &RegistrationRecord) -> String {
    let mut message = String::from("✅ <b>New Registration</b>\n\n");
    message.push_str(&format!(
        "<b>Name:</b> {}\n",
        escape_html(&record.display_name)
    ));
    message.push_str(&format!(
        "<b>Programming Language:</b> {}\n",
        escape_html(&record.programming_language)
    ));
    message.push_str(&format!(
        "<b>Telegram ID:</b> <code>{}</code>\n",
        record.identity
    ));
    message.push_str(&format!(
        "<b>Time:</b> {}\n",
        record.registered_at.format("%Y-%m-%d %H:%M:%S")
    ));
    message
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
