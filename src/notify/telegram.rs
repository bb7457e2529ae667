//! Telegram Bot API client

use super::NotifyError;
use crate::runtime::{ChatOutbox, Notifier};
use crate::state_machine::UserIdentity;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a single Bot API call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Minimal Bot API client: `sendMessage` only
pub struct TelegramClient {
    client: Client,
    /// `{api_url}/bot{token}`; never logged
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str, api_url: &str) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    /// Send a message to a chat, channel id, or `@channelusername`.
    ///
    /// Success means a 2xx response whose JSON body has `ok: true`.
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_html: bool,
    ) -> Result<(), NotifyError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: parse_html.then_some("HTML"),
        };

        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&request)
            .send()
            .await
            // The URL carries the bot token
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            let description = serde_json::from_str::<ApiResponse>(&body)
                .ok()
                .and_then(|r| r.description)
                .unwrap_or(body);
            return Err(NotifyError::Status {
                status: status.as_u16(),
                description,
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| NotifyError::MalformedBody(e.to_string()))?;

        if parsed.ok {
            Ok(())
        } else {
            Err(NotifyError::Api(
                parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            ))
        }
    }
}

/// Posts registration announcements to the broadcast channel
pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
    channel_id: String,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>, channel_id: impl Into<String>) -> Self {
        Self {
            client,
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str, rich_text: bool) -> Result<(), NotifyError> {
        self.client
            .send_message(&self.channel_id, message, rich_text)
            .await
    }
}

/// Sends chat replies back to users. On Telegram a private chat id equals
/// the user id, so the identity is the destination.
pub struct TelegramOutbox {
    client: Arc<TelegramClient>,
}

impl TelegramOutbox {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatOutbox for TelegramOutbox {
    async fn send(&self, identity: UserIdentity, text: &str) -> Result<(), NotifyError> {
        self.client
            .send_message(&identity.to_string(), text, false)
            .await
    }
}
