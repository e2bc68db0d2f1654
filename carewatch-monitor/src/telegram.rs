//! Telegram Bot API transport and acknowledgement listener
//!
//! Outbound alerts go through `TelegramTransport` (sendMessage /
//! sendPhoto). Inbound acknowledgement is a separate long-poll task that
//! watches the configured chat for `/ok` and flips the dispatcher's
//! acknowledgement flag.

use crate::dispatcher::{AlertDispatcher, AlertTransport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use carewatch_common::messages::MessageCatalog;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout for getUpdates, seconds
const POLL_TIMEOUT_SECS: u64 = 30;

/// Back-off after a failed poll before trying again
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bot credentials read from the environment
#[derive(Debug, Clone)]
pub struct BotCredentials {
    token: String,
    chat_id: String,
}

impl BotCredentials {
    /// Read `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| Error::Config("TELEGRAM_BOT_TOKEN not set".to_string()))?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .map_err(|_| Error::Config("TELEGRAM_CHAT_ID not set".to_string()))?;
        Ok(Self { token, chat_id })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }
}

/// Outbound alert delivery over the Telegram Bot API
pub struct TelegramTransport {
    http: reqwest::Client,
    credentials: BotCredentials,
}

impl TelegramTransport {
    /// Build a transport with an explicit send timeout so a hung request
    /// surfaces as a notification error instead of wedging the frame loop.
    pub fn new(credentials: BotCredentials, send_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(send_timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { http, credentials })
    }

    fn notification_error(&self, reason: impl Into<String>) -> Error {
        Error::Notification {
            reason: reason.into(),
            recipient: self.credentials.chat_id.clone(),
        }
    }

    async fn check_response(&self, response: reqwest::Response, method: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.notification_error(format!("{} returned {}: {}", method, status, body)))
    }
}

#[async_trait]
impl AlertTransport for TelegramTransport {
    async fn send_text(&self, text: &str) -> Result<()> {
        let response = self
            .http
            .post(self.credentials.method_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": self.credentials.chat_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| self.notification_error(e.to_string()))?;

        self.check_response(response, "sendMessage").await
    }

    async fn send_photo(&self, photo: &Path, caption: &str) -> Result<()> {
        let bytes = tokio::fs::read(photo)
            .await
            .map_err(|e| self.notification_error(format!("cannot read snapshot: {}", e)))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("snapshot.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| self.notification_error(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.credentials.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", part);

        let response = self
            .http
            .post(self.credentials.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.notification_error(e.to_string()))?;

        self.check_response(response, "sendPhoto").await
    }
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// The getUpdates offset that skips past every update in the batch
fn next_offset(updates: &[Update]) -> Option<i64> {
    updates.iter().map(|u| u.update_id + 1).max()
}

/// Watches the bot chat for the `/ok` acknowledgement command.
///
/// Runs as an independent task; the frame loop never waits on it. The
/// confirmation reply is fire-and-forget.
pub struct AckListener {
    http: reqwest::Client,
    credentials: BotCredentials,
    dispatcher: Arc<AlertDispatcher>,
    catalog: Arc<MessageCatalog>,
}

impl AckListener {
    pub fn new(
        credentials: BotCredentials,
        dispatcher: Arc<AlertDispatcher>,
        catalog: Arc<MessageCatalog>,
    ) -> Result<Self> {
        // Client timeout must outlast the long-poll window
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            credentials,
            dispatcher,
            catalog,
        })
    }

    /// Poll forever. Errors back off and continue; this task only ends with
    /// the process.
    pub async fn run(self) {
        // Acknowledgement state is process-lifetime, so commands queued
        // while the process was down are stale and must not apply here.
        let mut offset: i64 = 0;
        match self.poll(0, 0).await {
            Ok(updates) => {
                if let Some(next) = next_offset(&updates) {
                    debug!(skipped = updates.len(), "discarded updates from before startup");
                    offset = next;
                }
            }
            Err(e) => {
                warn!(error = %e, "could not drain pending updates, processing backlog");
            }
        }

        info!("acknowledgement listener started");
        loop {
            match self.poll(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => {
                    if let Some(next) = next_offset(&updates) {
                        offset = offset.max(next);
                    }
                    for update in updates {
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "acknowledgement poll failed, retrying");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn poll(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let response = self
            .http
            .post(self.credentials.method_url("getUpdates"))
            .json(&serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }))
            .send()
            .await
            .map_err(|e| Error::Notification {
                reason: e.to_string(),
                recipient: self.credentials.chat_id.clone(),
            })?;

        let updates: UpdatesResponse = response.json().await.map_err(|e| Error::Notification {
            reason: format!("malformed getUpdates response: {}", e),
            recipient: self.credentials.chat_id.clone(),
        })?;

        if !updates.ok {
            return Err(Error::Notification {
                reason: "getUpdates returned ok=false".to_string(),
                recipient: self.credentials.chat_id.clone(),
            });
        }

        Ok(updates.result)
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        if message.chat.id.to_string() != self.credentials.chat_id {
            debug!(chat_id = message.chat.id, "ignoring message from foreign chat");
            return;
        }
        let Some(text) = message.text else {
            return;
        };
        if text.trim() != "/ok" {
            return;
        }

        self.dispatcher.acknowledge();

        // Fire-and-forget confirmation; a failed reply is logged, not retried
        let reply = self
            .catalog
            .get("alerts.acknowledged")
            .unwrap_or("Alert acknowledged. Stopping notifications.");
        if let Err(e) = self.send_reply(reply).await {
            warn!(error = %e, "failed to send acknowledgement confirmation");
        }
    }

    async fn send_reply(&self, text: &str) -> Result<()> {
        let response = self
            .http
            .post(self.credentials.method_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": self.credentials.chat_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| Error::Notification {
                reason: e.to_string(),
                recipient: self.credentials.chat_id.clone(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Notification {
                reason: format!("sendMessage returned {}", status),
                recipient: self.credentials.chat_id.clone(),
            });
        }
        Ok(())
    }
}
