//! Telegram Bot API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use trackwire_core::config::TelegramConfig;
use trackwire_core::error::{Result, TrackWireError};
use trackwire_core::traits::Messenger;

/// Telegram Bot API client with long polling.
pub struct TelegramClient {
    config: TelegramConfig,
    client: reqwest::Client,
    /// Highest update id seen so far; getUpdates resumes from here.
    last_update_id: AtomicI64,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            last_update_id: AtomicI64::new(0),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{}",
            self.config.bot_token, method
        )
    }

    /// Send a MarkdownV2 message to a specific chat.
    pub async fn send_markdown(&self, chat_id: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| TrackWireError::Telegram(format!("sendMessage failed: {e}")))?;

        let result: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| TrackWireError::Telegram(format!("invalid send response: {e}")))?;

        if !result.ok {
            return Err(TrackWireError::Telegram(format!(
                "sendMessage rejected: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Get updates using long polling. Resumes from the last seen update id.
    pub async fn get_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::SeqCst) + 1;
        let poll_timeout = self.config.poll_timeout_secs;
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", poll_timeout.to_string()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            // request timeout must outlast the long-poll window
            .timeout(Duration::from_secs(poll_timeout + 10))
            .send()
            .await
            .map_err(|e| TrackWireError::Telegram(format!("getUpdates failed: {e}")))?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| TrackWireError::Telegram(format!("invalid updates response: {e}")))?;

        if !body.ok {
            return Err(TrackWireError::Telegram(format!(
                "getUpdates rejected: {}",
                body.description.unwrap_or_default()
            )));
        }

        let updates = body.result.unwrap_or_default();
        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }
        Ok(updates)
    }

    /// Bot identity check, used at startup to validate the token.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| TrackWireError::Telegram(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| TrackWireError::Telegram(format!("invalid getMe response: {e}")))?;
        body.result
            .ok_or_else(|| TrackWireError::Telegram("no bot info in getMe response".into()))
    }

    /// The operator chat id commands reply to.
    pub fn pm_chat_id(&self) -> &str {
        &self.config.pm_chat_id
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_to_pm(&self, text: &str) -> Result<()> {
        if self.config.pm_chat_id.is_empty() {
            return Err(TrackWireError::Telegram("pm_chat_id is not configured".into()));
        }
        self.send_markdown(&self.config.pm_chat_id, text).await
    }
}

// --- Telegram API types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl TelegramUpdate {
    /// The command-relevant text of this update, skipping bot echoes.
    pub fn command_text(&self) -> Option<(&str, i64)> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_deref()?;
        if msg.from.as_ref().is_some_and(|f| f.is_bot) {
            return None;
        }
        Some((text, msg.chat.id))
    }
}
