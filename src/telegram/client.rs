// =============================================================================
// Telegram Bot API Client — long polling + message sending
// =============================================================================
//
// SECURITY: the bot token is part of every URL, so URLs are never logged and
// the `Debug` impl redacts the token.
// =============================================================================

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::types::{ApiResponse, InlineKeyboardMarkup, Update};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    /// `poll_timeout_secs` is the long-poll timeout; the HTTP timeout is set a
    /// little above it so `getUpdates` is never cut off client-side.
    pub fn new(token: impl Into<String>, poll_timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;

        let status = resp.status();
        let envelope: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("failed to parse Telegram {method} response"))?;

        if !envelope.ok {
            anyhow::bail!(
                "Telegram {} returned {} ({}): {}",
                method,
                status,
                envelope.error_code.unwrap_or_default(),
                envelope.description.unwrap_or_default()
            );
        }

        envelope
            .result
            .with_context(|| format!("Telegram {method} response has no result"))
    }

    /// Long-poll for updates with id >= `offset`.
    #[instrument(skip(self), name = "telegram::get_updates")]
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": timeout_secs,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "updates received");
        }
        Ok(updates)
    }

    #[instrument(skip(self, text, keyboard), name = "telegram::send_message")]
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb)?;
        }
        let _: serde_json::Value = self.call("sendMessage", body).await?;
        Ok(())
    }

    #[instrument(skip(self, text, keyboard), name = "telegram::edit_message_text")]
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb)?;
        }
        let _: serde_json::Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    #[instrument(skip(self), name = "telegram::answer_callback_query")]
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                json!({ "callback_query_id": callback_query_id }),
            )
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let client = TelegramClient::new("123:SECRET", 30).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("<redacted>"));
    }
}
