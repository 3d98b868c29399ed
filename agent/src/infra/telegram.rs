//! Telegram Bot API sender — implements `MessageSender`.

use std::time::Duration;

use async_trait::async_trait;
use outpost_common::ChatRef;
use serde::Deserialize;
use serde_json::json;

use crate::application::ports::MessageSender;
use crate::domain::{DeliveryError, InteractiveAction};

/// Telegram caps message text at 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramSender {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl TelegramSender {
    #[must_use]
    pub fn new(client: reqwest::Client, api_base: &str, token: &str, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: format!("{}/bot{token}/sendMessage", api_base.trim_end_matches('/')),
            timeout,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> DeliveryError {
        if e.is_timeout() {
            return DeliveryError::Other(format!("no reply within {:?}", self.timeout));
        }
        // The token is part of the URL; never echo the request.
        DeliveryError::Other(e.without_url().to_string())
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn deliver(
        &self,
        chat_ref: ChatRef,
        text: &str,
        action: Option<&InteractiveAction>,
    ) -> Result<(), DeliveryError> {
        let body = message_body(chat_ref, text, action);
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let reply: Option<ApiReply> = response.json().await.ok();
        match reply {
            Some(ApiReply { ok: true, .. }) => Ok(()),
            Some(ApiReply { description, .. }) => Err(classify_failure(
                status,
                description.as_deref().unwrap_or_default(),
            )),
            None => Err(classify_failure(status, "")),
        }
    }
}

/// Builds the `sendMessage` payload, with an inline keyboard when an action is given.
#[must_use]
pub fn message_body(
    chat_ref: ChatRef,
    text: &str,
    action: Option<&InteractiveAction>,
) -> serde_json::Value {
    let text: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    let mut body = json!({
        "chat_id": chat_ref,
        "text": text,
        "disable_web_page_preview": true,
    });
    if let Some(action) = action {
        body["reply_markup"] = json!({
            "inline_keyboard": [[{
                "text": action.label,
                "callback_data": action.callback,
            }]]
        });
    }
    body
}

/// Maps a Bot API failure onto retry semantics.
#[must_use]
pub fn classify_failure(status: u16, description: &str) -> DeliveryError {
    let lower = description.to_lowercase();
    let gone = status == 403
        || lower.contains("chat not found")
        || lower.contains("user is deactivated")
        || lower.contains("bot was blocked");
    let detail = if description.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {description}")
    };
    if gone {
        DeliveryError::Unreachable(detail)
    } else {
        DeliveryError::Other(detail)
    }
}
