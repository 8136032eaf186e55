use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use reqwest::Client;
use serde_json::{Value, json};
use strum::{AsRefStr, EnumString, IntoStaticStr};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::config::{DEFAULT_PREVIEW_CHARS, LlmConfig};
use crate::models::error::ChatError;
use crate::traits::chat_api::ChatApi;

pub const NO_RESPONSE: &str = "No response received from the AI.";
pub const INVALID_RESPONSE: &str = "Invalid response received.";

/// Request/response shape spoken to the completion endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, IntoStaticStr, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CompletionStyle {
    /// `POST /chat/completions` with `messages`, answer at `choices[0].message.content`
    #[default]
    Chat,
    /// `POST /completions` with a single `prompt`, answer at `choices[0].text`
    Text,
}

impl CompletionStyle {
    fn path(&self) -> &'static str {
        match self {
            CompletionStyle::Chat => "chat/completions",
            CompletionStyle::Text => "completions",
        }
    }

    fn request_body(&self, model: &str, prompt: &str) -> Value {
        match self {
            CompletionStyle::Chat => json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
            }),
            CompletionStyle::Text => json!({
                "model": model,
                "prompt": prompt,
            }),
        }
    }
}

/// Pulls the answer text out of a completion response.
///
/// Never fails: a missing `choices` array yields [`NO_RESPONSE`] and a non-string
/// answer yields [`INVALID_RESPONSE`].
pub fn extract_answer(response: &Value, style: CompletionStyle) -> String {
    let Some(first) = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    else {
        return NO_RESPONSE.to_string();
    };
    let content = match style {
        CompletionStyle::Chat => first.get("message").and_then(|m| m.get("content")),
        CompletionStyle::Text => first.get("text"),
    };
    content
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| INVALID_RESPONSE.to_string())
}

fn preview(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

/// [`ChatApi`] over a hosted completion endpoint (Mistral by default).
#[derive(Debug, Builder)]
pub struct HttpChatApi {
    #[builder(default = Client::new())]
    client: Client,
    #[builder(into)]
    base_url: String,
    #[builder(into)]
    model: String,
    #[builder(into, default = crate::models::config::DEFAULT_PROVIDER.to_string())]
    provider: String,
    api_key: Option<String>,
    #[builder(default)]
    style: CompletionStyle,
    timeout: Option<Duration>,
    #[builder(default = DEFAULT_PREVIEW_CHARS)]
    preview_chars: usize,
}

impl HttpChatApi {
    pub fn from_config(llm: &LlmConfig) -> Self {
        let style = llm
            .style
            .as_deref()
            .and_then(|s| {
                s.parse::<CompletionStyle>()
                    .inspect_err(|_| warn!(style = %s, "unknown llm.style, using chat"))
                    .ok()
            })
            .unwrap_or_default();
        Self::builder()
            .base_url(llm.base_url())
            .model(llm.model())
            .provider(llm.provider())
            .maybe_api_key(llm.resolve_api_key())
            .style(style)
            .maybe_timeout(llm.request_timeout())
            .preview_chars(llm.preview_chars())
            .build()
    }

    pub fn style(&self) -> CompletionStyle {
        self.style
    }

    fn map_transport(&self, e: reqwest::Error) -> ChatError {
        match self.timeout {
            Some(t) if e.is_timeout() => ChatError::Timeout(t),
            _ => ChatError::Http(e),
        }
    }

    async fn send(&self, api_key: &str, prompt: &str) -> Result<String, ChatError> {
        let url = format!("{}/{}", self.base_url, self.style.path());
        let mut request = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.style.request_body(&self.model, prompt));
        if let Some(t) = self.timeout {
            request = request.timeout(t);
        }

        let response = request.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: preview(&body, self.preview_chars),
            });
        }
        let bytes = response.bytes().await.map_err(|e| self.map_transport(e))?;
        let value: Value = serde_json::from_slice(&bytes)?;
        Ok(extract_answer(&value, self.style))
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn call_chat_api(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::MissingCredential { provider: self.provider.clone() })?;

        info!(
            model = %self.model,
            style = self.style.as_ref(),
            prompt_len = prompt.len(),
            prompt_preview = %preview(prompt, self.preview_chars),
            "chat api: request"
        );

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            result = self.send(api_key, prompt) => result?,
        };

        info!(
            model = %self.model,
            response_len = text.len(),
            response_preview = %preview(&text, self.preview_chars),
            "chat api: response"
        );
        Ok(text)
    }
}
