use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::error::ChatError;

/// Defines the interface for a completion API (e.g., Mistral, OpenAI-compatible servers).
///
/// This trait allows consumers to abstract over different backend implementations
/// (e.g., real HTTP clients, mocks for testing).
///
/// Implementations must stop working on the request once `cancel` fires and return
/// [`ChatError::Cancelled`].
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Sends a prompt and returns the assistant's answer text.
    async fn call_chat_api(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ChatError>;
}
