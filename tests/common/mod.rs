#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use amica::models::error::ChatError;
use amica::services::presenter::TypingPresenter;
use amica::services::session::ChatSession;
use amica::traits::chat_api::ChatApi;
use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// What the mock does for one call.
pub enum Reply {
    Text(String),
    Error(ChatError),
    /// Blocks until the request is cancelled
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

#[derive(Default)]
pub struct MockChatApi {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockChatApi {
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn call_chat_api(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(s)) => Ok(s),
            Some(Reply::Error(e)) => Err(e),
            Some(Reply::Hang) => {
                cancel.cancelled().await;
                Err(ChatError::Cancelled)
            }
            None => Err(ChatError::Status { status: 500, body: "no reply scripted".into() }),
        }
    }
}

pub fn session_with(api: Arc<dyn ChatApi>, cadence_ms: u64) -> ChatSession {
    ChatSession::builder()
        .chat_api(api)
        .presenter(TypingPresenter::builder().cadence(Duration::from_millis(cadence_ms)).build())
        .suggestions(vec!["How do I build trust?".to_string()])
        .build()
}

pub fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "model": "mistral-tiny",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

pub async fn mount_chat_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_raw(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}
