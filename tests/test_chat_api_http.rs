use std::time::Duration;

use amica::models::error::ChatError;
use amica::services::chat_api_http::{CompletionStyle, HttpChatApi, INVALID_RESPONSE, NO_RESPONSE};
use amica::traits::chat_api::ChatApi;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use crate::common::{chat_body, mount_chat_completion, mount_raw};

fn api(server: &MockServer, style: CompletionStyle) -> HttpChatApi {
    HttpChatApi::builder()
        .base_url(format!("{}/v1", server.uri()))
        .model("mistral-tiny")
        .api_key("test-key".to_string())
        .style(style)
        .timeout(Duration::from_secs(5))
        .build()
}

#[tokio::test]
async fn chat_style_sends_messages_and_reads_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(json!({
            "model": "mistral-tiny",
            "messages": [{ "role": "user", "content": "How do I build trust?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Trust takes time.")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = api(&server, CompletionStyle::Chat)
        .call_chat_api("How do I build trust?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, "Trust takes time.");
}

#[tokio::test]
async fn text_style_sends_prompt_and_reads_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(body_json(json!({ "model": "mistral-tiny", "prompt": "love?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "text": "Yes." }] })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = api(&server, CompletionStyle::Text)
        .call_chat_api("love?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, "Yes.");
}

#[tokio::test]
async fn missing_choices_degrades_to_fallback() {
    let server = MockServer::start().await;
    mount_raw(&server, "/v1/chat/completions", ResponseTemplate::new(200).set_body_json(json!({ "object": "error" }))).await;

    let answer = api(&server, CompletionStyle::Chat)
        .call_chat_api("trust", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, NO_RESPONSE);
}

#[tokio::test]
async fn non_string_content_degrades_to_fallback() {
    let server = MockServer::start().await;
    let body = json!({ "choices": [{ "message": { "content": null } }] });
    mount_raw(&server, "/v1/chat/completions", ResponseTemplate::new(200).set_body_json(body)).await;

    let answer = api(&server, CompletionStyle::Chat)
        .call_chat_api("trust", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, INVALID_RESPONSE);
}

#[tokio::test]
async fn error_status_is_an_error() {
    let server = MockServer::start().await;
    mount_raw(&server, "/v1/chat/completions", ResponseTemplate::new(401).set_body_string("unauthorized")).await;

    let err = api(&server, CompletionStyle::Chat)
        .call_chat_api("trust", &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ChatError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "unauthorized");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_a_decode_error() {
    let server = MockServer::start().await;
    mount_raw(&server, "/v1/chat/completions", ResponseTemplate::new(200).set_body_string("<html>")).await;

    let err = api(&server, CompletionStyle::Chat)
        .call_chat_api("trust", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Decode(_)));
    assert_eq!(err.user_message(), "Failed to fetch response.");
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    mount_raw(
        &server,
        "/v1/chat/completions",
        ResponseTemplate::new(200)
            .set_body_json(chat_body("late"))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let api = HttpChatApi::builder()
        .base_url(format!("{}/v1", server.uri()))
        .model("mistral-tiny")
        .api_key("test-key".to_string())
        .timeout(Duration::from_millis(100))
        .build();
    let err = api.call_chat_api("trust", &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ChatError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn cancellation_aborts_the_request() {
    let server = MockServer::start().await;
    mount_raw(
        &server,
        "/v1/chat/completions",
        ResponseTemplate::new(200)
            .set_body_json(chat_body("late"))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = api(&server, CompletionStyle::Chat)
        .call_chat_api("trust", &token)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn base_url_trailing_slash_is_tolerated() {
    let server = MockServer::start().await;
    mount_chat_completion(&server, "ok").await;

    let llm = amica::models::config::LlmConfig {
        base_url: Some(format!("{}/v1/", server.uri())),
        api_key: Some("test-key".into()),
        ..Default::default()
    };
    let answer = HttpChatApi::from_config(&llm)
        .call_chat_api("trust", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, "ok");
}
