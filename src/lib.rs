pub mod models;
pub mod services;
pub mod subsystems;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};
use tracing::info;

use crate::models::config::{AppConfig, load_config_or_default};
use crate::services::chat_api_http::HttpChatApi;
use crate::services::presenter::TypingPresenter;
use crate::services::session::ChatSession;
use crate::services::topics::TopicGuard;
use crate::subsystems::console::ConsoleSubsystem;
use crate::subsystems::renderer::RendererSubsystem;
use crate::traits::chat_api::ChatApi;

/// Initialize structured logging (RUST_LOG wins over the configured level)
pub fn init_logging(cfg: &AppConfig) {
    let log_spec = std::env::var("RUST_LOG").unwrap_or_else(|_| cfg.log_level());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_spec))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Wires a session from config around the given completion API.
pub fn build_session(cfg: &AppConfig, chat_api: Arc<dyn ChatApi>) -> ChatSession {
    ChatSession::builder()
        .chat_api(chat_api)
        .presenter(TypingPresenter::builder().cadence(cfg.cadence()).build())
        .topics(TopicGuard::from_config(cfg.topics.as_ref()))
        .suggestions(cfg.suggestions())
        .build()
}

/// High-level entrypoint: load config, init logging, run the console chat
pub async fn run_with_config_path(path: &str) -> anyhow::Result<()> {
    let cfg = load_config_or_default(path).with_context(|| format!("Failed to load {path}"))?;
    init_logging(&cfg);
    run(cfg).await
}

pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let chat_api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::from_config(&cfg.llm));
    let session = Arc::new(build_session(&cfg, chat_api));
    info!(
        model = %cfg.llm.model(),
        cadence_ms = cfg.cadence().as_millis() as u64,
        "amica starting"
    );

    run_subsystems(session, BufReader::new(tokio::io::stdin())).await
}

/// Runs the console and renderer subsystems until `input` ends, `/quit` or Ctrl-C.
pub async fn run_subsystems<R>(session: Arc<ChatSession>, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let console = ConsoleSubsystem::builder().session(Arc::clone(&session)).build();
    let renderer = RendererSubsystem::builder().session(Arc::clone(&session)).build();

    Toplevel::new(move |s: SubsystemHandle| async move {
        s.start(SubsystemBuilder::new("renderer", move |h| renderer.run(h)));
        s.start(SubsystemBuilder::new("console", move |h| console.run_with_input(h, input)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(1000))
    .await
    .map_err(|e| anyhow::anyhow!("shutdown failed: {e}"))?;

    session.shutdown();
    info!("amica stopped");
    Ok(())
}
