use std::io::Write;
use std::sync::Arc;

use bon::Builder;
use tokio::sync::watch;
use tokio_graceful_shutdown::errors::CancelledByShutdown;
use tokio_graceful_shutdown::{FutureExt, SubsystemHandle};
use tracing::{debug, info};

use crate::models::types::{ConversationState, TurnId};
use crate::services::formatter::LINE_BREAK;
use crate::services::session::ChatSession;

/// Display markup -> plain terminal text.
pub fn to_terminal(markup: &str) -> String {
    markup.replace(LINE_BREAK, "\n")
}

/// Turns successive conversation snapshots into the text to append to a terminal.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    seen_turns: usize,
    current: Option<TurnId>,
    printed: String,
    closed: bool,
}

impl TranscriptRenderer {
    pub fn render(&mut self, state: &ConversationState) -> String {
        let mut out = String::new();
        if let Some(id) = self.current {
            if let Some(turn) = state.turn(id) {
                self.append_answer(&mut out, &turn.answer, turn.status.is_terminal());
            }
        }

        for turn in state.turns.iter().skip(self.seen_turns) {
            if self.current.is_some() && !self.closed {
                out.push('\n');
            }
            out.push_str(&format!("you> {}\namica> ", turn.prompt));
            self.seen_turns += 1;
            self.current = Some(turn.id);
            self.printed.clear();
            self.closed = false;
            self.append_answer(&mut out, &turn.answer, turn.status.is_terminal());
        }
        out
    }

    fn append_answer(&mut self, out: &mut String, answer: &str, terminal: bool) {
        if self.closed {
            return;
        }
        let text = to_terminal(answer);
        match text.strip_prefix(self.printed.as_str()) {
            Some(rest) => out.push_str(rest),
            None => {
                // answer was replaced rather than extended
                out.push('\n');
                out.push_str(&text);
            }
        }
        self.printed = text;
        if terminal {
            out.push('\n');
            self.closed = true;
        }
    }
}

/// Prints the conversation as it changes.
#[derive(Builder)]
pub struct RendererSubsystem {
    pub(crate) session: Arc<ChatSession>,
}

impl RendererSubsystem {
    pub async fn run(self, subsys: SubsystemHandle) -> anyhow::Result<()> {
        info!("Starting renderer subsystem");
        let mut rx: watch::Receiver<ConversationState> = self.session.subscribe();
        let mut renderer = TranscriptRenderer::default();

        let fut = async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                let chunk = renderer.render(&state);
                if !chunk.is_empty() {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(chunk.as_bytes())?;
                    stdout.flush()?;
                }
            }
            debug!("conversation store closed");
            Ok::<(), anyhow::Error>(())
        };

        match fut.cancel_on_shutdown(&subsys).await {
            Ok(result) => result?,
            Err(CancelledByShutdown) => info!("Renderer subsystem cancelled by shutdown"),
        }
        Ok(())
    }
}
