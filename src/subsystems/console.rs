use std::sync::Arc;

use bon::Builder;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_graceful_shutdown::errors::CancelledByShutdown;
use tokio_graceful_shutdown::{FutureExt, SubsystemHandle};
use tracing::{info, warn};

use crate::models::error::ChatError;
use crate::services::session::ChatSession;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    /// 1-based index into the session suggestions
    Suggest(usize),
    ListSuggestions,
    Cancel,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("/quit" | "/exit", _) => Command::Quit,
            ("/cancel", _) => Command::Cancel,
            ("/suggest", "") => Command::ListSuggestions,
            ("/suggest", n) => match n.parse() {
                Ok(i) => Command::Suggest(i),
                Err(_) => Command::ListSuggestions,
            },
            _ => Command::Ask(line.to_string()),
        }
    }
}

/// Reads prompts from stdin and feeds them to the session.
#[derive(Builder)]
pub struct ConsoleSubsystem {
    pub(crate) session: Arc<ChatSession>,
}

impl ConsoleSubsystem {
    pub async fn run(self, subsys: SubsystemHandle) -> anyhow::Result<()> {
        self.run_with_input(subsys, BufReader::new(tokio::io::stdin())).await
    }

    /// Like [`run`](Self::run), reading from `input` instead of stdin.
    pub async fn run_with_input<R>(self, subsys: SubsystemHandle, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        info!("Starting console subsystem");
        self.print_suggestions();

        let session = Arc::clone(&self.session);
        let fut = self.read_loop(input);

        match fut.cancel_on_shutdown(&subsys).await {
            Ok(result) => {
                result?;
                info!("Console subsystem finished");
                subsys.request_shutdown();
            }
            Err(CancelledByShutdown) => info!("Console subsystem cancelled by shutdown"),
        }
        session.shutdown();
        Ok(())
    }

    /// Processes input lines until EOF or `/quit`.
    pub async fn read_loop<R: AsyncBufRead + Unpin>(&self, reader: R) -> anyhow::Result<()> {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                Command::Quit => break,
                Command::Cancel => {
                    if !self.session.cancel_request() {
                        println!("(nothing to cancel)");
                    }
                }
                Command::ListSuggestions => self.print_suggestions(),
                Command::Suggest(i) => match self.session.suggestions().get(i.wrapping_sub(1)).cloned() {
                    Some(text) => self.ask(&text, true).await,
                    None => println!("(no suggestion #{i})"),
                },
                Command::Ask(text) => self.ask(&text, false).await,
            }
        }
        Ok(())
    }

    async fn ask(&self, text: &str, suggestion: bool) {
        let result = if suggestion {
            self.session.suggest(text).await
        } else {
            self.session.submit(text).await
        };
        match result {
            Ok(Some(_)) => self.session.wait_for_reveal().await,
            Ok(None) => {}
            Err(ChatError::Busy) => println!("(still waiting for the previous answer)"),
            Err(e) => warn!(error = %e, "submit failed"),
        }
    }

    fn print_suggestions(&self) {
        for (i, s) in self.session.suggestions().iter().enumerate() {
            println!("  /suggest {}  {}", i + 1, s);
        }
    }
}
