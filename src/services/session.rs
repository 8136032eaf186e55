//! Inbound surface of the chat: validates a prompt, asks the completion API, formats
//! the answer and reveals it into the conversation store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bon::bon;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::error::ChatError;
use crate::models::types::{ConversationState, TurnId};
use crate::services::formatter::format_answer;
use crate::services::presenter::{RevealHandle, TypingPresenter};
use crate::services::store::{Action, ConversationStore};
use crate::services::topics::TopicGuard;
use crate::traits::chat_api::ChatApi;

/// The reveal currently typing into the log.
struct ActiveReveal {
    turn: TurnId,
    answer: String,
    handle: RevealHandle,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ChatSession {
    chat_api: Arc<dyn ChatApi>,
    store: Arc<ConversationStore>,
    presenter: TypingPresenter,
    topics: TopicGuard,
    suggestions: Vec<String>,
    reveal: Mutex<Option<ActiveReveal>>,
    inflight: Mutex<Option<CancellationToken>>,
}

#[bon]
impl ChatSession {
    #[builder]
    pub fn new(
        chat_api: Arc<dyn ChatApi>,
        store: Option<Arc<ConversationStore>>,
        presenter: Option<TypingPresenter>,
        topics: Option<TopicGuard>,
        #[builder(default)] suggestions: Vec<String>,
    ) -> Self {
        Self {
            chat_api,
            store: store.unwrap_or_default(),
            presenter: presenter.unwrap_or_default(),
            topics: topics.unwrap_or_default(),
            suggestions,
            reveal: Mutex::new(None),
            inflight: Mutex::new(None),
        }
    }
}

impl ChatSession {
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn state(&self) -> ConversationState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.store.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.store.is_busy()
    }

    /// Predetermined queries offered to the user.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Runs one prompt through the whole pipeline.
    ///
    /// Returns `Ok(None)` for blank input, the id of the created turn otherwise. API
    /// failures end up in the turn itself; only [`ChatError::Busy`] is returned.
    pub async fn submit(&self, text: &str) -> Result<Option<TurnId>, ChatError> {
        let prompt = text;
        if prompt.trim().is_empty() {
            debug!("submit: blank prompt ignored");
            return Ok(None);
        }
        if self.store.is_busy() {
            warn!("submit: rejected, request in progress");
            return Err(ChatError::Busy);
        }

        if let Some(reply) = self.topics.decline(prompt) {
            info!(prompt_len = prompt.len(), "submit: off-topic prompt declined");
            let turn = self.store.dispatch(Action::Declined {
                prompt: prompt.to_string(),
                reply: reply.to_string(),
            });
            return Ok(turn);
        }

        let token = CancellationToken::new();
        let turn = {
            // at most one request in flight
            let mut inflight = lock(&self.inflight);
            if inflight.is_some() || self.store.is_busy() {
                return Err(ChatError::Busy);
            }
            *inflight = Some(token.clone());
            self.store.dispatch(Action::Submitted { prompt: prompt.to_string() })
        };
        let Some(turn) = turn else {
            lock(&self.inflight).take();
            return Ok(None);
        };
        info!(%turn, prompt_len = prompt.len(), "submit: calling chat api");

        let result = self.chat_api.call_chat_api(prompt, &token).await;
        lock(&self.inflight).take();

        match result {
            Ok(raw) => {
                let answer = format_answer(&raw);
                info!(%turn, raw_len = raw.len(), answer_len = answer.len(), "submit: answer received");
                self.start_reveal(turn, answer);
            }
            Err(e) => {
                warn!(%turn, error = %e, "submit: chat api failed");
                self.store.dispatch(Action::Failed {
                    turn,
                    message: e.user_message().to_string(),
                });
            }
        }
        Ok(Some(turn))
    }

    /// Same pipeline as [`submit`](Self::submit) for a predetermined query.
    pub async fn suggest(&self, suggestion: &str) -> Result<Option<TurnId>, ChatError> {
        debug!(suggestion = %suggestion, "suggest");
        self.submit(suggestion).await
    }

    fn start_reveal(&self, turn: TurnId, answer: String) {
        let mut active = lock(&self.reveal);
        if let Some(previous) = active.take() {
            self.finish_superseded(previous);
        }

        self.store.dispatch(Action::AnswerReceived { turn });
        let tick_store = Arc::clone(&self.store);
        let done_store = Arc::clone(&self.store);
        let final_answer = answer.clone();
        let handle = self.presenter.present(
            &answer,
            move |partial| {
                tick_store.dispatch(Action::RevealTick { turn, partial });
            },
            move || {
                done_store.dispatch(Action::RevealDone { turn, answer: final_answer });
            },
        );
        *active = Some(ActiveReveal { turn, answer, handle });
    }

    /// Stops a reveal that a newer answer replaces and shows its full text at once.
    fn finish_superseded(&self, previous: ActiveReveal) {
        if previous.handle.cancel() {
            debug!(turn = %previous.turn, "reveal superseded, completing previous turn");
            self.store.dispatch(Action::RevealDone {
                turn: previous.turn,
                answer: previous.answer,
            });
        }
    }

    /// Waits until the active reveal, if any, has finished.
    pub async fn wait_for_reveal(&self) {
        let finished = lock(&self.reveal).as_ref().map(|r| r.handle.on_finished());
        if let Some(finished) = finished {
            finished.await;
        }
    }

    /// Cancels the outstanding API request. Returns `true` if there was one.
    pub fn cancel_request(&self) -> bool {
        match lock(&self.inflight).as_ref() {
            Some(token) => {
                info!("cancelling in-flight request");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stops everything the session has running. A partially revealed turn keeps its text
    /// and ends as [`TurnStatus::Cancelled`](crate::models::types::TurnStatus::Cancelled).
    pub fn shutdown(&self) {
        self.cancel_request();
        if let Some(active) = lock(&self.reveal).take() {
            if active.handle.cancel() {
                info!(turn = %active.turn, "reveal cancelled on shutdown");
                self.store.dispatch(Action::RevealCancelled { turn: active.turn });
            }
        }
    }
}
