//! Conversation log as an explicit store driven by actions.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::models::types::{ChatTurn, ConversationState, TurnId, TurnStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A prompt went out to the completion API.
    Submitted { prompt: String },
    /// A prompt was answered locally without calling the API.
    Declined { prompt: String, reply: String },
    AnswerReceived { turn: TurnId },
    RevealTick { turn: TurnId, partial: String },
    RevealDone { turn: TurnId, answer: String },
    /// The reveal stopped before the end; the partial text stays.
    RevealCancelled { turn: TurnId },
    Failed { turn: TurnId, message: String },
}

/// Applies `action` to `state`. Returns the id of the turn the action created or touched.
pub fn reduce(state: &mut ConversationState, action: Action) -> Option<TurnId> {
    match action {
        Action::Submitted { prompt } => {
            let id = push_turn(state, prompt);
            state.busy = true;
            Some(id)
        }
        Action::Declined { prompt, reply } => {
            let id = push_turn(state, prompt);
            if let Some(turn) = state.turn_mut(id) {
                turn.answer = reply;
                turn.status = TurnStatus::Declined;
            }
            Some(id)
        }
        Action::AnswerReceived { turn } => {
            state.busy = false;
            let t = state.turn_mut(turn)?;
            if t.status.is_terminal() {
                return None;
            }
            t.status = TurnStatus::Revealing;
            state.revealing = Some(turn);
            Some(turn)
        }
        Action::RevealTick { turn, partial } => {
            if state.revealing != Some(turn) {
                trace!(%turn, "stale reveal tick dropped");
                return None;
            }
            let t = state.turn_mut(turn)?;
            t.answer = partial;
            Some(turn)
        }
        Action::RevealDone { turn, answer } => {
            if state.revealing == Some(turn) {
                state.revealing = None;
            }
            let t = state.turn_mut(turn)?;
            if t.status.is_terminal() {
                return None;
            }
            t.answer = answer;
            t.status = TurnStatus::Complete;
            Some(turn)
        }
        Action::RevealCancelled { turn } => {
            if state.revealing == Some(turn) {
                state.revealing = None;
            }
            let t = state.turn_mut(turn)?;
            if t.status != TurnStatus::Revealing {
                return None;
            }
            t.status = TurnStatus::Cancelled;
            Some(turn)
        }
        Action::Failed { turn, message } => {
            state.busy = false;
            if state.revealing == Some(turn) {
                state.revealing = None;
            }
            let t = state.turn_mut(turn)?;
            t.answer = message;
            t.status = TurnStatus::Failed;
            Some(turn)
        }
    }
}

fn push_turn(state: &mut ConversationState, prompt: String) -> TurnId {
    let id = TurnId::new(state.next_id);
    state.next_id += 1;
    state.turns.push(ChatTurn::new(id, prompt));
    id
}

/// Shared owner of the [`ConversationState`]; publishes a snapshot after every action.
#[derive(Debug)]
pub struct ConversationStore {
    state: Mutex<ConversationState>,
    tx: watch::Sender<ConversationState>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(ConversationState::default())
    }
}

impl ConversationStore {
    pub fn new(initial: ConversationState) -> Self {
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            state: Mutex::new(initial),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dispatch(&self, action: Action) -> Option<TurnId> {
        let mut state = self.lock();
        let kind = action_name(&action);
        let touched = reduce(&mut state, action);
        debug!(action = kind, turn = ?touched, busy = state.busy, "store: dispatch");
        self.tx.send_replace(state.clone());
        touched
    }

    pub fn snapshot(&self) -> ConversationState {
        self.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.tx.subscribe()
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Submitted { .. } => "submitted",
        Action::Declined { .. } => "declined",
        Action::AnswerReceived { .. } => "answer_received",
        Action::RevealTick { .. } => "reveal_tick",
        Action::RevealDone { .. } => "reveal_done",
        Action::RevealCancelled { .. } => "reveal_cancelled",
        Action::Failed { .. } => "failed",
    }
}
