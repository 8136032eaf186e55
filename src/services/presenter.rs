//! Word-by-word reveal of an already known answer.
//!
//! A reveal is a spawned tokio task that wakes every `cadence`, extends the visible
//! prefix by one token and reports it through `on_update`. The caller keeps a
//! [`RevealHandle`] and can stop the task at any time; once [`RevealHandle::cancel`]
//! returns no callback fires again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bon::Builder;
use strum::{AsRefStr, IntoStaticStr};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::debug;

use crate::models::config::DEFAULT_CADENCE_MS;

const MIN_CADENCE: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RevealPhase {
    Idle,
    Revealing,
    Done,
    Cancelled,
}

impl RevealPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, RevealPhase::Done | RevealPhase::Cancelled)
    }
}

/// Tokens of the answer and how many of them are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealState {
    words: Vec<String>,
    revealed_count: usize,
    cadence: Duration,
}

impl RevealState {
    pub fn new(full_text: &str, cadence: Duration) -> Self {
        Self {
            words: full_text.split_whitespace().map(str::to_owned).collect(),
            revealed_count: 0,
            cadence: cadence.max(MIN_CADENCE),
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed_count
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn is_terminal(&self) -> bool {
        self.revealed_count == self.words.len()
    }

    /// Space-joined visible prefix.
    pub fn prefix(&self) -> String {
        self.words[..self.revealed_count].join(" ")
    }

    /// Reveals one more token and returns the new prefix, `None` once terminal.
    pub fn advance(&mut self) -> Option<String> {
        if self.is_terminal() {
            return None;
        }
        self.revealed_count += 1;
        Some(self.prefix())
    }
}

fn lock(phase: &Mutex<RevealPhase>) -> MutexGuard<'_, RevealPhase> {
    phase.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running reveal. Dropping it cancels the reveal.
#[derive(Debug)]
pub struct RevealHandle {
    phase: Arc<Mutex<RevealPhase>>,
    token: CancellationToken,
    /// Cancelled once the reveal task has exited
    finished: CancellationToken,
}

impl RevealHandle {
    fn completed() -> Self {
        let finished = CancellationToken::new();
        finished.cancel();
        Self {
            phase: Arc::new(Mutex::new(RevealPhase::Done)),
            token: CancellationToken::new(),
            finished,
        }
    }

    pub fn phase(&self) -> RevealPhase {
        *lock(&self.phase)
    }

    pub fn is_finished(&self) -> bool {
        self.phase().is_finished()
    }

    /// Stops the reveal. Returns `true` if it was still running.
    ///
    /// Callbacks run under the same lock, so must not cancel their own reveal.
    pub fn cancel(&self) -> bool {
        let was_running = {
            let mut phase = lock(&self.phase);
            match *phase {
                RevealPhase::Idle | RevealPhase::Revealing => {
                    *phase = RevealPhase::Cancelled;
                    true
                }
                RevealPhase::Done | RevealPhase::Cancelled => false,
            }
        };
        self.token.cancel();
        was_running
    }

    /// Resolves once the reveal task has exited, done or cancelled. Does not borrow the handle.
    pub fn on_finished(&self) -> WaitForCancellationFutureOwned {
        self.finished.clone().cancelled_owned()
    }

    pub async fn wait(&self) {
        self.on_finished().await
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts a reveal of `full_text` at `cadence`. Must be called inside a tokio runtime.
///
/// Text without tokens completes on the spot: `on_done` runs before this returns and
/// `on_update` never does.
pub fn present<U, D>(full_text: &str, mut on_update: U, on_done: D, cadence: Duration) -> RevealHandle
where
    U: FnMut(String) + Send + 'static,
    D: FnOnce() + Send + 'static,
{
    let mut state = RevealState::new(full_text, cadence);
    if state.is_terminal() {
        debug!("reveal: nothing to reveal");
        on_done();
        return RevealHandle::completed();
    }

    let phase = Arc::new(Mutex::new(RevealPhase::Idle));
    let token = CancellationToken::new();
    *lock(&phase) = RevealPhase::Revealing;
    debug!(words = state.words().len(), cadence_ms = state.cadence().as_millis() as u64, "reveal: start");

    let finished = CancellationToken::new();
    let task_phase = Arc::clone(&phase);
    let task_token = token.clone();
    let finished_guard = finished.clone().drop_guard();
    tokio::spawn(async move {
        let _finished = finished_guard;
        let period = state.cadence();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut on_done = Some(on_done);

        loop {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let mut phase = lock(&task_phase);
            if *phase != RevealPhase::Revealing {
                break;
            }
            if let Some(partial) = state.advance() {
                on_update(partial);
            }
            if state.is_terminal() {
                *phase = RevealPhase::Done;
                if let Some(done) = on_done.take() {
                    done();
                }
                debug!(words = state.revealed_count(), "reveal: done");
                break;
            }
        }
    });

    RevealHandle {
        phase,
        token,
        finished,
    }
}

/// Reveal driver carrying a fixed cadence.
#[derive(Debug, Clone, Builder)]
pub struct TypingPresenter {
    #[builder(default = Duration::from_millis(DEFAULT_CADENCE_MS))]
    cadence: Duration,
}

impl Default for TypingPresenter {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TypingPresenter {
    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn present<U, D>(&self, full_text: &str, on_update: U, on_done: D) -> RevealHandle
    where
        U: FnMut(String) + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        present(full_text, on_update, on_done, self.cadence)
    }
}
