use chrono::{DateTime, Utc};
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, IntoStaticStr};

/// Identifier of a turn inside one conversation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into, Display)]
pub struct TurnId(u64);

impl TurnId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Lifecycle of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    /// Request to the completion API is outstanding
    Pending,
    /// Answer is known and being typed out
    Revealing,
    Complete,
    Failed,
    /// Reveal stopped early, the answer holds the partial text
    Cancelled,
    /// Answered locally, the API was never called
    Declined,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// No further mutation of the turn is expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnStatus::Complete | TurnStatus::Failed | TurnStatus::Cancelled | TurnStatus::Declined
        )
    }
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One prompt/answer pair of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: TurnId,
    pub prompt: String,
    pub answer: String,
    pub status: TurnStatus,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(id: TurnId, prompt: impl Into<String>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            answer: String::new(),
            status: TurnStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Snapshot of the whole conversation as seen by the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub turns: Vec<ChatTurn>,
    /// Set while a completion request is outstanding
    pub busy: bool,
    /// Turn whose answer is currently being revealed, at most one
    pub revealing: Option<TurnId>,
    pub(crate) next_id: u64,
}

impl ConversationState {
    pub fn turn(&self, id: TurnId) -> Option<&ChatTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub(crate) fn turn_mut(&mut self, id: TurnId) -> Option<&mut ChatTurn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
