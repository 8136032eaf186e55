use bon::Builder;

use crate::models::config::TopicsConfig;

pub const DEFAULT_DECLINE_REPLY: &str = "Hey I am here for help with your relationships 😄";

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "relationship",
    "love",
    "personal growth",
    "self-improvement",
    "emotional health",
    "communication",
    "boundaries",
    "dating",
    "intimacy",
    "growth",
    "self-love",
    "trust",
];

/// Keeps the conversation on topic: prompts that mention none of the keywords are
/// answered locally with a canned reply.
#[derive(Debug, Clone, Builder)]
pub struct TopicGuard {
    #[builder(default = true)]
    enabled: bool,
    #[builder(default = DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect())]
    keywords: Vec<String>,
    #[builder(default = DEFAULT_DECLINE_REPLY.to_string())]
    decline_reply: String,
}

impl Default for TopicGuard {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TopicGuard {
    pub fn from_config(cfg: Option<&TopicsConfig>) -> Self {
        let mut guard = Self::default();
        if let Some(cfg) = cfg {
            if let Some(enabled) = cfg.enabled {
                guard.enabled = enabled;
            }
            if let Some(keywords) = cfg.keywords.clone() {
                guard.keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
            }
            if let Some(reply) = cfg.decline_reply.clone() {
                guard.decline_reply = reply;
            }
        }
        guard
    }

    pub fn allows(&self, prompt: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let lowered = prompt.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Canned reply for a prompt the guard does not allow, `None` when allowed.
    pub fn decline(&self, prompt: &str) -> Option<&str> {
        (!self.allows(prompt)).then_some(self.decline_reply.as_str())
    }
}
