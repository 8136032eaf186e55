use thiserror::Error;

/// Errors produced on the way from a submitted prompt to a revealed answer.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no API credential configured for provider {provider}")]
    MissingCredential { provider: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode completion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("completion request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("a request is already in progress")]
    Busy,
}

impl ChatError {
    /// Literal text shown in the turn that this error terminates.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::MissingCredential { .. } => {
                "API key is missing. Set it in the config or the environment."
            }
            ChatError::Cancelled => "Request cancelled.",
            ChatError::Busy => "Please wait for the current answer.",
            ChatError::Http(_) | ChatError::Status { .. } | ChatError::Decode(_) | ChatError::Timeout(_) => {
                "Failed to fetch response."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_share_one_message() {
        let status = ChatError::Status { status: 500, body: "boom".into() };
        let timeout = ChatError::Timeout(std::time::Duration::from_secs(1));
        assert_eq!(status.user_message(), "Failed to fetch response.");
        assert_eq!(timeout.user_message(), status.user_message());
    }

    #[test]
    fn missing_credential_names_provider() {
        let err = ChatError::MissingCredential { provider: "mistral".into() };
        assert!(err.to_string().contains("mistral"));
        assert!(err.user_message().starts_with("API key is missing"));
    }
}
