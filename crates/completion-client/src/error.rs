use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("completion request timed out after {0}s")]
    Timeout(u64),

    #[error("completion provider rate limited the request: {0}")]
    RateLimited(String),

    #[error("completion provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {source}\n  body: {body}")]
    Malformed {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("completion response contained no choices")]
    EmptyResponse,

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("scripted client has no response left for prompt: {0}")]
    Exhausted(String),
}

impl CompletionError {
    /// `true` for failures a caller could reasonably retry the whole workflow on.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Transport(_)
            | CompletionError::Timeout(_)
            | CompletionError::RateLimited(_) => true,
            CompletionError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
