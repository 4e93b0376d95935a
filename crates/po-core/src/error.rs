use completion_client::CompletionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: u64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("could not parse '{section}' from completion: {reason}")]
    Parse { section: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse failure class, used by callers to map errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Storage,
    Completion,
    Parse,
}

impl PoError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        PoError::NotFound { entity, id }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        PoError::Validation(msg.into())
    }

    pub fn parse(section: impl Into<String>, reason: impl Into<String>) -> Self {
        PoError::Parse {
            section: section.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PoError::NotFound { .. } => ErrorKind::NotFound,
            PoError::Validation(_) | PoError::InvalidTransition { .. } => ErrorKind::Validation,
            PoError::Storage(_) | PoError::Io(_) | PoError::Yaml(_) | PoError::Json(_) => {
                ErrorKind::Storage
            }
            PoError::Completion(_) => ErrorKind::Completion,
            PoError::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// `true` when the caller supplied something wrong, as opposed to a
    /// failure on the server side.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Validation)
    }
}

pub type Result<T> = std::result::Result<T, PoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(PoError::not_found("sprint", 999).kind(), ErrorKind::NotFound);
        assert_eq!(
            PoError::InvalidTransition {
                from: "DRAFT".into(),
                to: "DONE".into()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(PoError::Storage("disk".into()).kind(), ErrorKind::Storage);
        assert_eq!(
            PoError::from(CompletionError::EmptyResponse).kind(),
            ErrorKind::Completion
        );
        assert_eq!(PoError::parse("Risks", "missing").kind(), ErrorKind::Parse);
    }

    #[test]
    fn client_errors() {
        assert!(PoError::not_found("user story", 1).is_client_error());
        assert!(PoError::validation("title is empty").is_client_error());
        assert!(!PoError::Storage("x".into()).is_client_error());
        assert!(!PoError::parse("Risks", "x").is_client_error());
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let msg = PoError::not_found("sprint", 999).to_string();
        assert_eq!(msg, "sprint not found: 999");
    }
}
