//! Error types for the ranking service
//!
//! `RankingError` is the error every request handler surfaces. Each variant maps
//! to one status code at the HTTP boundary; lower layers carry their own
//! `thiserror` enums and are folded into this one by the service.

use crate::store::StoreError;

/// Result type alias for request-level operations
pub type Result<T> = std::result::Result<T, RankingError>;

/// Failures a caller of the ranking engine can observe
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Not enough companies for matchup ({available} available)")]
    InsufficientCandidates { available: usize },

    #[error("Internal service error: {message}")]
    Internal { message: String },
}

impl RankingError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument { .. } => 400,
            Self::NotFound { .. } | Self::InsufficientCandidates { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    /// Message safe to send to clients. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidArgument { message } | Self::NotFound { message } => message.clone(),
            Self::InsufficientCandidates { .. } => "Not enough companies for matchup".to_string(),
            Self::Internal { .. } => "Internal server error".to_string(),
        }
    }

    /// Fold a store failure into a request error, logging the underlying cause.
    pub fn from_store(operation: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            other => {
                tracing::error!("Store failure during {}: {}", operation, other);
                Self::internal(format!("failed to {}", operation))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(RankingError::invalid_argument("bad").status_code(), 400);
        assert_eq!(RankingError::not_found("gone").status_code(), 404);
        assert_eq!(
            RankingError::InsufficientCandidates { available: 1 }.status_code(),
            404
        );
        assert_eq!(RankingError::internal("boom").status_code(), 500);
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = RankingError::internal("connection refused on 10.0.0.3");
        assert_eq!(err.public_message(), "Internal server error");

        let err = RankingError::invalid_argument("Score must be between 1 and 5");
        assert_eq!(err.public_message(), "Score must be between 1 and 5");
    }

    #[test]
    fn test_from_store_error() {
        let err = RankingError::from_store("load company", StoreError::NotFound("Company".into()));
        assert_eq!(err, RankingError::not_found("Company not found"));

        let err = RankingError::from_store(
            "load company",
            StoreError::Timeout(Duration::from_millis(10)),
        );
        assert!(matches!(err, RankingError::Internal { .. }));
    }
}
