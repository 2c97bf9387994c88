use thiserror::Error;

use crate::application::source::SourceError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

/// Message shown to readers when every fetch tactic failed.
pub const FEED_UNAVAILABLE_MESSAGE: &str =
    "Publications could not be loaded. Please try again later.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The session settled with every fetch tactic exhausted.
    #[error("feed unavailable: {0}")]
    FeedUnavailable(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn feed_unavailable(detail: impl Into<String>) -> Self {
        Self::FeedUnavailable(detail.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short reader-facing message; details stay in the logs.
    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::FeedUnavailable(_) | AppError::Source(_) => FEED_UNAVAILABLE_MESSAGE,
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                "Request could not be processed"
            }
            AppError::Infra(InfraError::Configuration { .. }) => "Client misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}
