//! Source trait describing the publication backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{CategoryRecord, PublicationRecord};
use crate::domain::types::{CategoryId, PublicationStatus};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Publication backend capabilities consumed by the fetch strategy.
///
/// Every call may fail. Dropping a returned future must abandon the
/// underlying request; the engine relies on that to cancel superseded work.
#[async_trait]
pub trait PublicationSource: Send + Sync {
    async fn fetch_all(
        &self,
        cap: usize,
        offset: usize,
        status: Option<PublicationStatus>,
    ) -> Result<Vec<PublicationRecord>, SourceError>;

    async fn fetch_by_category(
        &self,
        category: CategoryId,
        cap: usize,
        offset: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError>;

    async fn fetch_by_search_term(
        &self,
        term: &str,
        cap: usize,
        offset: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError>;

    /// Last-resort endpoint serving the most recent publications.
    async fn fetch_legacy_latest(&self, cap: usize)
    -> Result<Vec<PublicationRecord>, SourceError>;

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, SourceError>;
}
