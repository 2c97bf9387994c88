//! Domain entities mirrored from the publication backend.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::{AdminId, CategoryId, PublicationId, PublicationStatus};

/// Immutable snapshot of one publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicationRecord {
    pub id: PublicationId,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub status: PublicationStatus,
    pub admin_id: Option<AdminId>,
    pub categories: Vec<CategoryId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
}

impl PublicationRecord {
    /// Timestamp used for chronological ordering: last modification, else creation.
    pub fn activity_at(&self) -> OffsetDateTime {
        self.modified_at.unwrap_or(self.created_at)
    }

    pub fn in_category(&self, category: CategoryId) -> bool {
        self.categories.contains(&category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
}
