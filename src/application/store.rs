//! In-memory holder of the canonical publication list for one session.

use crate::domain::entities::PublicationRecord;
use crate::domain::types::PublicationId;

#[derive(Debug, Default)]
pub struct RecordStore {
    canonical: Vec<PublicationRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new working set; records are never edited in place.
    pub fn replace(&mut self, canonical: Vec<PublicationRecord>) {
        self.canonical = canonical;
    }

    /// Drop one record locally. Returns whether it was present.
    pub fn remove(&mut self, id: PublicationId) -> bool {
        let before = self.canonical.len();
        self.canonical.retain(|record| record.id != id);
        self.canonical.len() != before
    }

    pub fn clear(&mut self) {
        self.canonical = Vec::new();
    }

    pub fn as_slice(&self) -> &[PublicationRecord] {
        &self.canonical
    }
}
