//! Identity-keyed merge of overlapping record lists.

use std::collections::HashSet;

use crate::domain::entities::PublicationRecord;
use crate::domain::types::PublicationId;

/// Accumulates record lists, keeping the first record seen for each id.
#[derive(Debug, Default)]
pub struct Aggregator {
    seen: HashSet<PublicationId>,
    records: Vec<PublicationRecord>,
    duplicates: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            records: Vec::with_capacity(capacity),
            duplicates: 0,
        }
    }

    /// Absorb one list; records whose id was already seen are dropped whole.
    pub fn push(&mut self, list: Vec<PublicationRecord>) {
        for record in list {
            if self.seen.insert(record.id) {
                self.records.push(record);
            } else {
                self.duplicates += 1;
            }
        }
    }

    /// Number of records dropped as duplicates so far.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merged records in first-seen order.
    pub fn finish(self) -> Vec<PublicationRecord> {
        self.records
    }
}

/// Merge lists in the order given; the earliest list wins on id collisions.
pub fn merge<I>(lists: I) -> Vec<PublicationRecord>
where
    I: IntoIterator<Item = Vec<PublicationRecord>>,
{
    let mut aggregator = Aggregator::new();
    for list in lists {
        aggregator.push(list);
    }
    aggregator.finish()
}
