#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gazette::application::source::{PublicationSource, SourceError};
use gazette::domain::entities::{CategoryRecord, PublicationRecord};
use gazette::domain::types::{CategoryId, PublicationId, PublicationStatus};
use time::{Duration as TimeDuration, OffsetDateTime, macros::datetime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    All,
    Category(CategoryId),
    Search,
    Legacy,
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub endpoint: Endpoint,
    pub cap: usize,
    pub term: Option<String>,
    pub status: Option<PublicationStatus>,
}

#[derive(Debug, Clone)]
pub struct Reply {
    delay: Duration,
    outcome: Result<Vec<PublicationRecord>, String>,
}

impl Reply {
    pub fn ok(records: Vec<PublicationRecord>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(records),
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(message.to_string()),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-memory source answering from per-endpoint scripts.
///
/// One-shot replies are consumed in call order; once they run out the
/// endpoint's standing reply is used. Unscripted endpoints fail.
#[derive(Default)]
pub struct ScriptedSource {
    queued: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
    standing: Mutex<HashMap<Endpoint, Reply>>,
    catalog: Mutex<Option<Vec<CategoryRecord>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once(self, endpoint: Endpoint, reply: Reply) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn always(self, endpoint: Endpoint, reply: Reply) -> Self {
        self.standing.lock().unwrap().insert(endpoint, reply);
        self
    }

    pub fn with_catalog(self, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        let categories = ids
            .into_iter()
            .map(|id| CategoryRecord {
                id,
                name: format!("category {id}"),
            })
            .collect();
        *self.catalog.lock().unwrap() = Some(categories);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    pub fn category_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call.endpoint, Endpoint::Category(_)))
            .collect()
    }

    fn next_reply(&self, endpoint: Endpoint) -> Reply {
        if let Some(reply) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        self.standing
            .lock()
            .unwrap()
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| Reply::fail("not scripted"))
    }

    async fn answer(&self, call: Call) -> Result<Vec<PublicationRecord>, SourceError> {
        let endpoint = call.endpoint;
        self.calls.lock().unwrap().push(call);
        let reply = self.next_reply(endpoint);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.outcome.map_err(SourceError::unavailable)
    }
}

#[async_trait]
impl PublicationSource for ScriptedSource {
    async fn fetch_all(
        &self,
        cap: usize,
        _offset: usize,
        status: Option<PublicationStatus>,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        self.answer(Call {
            endpoint: Endpoint::All,
            cap,
            term: None,
            status,
        })
        .await
    }

    async fn fetch_by_category(
        &self,
        category: CategoryId,
        cap: usize,
        _offset: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        self.answer(Call {
            endpoint: Endpoint::Category(category),
            cap,
            term: None,
            status: None,
        })
        .await
    }

    async fn fetch_by_search_term(
        &self,
        term: &str,
        cap: usize,
        _offset: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        self.answer(Call {
            endpoint: Endpoint::Search,
            cap,
            term: Some(term.to_string()),
            status: None,
        })
        .await
    }

    async fn fetch_legacy_latest(
        &self,
        cap: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        self.answer(Call {
            endpoint: Endpoint::Legacy,
            cap,
            term: None,
            status: None,
        })
        .await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, SourceError> {
        self.calls.lock().unwrap().push(Call {
            endpoint: Endpoint::Catalog,
            cap: 0,
            term: None,
            status: None,
        });
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::unavailable("catalog down"))
    }
}

/// Published record whose creation time grows with its id.
pub fn record(id: PublicationId) -> PublicationRecord {
    PublicationRecord {
        id,
        title: format!("Post {id:03}"),
        summary: format!("Summary {id}"),
        body: String::new(),
        status: PublicationStatus::Published,
        admin_id: Some(1),
        categories: Vec::new(),
        created_at: base_time() + TimeDuration::minutes(id),
        modified_at: None,
    }
}

pub fn records(ids: impl IntoIterator<Item = PublicationId>) -> Vec<PublicationRecord> {
    ids.into_iter().map(record).collect()
}

pub fn in_category(mut record: PublicationRecord, category: CategoryId) -> PublicationRecord {
    record.categories.push(category);
    record
}

pub fn ids(records: &[PublicationRecord]) -> Vec<PublicationId> {
    records.iter().map(|record| record.id).collect()
}

fn base_time() -> OffsetDateTime {
    datetime!(2024-01-01 0:00 UTC)
}
