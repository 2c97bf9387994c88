//! Feed session: one consumer's query, records, page cursor and in-flight work.
//!
//! Every fetch runs under a [`FetchEpoch`]. Starting a new epoch cancels the
//! previous epoch's token (and with it any pending load-more timer); results
//! that come back for a non-current epoch are dropped without touching state.
//! Observers read [`FeedSnapshot`]s from a watch channel.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::application::epoch::{EpochClock, FetchEpoch};
use crate::application::error::FEED_UNAVAILABLE_MESSAGE;
use crate::application::lock::mutex_lock;
use crate::application::pagination::{DEFAULT_PAGE_SIZE, PageCursor};
use crate::application::pipeline::{PipelineParams, canonicalize};
use crate::application::source::PublicationSource;
use crate::application::store::RecordStore;
use crate::application::strategy::{FallbackStrategy, FetchOutcome, StrategyConfig, StrategyError};
use crate::domain::entities::PublicationRecord;
use crate::domain::query::QueryParams;
use crate::domain::types::PublicationId;

pub const DEFAULT_LOAD_MORE_DELAY: Duration = Duration::from_millis(500);

const SOURCE: &str = "application::session";
const METRIC_DISCARDED_TOTAL: &str = "gazette_fetch_discarded_total";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub page_size: NonZeroUsize,
    /// Delay between a load-more request and the page becoming visible.
    pub load_more_delay: Duration,
    pub strategy: StrategyConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_more_delay: DEFAULT_LOAD_MORE_DELAY,
            strategy: StrategyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Idle,
    Fetching,
    TornDown,
}

/// Point-in-time view of a session, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    /// Canonical list: deduplicated, filtered and sorted.
    pub records: Vec<PublicationRecord>,
    /// Prefix of `records` visible at the current page.
    pub displayed: Vec<PublicationRecord>,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub error: Option<String>,
    pub has_more: bool,
    pub page: usize,
    pub phase: LifecyclePhase,
    pub epoch: Option<u64>,
}

impl FeedSnapshot {
    fn initial() -> Self {
        Self {
            records: Vec::new(),
            displayed: Vec::new(),
            is_loading: false,
            is_loading_more: false,
            error: None,
            has_more: false,
            page: 1,
            phase: LifecyclePhase::Idle,
            epoch: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.is_loading && !self.is_loading_more
    }
}

struct PendingLoadMore {
    token: CancellationToken,
    task: JoinHandle<()>,
}

struct SessionState {
    phase: LifecyclePhase,
    query: Option<QueryParams>,
    epoch: Option<FetchEpoch>,
    epoch_token: Option<CancellationToken>,
    fetch_task: Option<JoinHandle<()>>,
    load_more: Option<PendingLoadMore>,
    store: RecordStore,
    cursor: PageCursor,
    is_loading: bool,
    is_loading_more: bool,
    error: Option<String>,
}

impl SessionState {
    fn new(page_size: NonZeroUsize) -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            query: None,
            epoch: None,
            epoch_token: None,
            fetch_task: None,
            load_more: None,
            store: RecordStore::new(),
            cursor: PageCursor::new(page_size),
            is_loading: false,
            is_loading_more: false,
            error: None,
        }
    }

    fn is_current(&self, epoch: FetchEpoch) -> bool {
        self.phase != LifecyclePhase::TornDown && self.epoch == Some(epoch)
    }

    fn cancel_pending_load_more(&mut self) {
        if let Some(pending) = self.load_more.take() {
            pending.token.cancel();
        }
        self.is_loading_more = false;
    }

    fn snapshot(&self) -> FeedSnapshot {
        let window = self.cursor.slice(self.store.as_slice());
        FeedSnapshot {
            records: self.store.as_slice().to_vec(),
            displayed: window.displayed.to_vec(),
            is_loading: self.is_loading,
            is_loading_more: self.is_loading_more,
            error: self.error.clone(),
            has_more: window.has_more,
            page: self.cursor.page(),
            phase: self.phase,
            epoch: self.epoch.map(|epoch| epoch.seq()),
        }
    }
}

struct SessionShared {
    source: Arc<dyn PublicationSource>,
    strategy: FallbackStrategy,
    load_more_delay: Duration,
    clock: EpochClock,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<FeedSnapshot>,
}

impl SessionShared {
    fn lock(&self, op: &'static str) -> MutexGuard<'_, SessionState> {
        mutex_lock(&self.state, SOURCE, op)
    }

    fn publish(&self, state: &SessionState) {
        self.snapshots.send_replace(state.snapshot());
    }

    /// Open a new epoch for the stored query and spawn its fetch.
    fn begin_epoch(self: &Arc<Self>, state: &mut SessionState) -> Option<FetchEpoch> {
        let query = state.query.clone()?;

        if let Some(previous) = state.epoch_token.take() {
            previous.cancel();
        }
        state.cancel_pending_load_more();

        let epoch = self.clock.advance();
        let token = CancellationToken::new();
        state.epoch = Some(epoch);
        state.epoch_token = Some(token.clone());
        state.phase = LifecyclePhase::Fetching;
        state.is_loading = true;
        state.error = None;
        state.store.clear();
        state.cursor.reset();

        let span = info_span!(
            "feed_fetch",
            epoch = epoch.seq(),
            trace_id = %epoch.trace_id(),
            sort = query.sort().as_str(),
            status = query.status().as_str(),
        );
        let shared = Arc::clone(self);
        let task = tokio::spawn(
            async move {
                let outcome = shared
                    .strategy
                    .fetch(shared.source.as_ref(), &query, &token)
                    .await;
                shared.settle(epoch, &query, outcome);
            }
            .instrument(span),
        );
        state.fetch_task = Some(task);

        debug!(epoch = epoch.seq(), "Fetch epoch started");
        self.publish(state);
        Some(epoch)
    }

    fn settle(
        &self,
        epoch: FetchEpoch,
        query: &QueryParams,
        outcome: Result<FetchOutcome, StrategyError>,
    ) {
        let mut state = self.lock("settle");
        if !state.is_current(epoch) {
            debug!(epoch = epoch.seq(), "Discarding superseded fetch result");
            counter!(METRIC_DISCARDED_TOTAL).increment(1);
            return;
        }

        match outcome {
            Ok(outcome) => {
                let fetched = outcome.records.len();
                let canonical = canonicalize(outcome.records, &PipelineParams::from(query));
                info!(
                    epoch = epoch.seq(),
                    tactic = outcome.tactic.as_str(),
                    failed_tactics = outcome.failures.len(),
                    fetched,
                    record_count = canonical.len(),
                    "Feed settled"
                );
                state.store.replace(canonical);
                state.error = None;
            }
            // The current epoch is only cancelled by teardown, which the check above covers.
            Err(StrategyError::Cancelled) => {
                debug!(epoch = epoch.seq(), "Current fetch reported cancellation");
                return;
            }
            Err(err) => {
                error!(epoch = epoch.seq(), error = %err, "Feed fetch exhausted every tactic");
                state.store.clear();
                state.error = Some(FEED_UNAVAILABLE_MESSAGE.to_string());
            }
        }

        state.cursor.reset();
        state.is_loading = false;
        state.phase = LifecyclePhase::Idle;
        state.fetch_task = None;
        self.publish(&state);
    }

    fn finish_load_more(&self, epoch: FetchEpoch) {
        let mut state = self.lock("finish_load_more");
        if !state.is_current(epoch) || !state.is_loading_more {
            return;
        }
        state.cursor.advance();
        state.is_loading_more = false;
        state.load_more = None;
        debug!(page = state.cursor.page(), "Page advanced");
        self.publish(&state);
    }
}

/// Feed engine handle owned by a single consumer.
///
/// Methods that start asynchronous work must be called from within a Tokio
/// runtime. Dropping the session tears it down.
pub struct FeedSession {
    shared: Arc<SessionShared>,
}

impl FeedSession {
    pub fn new(source: Arc<dyn PublicationSource>, options: SessionOptions) -> Self {
        let state = SessionState::new(options.page_size);
        let (snapshots, _) = watch::channel(FeedSnapshot::initial());
        Self {
            shared: Arc::new(SessionShared {
                source,
                strategy: FallbackStrategy::new(options.strategy),
                load_more_delay: options.load_more_delay,
                clock: EpochClock::new(),
                state: Mutex::new(state),
                snapshots,
            }),
        }
    }

    /// Show `query`. Starts a new epoch unless the query equals the current one.
    ///
    /// Returns whether a fetch was started.
    pub fn set_query(&self, query: QueryParams) -> bool {
        let mut state = self.shared.lock("set_query");
        if state.phase == LifecyclePhase::TornDown || state.query.as_ref() == Some(&query) {
            return false;
        }
        state.query = Some(query);
        self.shared.begin_epoch(&mut state).is_some()
    }

    /// Re-run the whole fallback chain for the current query.
    pub fn refresh(&self) -> bool {
        let mut state = self.shared.lock("refresh");
        if state.phase == LifecyclePhase::TornDown {
            return false;
        }
        self.shared.begin_epoch(&mut state).is_some()
    }

    /// Reveal the next page after the configured delay.
    ///
    /// No-op while a fetch or another load-more is in flight, or when every
    /// record is already displayed.
    pub fn load_more(&self) -> bool {
        let mut state = self.shared.lock("load_more");
        if state.phase != LifecyclePhase::Idle || state.is_loading || state.is_loading_more {
            return false;
        }
        if !state.cursor.slice(state.store.as_slice()).has_more {
            return false;
        }
        let (Some(epoch), Some(parent)) = (state.epoch, state.epoch_token.as_ref()) else {
            return false;
        };

        let token = parent.child_token();
        let timer_token = token.clone();
        let delay = self.shared.load_more_delay;
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = timer_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => shared.finish_load_more(epoch),
            }
        });

        state.is_loading_more = true;
        state.load_more = Some(PendingLoadMore { token, task });
        self.shared.publish(&state);
        true
    }

    /// Drop a record locally, e.g. after it was deleted elsewhere. Never fetches.
    pub fn remove_record(&self, id: PublicationId) -> bool {
        let mut state = self.shared.lock("remove_record");
        if state.phase == LifecyclePhase::TornDown {
            return false;
        }
        let removed = state.store.remove(id);
        if removed {
            debug!(record_id = id, "Record removed locally");
            self.shared.publish(&state);
        }
        removed
    }

    /// Cancel outstanding work and release the record store. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.shared.lock("teardown");
        if state.phase == LifecyclePhase::TornDown {
            return;
        }

        if let Some(token) = state.epoch_token.take() {
            token.cancel();
        }
        if let Some(task) = state.fetch_task.take() {
            task.abort();
        }
        if let Some(pending) = state.load_more.take() {
            pending.token.cancel();
            pending.task.abort();
        }

        state.phase = LifecyclePhase::TornDown;
        state.store.clear();
        state.is_loading = false;
        state.is_loading_more = false;
        info!(epoch = state.epoch.map(|epoch| epoch.seq()), "Feed session torn down");
        self.shared.publish(&state);
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Wait until no fetch or load-more is in flight.
    pub async fn settled(&self) -> FeedSnapshot {
        let mut receiver = self.subscribe();
        match receiver.wait_for(FeedSnapshot::is_settled).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    pub fn query(&self) -> Option<QueryParams> {
        self.shared.lock("query").query.clone()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.shared.lock("phase").phase
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
