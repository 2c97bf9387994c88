//! Ordered fallback chain for acquiring publications.
//!
//! A query picks a plan (search, single category, or full browse); each
//! tactic in the plan is attempted in turn and its failure is logged and
//! absorbed until the plan runs out. Only the browse plan has fallbacks:
//! search and category queries surface their single tactic's failure.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::aggregate::Aggregator;
use crate::application::source::{PublicationSource, SourceError};
use crate::domain::entities::PublicationRecord;
use crate::domain::query::QueryParams;

pub const DEFAULT_FANOUT_CATEGORIES: NonZeroUsize = NonZeroUsize::new(5).unwrap();

const METRIC_TACTIC_TOTAL: &str = "gazette_fetch_tactic_total";
const METRIC_FETCH_MS: &str = "gazette_fetch_duration_ms";

const SEARCH_PLAN: &[Tactic] = &[Tactic::Search];
const CATEGORY_PLAN: &[Tactic] = &[Tactic::Category];
const BROWSE_PLAN: &[Tactic] = &[Tactic::DirectListing, Tactic::CategoryFanOut, Tactic::Legacy];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tactic {
    Search,
    Category,
    DirectListing,
    CategoryFanOut,
    Legacy,
}

impl Tactic {
    pub fn as_str(self) -> &'static str {
        match self {
            Tactic::Search => "search",
            Tactic::Category => "category",
            Tactic::DirectListing => "direct_listing",
            Tactic::CategoryFanOut => "category_fan_out",
            Tactic::Legacy => "legacy",
        }
    }
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TacticError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("category catalog could not be loaded: {0}")]
    Catalog(SourceError),
    #[error("category catalog is empty")]
    EmptyCatalog,
    #[error("all {attempted} category requests failed")]
    AllCategoriesFailed { attempted: usize },
}

#[derive(Debug)]
pub struct TacticFailure {
    pub tactic: Tactic,
    pub error: TacticError,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("fetch cancelled")]
    Cancelled,
    #[error("every fetch tactic failed ({} attempted)", .attempts.len())]
    Exhausted { attempts: Vec<TacticFailure> },
}

/// Result of a plan that produced records.
#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<PublicationRecord>,
    /// Tactic that produced `records`.
    pub tactic: Tactic,
    /// Tactics that failed before it.
    pub failures: Vec<TacticFailure>,
}

#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Maximum number of categories queried by the fan-out tactic.
    pub fanout_categories: NonZeroUsize,
    /// Pause before the legacy endpoint is attempted.
    pub legacy_backoff: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fanout_categories: DEFAULT_FANOUT_CATEGORIES,
            legacy_backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FallbackStrategy {
    config: StrategyConfig,
}

impl FallbackStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Tactics attempted for `query`, in order.
    pub fn plan(query: &QueryParams) -> &'static [Tactic] {
        if query.search().is_some() {
            SEARCH_PLAN
        } else if query.category().is_some() {
            CATEGORY_PLAN
        } else {
            BROWSE_PLAN
        }
    }

    /// Run the plan for `query` until a tactic succeeds.
    ///
    /// Stops with [`StrategyError::Cancelled`] as soon as `cancel` fires; the
    /// in-flight source future is dropped at that point.
    pub async fn fetch(
        &self,
        source: &dyn PublicationSource,
        query: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, StrategyError> {
        let started_at = Instant::now();
        let mut failures = Vec::new();

        for &tactic in Self::plan(query) {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(tactic = tactic.as_str(), "fetch cancelled before tactic completed");
                    return Err(StrategyError::Cancelled);
                }
                result = self.run_tactic(tactic, source, query) => result,
            };

            match attempt {
                Ok(mut records) => {
                    records.truncate(query.cap());
                    info!(
                        tactic = tactic.as_str(),
                        outcome = "success",
                        record_count = records.len(),
                        "Fetch tactic succeeded"
                    );
                    counter!(METRIC_TACTIC_TOTAL, "tactic" => tactic.as_str(), "outcome" => "success")
                        .increment(1);
                    histogram!(METRIC_FETCH_MS, "outcome" => "success")
                        .record(started_at.elapsed().as_secs_f64() * 1000.0);
                    return Ok(FetchOutcome {
                        records,
                        tactic,
                        failures,
                    });
                }
                Err(error) => {
                    warn!(
                        tactic = tactic.as_str(),
                        outcome = "failure",
                        record_count = 0,
                        error = %error,
                        "Fetch tactic failed; falling through"
                    );
                    counter!(METRIC_TACTIC_TOTAL, "tactic" => tactic.as_str(), "outcome" => "failure")
                        .increment(1);
                    failures.push(TacticFailure { tactic, error });
                }
            }
        }

        histogram!(METRIC_FETCH_MS, "outcome" => "exhausted")
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        Err(StrategyError::Exhausted { attempts: failures })
    }

    async fn run_tactic(
        &self,
        tactic: Tactic,
        source: &dyn PublicationSource,
        query: &QueryParams,
    ) -> Result<Vec<PublicationRecord>, TacticError> {
        let cap = query.cap();
        match tactic {
            Tactic::Search => {
                let term = query.search().unwrap_or_default();
                Ok(source.fetch_by_search_term(term, cap, 0).await?)
            }
            Tactic::Category => match query.category() {
                Some(category) => Ok(source.fetch_by_category(category, cap, 0).await?),
                None => Ok(Vec::new()),
            },
            Tactic::DirectListing => Ok(source.fetch_all(cap, 0, query.status().as_status()).await?),
            Tactic::CategoryFanOut => self.fan_out(source, cap).await,
            Tactic::Legacy => {
                if !self.config.legacy_backoff.is_zero() {
                    tokio::time::sleep(self.config.legacy_backoff).await;
                }
                Ok(source.fetch_legacy_latest(cap).await?)
            }
        }
    }

    async fn fan_out(
        &self,
        source: &dyn PublicationSource,
        cap: usize,
    ) -> Result<Vec<PublicationRecord>, TacticError> {
        let catalog = source.list_categories().await.map_err(TacticError::Catalog)?;
        if catalog.is_empty() {
            return Err(TacticError::EmptyCatalog);
        }

        let selected: Vec<_> = catalog
            .into_iter()
            .take(self.config.fanout_categories.get())
            .collect();
        let per_category = (cap / selected.len()).max(1);

        // join_all keeps enumeration order regardless of completion order.
        let results = join_all(selected.iter().map(|category| async move {
            (
                category,
                source.fetch_by_category(category.id, per_category, 0).await,
            )
        }))
        .await;

        let mut aggregator = Aggregator::with_capacity(cap);
        let mut failed = 0usize;
        for (category, result) in results {
            match result {
                Ok(records) => {
                    debug!(
                        category_id = category.id,
                        record_count = records.len(),
                        "Category fetched"
                    );
                    aggregator.push(records);
                }
                Err(error) => {
                    failed += 1;
                    warn!(
                        category_id = category.id,
                        category = %category.name,
                        error = %error,
                        "Category fetch failed; treating as empty"
                    );
                }
            }
        }

        if failed == selected.len() {
            return Err(TacticError::AllCategoriesFailed { attempted: failed });
        }

        info!(
            categories = selected.len(),
            failed,
            per_category,
            duplicates = aggregator.duplicates(),
            record_count = aggregator.len(),
            "Category fan-out merged"
        );
        Ok(aggregator.finish())
    }
}
