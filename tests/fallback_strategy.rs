mod common;

use std::num::NonZeroUsize;
use std::time::Duration;

use common::{Endpoint, Reply, ScriptedSource, ids, in_category, record, records};
use gazette::application::strategy::{
    FallbackStrategy, StrategyConfig, StrategyError, Tactic, TacticError,
};
use gazette::domain::query::QueryParams;
use gazette::domain::types::PublicationStatus;
use tokio_util::sync::CancellationToken;

fn strategy() -> FallbackStrategy {
    FallbackStrategy::new(StrategyConfig::default())
}

#[tokio::test]
async fn fan_out_queries_first_five_categories_with_split_cap() {
    let source = ScriptedSource::new()
        .always(Endpoint::All, Reply::fail("listing down"))
        .with_catalog(1..=7)
        .always(Endpoint::Category(1), Reply::ok(records([10, 11])))
        .always(Endpoint::Category(2), Reply::ok(records([11, 20])))
        .always(Endpoint::Category(3), Reply::ok(records([30])))
        .always(Endpoint::Category(4), Reply::fail("timeout"))
        .always(Endpoint::Category(5), Reply::fail("500"))
        .always(Endpoint::Category(6), Reply::ok(records([60])))
        .always(Endpoint::Category(7), Reply::ok(records([70])));

    let query = QueryParams::published().with_cap(50);
    let outcome = strategy()
        .fetch(&source, &query, &CancellationToken::new())
        .await
        .expect("fan-out succeeds");

    assert_eq!(outcome.tactic, Tactic::CategoryFanOut);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].tactic, Tactic::DirectListing);
    assert_eq!(ids(&outcome.records), vec![10, 11, 20, 30]);

    let category_calls = source.category_calls();
    assert_eq!(category_calls.len(), 5);
    assert!(category_calls.iter().all(|call| call.cap == 10));
    assert_eq!(source.count(Endpoint::Category(6)), 0);
    assert_eq!(source.count(Endpoint::Legacy), 0);
}

#[tokio::test]
async fn direct_listing_passes_status_and_cap() {
    let source = ScriptedSource::new().always(Endpoint::All, Reply::ok(records(1..=3)));

    let outcome = strategy()
        .fetch(&source, &QueryParams::published().with_cap(12), &CancellationToken::new())
        .await
        .expect("listing succeeds");

    assert_eq!(outcome.tactic, Tactic::DirectListing);
    assert!(outcome.failures.is_empty());
    let calls = source.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].cap, 12);
    assert_eq!(calls[0].status, Some(PublicationStatus::Published));
}

#[tokio::test]
async fn oversized_responses_are_truncated_to_cap() {
    let source = ScriptedSource::new().always(Endpoint::All, Reply::ok(records(1..=80)));

    let outcome = strategy()
        .fetch(&source, &QueryParams::published().with_cap(50), &CancellationToken::new())
        .await
        .expect("listing succeeds");

    assert_eq!(outcome.records.len(), 50);
}

#[tokio::test]
async fn small_cap_still_requests_one_record_per_category() {
    let source = ScriptedSource::new()
        .with_catalog(1..=5)
        .always(Endpoint::Category(1), Reply::ok(records([1])))
        .always(Endpoint::Category(2), Reply::ok(records([2])))
        .always(Endpoint::Category(3), Reply::ok(records([3])))
        .always(Endpoint::Category(4), Reply::ok(records([4])))
        .always(Endpoint::Category(5), Reply::ok(records([5])));

    let outcome = strategy()
        .fetch(&source, &QueryParams::published().with_cap(3), &CancellationToken::new())
        .await
        .expect("fan-out succeeds");

    assert!(source.category_calls().iter().all(|call| call.cap == 1));
    assert_eq!(ids(&outcome.records), vec![1, 2, 3]);
}

#[tokio::test]
async fn fanout_limit_is_configurable() {
    let source = ScriptedSource::new()
        .with_catalog(1..=4)
        .always(Endpoint::Category(1), Reply::ok(records([1])))
        .always(Endpoint::Category(2), Reply::ok(records([2])));

    let strategy = FallbackStrategy::new(StrategyConfig {
        fanout_categories: NonZeroUsize::new(2).expect("non-zero"),
        ..StrategyConfig::default()
    });
    let outcome = strategy
        .fetch(&source, &QueryParams::published().with_cap(50), &CancellationToken::new())
        .await
        .expect("fan-out succeeds");

    assert_eq!(source.category_calls().len(), 2);
    assert!(source.category_calls().iter().all(|call| call.cap == 25));
    assert_eq!(ids(&outcome.records), vec![1, 2]);
}

#[tokio::test]
async fn every_tactic_failing_exhausts_the_chain() {
    let source = ScriptedSource::new();

    let error = strategy()
        .fetch(&source, &QueryParams::published(), &CancellationToken::new())
        .await
        .expect_err("nothing is scripted");

    match error {
        StrategyError::Exhausted { attempts } => {
            let tactics: Vec<_> = attempts.iter().map(|failure| failure.tactic).collect();
            assert_eq!(
                tactics,
                vec![Tactic::DirectListing, Tactic::CategoryFanOut, Tactic::Legacy]
            );
            assert!(matches!(attempts[1].error, TacticError::Catalog(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_catalog_falls_through_to_legacy() {
    let source = ScriptedSource::new()
        .with_catalog([])
        .always(Endpoint::Legacy, Reply::ok(records([5, 6])));

    let outcome = strategy()
        .fetch(&source, &QueryParams::published(), &CancellationToken::new())
        .await
        .expect("legacy succeeds");

    assert_eq!(outcome.tactic, Tactic::Legacy);
    assert!(matches!(
        outcome.failures[1].error,
        TacticError::EmptyCatalog
    ));
    assert_eq!(ids(&outcome.records), vec![5, 6]);
}

#[tokio::test]
async fn all_categories_failing_fails_the_fan_out() {
    let source = ScriptedSource::new()
        .with_catalog([1, 2])
        .always(Endpoint::Legacy, Reply::ok(records([9])));

    let outcome = strategy()
        .fetch(&source, &QueryParams::published(), &CancellationToken::new())
        .await
        .expect("legacy succeeds");

    assert_eq!(outcome.tactic, Tactic::Legacy);
    assert!(matches!(
        outcome.failures[1].error,
        TacticError::AllCategoriesFailed { attempted: 2 }
    ));
}

#[tokio::test]
async fn search_failure_surfaces_without_fallback() {
    let source = ScriptedSource::new()
        .always(Endpoint::Search, Reply::fail("search down"))
        .always(Endpoint::Legacy, Reply::ok(records([1, 2])))
        .always(Endpoint::All, Reply::ok(records([3])));

    let query = QueryParams::published()
        .with_search("  tokio  ")
        .with_category(Some(4));
    let error = strategy()
        .fetch(&source, &query, &CancellationToken::new())
        .await
        .expect_err("search has no fallback");

    match error {
        StrategyError::Exhausted { attempts } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].tactic, Tactic::Search);
        }
        other => panic!("unexpected error: {other}"),
    }
    let calls = source.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].term.as_deref(), Some("tokio"));
    assert_eq!(source.count(Endpoint::Legacy), 0);
    assert_eq!(source.count(Endpoint::All), 0);
    assert_eq!(source.count(Endpoint::Catalog), 0);
}

#[tokio::test]
async fn category_failure_surfaces_without_fallback() {
    let source = ScriptedSource::new()
        .always(Endpoint::Category(3), Reply::fail("category down"))
        .always(Endpoint::Legacy, Reply::ok(vec![in_category(record(1), 3)]));

    let query = QueryParams::published().with_category(Some(3));
    let error = strategy()
        .fetch(&source, &query, &CancellationToken::new())
        .await
        .expect_err("category has no fallback");

    match error {
        StrategyError::Exhausted { attempts } => {
            let tactics: Vec<_> = attempts.iter().map(|failure| failure.tactic).collect();
            assert_eq!(tactics, vec![Tactic::Category]);
            assert!(matches!(attempts[0].error, TacticError::Source(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(source.count(Endpoint::Legacy), 0);
    assert_eq!(source.count(Endpoint::All), 0);
}

#[tokio::test]
async fn category_query_returns_category_records() {
    let source = ScriptedSource::new().always(
        Endpoint::Category(3),
        Reply::ok(vec![in_category(record(1), 3), in_category(record(4), 3)]),
    );

    let query = QueryParams::published().with_category(Some(3));
    let outcome = strategy()
        .fetch(&source, &query, &CancellationToken::new())
        .await
        .expect("category succeeds");

    assert_eq!(outcome.tactic, Tactic::Category);
    assert!(outcome.failures.is_empty());
    assert_eq!(ids(&outcome.records), vec![1, 4]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_chain() {
    let source = ScriptedSource::new()
        .always(
            Endpoint::All,
            Reply::ok(records([1])).after(Duration::from_secs(10)),
        )
        .always(Endpoint::Legacy, Reply::ok(records([2])));
    let token = CancellationToken::new();
    let strategy = strategy();
    let query = QueryParams::published();

    let (result, ()) = tokio::join!(strategy.fetch(&source, &query, &token), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    assert!(matches!(result, Err(StrategyError::Cancelled)));
    assert_eq!(source.count(Endpoint::Legacy), 0);
}

#[tokio::test(start_paused = true)]
async fn legacy_backoff_delays_last_resort() {
    let source = ScriptedSource::new()
        .with_catalog([])
        .always(Endpoint::Legacy, Reply::ok(records([1])));
    let strategy = FallbackStrategy::new(StrategyConfig {
        legacy_backoff: Duration::from_secs(2),
        ..StrategyConfig::default()
    });

    let started = tokio::time::Instant::now();
    let outcome = strategy
        .fetch(&source, &QueryParams::published(), &CancellationToken::new())
        .await
        .expect("legacy succeeds");

    assert_eq!(outcome.tactic, Tactic::Legacy);
    assert!(started.elapsed() >= Duration::from_secs(2));
}
