mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{Endpoint, Reply, ScriptedSource, records};
use gazette::application::session::{FeedSession, SessionOptions};
use gazette::domain::query::QueryParams;
use gazette::domain::types::SortOrder;
use metrics_util::debugging::DebuggingRecorder;

#[tokio::test(start_paused = true)]
async fn fetch_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let source = Arc::new(
        ScriptedSource::new()
            .once(
                Endpoint::All,
                Reply::ok(records(1..=3)).after(Duration::from_millis(500)),
            )
            .once(Endpoint::All, Reply::fail("listing down"))
            .with_catalog([])
            .always(Endpoint::Legacy, Reply::ok(records(1..=3))),
    );
    let session = FeedSession::new(source, SessionOptions::default());

    // First epoch is superseded while its listing call is still pending.
    session.set_query(QueryParams::published());
    tokio::time::sleep(Duration::from_millis(10)).await;
    session.set_query(QueryParams::published().with_sort(SortOrder::Oldest));
    let snapshot = session.settled().await;
    assert_eq!(snapshot.records.len(), 3);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "gazette_fetch_tactic_total",
        "gazette_fetch_discarded_total",
        "gazette_fetch_duration_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
