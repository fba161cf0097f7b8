//! Orchestration tests against an in-memory listing
//!
//! The scripted source and publishers come from `crawler::testing`, so the
//! crawl loop runs without a network: timing, failures and page contents are
//! all fixed per test.

use page_harvester::checkpoint::CheckpointError;
use page_harvester::config::{Config, DetailExhaustionPolicy};
use page_harvester::crawler::testing::{
    RecordingPublisher, RejectingPublisher, ScriptedItem, ScriptedSource,
};
use page_harvester::crawler::{Coordinator, RetryOutcome, RetryPolicy};
use page_harvester::storage::{CsvSink, RecordSink};
use page_harvester::{CrawlPhase, HarvestError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn item(key: &str) -> ScriptedItem {
    ScriptedItem::new(key)
}

fn slow(key: &str, latency_ms: u64) -> ScriptedItem {
    ScriptedItem::new(key).delayed(latency_ms)
}

fn config(start: u32, end: u32) -> Config {
    let mut config = Config::default();
    config.crawler.start_page = start;
    config.crawler.end_page = end;
    config.crawler.retry_delay_ms = 0;
    config.crawler.pacing_min_ms = 0;
    config.crawler.pacing_max_ms = 0;
    config
}

fn run_setup(
    config: &Config,
    source: Arc<ScriptedSource>,
    output: &Path,
    publisher: &RecordingPublisher,
) -> Coordinator {
    let sink = Box::new(CsvSink::open(output).expect("Failed to open output"));
    Coordinator::new(config, source, sink, Box::new(publisher.clone()))
        .expect("Failed to create coordinator")
}

fn stored_keys(output: &Path) -> Vec<String> {
    CsvSink::open(output)
        .unwrap()
        .load_records()
        .unwrap()
        .into_iter()
        .map(|r| r.item_key)
        .collect()
}

#[tokio::test]
async fn test_order_independent_of_completion_timing() {
    let source = Arc::new(ScriptedSource::new().with_page(
        1,
        vec![
            slow("k1", 80),
            slow("k2", 60),
            slow("k3", 40),
            slow("k4", 20),
            item("k5"),
        ],
    ));
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    run_setup(&config(1, 1), source, &output, &RecordingPublisher::new())
        .run()
        .await
        .unwrap();

    assert_eq!(stored_keys(&output), vec!["k1", "k2", "k3", "k4", "k5"]);
}

#[tokio::test]
async fn test_keys_unique_across_pages() {
    // "shared" is listed on two pages and repeated within page 3
    let source = Arc::new(
        ScriptedSource::new()
            .with_page(3, vec![item("a"), item("shared"), item("shared")])
            .with_page(2, vec![item("shared"), item("b")]),
    );
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let report = run_setup(&config(3, 2), source, &output, &RecordingPublisher::new())
        .run()
        .await
        .unwrap();

    let keys = stored_keys(&output);
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len());
    assert_eq!(keys, vec!["a", "shared", "b"]);
    assert_eq!(report.duplicates_skipped, 2);
}

#[tokio::test]
async fn test_scenario_page_fifty() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_page(60, vec![item("B")])
            .with_page(50, vec![slow("A", 50), slow("B", 10), item("C")]),
    );
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    // B is collected by an earlier run
    run_setup(&config(60, 60), source.clone(), &output, &RecordingPublisher::new())
        .run()
        .await
        .unwrap();

    let mut coordinator = run_setup(&config(50, 50), source, &output, &RecordingPublisher::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.records_added, 2);
    assert_eq!(coordinator.state().consecutive_failures, 0);
    assert_eq!(stored_keys(&output), vec!["B", "A", "C"]);
}

#[tokio::test]
async fn test_circuit_breaker_stops_before_sixth_page() {
    let mut source = ScriptedSource::new();
    for page in 1..=10 {
        source = source.with_page(page, vec![]);
    }
    let source = Arc::new(source);
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let result = run_setup(&config(1, 10), source.clone(), &output, &RecordingPublisher::new())
        .run()
        .await;

    let err = result.expect_err("crawl should stop");
    assert!(matches!(err, HarvestError::CircuitOpen { last_page: 5, .. }));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(source.page_calls(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    // Four broken pages, a good one, four more broken ones: never five in a row
    let mut source = ScriptedSource::new().with_page(5, vec![item("mid")]);
    for page in (1..=4).chain(6..=9) {
        source = source.with_failing_page(page, u32::MAX, vec![]);
    }
    let mut config = config(1, 9);
    config.crawler.max_retries = 0;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let report = run_setup(&config, Arc::new(source), &output, &RecordingPublisher::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.pages_failed, 8);
    assert_eq!(report.pages_succeeded, 1);
    assert_eq!(stored_keys(&output), vec!["mid"]);
}

#[tokio::test]
async fn test_checkpoint_cadence_with_final_flush() {
    let mut source = ScriptedSource::new();
    for page in 1..=23 {
        source = source.with_page(page, vec![item(&format!("p{}", page))]);
    }
    let recorder = RecordingPublisher::new();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let report = run_setup(&config(1, 23), Arc::new(source), &output, &recorder)
        .run()
        .await
        .unwrap();

    assert_eq!(report.checkpoints, 3);
    assert_eq!(
        recorder.labels(),
        vec![
            "Update data for pages 1 to 10",
            "Update data for pages 11 to 20",
            "Final update for pages 21 to 23",
        ]
    );
}

#[tokio::test]
async fn test_rejected_checkpoint_ends_crawl() {
    let mut source = ScriptedSource::new();
    for page in 1..=12 {
        source = source.with_page(page, vec![item(&format!("p{}", page))]);
    }
    let source = Arc::new(source);
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let sink = Box::new(CsvSink::open(&output).unwrap());
    let mut coordinator =
        Coordinator::new(&config(1, 12), source.clone(), sink, Box::new(RejectingPublisher))
            .unwrap();
    let err = coordinator.run().await.expect_err("checkpoint should fail");

    assert!(matches!(
        err,
        HarvestError::Checkpoint(CheckpointError::CommandFailed { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        coordinator.report().phase,
        CrawlPhase::Terminated { success: false }
    );
    // Nothing past the first checkpoint is attempted
    assert_eq!(source.page_calls().len(), 10);
    assert_eq!(stored_keys(&output).len(), 10);
}

#[tokio::test]
async fn test_flaky_details_recover_within_retry_bound() {
    let source = Arc::new(
        ScriptedSource::new().with_page(1, vec![item("flaky").failing(3), item("steady")]),
    );
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    run_setup(&config(1, 1), source.clone(), &output, &RecordingPublisher::new())
        .run()
        .await
        .unwrap();

    assert_eq!(stored_keys(&output), vec!["flaky", "steady"]);
    assert_eq!(source.detail_calls("flaky"), 4);
    assert_eq!(source.detail_calls("steady"), 1);
}

#[tokio::test]
async fn test_skip_policy_continues_past_dead_item() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_page(2, vec![item("x"), item("dead").failing(u32::MAX)])
            .with_page(1, vec![item("y")]),
    );
    let mut config = config(2, 1);
    config.crawler.detail_exhaustion = DetailExhaustionPolicy::Skip;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let report = run_setup(&config, source, &output, &RecordingPublisher::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.items_skipped, 1);
    assert_eq!(stored_keys(&output), vec!["x", "y"]);
}

#[tokio::test]
async fn test_detail_concurrency_bounded() {
    let items: Vec<ScriptedItem> = (0..12).map(|i| slow(&format!("i{}", i), 20)).collect();
    let source = Arc::new(ScriptedSource::new().with_page(1, items));
    let mut config = config(1, 1);
    config.crawler.max_workers = 3;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    run_setup(&config, source.clone(), &output, &RecordingPublisher::new())
        .run()
        .await
        .unwrap();

    let peak = source.max_in_flight();
    assert!(peak <= 3, "peak concurrency {} exceeded the pool size", peak);
    assert_eq!(stored_keys(&output).len(), 12);
}

#[tokio::test]
async fn test_retry_bound() {
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let calls = AtomicUsize::new(0);
    let outcome = policy
        .execute("recovers", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Err("down")
            } else {
                Ok(n)
            }
        })
        .await;
    assert!(matches!(outcome, RetryOutcome::Success { value: 3, attempts: 4 }));

    let calls = AtomicUsize::new(0);
    let outcome: RetryOutcome<(), &str> = policy
        .execute("never", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("down")
        })
        .await;
    assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 4, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
