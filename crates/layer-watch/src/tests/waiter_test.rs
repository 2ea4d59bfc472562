//! Layer waiter tests
//!
//! Runs on tokio's paused clock so the 15 second cadence costs nothing;
//! elapsed virtual time tells exactly how many pauses the waiter took.

use std::time::Duration;

use crate::{
    wait_for_layers, LayerWaiter, QueryError, ScriptedSource, WaitConfig, WaitOutcome,
};
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_secs(15);

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn test_satisfied_after_settling_pause() {
    let source = ScriptedSource::new([6, 9]);
    let start = Instant::now();

    let outcome = wait_for_layers(&source, "ns", 3, secs(120)).await.unwrap();

    assert_eq!(outcome, WaitOutcome::Reached { old: 6, new: 9 });
    assert_eq!(source.calls(), 2);
    assert_eq!(start.elapsed(), INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_accumulates_until_delta() {
    let source = ScriptedSource::new([3, 4, 5, 6, 7]);
    let start = Instant::now();

    let outcome = wait_for_layers(&source, "ns", 3, secs(120)).await.unwrap();

    assert_eq!(outcome, WaitOutcome::Reached { old: 3, new: 6 });
    assert_eq!(source.calls(), 4);
    assert_eq!(start.elapsed(), INTERVAL * 3);
}

#[tokio::test(start_paused = true)]
async fn test_drain_returns_once_aligned() {
    let source = ScriptedSource::new([4, 5, 6, 9]);
    let start = Instant::now();

    let outcome = wait_for_layers(&source, "ns", 3, secs(120)).await.unwrap();

    assert_eq!(outcome, WaitOutcome::Aligned { count: 6 });
    assert_eq!(source.calls(), 3);
    assert_eq!(start.elapsed(), INTERVAL * 2);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_misaligned_cluster_times_out() {
    let source = ScriptedSource::new([4]);
    let start = Instant::now();

    let outcome = wait_for_layers(&source, "ns", 3, secs(100)).await.unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut { old: 4, new: 4 });
    assert!(outcome.timed_out());
    // baseline + 6 drain polls + settling poll
    assert_eq!(source.calls(), 8);
    assert_eq!(start.elapsed(), INTERVAL * 7);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_aligned_cluster_times_out() {
    let source = ScriptedSource::new([6]);
    let start = Instant::now();

    let outcome = wait_for_layers(&source, "ns", 3, secs(60)).await.unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut { old: 6, new: 6 });
    // baseline + settling poll + 4 accumulation polls
    assert_eq!(source.calls(), 6);
    assert_eq!(start.elapsed(), INTERVAL * 5);
}

#[tokio::test(start_paused = true)]
async fn test_poll_count_bounded_by_timeout() {
    for timeout in [0, 1, 14, 15, 29, 30, 100, 301] {
        for start_count in [4, 6] {
            let source = ScriptedSource::new([start_count]);
            let outcome = wait_for_layers(&source, "ns", 3, secs(timeout)).await.unwrap();

            assert!(outcome.timed_out());
            let loop_polls = source.calls() - 2;
            assert!(
                loop_polls as u64 <= timeout / 15,
                "timeout {}s issued {} polls",
                timeout,
                loop_polls
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_still_settles_once() {
    let source = ScriptedSource::new([4, 8]);
    let start = Instant::now();

    let outcome = wait_for_layers(&source, "ns", 3, Duration::ZERO).await.unwrap();

    assert_eq!(outcome, WaitOutcome::Reached { old: 4, new: 8 });
    assert_eq!(source.calls(), 2);
    assert_eq!(start.elapsed(), INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_custom_poll_interval() {
    let source = ScriptedSource::new([0, 1, 2]);
    let waiter = LayerWaiter::with_config(
        &source,
        WaitConfig {
            poll_interval: secs(1),
        },
    );
    let start = Instant::now();

    let outcome = waiter.wait_for_layers("ns", 2, secs(10)).await.unwrap();

    assert_eq!(outcome, WaitOutcome::Reached { old: 0, new: 2 });
    assert_eq!(start.elapsed(), secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_counts_beyond_one_search_page() {
    let source = ScriptedSource::new([10_000, 10_002, 10_004]);

    let outcome = wait_for_layers(&source, "ns", 4, secs(120)).await.unwrap();

    assert_eq!(outcome, WaitOutcome::Reached { old: 10_000, new: 10_004 });
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_query_failure_propagates() {
    let source = ScriptedSource::new([3]);
    source.push_failure("index missing");

    let result = wait_for_layers(&source, "ns", 3, secs(60)).await;

    assert!(matches!(result, Err(QueryError::Unavailable(reason)) if reason == "index missing"));
}
