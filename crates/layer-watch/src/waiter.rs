//! Layer waiter - block until the cluster has released more layers
//!
//! Layer progress is only visible through the release ticks nodes log, so the
//! waiter polls the tick count at a fixed cadence. Every node logs one tick per
//! layer; with `delta` nodes reporting, `delta` new ticks mean one new layer.
//!
//! Polling happens in two phases:
//! 1. Drain: if sampling started mid-burst (count not a multiple of `delta`),
//!    wait for the burst to finish and return as soon as it does.
//! 2. Accumulate: after a settling interval, wait for `delta` more ticks.
//!
//! Running out of time is not an error. Callers re-check the cluster if they
//! need to know whether the target was reached.

use crate::source::{QueryError, ReleaseTickSource};
use std::time::Duration;
use tokio::time::sleep;

/// Default pause between two polls of the log service
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Waiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Pause between polls, also the unit the timeout budget is spent in
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Sampling started mid-burst and the burst completed
    Aligned { count: usize },
    /// `new - old` reached the requested delta
    Reached { old: usize, new: usize },
    /// The timeout budget ran out first
    TimedOut { old: usize, new: usize },
}

impl WaitOutcome {
    pub fn timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut { .. })
    }
}

/// Polls a release tick source until enough layers went by
pub struct LayerWaiter<S> {
    source: S,
    config: WaitConfig,
}

impl<S: ReleaseTickSource> LayerWaiter<S> {
    /// Create a waiter with the default 15 second cadence
    pub fn new(source: S) -> Self {
        Self::with_config(source, WaitConfig::default())
    }

    pub fn with_config(source: S, config: WaitConfig) -> Self {
        // A zero interval would spin without ever spending the budget
        let poll_interval = config.poll_interval.max(Duration::from_millis(1));
        Self {
            source,
            config: WaitConfig { poll_interval },
        }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Wait until `delta` more release ticks were logged in `namespace`
    ///
    /// Each loop poll spends one interval of `timeout`; a poll only happens
    /// while a whole interval is left, so at most `timeout / interval` loop
    /// polls are issued. The settling pause is not charged to the budget.
    pub async fn wait_for_layers(
        &self,
        namespace: &str,
        delta: usize,
        timeout: Duration,
    ) -> Result<WaitOutcome, QueryError> {
        let interval = self.config.poll_interval;
        let mut budget = timeout;

        let mut old = self.source.release_tick_count(namespace).await?;
        tracing::info!(
            "Waiting for {} release ticks in {} (currently {}, timeout {:?})",
            delta,
            namespace,
            old,
            timeout
        );

        if delta == 0 {
            return Ok(WaitOutcome::Reached { old, new: old });
        }

        // Sampling started while a layer was still being released
        while old % delta != 0 && budget >= interval {
            sleep(interval).await;
            old = self.source.release_tick_count(namespace).await?;
            if old % delta == 0 {
                tracing::info!("Release ticks aligned at {} in {}", old, namespace);
                return Ok(WaitOutcome::Aligned { count: old });
            }
            budget -= interval;
            tracing::debug!("Draining: {} ticks, {:?} left", old, budget);
        }

        sleep(interval).await;
        let mut new = self.source.release_tick_count(namespace).await?;

        while old + delta > new && budget >= interval {
            sleep(interval).await;
            new = self.source.release_tick_count(namespace).await?;
            budget -= interval;
            tracing::debug!(
                "Accumulating: {} of {} new ticks, {:?} left",
                new.saturating_sub(old),
                delta,
                budget
            );
        }

        if new >= old + delta {
            tracing::info!("Observed {} new release ticks in {}", new - old, namespace);
            Ok(WaitOutcome::Reached { old, new })
        } else {
            tracing::warn!(
                "Timed out waiting for release ticks in {}: {} of {} observed",
                namespace,
                new.saturating_sub(old),
                delta
            );
            Ok(WaitOutcome::TimedOut { old, new })
        }
    }
}

/// Wait with the default cadence
pub async fn wait_for_layers<S: ReleaseTickSource>(
    source: S,
    namespace: &str,
    delta: usize,
    timeout: Duration,
) -> Result<WaitOutcome, QueryError> {
    LayerWaiter::new(source)
        .wait_for_layers(namespace, delta, timeout)
        .await
}
