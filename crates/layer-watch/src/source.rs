//! Release tick sources
//!
//! The waiter only ever asks "how many release ticks has this namespace logged
//! so far". Anything able to answer that repeatedly and cheaply can drive it.

use async_trait::async_trait;
use audit_types::ReleaseTick;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Message nodes log when the clock releases a new layer
pub const RELEASE_TICK_MESSAGE: &str = "release tick";

/// Errors raised while querying the log service
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("query request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("query service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed query response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("query response carries no hit total")]
    MissingTotal,

    #[error("query source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the release ticks logged in a namespace
#[async_trait]
pub trait ReleaseTickSource: Send + Sync {
    /// All release ticks logged in `namespace` so far
    async fn release_ticks(&self, namespace: &str) -> Result<Vec<ReleaseTick>, QueryError>;

    /// Number of release ticks logged in `namespace` so far
    async fn release_tick_count(&self, namespace: &str) -> Result<usize, QueryError> {
        Ok(self.release_ticks(namespace).await?.len())
    }
}

#[async_trait]
impl<T: ReleaseTickSource + ?Sized> ReleaseTickSource for &T {
    async fn release_ticks(&self, namespace: &str) -> Result<Vec<ReleaseTick>, QueryError> {
        (**self).release_ticks(namespace).await
    }

    async fn release_tick_count(&self, namespace: &str) -> Result<usize, QueryError> {
        (**self).release_tick_count(namespace).await
    }
}

#[async_trait]
impl<T: ReleaseTickSource + ?Sized> ReleaseTickSource for Arc<T> {
    async fn release_ticks(&self, namespace: &str) -> Result<Vec<ReleaseTick>, QueryError> {
        (**self).release_ticks(namespace).await
    }

    async fn release_tick_count(&self, namespace: &str) -> Result<usize, QueryError> {
        (**self).release_tick_count(namespace).await
    }
}

/// One scripted answer
#[derive(Debug, Clone)]
enum Step {
    Count(usize),
    Fail(String),
}

#[derive(Debug, Default)]
struct ScriptState {
    steps: VecDeque<Step>,
    last: usize,
    calls: usize,
}

/// In-memory source answering from a script of tick counts
///
/// Each query consumes the next step; once the script runs out the last
/// count is repeated, so a cluster that stopped advancing is one count long.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    state: Mutex<ScriptState>,
}

impl ScriptedSource {
    pub fn new<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        Self {
            state: Mutex::new(ScriptState {
                steps: counts.into_iter().map(Step::Count).collect(),
                ..Default::default()
            }),
        }
    }

    /// Append a count to the script
    pub fn push_count(&self, count: usize) {
        self.state.lock().steps.push_back(Step::Count(count));
    }

    /// Append a failed query to the script
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.state.lock().steps.push_back(Step::Fail(reason.into()));
    }

    /// Number of queries answered so far
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    fn next_count(&self) -> Result<usize, QueryError> {
        let mut state = self.state.lock();
        state.calls += 1;

        match state.steps.pop_front() {
            Some(Step::Count(count)) => {
                state.last = count;
                Ok(count)
            }
            Some(Step::Fail(reason)) => Err(QueryError::Unavailable(reason)),
            None => Ok(state.last),
        }
    }
}

#[async_trait]
impl ReleaseTickSource for ScriptedSource {
    async fn release_ticks(&self, _namespace: &str) -> Result<Vec<ReleaseTick>, QueryError> {
        let count = self.next_count()?;
        Ok((0..count)
            .map(|_| ReleaseTick::with_message(RELEASE_TICK_MESSAGE))
            .collect())
    }

    async fn release_tick_count(&self, _namespace: &str) -> Result<usize, QueryError> {
        self.next_count()
    }
}
