//! Layer Watch - follow a running cluster through its logs
//!
//! Handles everything the audit learns from the cluster's log service:
//! - Waiting for a number of layers to be released
//! - Querying release ticks and other hits from Elasticsearch
//! - Summarising hits for diagnostics

pub mod diagnostics;
pub mod elastic;
pub mod source;
pub mod waiter;

pub use diagnostics::{count_entry_values, hit_time_span, log_entry_counts, DiagnosticsError};
pub use elastic::{parse_hits, parse_total, search_body, ElasticConfig, ElasticSource};
pub use source::{QueryError, ReleaseTickSource, ScriptedSource, RELEASE_TICK_MESSAGE};
pub use waiter::{wait_for_layers, LayerWaiter, WaitConfig, WaitOutcome, DEFAULT_POLL_INTERVAL};

#[cfg(test)]
mod tests;
