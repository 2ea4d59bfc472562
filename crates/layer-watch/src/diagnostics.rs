//! Hit diagnostics - how often each value of a log entry shows up

use audit_types::{log_entry_attribute, LogHit};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticsError {
    #[error("unknown log entry {0}")]
    UnknownLogEntry(String),
}

/// Count occurrences of every value of `entry` across `hits`
///
/// Hits that do not carry the attribute are left out.
pub fn count_entry_values(
    hits: &[LogHit],
    entry: &str,
) -> Result<BTreeMap<String, usize>, DiagnosticsError> {
    let attribute = log_entry_attribute(entry)
        .ok_or_else(|| DiagnosticsError::UnknownLogEntry(entry.to_string()))?;

    let mut counts = BTreeMap::new();
    for value in hits.iter().filter_map(|hit| hit.attribute(attribute)) {
        *counts.entry(value).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Count and log occurrences of every value of `entry`
pub fn log_entry_counts(
    hits: &[LogHit],
    entry: &str,
) -> Result<BTreeMap<String, usize>, DiagnosticsError> {
    let counts = count_entry_values(hits, entry)?;
    for (value, count) in &counts {
        tracing::info!("found {} appearances of '{}' in hits", count, value);
    }
    Ok(counts)
}

/// Earliest and latest record time across `hits`
///
/// Hits without a parseable time are ignored; `None` when none has one.
pub fn hit_time_span(hits: &[LogHit]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    hits.iter()
        .filter_map(LogHit::timestamp)
        .fold(None, |span, t| match span {
            None => Some((t, t)),
            Some((first, last)) => Some((first.min(t), last.max(t))),
        })
}
