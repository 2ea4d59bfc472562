//! Log hits returned by the cluster's log query service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical log field names mapped to the attribute nodes write them under
pub const LOG_ENTRIES: &[(&str, &str)] = &[("message", "M")];

/// Resolve a logical field name through [`LOG_ENTRIES`]
pub fn log_entry_attribute(entry: &str) -> Option<&'static str> {
    LOG_ENTRIES
        .iter()
        .find(|(name, _)| *name == entry)
        .map(|(_, attribute)| *attribute)
}

/// A single structured log record
///
/// Nodes log with short keys (`M` message, `T` time, `L` level, `N` logger).
/// Anything else the log pipeline attached is kept in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogHit {
    #[serde(rename = "M", default)]
    pub message: String,
    #[serde(rename = "T", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A hit announcing that a new layer was released
///
/// Only the number of ticks seen matters; the record itself is opaque.
pub type ReleaseTick = LogHit;

impl LogHit {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Value of a log attribute rendered as a string
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "M" => Some(self.message.clone()),
            "T" => self.time.clone(),
            "L" => self.level.clone(),
            "N" => self.logger.clone(),
            _ => self.fields.get(name).map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    /// Parsed record time, if present and RFC 3339
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}
