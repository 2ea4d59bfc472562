//! Harness Configuration

use anyhow::{Context, Result};
use layer_watch::{ElasticConfig, WaitConfig, RELEASE_TICK_MESSAGE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Harness configuration, loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Elasticsearch base URL
    pub elastic_url: String,
    /// Index pattern holding cluster logs
    pub index: String,
    /// Message nodes log on every released layer
    pub release_tick_message: String,
    /// Seconds between two polls while waiting for layers
    pub poll_interval_secs: u64,
    /// Upper bound on hits per query
    pub max_hits: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            elastic_url: "http://127.0.0.1:9200".to_string(),
            index: "kubernetes_cluster-*".to_string(),
            release_tick_message: RELEASE_TICK_MESSAGE.to_string(),
            poll_interval_secs: 15,
            max_hits: 10_000,
            request_timeout_secs: 10,
        }
    }
}

impl HarnessConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn elastic(&self) -> ElasticConfig {
        ElasticConfig {
            url: self.elastic_url.clone(),
            index: self.index.clone(),
            release_tick_message: self.release_tick_message.clone(),
            max_hits: self.max_hits,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn wait(&self) -> WaitConfig {
        WaitConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}
