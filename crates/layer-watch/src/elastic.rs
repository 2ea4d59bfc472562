//! Elasticsearch-backed log queries
//!
//! Cluster logs are shipped to an Elasticsearch index with the pod's
//! Kubernetes metadata attached. Release ticks are found by namespace and
//! message.

use crate::source::{QueryError, ReleaseTickSource, RELEASE_TICK_MESSAGE};
use async_trait::async_trait;
use audit_types::{log_entry_attribute, LogHit, ReleaseTick};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Field holding the namespace a log line came from
pub const NAMESPACE_FIELD: &str = "kubernetes.namespace_name";

/// Elasticsearch connection settings
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL, e.g. `http://127.0.0.1:9200`
    pub url: String,
    /// Index or index pattern to search
    pub index: String,
    /// Message identifying a release tick
    pub release_tick_message: String,
    /// Upper bound on hits returned by one search
    pub max_hits: usize,
    pub request_timeout: Duration,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9200".to_string(),
            index: "kubernetes_cluster-*".to_string(),
            release_tick_message: RELEASE_TICK_MESSAGE.to_string(),
            max_hits: 10_000,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<HitDocument>,
}

/// `hits.total`: an object on 7.x and later, a bare number before
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: usize },
    Count(usize),
}

impl TotalHits {
    fn value(&self) -> usize {
        match self {
            TotalHits::Object { value } => *value,
            TotalHits::Count(value) => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HitDocument {
    #[serde(rename = "_source")]
    source: LogHit,
}

/// Build the search body matching `message` in `namespace`
///
/// The exact match total is always tracked; `size` only bounds the page.
pub fn search_body(namespace: &str, message: &str, size: usize) -> Value {
    let message_attribute = log_entry_attribute("message").unwrap_or("M");

    let mut namespace_match = Map::new();
    namespace_match.insert(NAMESPACE_FIELD.to_string(), json!(namespace));
    let mut message_match = Map::new();
    message_match.insert(message_attribute.to_string(), json!(message));

    json!({
        "size": size,
        "track_total_hits": true,
        "query": {
            "bool": {
                "filter": [
                    { "match_phrase": Value::Object(namespace_match) },
                    { "match_phrase": Value::Object(message_match) }
                ]
            }
        }
    })
}

/// Extract the log hits from a `_search` response body
pub fn parse_hits(body: &[u8]) -> Result<Vec<LogHit>, QueryError> {
    let response: SearchResponse = serde_json::from_slice(body)?;
    Ok(response.hits.hits.into_iter().map(|doc| doc.source).collect())
}

/// Extract the total number of matches from a `_search` response body
///
/// This is independent of how many hits the page carries.
pub fn parse_total(body: &[u8]) -> Result<usize, QueryError> {
    let response: SearchResponse = serde_json::from_slice(body)?;
    response
        .hits
        .total
        .map(|total| total.value())
        .ok_or(QueryError::MissingTotal)
}

/// Log query client for an Elasticsearch cluster
pub struct ElasticSource {
    client: reqwest::Client,
    config: ElasticConfig,
}

impl ElasticSource {
    pub fn new(config: ElasticConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn search_url(&self) -> String {
        format!(
            "{}/{}/_search",
            self.config.url.trim_end_matches('/'),
            self.config.index
        )
    }

    async fn post_search(&self, body: &Value) -> Result<Vec<u8>, QueryError> {
        let url = self.search_url();
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Number of hits logged in `namespace` whose message matches `message`
    pub async fn count(&self, namespace: &str, message: &str) -> Result<usize, QueryError> {
        tracing::debug!("Counting '{}' in {}", message, namespace);
        let bytes = self.post_search(&search_body(namespace, message, 0)).await?;
        parse_total(&bytes)
    }

    /// Hits logged in `namespace` whose message matches `message`
    ///
    /// At most `max_hits` are returned; a truncated page is logged.
    pub async fn search(&self, namespace: &str, message: &str) -> Result<Vec<LogHit>, QueryError> {
        tracing::debug!("Querying '{}' in {}", message, namespace);
        let body = search_body(namespace, message, self.config.max_hits);
        let bytes = self.post_search(&body).await?;

        let hits = parse_hits(&bytes)?;
        if let Ok(total) = parse_total(&bytes) {
            if total > hits.len() {
                tracing::warn!(
                    "Query for '{}' in {} truncated: {} of {} hits returned",
                    message,
                    namespace,
                    hits.len(),
                    total
                );
            }
        }
        Ok(hits)
    }
}

#[async_trait]
impl ReleaseTickSource for ElasticSource {
    async fn release_ticks(&self, namespace: &str) -> Result<Vec<ReleaseTick>, QueryError> {
        self.search(namespace, &self.config.release_tick_message).await
    }

    async fn release_tick_count(&self, namespace: &str) -> Result<usize, QueryError> {
        self.count(namespace, &self.config.release_tick_message).await
    }
}
