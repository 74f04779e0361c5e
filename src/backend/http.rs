//! An HTTP [`BackendAdapter`] speaking the templated-query document
//! store contract of spec §6. Shaped after the search-template and
//! bulk-update APIs the system this crate's specification was
//! distilled from actually talks to (see `original_source/` in the
//! retrieval pack this crate was built from), without depending on any
//! particular document store's client library — any store that
//! accepts the same JSON shapes works.

use super::BackendAdapter;
use crate::error::BackendError;
use crate::model::{Node, TaxonId};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use futures::stream::BoxStream;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Connection settings for an [`HttpBackendAdapter`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub index: String,
    pub max_retry_elapsed: Duration,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            index: index.into(),
            max_retry_elapsed: Duration::from_secs(30),
        }
    }
}

pub struct HttpBackendAdapter {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: serde_json::Value,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct MaxDepthResponse {
    aggregations: MaxDepthAggregations,
}

#[derive(Deserialize)]
struct MaxDepthAggregations {
    depths: MaxDepthValue,
}

#[derive(Deserialize)]
struct MaxDepthValue {
    value: Option<f64>,
}

/// Malformed individual documents (missing fields, wrong shapes) are
/// logged and dropped rather than failing the whole page: per spec
/// §7 these are per-node faults, not query failures.
fn hits_into_nodes(hits: Vec<SearchHit>) -> Vec<Node> {
    hits.into_iter()
        .filter_map(|hit| match serde_json::from_value::<Node>(hit.source) {
            Ok(node) => Some(node),
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed node document");
                None
            }
        })
        .collect()
}

impl HttpBackendAdapter {
    pub fn new(config: HttpBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            max_elapsed_time: Some(self.config.max_retry_elapsed),
            ..ExponentialBackoff::default()
        }
    }

    /// POST a named search template with `params`, retrying transient
    /// transport failures. A request that succeeds at the HTTP layer
    /// but whose body fails to parse is not retried: that is a
    /// permanent shape mismatch, not a transient fault.
    async fn search_template(
        &self,
        template_id: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let url = format!("{}/{}/_search/template", self.config.base_url, self.config.index);
        let body = json!({ "id": template_id, "params": params });

        let response = retry(self.backoff(), || async {
            self.client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(BackendError::from(e)))
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(BackendError::from)?;
        if !status.is_success() {
            return Err(BackendError::Rejected(format!(
                "template `{template_id}` returned {status}: {text}"
            )));
        }
        serde_json::from_str(&text).map_err(BackendError::from)
    }

    async fn scroll_search_template(
        &self,
        template_id: &str,
        mut params: serde_json::Value,
        page_size: usize,
    ) -> Result<Vec<Node>, BackendError> {
        // Fetched eagerly (single scroll) rather than lazily per-page:
        // the driver already bounds its own in-flight work by depth
        // level, and the page_size hint still caps each request.
        let mut all = Vec::new();
        let mut from = 0usize;
        loop {
            if let Some(obj) = params.as_object_mut() {
                obj.insert("from".to_string(), json!(from));
                obj.insert("size".to_string(), json!(page_size));
            }
            let raw = self.search_template(template_id, params.clone()).await?;
            let page: SearchResponse = serde_json::from_value(raw).map_err(BackendError::from)?;
            let count = page.hits.hits.len();
            all.extend(hits_into_nodes(page.hits.hits));
            if count < page_size {
                break;
            }
            from += page_size;
        }
        Ok(all)
    }
}

#[async_trait]
impl BackendAdapter for HttpBackendAdapter {
    async fn max_depth_under(&self, root: &str) -> Result<u32, BackendError> {
        let raw = self
            .search_template(
                "max_nested_value_by_key_value",
                json!({ "path": "lineage", "key": "taxon_id", "value": root, "field": "node_depth" }),
            )
            .await?;
        let parsed: MaxDepthResponse = serde_json::from_value(raw).map_err(BackendError::from)?;
        Ok(parsed.aggregations.depths.value.unwrap_or(0.0) as u32)
    }

    fn stream_nodes_at_root_depth<'a>(
        &'a self,
        root: &'a str,
        depth: u32,
        page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>> {
        Box::pin(async_stream::stream! {
            let result = if depth == 0 {
                self.search_template("taxon_attributes_by_taxon_id", json!({ "taxon_id": root }))
                    .await
                    .and_then(|raw| serde_json::from_value::<SearchResponse>(raw).map_err(BackendError::from))
                    .map(|resp| hits_into_nodes(resp.hits.hits))
            } else {
                self.scroll_search_template(
                    "taxon_attributes_by_root_depth",
                    json!({ "taxon_id": root, "depth": depth }),
                    page_size,
                )
                .await
            };
            match result {
                Ok(nodes) => {
                    for node in nodes {
                        yield Ok(node);
                    }
                }
                Err(err) => yield Err(err),
            }
        })
    }

    fn stream_descendants_missing<'a>(
        &'a self,
        root: &'a str,
        keys: &'a [String],
        page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>> {
        Box::pin(async_stream::stream! {
            let mut seen = std::collections::HashSet::new();
            for key in keys {
                let result = self
                    .scroll_search_template(
                        "taxon_missing_attribute_by_ancestor_id",
                        json!({ "taxon_id": root, "attribute": key }),
                        page_size,
                    )
                    .await;
                match result {
                    Ok(nodes) => {
                        for node in nodes {
                            if seen.insert(node.taxon_id.clone()) {
                                yield Ok(node);
                            }
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        })
    }

    async fn bulk_update(&self, updates: Vec<(TaxonId, Node)>) -> Result<(), BackendError> {
        if updates.is_empty() {
            return Ok(());
        }
        let url = format!("{}/{}/_bulk", self.config.base_url, self.config.index);
        let mut body = String::new();
        for (id, node) in &updates {
            body.push_str(&json!({ "update": { "_id": id } }).to_string());
            body.push('\n');
            body.push_str(&json!({ "doc": node }).to_string());
            body.push('\n');
        }

        let response = retry(self.backoff(), || async {
            self.client
                .post(&url)
                .header("content-type", "application/x-ndjson")
                .body(body.clone())
                .send()
                .await
                .map_err(|e| backoff::Error::transient(BackendError::from(e)))
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected(format!("bulk update returned {status}: {text}")));
        }
        Ok(())
    }
}
