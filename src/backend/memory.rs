//! A deterministic, non-networked [`BackendAdapter`] used by the test
//! suite and by anything embedding this crate as a library without a
//! real document store.

use super::BackendAdapter;
use crate::error::BackendError;
use crate::model::{Node, TaxonId};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryBackendAdapter {
    nodes: RwLock<HashMap<TaxonId, Node>>,
}

impl InMemoryBackendAdapter {
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.taxon_id.clone(), n)).collect();
        Self { nodes: RwLock::new(nodes) }
    }

    pub async fn get(&self, taxon_id: &str) -> Option<Node> {
        self.nodes.read().await.get(taxon_id).cloned()
    }

    pub async fn snapshot(&self) -> HashMap<TaxonId, Node> {
        self.nodes.read().await.clone()
    }
}

#[async_trait]
impl BackendAdapter for InMemoryBackendAdapter {
    async fn max_depth_under(&self, root: &str) -> Result<u32, BackendError> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .values()
            .filter_map(|n| n.relative_depth_of(root))
            .filter(|&d| d > 0)
            .max()
            .unwrap_or(0))
    }

    fn stream_nodes_at_root_depth<'a>(
        &'a self,
        root: &'a str,
        depth: u32,
        _page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>> {
        Box::pin(async_stream::stream! {
            let nodes = self.nodes.read().await;
            let mut matched: Vec<Node> = if depth == 0 {
                nodes.get(root).cloned().into_iter().collect()
            } else {
                nodes
                    .values()
                    .filter(|n| n.relative_depth_of(root) == Some(depth))
                    .cloned()
                    .collect()
            };
            drop(nodes);
            matched.sort_by(|a, b| a.taxon_id.cmp(&b.taxon_id));
            for node in matched {
                yield Ok(node);
            }
        })
    }

    fn stream_descendants_missing<'a>(
        &'a self,
        root: &'a str,
        keys: &'a [String],
        _page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>> {
        Box::pin(async_stream::stream! {
            let nodes = self.nodes.read().await;
            let mut matched: Vec<Node> = nodes
                .values()
                .filter(|n| matches!(n.relative_depth_of(root), Some(d) if d > 0))
                .filter(|n| keys.iter().any(|k| !n.has_attribute(k)))
                .cloned()
                .collect();
            drop(nodes);
            matched.sort_by(|a, b| a.taxon_id.cmp(&b.taxon_id));
            for node in matched {
                yield Ok(node);
            }
        })
    }

    async fn bulk_update(&self, updates: Vec<(TaxonId, Node)>) -> Result<(), BackendError> {
        let mut nodes = self.nodes.write().await;
        for (id, node) in updates {
            nodes.insert(id, node);
        }
        Ok(())
    }
}
