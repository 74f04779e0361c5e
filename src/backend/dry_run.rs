//! A [`BackendAdapter`] decorator that runs both traversal passes for
//! real but discards the writes, logging what would have been
//! submitted instead. Used by the CLI's `--dry-run` flag (spec.md §6's
//! CLI surface names only the pass flags and root id; `--dry-run` is
//! one of the ambient flags this corpus's tools universally carry, per
//! SPEC_FULL.md §4.I).

use super::BackendAdapter;
use crate::error::BackendError;
use crate::model::{Node, TaxonId};
use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::info;

pub struct DryRunBackendAdapter<B> {
    inner: B,
}

impl<B> DryRunBackendAdapter<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: BackendAdapter> BackendAdapter for DryRunBackendAdapter<B> {
    async fn max_depth_under(&self, root: &str) -> Result<u32, BackendError> {
        self.inner.max_depth_under(root).await
    }

    fn stream_nodes_at_root_depth<'a>(
        &'a self,
        root: &'a str,
        depth: u32,
        page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>> {
        self.inner.stream_nodes_at_root_depth(root, depth, page_size)
    }

    fn stream_descendants_missing<'a>(
        &'a self,
        root: &'a str,
        keys: &'a [String],
        page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>> {
        self.inner.stream_descendants_missing(root, keys, page_size)
    }

    /// Logs the would-be update and discards it rather than calling
    /// through to the wrapped adapter.
    async fn bulk_update(&self, updates: Vec<(TaxonId, Node)>) -> Result<(), BackendError> {
        for (id, node) in &updates {
            info!(
                taxon_id = %id,
                attributes = node.attributes.len(),
                "dry-run: would update"
            );
        }
        Ok(())
    }
}
