//! Component G: the downward (root-to-tips) traversal driver.

use super::copy::copy_summary;
use crate::backend::BackendAdapter;
use crate::error::{BackendError, FillError, FillResult};
use crate::model::{AttributeTypeTable, Node, TaxonId};
use futures::StreamExt;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
pub struct DownwardReport {
    pub levels_visited: u32,
    pub nodes_updated: u64,
}

/// Run the downward pass rooted at `root`, per spec §4.G. Starts one
/// level above the leaves: a leaf has no descendants to stamp.
#[instrument(skip(backend, table), fields(root))]
pub async fn run_downward(
    backend: &dyn BackendAdapter,
    root: &str,
    table: &AttributeTypeTable,
    page_size: usize,
) -> FillResult<DownwardReport> {
    let max_depth = backend
        .max_depth_under(root)
        .await
        .map_err(|source| fatal(source, root))?;

    let mut report = DownwardReport::default();
    if max_depth == 0 {
        return Ok(report);
    }

    let downward_keys = table.downward_keys();

    for depth in (0..max_depth).rev() {
        let span = tracing::debug_span!("level", depth);
        let _enter = span.enter();

        let mut ancestors = backend.stream_nodes_at_root_depth(root, depth, page_size);
        while let Some(next) = ancestors.next().await {
            let ancestor = next.map_err(|source| fatal(source, root))?;

            let fill_attrs: Vec<_> = ancestor
                .attributes
                .iter()
                .filter(|a| downward_keys.contains(a.key.as_str()))
                .cloned()
                .collect();
            if fill_attrs.is_empty() {
                continue;
            }

            let keys: Vec<String> = fill_attrs.iter().map(|a| a.key.clone()).collect();
            let mut descendants = backend.stream_descendants_missing(&ancestor.taxon_id, &keys, page_size);
            let mut updates: Vec<(TaxonId, Node)> = Vec::new();

            while let Some(next) = descendants.next().await {
                let mut descendant = next.map_err(|source| fatal(source, root))?;
                let mut changed = false;

                for source_attr in &fill_attrs {
                    if descendant.has_attribute(&source_attr.key) {
                        continue;
                    }
                    let Some(meta) = table.get(&source_attr.key) else { continue };
                    descendant.attributes.push(copy_summary(source_attr, meta));
                    changed = true;
                }

                if changed {
                    updates.push((descendant.doc_id().to_string(), descendant));
                }
            }
            drop(descendants);

            if !updates.is_empty() {
                report.nodes_updated += updates.len() as u64;
                debug!(
                    ancestor = %ancestor.taxon_id,
                    count = updates.len(),
                    "submitting descendant stamps"
                );
                backend
                    .bulk_update(updates)
                    .await
                    .map_err(|source| fatal(source, root))?;
            }
        }
        report.levels_visited += 1;
    }

    Ok(report)
}

fn fatal(source: BackendError, root: &str) -> FillError {
    FillError::Backend {
        pass: "downward",
        root: root.to_string(),
        source,
    }
}
