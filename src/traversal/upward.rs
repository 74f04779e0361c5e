//! Component F: the upward (tips-to-root) traversal driver.

use crate::accumulator::DescendantAccumulator;
use crate::backend::BackendAdapter;
use crate::error::{BackendError, FillError, FillResult};
use crate::model::{AggregationSource, AttributeRecord, AttributeTypeTable, Node, TaxonId};
use crate::summary::{self, Carriers, Override};
use futures::StreamExt;
use tracing::{debug, instrument, warn};

/// Outcome of one upward pass: how many nodes were touched per depth
/// level, for the end-of-run summary line.
#[derive(Debug, Default)]
pub struct UpwardReport {
    pub levels_visited: u32,
    pub nodes_updated: u64,
}

/// Run the upward pass rooted at `root`, per spec §4.F.
#[instrument(skip(backend, table), fields(root))]
pub async fn run_upward(
    backend: &dyn BackendAdapter,
    root: &str,
    table: &AttributeTypeTable,
    page_size: usize,
) -> FillResult<UpwardReport> {
    let max_depth = backend
        .max_depth_under(root)
        .await
        .map_err(|source| fatal(source, root))?;

    let mut accumulator = DescendantAccumulator::new();
    let mut report = UpwardReport::default();

    for depth in (0..=max_depth).rev() {
        let span = tracing::debug_span!("level", depth);
        let _enter = span.enter();

        let mut stream = backend.stream_nodes_at_root_depth(root, depth, page_size);
        let mut updates: Vec<(TaxonId, Node)> = Vec::new();

        while let Some(next) = stream.next().await {
            let mut node = next.map_err(|source| fatal(source, root))?;
            let changed = process_node(&mut node, table, &mut accumulator);
            if changed {
                updates.push((node.doc_id().to_string(), node));
            }
        }
        drop(stream);

        if !updates.is_empty() {
            report.nodes_updated += updates.len() as u64;
            debug!(depth, count = updates.len(), "submitting level updates");
            backend
                .bulk_update(updates)
                .await
                .map_err(|source| fatal(source, root))?;
        }
        report.levels_visited += 1;
    }

    Ok(report)
}

/// Summarise a single node's own attributes and any contributions
/// drained from its already-processed children. Returns whether the
/// node's attribute list changed.
fn process_node(node: &mut Node, table: &AttributeTypeTable, accumulator: &mut DescendantAccumulator) -> bool {
    let mut changed = false;
    let parent = node.parent.clone();
    let mut contributions: Vec<(String, crate::model::AttributeValue, Carriers)> = Vec::new();
    // Keys already pushed into `contributions` this call, so a key that
    // is both one of this node's own raw attributes and present in its
    // drained bucket (a node can have both direct observations and
    // contributing children for the same key) is only announced to the
    // parent once.
    let mut contributed_keys: std::collections::HashSet<String> = std::collections::HashSet::new();

    for attribute in node.attributes.iter_mut() {
        if !attribute.is_raw() || !table.contains(&attribute.key) {
            continue;
        }
        let Some(meta) = table.get(&attribute.key) else { continue };

        match summary::summarise(attribute, meta, AggregationSource::Direct, Override::default()) {
            Ok(result) => {
                if let Some(traverse_value) = result.traverse_value {
                    // Raw observations are consumed once summarised: an
                    // unchanged record on a later run then has no working
                    // values left and is correctly treated as "no summary".
                    attribute.values = None;
                    changed = true;
                    if meta.propagates_upward() {
                        contributed_keys.insert(attribute.key.clone());
                        contributions.push((attribute.key.clone(), traverse_value, result.carriers));
                    }
                }
            }
            Err(err) => {
                warn!(key = %attribute.key, error = %err, "skipping attribute: summariser rejected its values");
            }
        }
    }

    let drained = if accumulator.has_pending(&node.taxon_id) {
        accumulator.drain(&node.taxon_id)
    } else {
        std::collections::HashMap::new()
    };

    // Already-summarised attributes whose bucket got no fresh
    // contribution this pass still have to keep feeding their parent:
    // a sibling whose own subtree didn't change this run (e.g. D and E
    // when F is added under B, spec.md §8 scenario 4) would otherwise
    // silently drop out of the parent's median after its one and only
    // raw-values pass.
    for attribute in node.attributes.iter() {
        if attribute.is_raw() || drained.contains_key(&attribute.key) {
            continue;
        }
        let Some(meta) = table.get(&attribute.key) else { continue };
        if !meta.propagates_upward() {
            continue;
        }
        if let Some(value) = stored_traverse_value(attribute, meta) {
            let carriers = Carriers {
                max_value: attribute.max.clone(),
                min_value: attribute.min.clone(),
            };
            contributed_keys.insert(attribute.key.clone());
            contributions.push((attribute.key.clone(), value, carriers));
        }
    }

    for (key, bucket) in drained {
        let existing = node.attribute(&key).cloned();
        let Some(meta) = table.get(&key) else { continue };

        if let Some(existing) = &existing {
            if existing.aggregation_source == Some(AggregationSource::Direct) {
                // A direct observation is the most authoritative
                // source for this key and is never overwritten by
                // contributions rolling up from descendants — but it
                // still has to keep reaching the parent on a pass where
                // a child's re-announcement is the only thing that
                // landed in this bucket, or the parent's summary loses
                // this node's contribution the moment its own raw
                // values have already been consumed (P4). Skip the
                // re-announce if this node's own raw-attribute loop
                // above already contributed this key this pass (a node
                // can carry both a direct observation and contributing
                // children for the same key), or it would be counted
                // twice in the parent's bucket.
                if meta.propagates_upward() && !contributed_keys.contains(&key) {
                    if let Some(value) = stored_traverse_value(existing, meta) {
                        let carriers = Carriers {
                            max_value: existing.max.clone(),
                            min_value: existing.min.clone(),
                        };
                        contributions.push((key, value, carriers));
                    }
                }
                continue;
            }
        }

        let mut attribute = AttributeRecord::raw(key.clone(), meta.value_type, Vec::new());
        // The bucket's own folded max_value/min_value (the subtree-wide
        // extremes carried up from grandchildren) are deliberately not
        // threaded in here: per the worked example (spec.md §8 scenario
        // 1), a node's min/max are summarised fresh from its direct
        // children's traverse values, not from its whole subtree. Using
        // Carriers::default() makes `summarise` compute the extremum of
        // `bucket.values` alone.
        let over = Override {
            values: Some(bucket.values),
            carriers: Carriers::default(),
        };

        match summary::summarise(&mut attribute, meta, AggregationSource::Descendant, over) {
            Ok(result) => {
                if let Some(traverse_value) = result.traverse_value {
                    let propagates = meta.propagates_upward();
                    // A rerun over an unchanged subtree recomputes the same
                    // descendant summary; only a genuine difference from
                    // what was already recorded counts as a change (P4:
                    // idempotency across repeated passes).
                    let unchanged = existing.as_ref().map(|old| records_equivalent(old, &attribute)).unwrap_or(false);
                    if !unchanged {
                        changed = true;
                    }
                    node.attributes.retain(|a| a.key != key);
                    node.attributes.push(attribute);
                    if propagates {
                        contributions.push((key, traverse_value, result.carriers));
                    }
                }
                // else: empty aggregated bucket, treated as no
                // contribution; the attribute is left absent.
            }
            Err(err) => {
                warn!(key = %key, error = %err, "skipping descendant summary: evaluator rejected its values");
            }
        }
    }

    if let Some(parent) = &parent {
        for (key, traverse_value, carriers) in contributions {
            accumulator.contribute(parent, &key, traverse_value, carriers.max_value, carriers.min_value);
        }
    }

    changed
}

/// Reconstruct the traverse value of an already-summarised attribute
/// from its stored fields, so it can be re-announced to its parent on
/// a pass where its own subtree produced nothing new. The traverse
/// summary is always either the chain's first entry (`canonical_value`)
/// or `min`/`max`, the only auxiliary summaries a record retains.
fn stored_traverse_value(
    attribute: &AttributeRecord,
    meta: &crate::model::AttributeTypeMeta,
) -> Option<crate::model::AttributeValue> {
    match meta.traverse {
        Some(crate::model::SummaryKind::Min) => attribute.min.clone().or_else(|| attribute.canonical_value.clone()),
        Some(crate::model::SummaryKind::Max) => attribute.max.clone().or_else(|| attribute.canonical_value.clone()),
        _ => attribute.canonical_value.clone(),
    }
}

/// Whether two attribute records carry the same summarised state, for
/// the idempotency check above. Deliberately ignores `values` (always
/// `None` on a summarised record) and `key`/`value_type` (never differ
/// between an old and new summary of the same key).
fn records_equivalent(a: &AttributeRecord, b: &AttributeRecord) -> bool {
    a.canonical_value == b.canonical_value
        && a.count == b.count
        && a.aggregation_method == b.aggregation_method
        && a.aggregation_source == b.aggregation_source
        && a.min == b.min
        && a.max == b.max
}

fn fatal(source: BackendError, root: &str) -> FillError {
    FillError::Backend {
        pass: "upward",
        root: root.to_string(),
        source,
    }
}
