//! Component D: the descendant accumulator.
//!
//! Per-parent, per-attribute scratch store for contributions arriving
//! from already-processed children during one upward pass. Modelled as
//! a flat map keyed by `(parent_id, attribute_key)` per the
//! specification's design note, rather than a nested two-level map.

use crate::model::{AttributeValue, TaxonId};
use std::collections::HashMap;

/// One bucket of contributions awaiting summarisation at a parent.
#[derive(Debug, Clone, Default)]
pub struct AccumulatorEntry {
    pub values: Vec<AttributeValue>,
    pub max_value: Option<AttributeValue>,
    pub min_value: Option<AttributeValue>,
}

/// Ephemeral, single-pass accumulator. Not shared across upward passes.
#[derive(Debug, Default)]
pub struct DescendantAccumulator {
    entries: HashMap<(TaxonId, String), AccumulatorEntry>,
}

impl DescendantAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a child's traverse value against its parent. List values
    /// are spliced into the bucket rather than appended whole.
    pub fn contribute(
        &mut self,
        parent_id: &str,
        key: &str,
        traverse_value: AttributeValue,
        max_value: Option<AttributeValue>,
        min_value: Option<AttributeValue>,
    ) {
        let entry = self
            .entries
            .entry((parent_id.to_string(), key.to_string()))
            .or_default();

        match traverse_value {
            AttributeValue::List(items) => entry.values.extend(items),
            other => entry.values.push(other),
        }

        if let Some(max_value) = max_value {
            entry.max_value = Some(fold(entry.max_value.take(), max_value, true));
        }
        if let Some(min_value) = min_value {
            entry.min_value = Some(fold(entry.min_value.take(), min_value, false));
        }
    }

    /// Atomically take every bucket accumulated for `parent_id`,
    /// removing them from the accumulator.
    pub fn drain(&mut self, parent_id: &str) -> HashMap<String, AccumulatorEntry> {
        let keys: Vec<(TaxonId, String)> = self
            .entries
            .keys()
            .filter(|(p, _)| p == parent_id)
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|k| {
                let key = k.1.clone();
                self.entries.remove(&k).map(|entry| (key, entry))
            })
            .collect()
    }

    pub fn has_pending(&self, parent_id: &str) -> bool {
        self.entries.keys().any(|(p, _)| p == parent_id)
    }
}

fn fold(carried: Option<AttributeValue>, incoming: AttributeValue, want_max: bool) -> AttributeValue {
    match carried {
        None => incoming,
        Some(carried) => match (incoming.as_f64(), carried.as_f64()) {
            (Some(a), Some(b)) => {
                if (want_max && a >= b) || (!want_max && a <= b) {
                    incoming
                } else {
                    carried
                }
            }
            _ => {
                let a = incoming.to_string();
                let b = carried.to_string();
                if (want_max && a >= b) || (!want_max && a <= b) {
                    incoming
                } else {
                    carried
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributions_from_multiple_children_accumulate_into_one_bucket() {
        let mut acc = DescendantAccumulator::new();
        acc.contribute("B", "size", AttributeValue::Long(15), Some(AttributeValue::Long(20)), Some(AttributeValue::Long(10)));
        acc.contribute("B", "size", AttributeValue::Long(30), Some(AttributeValue::Long(30)), Some(AttributeValue::Long(30)));

        let drained = acc.drain("B");
        let bucket = drained.get("size").expect("bucket present");
        assert_eq!(bucket.values, vec![AttributeValue::Long(15), AttributeValue::Long(30)]);
        assert_eq!(bucket.max_value, Some(AttributeValue::Long(30)));
        assert_eq!(bucket.min_value, Some(AttributeValue::Long(10)));
    }

    #[test]
    fn list_contributions_are_spliced_not_nested() {
        let mut acc = DescendantAccumulator::new();
        acc.contribute(
            "B",
            "tags",
            AttributeValue::List(vec![AttributeValue::Long(1), AttributeValue::Long(2)]),
            None,
            None,
        );
        let drained = acc.drain("B");
        assert_eq!(drained["tags"].values, vec![AttributeValue::Long(1), AttributeValue::Long(2)]);
    }

    #[test]
    fn drain_removes_the_parents_buckets_and_is_keyed_per_parent() {
        let mut acc = DescendantAccumulator::new();
        acc.contribute("B", "size", AttributeValue::Long(1), None, None);
        acc.contribute("C", "size", AttributeValue::Long(2), None, None);

        assert!(acc.has_pending("B"));
        assert!(acc.has_pending("C"));

        let drained_b = acc.drain("B");
        assert_eq!(drained_b.len(), 1);
        assert!(!acc.has_pending("B"));
        assert!(acc.has_pending("C"), "draining B must not touch C's bucket");
    }

    #[test]
    fn drain_of_an_unknown_parent_is_empty() {
        let mut acc = DescendantAccumulator::new();
        assert!(acc.drain("nobody").is_empty());
    }
}
