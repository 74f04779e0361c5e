//! The downward pass's "copy summary" construction (spec §4.G step 2).

use crate::model::{AggregationSource, AttributeRecord, AttributeTypeMeta};

/// Build the record the downward pass stamps onto a descendant missing
/// `source.key`. Carries the canonical value, count, and whichever of
/// `min`/`max` the source actually populated; never carries `values`,
/// since an ancestor stamp is never a raw observation.
///
/// `aggregation_method` is `meta.traverse`'s recorded method. Callers
/// must only invoke this for keys where
/// [`AttributeTypeMeta::propagates_downward`] holds, which already
/// rules out a `list` traverse (Open Question 2): a list traverse
/// value is never carried across levels, so there is nothing to stamp.
pub fn copy_summary(source: &AttributeRecord, meta: &AttributeTypeMeta) -> AttributeRecord {
    AttributeRecord {
        key: source.key.clone(),
        value_type: source.value_type,
        canonical_value: source.canonical_value.clone(),
        count: source.count,
        aggregation_method: meta.traverse.map(|s| s.recorded_method()),
        aggregation_source: Some(AggregationSource::Ancestor),
        min: source.min.clone(),
        max: source.max.clone(),
        values: None,
    }
}
