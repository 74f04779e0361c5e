//! Property tests over the pure summary evaluator (SPEC_FULL.md §8):
//! `max`/`min` carrier folding is order-independent, and deduplicating
//! a `list` traverse value is idempotent.

use proptest::prelude::*;
use taxafill::model::{AttributeValue, SummaryKind};
use taxafill::summary::{evaluate, Carriers};

fn longs(values: &[i64]) -> Vec<AttributeValue> {
    values.iter().copied().map(AttributeValue::Long).collect()
}

proptest! {
    /// Folding two non-empty batches through `max` in either order
    /// must land on the same overall maximum, since the carrier just
    /// threads the running extremum forward (spec.md §4.B).
    #[test]
    fn max_folding_is_order_independent(
        a in prop::collection::vec(-1000i64..1000, 1..10),
        b in prop::collection::vec(-1000i64..1000, 1..10),
    ) {
        let a_vals = longs(&a);
        let b_vals = longs(&b);

        let (_, carried_after_a) = evaluate(SummaryKind::Max, &a_vals, Carriers::default()).unwrap();
        let (ab, _) = evaluate(SummaryKind::Max, &b_vals, carried_after_a).unwrap();

        let (_, carried_after_b) = evaluate(SummaryKind::Max, &b_vals, Carriers::default()).unwrap();
        let (ba, _) = evaluate(SummaryKind::Max, &a_vals, carried_after_b).unwrap();

        let expected = a.iter().chain(b.iter()).copied().max().unwrap();
        prop_assert_eq!(ab, AttributeValue::Long(expected));
        prop_assert_eq!(ba, AttributeValue::Long(expected));
    }

    /// Same property for `min`.
    #[test]
    fn min_folding_is_order_independent(
        a in prop::collection::vec(-1000i64..1000, 1..10),
        b in prop::collection::vec(-1000i64..1000, 1..10),
    ) {
        let a_vals = longs(&a);
        let b_vals = longs(&b);

        let (_, carried_after_a) = evaluate(SummaryKind::Min, &a_vals, Carriers::default()).unwrap();
        let (ab, _) = evaluate(SummaryKind::Min, &b_vals, carried_after_a).unwrap();

        let (_, carried_after_b) = evaluate(SummaryKind::Min, &b_vals, Carriers::default()).unwrap();
        let (ba, _) = evaluate(SummaryKind::Min, &a_vals, carried_after_b).unwrap();

        let expected = a.iter().chain(b.iter()).copied().min().unwrap();
        prop_assert_eq!(ab, AttributeValue::Long(expected));
        prop_assert_eq!(ba, AttributeValue::Long(expected));
    }

    /// Deduplicating an already-deduplicated list is a no-op, and the
    /// result never contains more elements than the input (spec.md
    /// §4.C step 2's "deduplicate by set-equality" requirement).
    #[test]
    fn list_dedup_is_idempotent(values in prop::collection::vec(0i64..5, 0..20)) {
        let list = AttributeValue::List(values.into_iter().map(AttributeValue::Long).collect());
        let once = list.clone().deduplicated();
        let twice = once.clone().deduplicated();
        prop_assert_eq!(&once, &twice);

        if let (AttributeValue::List(a), AttributeValue::List(b)) = (&list, &once) {
            prop_assert!(b.len() <= a.len());
        }
    }
}
