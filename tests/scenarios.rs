//! Integration tests covering the worked scenarios and testable
//! properties of spec.md §8, run end to end against
//! [`InMemoryBackendAdapter`].

use std::collections::HashMap;
use taxafill::backend::InMemoryBackendAdapter;
use taxafill::model::{
    AggregationMethod, AggregationSource, AttributeRecord, AttributeTypeMeta, AttributeTypeTable,
    AttributeValue, LineageEntry, Node, ObservedValue, SummaryKind, TraverseDirection, ValueType,
};
use taxafill::traversal::{run_downward, run_upward};

const PAGE_SIZE: usize = 50;

fn lineage(entries: &[(&str, u32)]) -> Vec<LineageEntry> {
    entries
        .iter()
        .map(|(id, depth)| LineageEntry { taxon_id: id.to_string(), node_depth: *depth })
        .collect()
}

fn size_attribute(values: &[i64]) -> AttributeRecord {
    AttributeRecord::raw(
        "size",
        ValueType::Long,
        values.iter().map(|v| ObservedValue { value: AttributeValue::Long(*v) }).collect(),
    )
}

fn node(taxon_id: &str, parent: Option<&str>, depth: u32, lineage: Vec<LineageEntry>, attributes: Vec<AttributeRecord>) -> Node {
    Node {
        taxon_id: taxon_id.to_string(),
        parent: parent.map(str::to_string),
        node_depth: depth,
        lineage,
        attributes,
    }
}

/// The tree from spec.md §8's worked scenarios:
/// ```text
/// A (root, depth 0)
/// ├── B (depth 1)
/// │   ├── D (depth 2)  size = [10, 20]
/// │   └── E (depth 2)  size = [30]
/// └── C (depth 1)      size = [40]
/// ```
fn worked_tree() -> Vec<Node> {
    vec![
        node("A", None, 0, vec![], vec![]),
        node("B", Some("A"), 1, lineage(&[("A", 0)]), vec![]),
        node("C", Some("A"), 1, lineage(&[("A", 0)]), vec![size_attribute(&[40])]),
        node("D", Some("B"), 2, lineage(&[("A", 0), ("B", 1)]), vec![size_attribute(&[10, 20])]),
        node("E", Some("B"), 2, lineage(&[("A", 0), ("B", 1)]), vec![size_attribute(&[30])]),
    ]
}

fn size_table() -> AttributeTypeTable {
    let mut entries = HashMap::new();
    entries.insert(
        "size".to_string(),
        AttributeTypeMeta {
            value_type: ValueType::Long,
            summary: vec![SummaryKind::Median, SummaryKind::Min, SummaryKind::Max],
            traverse: Some(SummaryKind::Median),
            traverse_direction: None,
        },
    );
    AttributeTypeTable::new(entries)
}

fn long(v: i64) -> AttributeValue {
    AttributeValue::Long(v)
}

fn double(v: f64) -> AttributeValue {
    AttributeValue::Double(v)
}

#[tokio::test]
async fn scenario_1_upward_pass_computes_medians_up_the_tree() {
    let backend = InMemoryBackendAdapter::new(worked_tree());
    let table = size_table();

    run_upward(&backend, "A", &table, PAGE_SIZE).await.unwrap();

    let d = backend.get("D").await.unwrap();
    let size = d.attribute("size").unwrap();
    assert_eq!(size.canonical_value, Some(long(15)));
    assert_eq!(size.count, 2);
    assert_eq!(size.aggregation_method, Some(AggregationMethod::Median));
    assert_eq!(size.aggregation_source, Some(AggregationSource::Direct));
    assert_eq!(size.min, Some(long(10)));
    assert_eq!(size.max, Some(long(20)));

    let e = backend.get("E").await.unwrap();
    let size = e.attribute("size").unwrap();
    assert_eq!(size.canonical_value, Some(long(30)));
    assert_eq!(size.aggregation_source, Some(AggregationSource::Direct));

    let b = backend.get("B").await.unwrap();
    let size = b.attribute("size").unwrap();
    assert_eq!(size.canonical_value, Some(double(22.5)));
    assert_eq!(size.count, 2);
    assert_eq!(size.aggregation_source, Some(AggregationSource::Descendant));
    assert_eq!(size.min, Some(long(15)));
    assert_eq!(size.max, Some(long(30)));

    let c = backend.get("C").await.unwrap();
    let size = c.attribute("size").unwrap();
    assert_eq!(size.canonical_value, Some(long(40)));
    assert_eq!(size.aggregation_source, Some(AggregationSource::Direct));

    let a = backend.get("A").await.unwrap();
    let size = a.attribute("size").unwrap();
    assert_eq!(size.canonical_value, Some(double(31.25)));
    assert_eq!(size.count, 2);
    assert_eq!(size.aggregation_source, Some(AggregationSource::Descendant));
    assert_eq!(size.min, Some(double(22.5)));
    assert_eq!(size.max, Some(long(40)));
}

/// scenario 2: an `ancestor`-restricted attribute never propagates
/// downward, and a `descendant`-restricted attribute stamps ancestor
/// copies on every node that lacks it.
#[tokio::test]
async fn scenario_2_traverse_direction_restricts_propagation() {
    let mut nodes = worked_tree();
    let mut entries = HashMap::new();
    entries.insert(
        "size".to_string(),
        AttributeTypeMeta {
            value_type: ValueType::Long,
            summary: vec![SummaryKind::Median],
            traverse: Some(SummaryKind::Median),
            traverse_direction: Some(TraverseDirection::Ancestor),
        },
    );
    entries.insert(
        "habitat".to_string(),
        AttributeTypeMeta {
            value_type: ValueType::Keyword,
            summary: vec![SummaryKind::Mode],
            traverse: Some(SummaryKind::Mode),
            traverse_direction: Some(TraverseDirection::Descendant),
        },
    );
    let table = AttributeTypeTable::new(entries);

    let a = nodes.iter_mut().find(|n| n.taxon_id == "A").unwrap();
    a.attributes.push(AttributeRecord {
        key: "habitat".to_string(),
        value_type: ValueType::Keyword,
        canonical_value: Some(AttributeValue::Keyword("marine".to_string())),
        count: 7,
        aggregation_method: Some(AggregationMethod::Mode),
        aggregation_source: Some(AggregationSource::Direct),
        min: None,
        max: None,
        values: None,
    });

    let backend = InMemoryBackendAdapter::new(nodes);
    run_downward(&backend, "A", &table, PAGE_SIZE).await.unwrap();

    for id in ["B", "C", "D", "E"] {
        let n = backend.get(id).await.unwrap();
        let habitat = n.attribute("habitat").expect("habitat stamped");
        assert_eq!(habitat.canonical_value, Some(AttributeValue::Keyword("marine".to_string())));
        assert_eq!(habitat.aggregation_source, Some(AggregationSource::Ancestor));
        assert_eq!(habitat.count, 7);
        assert_eq!(habitat.aggregation_method, Some(AggregationMethod::Mode));
        assert!(n.attribute("size").is_none(), "size is ancestor-only and must not propagate downward");
    }
}

/// P4: re-running the upward pass on an unchanged tree is a no-op.
#[tokio::test]
async fn scenario_3_upward_pass_is_idempotent() {
    let backend = InMemoryBackendAdapter::new(worked_tree());
    let table = size_table();

    run_upward(&backend, "A", &table, PAGE_SIZE).await.unwrap();
    let after_first = backend.snapshot().await;

    let report = run_upward(&backend, "A", &table, PAGE_SIZE).await.unwrap();
    assert_eq!(report.nodes_updated, 0, "second pass must emit no updates");

    let after_second = backend.snapshot().await;
    for id in ["A", "B", "C", "D", "E"] {
        let before = after_first.get(id).unwrap().attribute("size").cloned();
        let after = after_second.get(id).unwrap().attribute("size").cloned();
        assert_eq!(before.map(|a| a.canonical_value), after.map(|a| a.canonical_value));
    }
}

/// A node carrying both its own direct observations and a contributing
/// child for the same key must keep feeding its parent on every later
/// pass, not just the first: the direct record, not the child's
/// re-announcement, wins locally, but it still has to reach the parent
/// every time (P4).
///
/// ```text
/// R (root, depth 0)
/// ├── N (depth 1)  size = [100]
/// │   └── L (depth 2)  size = [10, 20]
/// └── M (depth 1)  size = [40]
/// ```
fn direct_and_descendant_same_key_tree() -> Vec<Node> {
    vec![
        node("R", None, 0, vec![], vec![]),
        node("N", Some("R"), 1, lineage(&[("R", 0)]), vec![size_attribute(&[100])]),
        node("M", Some("R"), 1, lineage(&[("R", 0)]), vec![size_attribute(&[40])]),
        node("L", Some("N"), 2, lineage(&[("R", 0), ("N", 1)]), vec![size_attribute(&[10, 20])]),
    ]
}

#[tokio::test]
async fn scenario_3b_direct_record_keeps_reaching_its_parent_across_passes() {
    let backend = InMemoryBackendAdapter::new(direct_and_descendant_same_key_tree());
    let table = size_table();

    run_upward(&backend, "R", &table, PAGE_SIZE).await.unwrap();
    let n = backend.get("N").await.unwrap();
    let size = n.attribute("size").unwrap();
    assert_eq!(size.canonical_value, Some(long(100)), "N's own direct observation wins locally");
    assert_eq!(size.aggregation_source, Some(AggregationSource::Direct));

    let r = backend.get("R").await.unwrap();
    assert_eq!(
        r.attribute("size").unwrap().canonical_value,
        Some(double(70.0)),
        "R's median comes from N's direct 100 and M's direct 40"
    );

    let report = run_upward(&backend, "R", &table, PAGE_SIZE).await.unwrap();
    assert_eq!(report.nodes_updated, 0, "N and M are unchanged locally, so nothing should be rewritten");

    let r_after = backend.get("R").await.unwrap();
    assert_eq!(
        r_after.attribute("size").unwrap().canonical_value,
        Some(double(70.0)),
        "N must keep re-announcing its direct 100 to R, not just on the first pass"
    );
}

/// scenario 4: adding a new leaf and re-running only touches the nodes
/// on the path from that leaf to the root.
#[tokio::test]
async fn scenario_4_adding_a_leaf_only_updates_its_ancestors() {
    let backend = InMemoryBackendAdapter::new(worked_tree());
    let table = size_table();
    run_upward(&backend, "A", &table, PAGE_SIZE).await.unwrap();

    let d_before = backend.get("D").await.unwrap();
    let e_before = backend.get("E").await.unwrap();
    let c_before = backend.get("C").await.unwrap();

    let mut nodes = backend.snapshot().await.into_values().collect::<Vec<_>>();
    nodes.push(node("F", Some("B"), 2, lineage(&[("A", 0), ("B", 1)]), vec![size_attribute(&[100])]));
    let backend = InMemoryBackendAdapter::new(nodes);

    run_upward(&backend, "A", &table, PAGE_SIZE).await.unwrap();

    let b = backend.get("B").await.unwrap();
    assert_eq!(b.attribute("size").unwrap().canonical_value, Some(long(30)));

    let a = backend.get("A").await.unwrap();
    assert_eq!(a.attribute("size").unwrap().canonical_value, Some(double(35.0)));

    let d_after = backend.get("D").await.unwrap();
    let e_after = backend.get("E").await.unwrap();
    let c_after = backend.get("C").await.unwrap();
    assert_eq!(d_before.attribute("size").unwrap().canonical_value, d_after.attribute("size").unwrap().canonical_value);
    assert_eq!(e_before.attribute("size").unwrap().canonical_value, e_after.attribute("size").unwrap().canonical_value);
    assert_eq!(c_before.attribute("size").unwrap().canonical_value, c_after.attribute("size").unwrap().canonical_value);
}

/// scenario 5: `summary = [list]` over `[[1,2], 2, 3]` produces a
/// deduplicated canonical value of count 3.
#[tokio::test]
async fn scenario_5_list_summary_deduplicates_the_traverse_value() {
    let attr = AttributeRecord::raw(
        "tags",
        ValueType::Long,
        vec![
            ObservedValue { value: AttributeValue::List(vec![long(1), long(2)]) },
            ObservedValue { value: long(2) },
            ObservedValue { value: long(3) },
        ],
    );
    let leaf = node("X", Some("root"), 1, lineage(&[("root", 0)]), vec![attr]);
    let root = node("root", None, 0, vec![], vec![]);

    let mut entries = HashMap::new();
    entries.insert(
        "tags".to_string(),
        AttributeTypeMeta {
            value_type: ValueType::Long,
            summary: vec![SummaryKind::List],
            traverse: Some(SummaryKind::List),
            traverse_direction: None,
        },
    );
    let table = AttributeTypeTable::new(entries);

    let backend = InMemoryBackendAdapter::new(vec![root, leaf]);
    run_upward(&backend, "root", &table, PAGE_SIZE).await.unwrap();

    let x = backend.get("X").await.unwrap();
    let tags = x.attribute("tags").unwrap();
    assert_eq!(tags.count, 3);
}

/// P6: a descendant missing an attribute receives the *nearest*
/// ancestor's summary, not a farther one, because the nearer ancestor
/// is processed (and thus stamps first) at a shallower iteration.
#[tokio::test]
async fn p6_nearest_ancestor_wins_over_a_farther_one() {
    let mut entries = HashMap::new();
    entries.insert(
        "habitat".to_string(),
        AttributeTypeMeta {
            value_type: ValueType::Keyword,
            summary: vec![SummaryKind::Mode],
            traverse: Some(SummaryKind::Mode),
            traverse_direction: None,
        },
    );
    let table = AttributeTypeTable::new(entries);

    let stamp = |value: &str, count: u64| AttributeRecord {
        key: "habitat".to_string(),
        value_type: ValueType::Keyword,
        canonical_value: Some(AttributeValue::Keyword(value.to_string())),
        count,
        aggregation_method: Some(AggregationMethod::Mode),
        aggregation_source: Some(AggregationSource::Direct),
        min: None,
        max: None,
        values: None,
    };

    let a = node("A", None, 0, vec![], vec![stamp("marine", 100)]);
    let b = node("B", Some("A"), 1, lineage(&[("A", 0)]), vec![stamp("freshwater", 10)]);
    let d = node("D", Some("B"), 2, lineage(&[("A", 0), ("B", 1)]), vec![]);

    let backend = InMemoryBackendAdapter::new(vec![a, b, d]);
    run_downward(&backend, "A", &table, PAGE_SIZE).await.unwrap();

    let d = backend.get("D").await.unwrap();
    let habitat = d.attribute("habitat").unwrap();
    assert_eq!(habitat.canonical_value, Some(AttributeValue::Keyword("freshwater".to_string())));
    assert_eq!(habitat.count, 10);
    assert_eq!(habitat.aggregation_source, Some(AggregationSource::Ancestor));
}

/// P5: the downward pass never overwrites an attribute a node already has.
#[tokio::test]
async fn p5_downward_pass_never_overwrites_an_existing_record() {
    let mut entries = HashMap::new();
    entries.insert(
        "habitat".to_string(),
        AttributeTypeMeta {
            value_type: ValueType::Keyword,
            summary: vec![SummaryKind::Mode],
            traverse: Some(SummaryKind::Mode),
            traverse_direction: None,
        },
    );
    let table = AttributeTypeTable::new(entries);

    let own = AttributeRecord {
        key: "habitat".to_string(),
        value_type: ValueType::Keyword,
        canonical_value: Some(AttributeValue::Keyword("brackish".to_string())),
        count: 3,
        aggregation_method: Some(AggregationMethod::Mode),
        aggregation_source: Some(AggregationSource::Direct),
        min: None,
        max: None,
        values: None,
    };
    let ancestor = AttributeRecord { ..own.clone() };

    let a = node("A", None, 0, vec![], vec![ancestor]);
    let b = node("B", Some("A"), 1, lineage(&[("A", 0)]), vec![own]);

    let backend = InMemoryBackendAdapter::new(vec![a, b]);
    run_downward(&backend, "A", &table, PAGE_SIZE).await.unwrap();

    let b = backend.get("B").await.unwrap();
    let habitat = b.attribute("habitat").unwrap();
    assert_eq!(habitat.aggregation_source, Some(AggregationSource::Direct), "B's own record must survive untouched");
    assert_eq!(habitat.canonical_value, Some(AttributeValue::Keyword("brackish".to_string())));
}

/// Exercises the same pipeline the CLI drives: [`taxafill::run`]
/// resolves a full `RunConfig` (as the CLI's config layer would) and
/// runs both passes in order against an adapter trait object.
#[tokio::test]
async fn full_run_executes_both_passes_through_the_public_entry_point() {
    let backend = InMemoryBackendAdapter::new(worked_tree());
    let table = size_table();
    let config = taxafill::RunConfig {
        root: "A".to_string(),
        passes: taxafill::config::PassSelection::both(),
        page_size: PAGE_SIZE,
        backend: taxafill::config::BackendSettings::default(),
        dry_run: false,
    };

    let report = taxafill::run(&backend, &table, &config).await.unwrap();

    let upward = report.upward.as_ref().expect("upward pass requested");
    assert_eq!(upward.nodes_updated, 5, "every node in the worked tree gets a size summary");

    // every node already carries `size` after the upward pass, so the
    // downward pass finds nothing left to stamp.
    let downward = report.downward.as_ref().expect("downward pass requested");
    assert_eq!(downward.nodes_updated, 0);

    let a = backend.get("A").await.unwrap();
    assert_eq!(a.attribute("size").unwrap().canonical_value, Some(double(31.25)));
}

/// A `traverse_direction: descendant` attribute never accumulates
/// upward even when a node carries a direct record for it.
#[tokio::test]
async fn descendant_only_traverse_direction_suppresses_upward_propagation() {
    let mut entries = HashMap::new();
    entries.insert(
        "habitat".to_string(),
        AttributeTypeMeta {
            value_type: ValueType::Keyword,
            summary: vec![SummaryKind::Mode],
            traverse: Some(SummaryKind::Mode),
            traverse_direction: Some(TraverseDirection::Descendant),
        },
    );
    let table = AttributeTypeTable::new(entries);

    let attr = AttributeRecord::raw(
        "habitat",
        ValueType::Keyword,
        vec![ObservedValue { value: AttributeValue::Keyword("reef".to_string()) }],
    );
    let a = node("A", None, 0, vec![], vec![]);
    let b = node("B", Some("A"), 1, lineage(&[("A", 0)]), vec![attr]);

    let backend = InMemoryBackendAdapter::new(vec![a, b]);
    run_upward(&backend, "A", &table, PAGE_SIZE).await.unwrap();

    let a = backend.get("A").await.unwrap();
    assert!(a.attribute("habitat").is_none(), "descendant-only traverse must not reach the parent");

    let b = backend.get("B").await.unwrap();
    assert_eq!(b.attribute("habitat").unwrap().aggregation_source, Some(AggregationSource::Direct));
}
