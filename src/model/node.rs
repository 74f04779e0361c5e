//! Taxonomic node documents.

use super::attribute::AttributeRecord;
use serde::{Deserialize, Serialize};

/// Stable identifier for a taxon. Opaque to the engine.
pub type TaxonId = String;

/// One entry in a node's lineage: an ancestor id and its depth from
/// the absolute root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEntry {
    pub taxon_id: TaxonId,
    pub node_depth: u32,
}

/// A taxonomic record as read from / written to the document store.
///
/// Only `taxon_id`, `parent`, `node_depth`, `lineage`, and `attributes`
/// are interpreted by this crate; any other fields present on the
/// underlying document are opaque to it and are expected to be
/// preserved by the store's patch-merge semantics on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub taxon_id: TaxonId,
    #[serde(default)]
    pub parent: Option<TaxonId>,
    pub node_depth: u32,
    #[serde(default)]
    pub lineage: Vec<LineageEntry>,
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
}

impl Node {
    /// The document id used for bulk updates. Identical to `taxon_id`
    /// for this engine; kept distinct in the type signatures of
    /// [`crate::backend::BackendAdapter`] in case a store's internal
    /// document id ever diverges from the taxon id.
    pub fn doc_id(&self) -> &str {
        &self.taxon_id
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeRecord> {
        self.attributes.iter().find(|a| a.key == key)
    }

    pub fn attribute_mut(&mut self, key: &str) -> Option<&mut AttributeRecord> {
        self.attributes.iter_mut().find(|a| a.key == key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attribute(key).is_some()
    }

    /// This node's depth relative to `root`, i.e. `node_depth` minus the
    /// absolute depth recorded for `root` in this node's own lineage.
    /// `Some(0)` iff this node *is* `root`; `None` if `root` is not an
    /// ancestor of this node.
    pub fn relative_depth_of(&self, root: &str) -> Option<u32> {
        if self.taxon_id == root {
            return Some(0);
        }
        self.lineage
            .iter()
            .find(|entry| entry.taxon_id == root)
            .map(|entry| self.node_depth.saturating_sub(entry.node_depth))
    }
}
