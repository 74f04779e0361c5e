//! Component E: the backend adapter.
//!
//! The document store itself is out of scope for this crate (spec
//! §1); this module only defines the interface the traversal drivers
//! need and two implementations of it: an HTTP one speaking the
//! templated-query contract of spec §6, and an in-memory one used by
//! tests.

pub mod dry_run;
pub mod http;
pub mod memory;

use crate::error::BackendError;
use crate::model::{Node, TaxonId};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub use dry_run::DryRunBackendAdapter;
pub use http::HttpBackendAdapter;
pub use memory::InMemoryBackendAdapter;

/// A page size hint passed to streaming operations. Adapters are free
/// to use a different actual page size; this only bounds how much is
/// buffered client-side at once.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// The four operations spec §4.E requires of a document store, plus
/// bulk update. All streaming operations must be stable-ordered for a
/// given call but make no cross-call ordering guarantee.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Largest `node_depth` among descendants of `root` (spec §4.E,
    /// §6 query 1), measured relative to `root` per
    /// [`crate::model::Node::relative_depth_of`].
    async fn max_depth_under(&self, root: &str) -> Result<u32, BackendError>;

    /// Nodes at `depth` levels below `root` (`depth == 0` returns just
    /// `root` itself). Spec §4.E / §6 query 2 and 3.
    fn stream_nodes_at_root_depth<'a>(
        &'a self,
        root: &'a str,
        depth: u32,
        page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>>;

    /// Descendants of `root` (excluding `root`) missing at least one of
    /// `keys`, duplicates suppressed across keys. Spec §4.E / §6 query 4.
    fn stream_descendants_missing<'a>(
        &'a self,
        root: &'a str,
        keys: &'a [String],
        page_size: usize,
    ) -> BoxStream<'a, Result<Node, BackendError>>;

    /// Apply a batch of `(document_id, patched_node)` pairs with patch
    /// (attributes-replace) semantics. Batches are submitted per page
    /// by the drivers rather than as one unbounded stream, since the
    /// drivers already chunk work by `page_size`.
    async fn bulk_update(&self, updates: Vec<(TaxonId, Node)>) -> Result<(), BackendError>;
}
