//! A bidirectional tree-traversal engine that fills in derived
//! taxonomic attribute summaries.
//!
//! The tree itself lives in an external, indexed document store
//! reached through [`backend::BackendAdapter`]. This crate walks it in
//! two directions:
//!
//! - **upward** ([`traversal::run_upward`]) — tips to root, computing a
//!   summary at every internal node from its own observations and its
//!   children's summaries.
//! - **downward** ([`traversal::run_downward`]) — root to tips, pushing
//!   an authoritative ancestor summary down to descendants that lack
//!   their own value.
//!
//! Everything that touches the tree shape or the backend lives under
//! [`traversal`]; [`summary`] is pure value computation with no
//! knowledge of nodes or provenance.

pub mod accumulator;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod summary;
pub mod traversal;

pub use config::RunConfig;
pub use error::{BackendError, FillError, FillResult};
pub use model::{AttributeTypeTable, Node};
pub use report::PassReport;

use backend::BackendAdapter;

/// Run the passes selected by `config.passes` against `backend`, in
/// the fixed order spec.md §2 requires: upward before downward, so
/// that downward propagation uses the freshest ancestral summaries.
pub async fn run(
    backend: &dyn BackendAdapter,
    table: &AttributeTypeTable,
    config: &RunConfig,
) -> FillResult<PassReport> {
    let mut report = PassReport::default();

    if config.passes.upward {
        let upward = traversal::run_upward(backend, &config.root, table, config.page_size).await?;
        report.upward = Some(upward);
    }

    if config.passes.downward {
        let downward =
            traversal::run_downward(backend, &config.root, table, config.page_size).await?;
        report.downward = Some(downward);
    }

    Ok(report)
}
