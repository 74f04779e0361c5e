//! Crate-wide error taxonomy (spec §7).

use crate::model::TaxonId;
use thiserror::Error;

/// Errors surfaced by a [`crate::backend::BackendAdapter`]. The adapter
/// itself may retry internally before giving up; the core never does.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned a malformed response: {0}")]
    Decode(String),

    #[error("backend reported failure: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// Fatal, pass-aborting errors. Per-node and per-attribute faults
/// (malformed node, type mismatch, empty summary) are *not* modelled
/// here: the traversal drivers log and skip them inline rather than
/// returning an error, per spec §7's fault-isolation policy.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("config error: {detail}")]
    Config { detail: String },

    #[error("backend error during {pass} pass (root {root}): {source}")]
    Backend {
        pass: &'static str,
        root: TaxonId,
        #[source]
        source: BackendError,
    },
}

pub type FillResult<T> = Result<T, FillError>;
