//! The end-of-run summary line (spec §7: "silence plus zero exit" on a
//! fully successful run — this is the informational line that
//! accompanies it, not a diagnostic).

use crate::traversal::{DownwardReport, UpwardReport};
use std::fmt;

/// Aggregate outcome of a single invocation, covering whichever passes
/// were actually requested.
#[derive(Debug, Default)]
pub struct PassReport {
    pub upward: Option<UpwardReport>,
    pub downward: Option<DownwardReport>,
}

impl PassReport {
    pub fn nodes_updated(&self) -> u64 {
        self.upward.as_ref().map_or(0, |r| r.nodes_updated)
            + self.downward.as_ref().map_or(0, |r| r.nodes_updated)
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fill complete:")?;
        if let Some(up) = &self.upward {
            write!(
                f,
                " upward[levels={} updated={}]",
                up.levels_visited, up.nodes_updated
            )?;
        }
        if let Some(down) = &self.downward {
            write!(
                f,
                " downward[levels={} updated={}]",
                down.levels_visited, down.nodes_updated
            )?;
        }
        if self.upward.is_none() && self.downward.is_none() {
            write!(f, " no pass requested")?;
        }
        Ok(())
    }
}
