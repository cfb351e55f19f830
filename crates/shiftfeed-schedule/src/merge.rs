//! Combines the cached shift history with a fresh fetch.

use crate::types::Shift;

/// Keep cached shifts that have already started by `run_instant` and append
/// the fresh window.
///
/// Future cached shifts are always replaced by `fresh`, never patched. An
/// empty `fresh` therefore leaves only the started history.
pub fn merge(cached: Vec<Shift>, fresh: Vec<Shift>, run_instant: i64) -> Vec<Shift> {
    let mut merged: Vec<Shift> = cached
        .into_iter()
        .filter(|shift| run_instant >= shift.start_time)
        .collect();

    let retained = merged.len();
    merged.extend(fresh);

    tracing::debug!(
        retained,
        upcoming = merged.len() - retained,
        "Merged cached history with fresh shifts"
    );

    merged
}
