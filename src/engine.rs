//! The capability contract shared by every search strategy.

use crate::error::Result;
use crate::path::Path;

/// Common contract for the four search strategies (KSPD, KSPD⁻, KSPD-Yen,
/// IterBound). The CLI and any other caller depend only on this contract,
/// never on a concrete engine.
pub trait PathFinder {
    /// Finds up to `k` paths from `src` to `dest`, in admission order,
    /// non-decreasing by length.
    ///
    /// Rejects `src`/`dest` not in the graph or `k < 1` with
    /// [`crate::error::Error::Input`]. Returns `Ok(vec![])` if `dest` is
    /// unreachable from `src` — that is not an error.
    fn find_paths(&mut self, src: usize, dest: usize, k: usize) -> Result<Vec<Path>>;

    /// Number of candidates popped from the selection structure during the
    /// most recent `find_paths` call. Reset at the start of every call.
    fn number_of_paths_explored(&self) -> u64;
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold > 0.0 && threshold < 1.0 {
        Ok(())
    } else {
        Err(crate::error::Error::Configuration(threshold))
    }
}

pub(crate) fn validate_query(
    graph: &crate::graph::Graph,
    src: usize,
    dest: usize,
    k: usize,
) -> Result<()> {
    if !graph.contains_node(src) {
        return Err(crate::error::Error::Input(format!(
            "source vertex {} is not in the graph",
            src
        )));
    }
    if !graph.contains_node(dest) {
        return Err(crate::error::Error::Input(format!(
            "destination vertex {} is not in the graph",
            dest
        )));
    }
    if k < 1 {
        return Err(crate::error::Error::Input(
            "k must be at least 1".to_string(),
        ));
    }
    Ok(())
}
