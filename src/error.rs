//! Error kinds surfaced at the engine and ingestion boundaries.

use thiserror::Error;

/// Errors a [`crate::engine::PathFinder`] can report.
///
/// Pruning decisions made *inside* a search (a lower bound failing to beat the
/// current best, a neighbour being blocked, a subspace turning out infeasible)
/// are ordinary control flow and never surface as an `Error`; an unreachable
/// destination is reported as `Ok(vec![])`, not an error either.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// `threshold` was outside the open interval `(0, 1)`.
    #[error("threshold {0} out of range, expected 0 < threshold < 1")]
    Configuration(f64),
    /// `src`/`dest` is not a vertex of the graph, or `k < 1`.
    #[error("{0}")]
    Input(String),
}

/// Errors from parsing a graph input file (edge list, DIMACS, or gzip-wrapped
/// variants of either). Never produced by the core search engines themselves.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error reading graph input: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed graph input at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
