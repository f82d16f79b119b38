//! Top-k shortest diverse paths over a weighted directed graph.
//!
//! Four search strategies share the same primitives (graph, reverse
//! shortest-path tree, path/arena bookkeeping): [`kspd::Kspd`],
//! [`kspd::KspdMinus`], [`yen::Yen`] and [`iterbound::IterBound`], all behind
//! the [`engine::PathFinder`] trait.

pub mod engine;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod iterbound;
pub mod kspd;
pub mod path;
pub mod prefix_map;
pub mod state;
pub mod yen;

pub use engine::PathFinder;
pub use error::{Error, IngestError, Result};
pub use graph::Graph;
pub use iterbound::IterBound;
pub use kspd::{Kspd, KspdMinus};
pub use path::Path;
pub use yen::Yen;
