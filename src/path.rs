//! The [`Path`] value and the arena that owns live candidates during a query.

use std::collections::HashMap;

use indexmap::IndexMap;
use noisy_float::prelude::{n64, N64};

use crate::state::GraphState;

/// A candidate (or accepted) path from some source to its current tail.
///
/// `cached_intersections` memoises, per accepted-path index in the current
/// `result_set`, the total weight of the edges this path shares with that
/// accepted path — so [`Path::lb2`] is `O(k)` rather than `O(k * |edges|)`.
#[derive(Clone, Debug)]
pub struct Path {
    pub route: Vec<usize>,
    pub edges: IndexMap<(usize, usize), f64>,
    pub length: N64,
    pub lb: N64,
    /// `(admitted-path-index, deviation-vertex)`.
    pub cls: Option<(usize, usize)>,
    pub is_active: bool,
    cached_intersections: HashMap<usize, N64>,
}

impl Default for Path {
    fn default() -> Self {
        Self {
            route: Vec::new(),
            edges: IndexMap::new(),
            length: n64(0.0),
            lb: n64(0.0),
            cls: None,
            is_active: true,
            cached_intersections: HashMap::new(),
        }
    }
}

impl Path {
    pub fn singleton(v: usize) -> Self {
        Self {
            route: vec![v],
            ..Default::default()
        }
    }

    pub fn tail(&self) -> Option<usize> {
        self.route.last().copied()
    }

    pub fn head(&self) -> Option<usize> {
        self.route.first().copied()
    }

    /// Appends `(tail, to)` to the route, updating `edges` and `length`.
    pub fn push_edge(&mut self, to: usize, weight: f64) {
        let from = self.tail().expect("path must be non-empty to extend");
        self.edges.insert((from, to), weight);
        self.length += weight;
        self.route.push(to);
    }

    /// `LB1 = length + reverse-SPT distance of the tail`, settling the tail
    /// on demand. Admissible: the reverse-SPT distance is the exact
    /// remaining distance to the destination.
    pub fn lb1(&self, state: &mut GraphState) -> N64 {
        match self.tail() {
            None => n64(0.0),
            Some(tail) => self.length + state.ensure_settled(tail),
        }
    }

    /// `LB2 = max over accepted p of I(p, self) * (1 + 1/threshold) - length(p)`,
    /// or `0` if `result_set` is empty. Any completion of `self` with length
    /// below this bound cannot be diverse from some `p` in `result_set`.
    pub fn lb2(&mut self, threshold: f64, result_set: &[Path]) -> N64 {
        if result_set.is_empty() {
            return n64(0.0);
        }
        let mut lb2 = n64(0.0);
        for (i, old) in result_set.iter().enumerate() {
            let edges = &self.edges;
            let intersection = *self.cached_intersections.entry(i).or_insert_with(|| {
                old.edges
                    .iter()
                    .filter(|(e, _)| edges.contains_key(*e))
                    .map(|(_, w)| n64(*w))
                    .sum()
            });
            let candidate = intersection * (1.0 + 1.0 / threshold) - old.length;
            if candidate > lb2 {
                lb2 = candidate;
            }
        }
        lb2
    }

    /// `true` iff `self` is weighted-Jaccard-diverse (similarity `<= threshold`)
    /// from every path in `result_set`. A union of zero weight counts as
    /// similarity zero (trivially diverse).
    pub fn similarity_ok(&self, threshold: f64, result_set: &[Path]) -> bool {
        for old in result_set {
            let intersection: f64 = old
                .edges
                .iter()
                .filter(|(e, _)| self.edges.contains_key(*e))
                .map(|(_, w)| *w)
                .sum();
            let union = self.length.raw() + old.length.raw() - intersection;
            if union > 0.0 && intersection / union > threshold {
                return false;
            }
        }
        true
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "route={:?} length={} lb={} class={:?} active={}",
            self.route, self.length, self.lb, self.cls, self.is_active
        )
    }
}

/// Owns every [`Path`] created during a single query.
///
/// Local queues and the prefix map hold arena indices rather than owning the
/// `Path` values themselves, so a candidate can be referenced from many
/// places (its own local queue, every prefix bucket it belongs to) without
/// reference counting; indices stay valid for the arena's whole lifetime,
/// which ends when the engine's `find_paths` call returns.
#[derive(Default)]
pub struct Arena {
    slots: Vec<Option<Path>>,
}

pub type PathId = usize;

impl Arena {
    pub fn insert(&mut self, path: Path) -> PathId {
        self.slots.push(Some(path));
        self.slots.len() - 1
    }

    pub fn get(&self, id: PathId) -> &Path {
        self.slots[id].as_ref().expect("dangling arena reference")
    }

    pub fn get_mut(&mut self, id: PathId) -> &mut Path {
        self.slots[id].as_mut().expect("dangling arena reference")
    }

    /// Removes the path from the arena, returning its final value.
    pub fn take(&mut self, id: PathId) -> Path {
        self.slots[id].take().expect("dangling arena reference")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::Graph;

    fn dest_settled_graph() -> (Graph, GraphState) {
        let mut g = Graph::new();
        g.add_edge(1, 2, 10.0);
        g.add_edge(2, 3, 1.0);
        let rev = g.reverse();
        let state = GraphState::new(rev, 3);
        (g, state)
    }

    #[test]
    fn lb1_is_admissible_and_exact_at_tail() {
        let (_g, mut state) = dest_settled_graph();
        let mut p = Path::singleton(1);
        p.push_edge(2, 10.0);
        let lb1 = p.lb1(&mut state);
        assert!(lb1 >= p.length);
        p.push_edge(3, 1.0);
        assert_eq!(p.lb1(&mut state), p.length);
    }

    #[test]
    fn lb2_is_zero_with_no_accepted_paths() {
        let mut p = Path::singleton(1);
        p.push_edge(2, 1.0);
        assert_eq!(p.lb2(0.5, &[]), n64(0.0));
    }

    #[test]
    fn similarity_rejects_identical_path() {
        let mut p = Path::singleton(1);
        p.push_edge(2, 1.0);
        p.push_edge(3, 1.0);
        let accepted = p.clone();
        assert!(!p.similarity_ok(0.5, &[accepted]));
    }

    #[test]
    fn similarity_accepts_disjoint_path() {
        let mut a = Path::singleton(1);
        a.push_edge(2, 1.0);
        let mut b = Path::singleton(1);
        b.push_edge(4, 1.0);
        assert!(b.similarity_ok(0.5, &[a]));
    }
}
