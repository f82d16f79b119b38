//! Directed, non-negatively weighted graph primitives.
//!
//! Vertices are plain `usize` ids, matching the integer ids used by every
//! accepted graph input format (edge lists, DIMACS challenge 9 arcs). A
//! [`Graph`] exposes only the forward adjacency; [`Graph::reverse`] produces
//! an independent graph with every edge flipped, used as the "reversed
//! graph" view the reverse shortest-path-tree engine walks.

use indexmap::IndexMap;

/// A directed graph with non-negative `f64` edge weights.
///
/// Multi-edges between the same ordered pair collapse to a single edge keyed
/// by `(u, v)`; the most recently added weight wins.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    adj: IndexMap<usize, IndexMap<usize, f64>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directed edge `u -> v` with the given weight, registering both
    /// endpoints as vertices of the graph even if `v` has no outgoing edges.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64) {
        self.adj.entry(u).or_default().insert(v, weight);
        self.adj.entry(v).or_default();
    }

    /// Ensures `v` is a vertex of the graph, even if orphaned.
    pub fn add_node(&mut self, v: usize) {
        self.adj.entry(v).or_default();
    }

    pub fn contains_node(&self, v: usize) -> bool {
        self.adj.contains_key(&v)
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    pub fn weight(&self, u: usize, v: usize) -> Option<f64> {
        self.adj.get(&u)?.get(&v).copied()
    }

    /// Outgoing neighbours of `u` with their edge weights.
    pub fn neighbors(&self, u: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.adj
            .get(&u)
            .into_iter()
            .flat_map(|m| m.iter().map(|(v, w)| (*v, *w)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.adj.keys().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.adj
            .iter()
            .flat_map(|(u, m)| m.iter().map(move |(v, w)| (*u, *v, *w)))
    }

    /// Builds the reversed graph: every edge `u -> v` becomes `v -> u`.
    ///
    /// `reverse(reverse(g))` is isomorphic to `g` (same vertex set, same
    /// weighted edge set), since the construction is involutive.
    pub fn reverse(&self) -> Graph {
        let mut r = Graph::new();
        for v in self.nodes() {
            r.add_node(v);
        }
        for (u, v, w) in self.edges() {
            r.add_edge(v, u, w);
        }
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Graph {
        let mut g = Graph::new();
        for (u, v, w) in [
            (1, 2, 10.0),
            (2, 3, 1.0),
            (3, 4, 10.0),
            (1, 8, 20.0),
            (8, 2, 1.0),
            (2, 6, 1.0),
            (6, 7, 1.0),
            (7, 8, 1.0),
            (2, 7, 3.0),
            (7, 5, 15.0),
            (3, 5, 18.0),
            (5, 4, 1.0),
        ] {
            g.add_edge(u, v, w);
        }
        g
    }

    #[test]
    fn reverse_round_trips() {
        let g = sample();
        let rr = g.reverse().reverse();
        let mut a: Vec<_> = g.edges().collect();
        let mut b: Vec<_> = rr.edges().collect();
        a.sort_by(|x, y| x.partial_cmp(y).unwrap());
        b.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_eq!(a, b);
        let mut an: Vec<_> = g.nodes().collect();
        let mut bn: Vec<_> = rr.nodes().collect();
        an.sort();
        bn.sort();
        assert_eq!(an, bn);
    }

    #[test]
    fn reverse_flips_direction() {
        let g = sample();
        let r = g.reverse();
        assert_eq!(r.weight(2, 1), Some(10.0));
        assert_eq!(r.weight(1, 2), None);
    }

    #[test]
    fn multi_edge_collapses_to_last_write() {
        let mut g = Graph::new();
        g.add_edge(1, 2, 5.0);
        g.add_edge(1, 2, 3.0);
        assert_eq!(g.weight(1, 2), Some(3.0));
    }

    #[test]
    fn orphan_destination_is_a_node() {
        let mut g = Graph::new();
        g.add_edge(1, 2, 1.0);
        assert!(g.contains_node(2));
        assert_eq!(g.neighbors(2).count(), 0);
    }
}
