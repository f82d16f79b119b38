//! Classical Yen enumeration with a Jaccard diversity post-filter (C10).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use noisy_float::prelude::N64;

use crate::engine::{validate_query, validate_threshold, PathFinder};
use crate::error::Result;
use crate::graph::Graph;
use crate::path::Path;
use crate::state::{dijkstra, dijkstra_excluding};

/// Yen's k-shortest-paths algorithm, admitting a popped candidate to the
/// result set only if it clears the weighted-Jaccard diversity threshold
/// against every path already admitted.
pub struct Yen {
    graph: Graph,
    threshold: f64,
    explored: u64,
}

impl Yen {
    pub fn new(graph: Graph, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            graph,
            threshold,
            explored: 0,
        })
    }

    fn build_path(&self, route: &[usize]) -> Path {
        let mut path = Path::singleton(route[0]);
        for w in route.windows(2) {
            let weight = self
                .graph
                .weight(w[0], w[1])
                .expect("spur-joined route must follow real edges");
            path.push_edge(w[1], weight);
        }
        path.lb = path.length;
        path
    }

    /// For every deviation point on `base`, excludes the edges already taken
    /// out of that point by any accepted path sharing the same root, and the
    /// root's own interior vertices, then spurs a fresh Dijkstra run.
    /// Candidates whose full route was already seen are dropped.
    fn generate_spurs(
        &self,
        base: &Path,
        dest: usize,
        accepted: &[Path],
        seen_routes: &mut HashSet<Vec<usize>>,
        pool: &mut Vec<Path>,
        heap: &mut BinaryHeap<Reverse<(N64, usize)>>,
    ) {
        for i in 0..base.route.len().saturating_sub(1) {
            let spur_node = base.route[i];
            let root = &base.route[..i];

            let excluded_nodes: HashSet<usize> = root.iter().copied().collect();
            let mut excluded_edges = HashSet::new();
            for p in accepted {
                if p.route.len() > i + 1 && p.route[..=i] == base.route[..=i] {
                    excluded_edges.insert((p.route[i], p.route[i + 1]));
                }
            }

            let Some(spur_path) =
                dijkstra_excluding(&self.graph, spur_node, dest, &excluded_nodes, &excluded_edges)
            else {
                continue;
            };

            let mut total_route = root.to_vec();
            total_route.extend(spur_path.route.iter().copied());
            if seen_routes.contains(&total_route) {
                continue;
            }
            seen_routes.insert(total_route.clone());
            let total = self.build_path(&total_route);
            let id = pool.len();
            let length = total.length;
            pool.push(total);
            heap.push(Reverse((length, id)));
        }
    }
}

impl PathFinder for Yen {
    fn find_paths(&mut self, src: usize, dest: usize, k: usize) -> Result<Vec<Path>> {
        validate_query(&self.graph, src, dest, k)?;
        self.explored = 0;

        let Some(p1) = dijkstra(&self.graph, src, dest) else {
            return Ok(Vec::new());
        };
        if src == dest {
            return Ok(vec![p1]);
        }

        let mut accepted = vec![p1.clone()];
        let mut result = vec![p1.clone()];
        let mut seen_routes = HashSet::new();
        seen_routes.insert(p1.route.clone());

        let mut pool: Vec<Path> = Vec::new();
        let mut heap: BinaryHeap<Reverse<(N64, usize)>> = BinaryHeap::new();
        self.generate_spurs(&p1, dest, &accepted, &mut seen_routes, &mut pool, &mut heap);

        while result.len() < k {
            let Some(Reverse((_, id))) = heap.pop() else {
                break;
            };
            self.explored += 1;
            let candidate = pool[id].clone();
            accepted.push(candidate.clone());
            self.generate_spurs(&candidate, dest, &accepted, &mut seen_routes, &mut pool, &mut heap);
            if candidate.similarity_ok(self.threshold, &result) {
                result.push(candidate);
            }
        }

        Ok(result)
    }

    fn number_of_paths_explored(&self) -> u64 {
        self.explored
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn textbook_graph() -> Graph {
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
    fn first_result_is_the_shortest_path() {
        let g = textbook_graph();
        let mut engine = Yen::new(g.clone(), 0.5).unwrap();
        let result = engine.find_paths(1, 4, 3).unwrap();
        assert_eq!(result[0].route, vec![1, 2, 3, 4]);
        assert_eq!(result[0].length, dijkstra(&g, 1, 4).unwrap().length);
    }

    #[test]
    fn results_are_nondecreasing_and_distinct() {
        let g = textbook_graph();
        let mut engine = Yen::new(g, 0.5).unwrap();
        let result = engine.find_paths(1, 4, 4).unwrap();
        for w in result.windows(2) {
            assert!(w[0].length <= w[1].length);
        }
        let mut routes: Vec<_> = result.iter().map(|p| p.route.clone()).collect();
        let unique_count = {
            routes.sort();
            routes.dedup();
            routes.len()
        };
        assert_eq!(unique_count, result.len());
    }

    #[test]
    fn results_respect_diversity_threshold() {
        let g = textbook_graph();
        let mut engine = Yen::new(g, 0.3).unwrap();
        let result = engine.find_paths(1, 4, 5).unwrap();
        for i in 0..result.len() {
            for j in (i + 1)..result.len() {
                assert!(result[i].similarity_ok(0.3, &[result[j].clone()]));
            }
        }
    }

    #[test]
    fn trivial_src_eq_dest() {
        let g = textbook_graph();
        let mut engine = Yen::new(g, 0.5).unwrap();
        let result = engine.find_paths(3, 3, 4).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].route, vec![3]);
    }

    #[test]
    fn unreachable_destination_returns_empty() {
        let mut g = Graph::new();
        g.add_edge(1, 2, 1.0);
        g.add_node(3);
        let mut engine = Yen::new(g, 0.5).unwrap();
        assert!(engine.find_paths(1, 3, 3).unwrap().is_empty());
    }
}
