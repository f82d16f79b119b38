//! KSPD (C8) and its ablation baseline KSPD⁻ (C9).
//!
//! Both engines share the same deviation-tree search; they differ only in
//! whether LB2 contributes to the effective lower bound and whether class
//! propagation through the prefix map runs on admission. [`Variant`]
//! switches between the two without duplicating the search loop.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::engine::{validate_query, validate_threshold, PathFinder};
use crate::error::Result;
use crate::graph::Graph;
use crate::path::{Arena, Path, PathId};
use crate::prefix_map::PrefixMap;
use crate::state::{dijkstra, GraphState};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Variant {
    Full,
    Minus,
}

struct Search {
    graph: Graph,
    threshold: f64,
    variant: Variant,
    state: GraphState,
    arena: Arena,
    /// Local queues keyed by tail vertex, in first-registered order so that
    /// queue-selection ties resolve deterministically (FIFO), matching the
    /// tie-breaking rule the global PQ uses on `lb`.
    lq: IndexMap<usize, Vec<PathId>>,
    /// Per-class set of vertices already branched to, preventing duplicate
    /// deviations from the same class.
    covered: HashMap<(usize, usize), std::collections::HashSet<usize>>,
    prefix_map: Option<PrefixMap>,
    result_set: Vec<Path>,
    explored: u64,
}

impl Search {
    fn new(graph: Graph, threshold: f64, dest: usize, variant: Variant) -> Self {
        let state = GraphState::new(graph.reverse(), dest);
        Self {
            graph,
            threshold,
            variant,
            state,
            arena: Arena::default(),
            lq: IndexMap::new(),
            covered: HashMap::new(),
            prefix_map: if variant == Variant::Full {
                Some(PrefixMap::new())
            } else {
                None
            },
            result_set: Vec::new(),
            explored: 0,
        }
    }

    fn effective_lb(&mut self, path: &mut Path) -> noisy_float::prelude::N64 {
        let lb1 = path.lb1(&mut self.state);
        match self.variant {
            Variant::Full => {
                let lb2 = path.lb2(self.threshold, &self.result_set);
                lb1.max(lb2)
            }
            Variant::Minus => lb1,
        }
    }

    fn insert_candidate(&mut self, mut path: Path) {
        let tail = path.tail().expect("candidate must be non-empty");
        path.lb = self.effective_lb(&mut path);
        let route = path.route.clone();
        let id = self.arena.insert(path);
        self.lq.entry(tail).or_default().push(id);
        if let Some(pm) = &mut self.prefix_map {
            pm.insert(id, &route);
        }
    }

    fn seed(&mut self, p1: &Path) {
        for (idx, &u) in p1.route[..p1.route.len() - 1].iter().enumerate() {
            let next_vertex = p1.route[idx + 1];
            let prefix: Vec<usize> = p1.route[..=idx].to_vec();
            for (w, weight) in self.graph.neighbors(u).collect::<Vec<_>>() {
                if prefix.contains(&w) || w == next_vertex {
                    continue;
                }
                let mut candidate = Path::default();
                candidate.route = prefix.clone();
                for i in 0..prefix.len() - 1 {
                    let ew = self.graph.weight(prefix[i], prefix[i + 1]).unwrap();
                    candidate.edges.insert((prefix[i], prefix[i + 1]), ew);
                    candidate.length += ew;
                }
                candidate.push_edge(w, weight);
                candidate.cls = Some((1, u));
                self.insert_candidate(candidate);
            }
        }
    }

    /// Finds the local queue with the smallest lb among its *active*
    /// candidates and pops that candidate. Queues left with no active
    /// candidate are retained (reactivation may revive them later) but
    /// skipped, so a fully-dominated queue never causes the search to spin.
    fn pop_next_active(&mut self) -> Option<PathId> {
        let mut best: Option<(noisy_float::prelude::N64, usize)> = None;
        for (&v, ids) in self.lq.iter() {
            if let Some(lb) = ids
                .iter()
                .filter(|&&id| self.arena.get(id).is_active)
                .map(|&id| self.arena.get(id).lb)
                .min()
            {
                if best.map_or(true, |(b, _)| lb < b) {
                    best = Some((lb, v));
                }
            }
        }
        let (_, v) = best?;
        let arena = &self.arena;
        let ids = self.lq.get_mut(&v).unwrap();
        let idx = ids
            .iter()
            .enumerate()
            .filter(|(_, &id)| arena.get(id).is_active)
            .min_by_key(|(_, &id)| arena.get(id).lb)
            .map(|(i, _)| i)
            .unwrap();
        Some(ids.remove(idx))
    }

    /// Extends `path_id` one reverse-SPT step toward the destination,
    /// spawning branch children at the tail along the way. Returns `false`
    /// if `path_id` cannot be extended further (dead end).
    fn extend(&mut self, path_id: PathId) -> bool {
        self.state.ensure_settled(self.arena.get(path_id).tail().unwrap());
        let tail = self.arena.get(path_id).tail().unwrap();
        let cls = self.arena.get(path_id).cls;
        let route_snapshot = self.arena.get(path_id).route.clone();
        let length_snapshot = self.arena.get(path_id).length;

        if let Some(siblings) = self.lq.get(&tail) {
            for sib_id in siblings.clone() {
                if sib_id == path_id {
                    continue;
                }
                let dominated = {
                    let sib = self.arena.get(sib_id);
                    sib.is_active && sib.cls == cls && sib.length >= length_snapshot
                };
                if dominated {
                    self.arena.get_mut(sib_id).is_active = false;
                }
            }
        }

        let parent = self.state.parent(tail);

        for (n, w) in self.graph.neighbors(tail).collect::<Vec<_>>() {
            if route_snapshot.contains(&n) || Some(n) == parent {
                continue;
            }
            let mut child = self.arena.get(path_id).clone();
            child.push_edge(n, w);
            child.cls = cls;
            let mut active = true;
            if let Some(key) = cls {
                let covered = self.covered.entry(key).or_default();
                if covered.contains(&n) {
                    active = false;
                } else {
                    covered.insert(n);
                }
            }
            child.is_active = active;
            child.lb = self.effective_lb(&mut child);
            let child_route = child.route.clone();
            let child_id = self.arena.insert(child);
            self.lq.entry(n).or_default().push(child_id);
            if let Some(pm) = &mut self.prefix_map {
                pm.insert(child_id, &child_route);
            }
        }

        match parent {
            Some(par) if !route_snapshot.contains(&par) => {
                let w = self
                    .graph
                    .weight(tail, par)
                    .expect("reverse-SPT parent must be a forward edge from the tail");
                self.arena.get_mut(path_id).push_edge(par, w);
                true
            }
            _ => {
                if let Some(pm) = &mut self.prefix_map {
                    pm.remove(path_id, &route_snapshot);
                }
                false
            }
        }
    }

    /// Reassigns the class of every live candidate sharing a proper prefix
    /// of `route` and reactivates any candidate whose class matches
    /// `old_cls`. KSPD only (§4.4); never called for KSPD⁻.
    fn propagate_class(&mut self, route: &[usize], old_cls: Option<(usize, usize)>, new_id: usize) {
        let Some(old_cls) = old_cls else { return };
        for &v in route {
            if let Some(ids) = self.lq.get(&v) {
                for id in ids.clone() {
                    let matches = {
                        let p = self.arena.get(id);
                        !p.is_active && p.cls == Some(old_cls)
                    };
                    if matches {
                        self.arena.get_mut(id).is_active = true;
                    }
                }
            }
        }
        if let Some(pm) = &self.prefix_map {
            for i in 1..route.len() {
                let prefix = &route[..=i];
                let vertex = route[i];
                for cid in pm.find(prefix).to_vec() {
                    if self.arena.get(cid).route.len() > prefix.len() {
                        self.arena.get_mut(cid).cls = Some((new_id, vertex));
                    }
                }
            }
        }
    }

    fn find_next_path(&mut self, dest: usize) -> Option<Path> {
        'outer: loop {
            let path_id = self.pop_next_active()?;
            self.explored += 1;
            while self.arena.get(path_id).tail() != Some(dest) {
                if !self.extend(path_id) {
                    self.arena.take(path_id);
                    continue 'outer;
                }
            }
            let candidate = self.arena.get(path_id);
            let effective_lb = candidate.lb;
            let passes_lb = match self.variant {
                Variant::Full => {
                    let lb2_now = self.arena.get_mut(path_id).lb2(self.threshold, &self.result_set);
                    effective_lb >= lb2_now
                }
                Variant::Minus => true,
            };
            let route = self.arena.get(path_id).route.clone();
            if let Some(pm) = &mut self.prefix_map {
                pm.remove(path_id, &route);
            }
            if !passes_lb {
                self.arena.take(path_id);
                continue;
            }
            if !self.arena.get(path_id).similarity_ok(self.threshold, &self.result_set) {
                self.arena.take(path_id);
                continue;
            }
            if let Some(cls) = self.arena.get(path_id).cls {
                if let Some(set) = self.covered.get_mut(&cls) {
                    set.clear();
                }
            }
            if self.variant == Variant::Full {
                let cls = self.arena.get(path_id).cls;
                self.propagate_class(&route, cls, self.result_set.len() + 1);
            }
            return Some(self.arena.take(path_id));
        }
    }

    fn run(&mut self, src: usize, dest: usize, k: usize) -> Vec<Path> {
        let Some(p1) = dijkstra(&self.graph, src, dest) else {
            return Vec::new();
        };
        if src == dest {
            return vec![p1];
        }
        self.seed(&p1);
        self.result_set.push(p1);
        while self.result_set.len() < k {
            match self.find_next_path(dest) {
                Some(p) => self.result_set.push(p),
                None => break,
            }
        }
        self.result_set.clone()
    }
}

/// KSPD: class-indexed branching with LB1 and LB2 pruning, and prefix-map
/// driven class propagation on admission.
pub struct Kspd {
    graph: Graph,
    threshold: f64,
    explored: u64,
}

impl Kspd {
    pub fn new(graph: Graph, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            graph,
            threshold,
            explored: 0,
        })
    }
}

impl PathFinder for Kspd {
    fn find_paths(&mut self, src: usize, dest: usize, k: usize) -> Result<Vec<Path>> {
        validate_query(&self.graph, src, dest, k)?;
        let mut search = Search::new(self.graph.clone(), self.threshold, dest, Variant::Full);
        let result = search.run(src, dest, k);
        self.explored = search.explored;
        Ok(result)
    }

    fn number_of_paths_explored(&self) -> u64 {
        self.explored
    }
}

/// KSPD⁻: the ablation baseline. Identical search, but `lb` is always `LB1`
/// (LB2 never computed or consulted) and class propagation is skipped —
/// the prefix map is never even constructed.
pub struct KspdMinus {
    graph: Graph,
    threshold: f64,
    explored: u64,
}

impl KspdMinus {
    pub fn new(graph: Graph, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            graph,
            threshold,
            explored: 0,
        })
    }
}

impl PathFinder for KspdMinus {
    fn find_paths(&mut self, src: usize, dest: usize, k: usize) -> Result<Vec<Path>> {
        validate_query(&self.graph, src, dest, k)?;
        let mut search = Search::new(self.graph.clone(), self.threshold, dest, Variant::Minus);
        let result = search.run(src, dest, k);
        self.explored = search.explored;
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

    fn assert_well_formed(graph: &Graph, src: usize, dest: usize, paths: &[Path]) {
        for p in paths {
            assert_eq!(p.route.first().copied(), Some(src));
            assert_eq!(p.route.last().copied(), Some(dest));
            let mut seen = std::collections::HashSet::new();
            for &v in &p.route {
                assert!(seen.insert(v), "route must not repeat a vertex");
            }
            for w in p.route.windows(2) {
                assert!(graph.weight(w[0], w[1]).is_some());
            }
            let sum: f64 = p.edges.values().sum();
            assert!((sum - p.length.raw()).abs() < 1e-9);
        }
    }

    #[test]
    fn scenario_a_textbook_first_result_optimal() {
        let g = textbook_graph();
        let mut engine = Kspd::new(g.clone(), 0.5).unwrap();
        let result = engine.find_paths(1, 4, 3).unwrap();
        assert_eq!(result[0].route, vec![1, 2, 3, 4]);
        assert_eq!(result[0].length.raw(), 21.0);
        for w in result.windows(2) {
            assert!(w[0].length <= w[1].length);
        }
        assert_well_formed(&g, 1, 4, &result);
        for i in 0..result.len() {
            for j in (i + 1)..result.len() {
                assert!(result[i].similarity_ok(0.5, &[result[j].clone()]));
            }
        }
    }

    #[test]
    fn scenario_b_trivial_src_eq_dest() {
        let g = textbook_graph();
        let mut engine = Kspd::new(g, 0.5).unwrap();
        let result = engine.find_paths(2, 2, 5).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].route, vec![2]);
        assert_eq!(engine.number_of_paths_explored(), 0);
    }

    #[test]
    fn scenario_c_unreachable_returns_empty() {
        let mut g = Graph::new();
        g.add_edge(1, 2, 1.0);
        g.add_node(3);
        let mut engine = Kspd::new(g, 0.5).unwrap();
        let result = engine.find_paths(1, 3, 3).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn scenario_e_k_equals_one_matches_dijkstra() {
        let g = textbook_graph();
        let mut engine = Kspd::new(g.clone(), 0.5).unwrap();
        let result = engine.find_paths(1, 4, 1).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].length, dijkstra(&g, 1, 4).unwrap().length);
    }

    #[test]
    fn scenario_d_single_path_terminates_without_error() {
        let mut g = Graph::new();
        g.add_edge(1, 2, 1.0);
        g.add_edge(2, 3, 1.0);
        let mut engine = Kspd::new(g, 0.5).unwrap();
        let result = engine.find_paths(1, 3, 5).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let g = textbook_graph();
        assert!(Kspd::new(g.clone(), 0.0).is_err());
        assert!(Kspd::new(g, 1.5).is_err());
    }

    #[test]
    fn rejects_unknown_vertex_and_zero_k() {
        let g = textbook_graph();
        let mut engine = Kspd::new(g, 0.5).unwrap();
        assert!(engine.find_paths(99, 4, 1).is_err());
        assert!(engine.find_paths(1, 4, 0).is_err());
    }

    #[test]
    fn scenario_f_kspd_and_minus_both_well_formed_and_diverse() {
        // LB2 pruning changes exploration order between the two variants, so
        // the exact admitted route sets may differ; both must still be
        // internally consistent and agree on the first (shortest) result.
        let g = textbook_graph();
        let mut full = Kspd::new(g.clone(), 0.5).unwrap();
        let mut minus = KspdMinus::new(g.clone(), 0.5).unwrap();
        let a = full.find_paths(1, 4, 5).unwrap();
        let b = minus.find_paths(1, 4, 5).unwrap();
        assert_eq!(a[0].route, b[0].route);
        assert_well_formed(&g, 1, 4, &a);
        assert_well_formed(&g, 1, 4, &b);
        for paths in [&a, &b] {
            for i in 0..paths.len() {
                for j in (i + 1)..paths.len() {
                    assert!(paths[i].similarity_ok(0.5, &[paths[j].clone()]));
                }
            }
        }
    }
}
