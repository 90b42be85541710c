use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::cmp::Ordering;

use petgraph::algo::Measure;
use petgraph::graph::DiGraph;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeRef, VisitMap, Visitable};


/// Forward multi-source dijkstra that stops at the first target reached.  Based on the
/// implementation in the petgraph library, extended to return the path.
///
/// Every node in `sources` starts at cost zero.  The search ends as soon as any node in
/// `targets` is settled; the cost of reaching it and the edges taken, in travel order, are
/// returned.  Returns `None` if no target is reachable.  Edge costs must be non-negative.
///
/// Ties are broken deterministically: nodes with equal cost are settled in increasing index
/// order, and a node's predecessor is only replaced by a strictly cheaper one.
pub fn dijkstra_to_any<N, E, F, K>(
    graph: &DiGraph<N, E>,
    sources: &[NodeIndex],
    targets: &[NodeIndex],
    mut edge_cost: F,
) -> Option<(K, Vec<EdgeIndex>)>
where
    F: FnMut(&E) -> K,
    K: Measure + Copy,
{
    let targets: HashSet<NodeIndex> = targets.iter().copied().collect();
    if targets.is_empty() {
        return None;
    }
    let mut visited = graph.visit_map();
    let mut scores = HashMap::new();
    let mut edges_used: HashMap<NodeIndex, EdgeIndex> = HashMap::new();
    let mut visit_next = BinaryHeap::new();
    let zero_score = K::default();
    for source in sources {
        if !scores.contains_key(source) {
            scores.insert(*source, zero_score);
            visit_next.push(MinScored(zero_score, *source));
        }
    }

    while let Some(MinScored(node_score, node)) = visit_next.pop() {
        if visited.is_visited(&node) {
            continue;
        }
        if targets.contains(&node) {
            let mut path = vec![];
            let mut cur = node;
            while let Some(edge) = edges_used.get(&cur) {
                path.push(*edge);
                match graph.edge_endpoints(*edge) {
                    Some((prev, _)) => cur = prev,
                    None => break,
                }
            }
            path.reverse();
            return Some((node_score, path));
        }
        for edge in graph.edges(node) {
            let next = edge.target();
            if visited.is_visited(&next) {
                continue;
            }
            let next_score = node_score + edge_cost(edge.weight());
            match scores.entry(next) {
                Occupied(ent) => {
                    if next_score < *ent.get() {
                        *ent.into_mut() = next_score;
                        visit_next.push(MinScored(next_score, next));
                        edges_used.insert(next, edge.id());
                    }
                }
                Vacant(ent) => {
                    ent.insert(next_score);
                    visit_next.push(MinScored(next_score, next));
                    edges_used.insert(next, edge.id());
                }
            }
        }
        visited.visit(node);
    }
    None
}


/// A heap entry that makes `BinaryHeap` a min-heap on the score, breaking ties towards the
/// smaller item.
#[derive(Copy, Clone, Debug)]
pub struct MinScored<K, T>(pub K, pub T);

impl<K: PartialOrd, T: Ord> PartialEq for MinScored<K, T> {
    #[inline]
    fn eq(&self, other: &MinScored<K, T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd, T: Ord> Eq for MinScored<K, T> {}

impl<K: PartialOrd, T: Ord> PartialOrd for MinScored<K, T> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K, T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd, T: Ord> Ord for MinScored<K, T> {
    #[inline]
    fn cmp(&self, other: &MinScored<K, T>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        if a == b {
            other.1.cmp(&self.1)
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // these are the NaN cases
            other.1.cmp(&self.1)
        } else if a.ne(a) {
            // Order NaN less, so that it is last in the MinScore order
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::Graph;

    type GG = DiGraph<(), f64>;

    fn path_targets(graph: &GG, path: &[EdgeIndex]) -> Vec<NodeIndex> {
        path.iter().map(|ee| graph.edge_endpoints(*ee).unwrap().1).collect()
    }

    // simple graph with two nodes
    #[test]
    fn test_simple_graph() {
        let mut graph: GG = Graph::new();
        let aa = graph.add_node(());
        let bb = graph.add_node(());
        graph.add_edge(aa, bb, 1.);
        let (cost, path) = dijkstra_to_any(&graph, &[aa], &[bb], |ww| *ww).unwrap();
        assert_eq!(cost, 1.);
        assert_eq!(path_targets(&graph, &path), vec![bb]);

        // edges are directed
        assert!(dijkstra_to_any(&graph, &[bb], &[aa], |ww| *ww).is_none());
    }

    #[test]
    fn test_petgraph_example() {
        let mut graph: GG = Graph::new();
        let aa = graph.add_node(());
        let bb = graph.add_node(());
        let cc = graph.add_node(());
        let dd = graph.add_node(());
        let ee = graph.add_node(());
        let ff = graph.add_node(());
        let gg = graph.add_node(());
        let hh = graph.add_node(());

        graph.add_edge(aa, bb, 1.);
        graph.add_edge(bb, cc, 1.);
        graph.add_edge(cc, dd, 1.);
        graph.add_edge(dd, aa, 1.);
        graph.add_edge(ee, ff, 1.);
        graph.add_edge(bb, ee, 1.);
        graph.add_edge(ff, gg, 1.);
        graph.add_edge(gg, hh, 1.);
        graph.add_edge(hh, ee, 1.);
        // a ----> b ----> e ----> f
        // ^       |       ^       |
        // |       v       |       v
        // d <---- c       h <---- g

        let (cost, path) = dijkstra_to_any(&graph, &[aa], &[hh], |ww| *ww).unwrap();
        assert_eq!(cost, 5.);
        assert_eq!(path_targets(&graph, &path), vec![bb, ee, ff, gg, hh]);

        let (cost, path) = dijkstra_to_any(&graph, &[cc], &[bb], |ww| *ww).unwrap();
        assert_eq!(cost, 3.);
        assert_eq!(path_targets(&graph, &path), vec![dd, aa, bb]);
    }

    #[test]
    fn test_multiple_sources_and_targets() {
        let mut graph: GG = Graph::new();
        let s1 = graph.add_node(());
        let s2 = graph.add_node(());
        let mid = graph.add_node(());
        let t1 = graph.add_node(());
        let t2 = graph.add_node(());
        graph.add_edge(s1, mid, 5.);
        graph.add_edge(s2, mid, 1.);
        graph.add_edge(mid, t1, 3.);
        graph.add_edge(mid, t2, 2.);

        let (cost, path) = dijkstra_to_any(&graph, &[s1, s2], &[t1, t2], |ww| *ww).unwrap();
        assert_eq!(cost, 3.);
        assert_eq!(path.len(), 2);
        assert_eq!(graph.edge_endpoints(path[0]).unwrap(), (s2, mid));
        assert_eq!(graph.edge_endpoints(path[1]).unwrap(), (mid, t2));
    }

    #[test]
    fn test_tie_break_is_lowest_index() {
        // two equal-cost routes from a to d, via b (lower index) or via c
        let mut graph: GG = Graph::new();
        let aa = graph.add_node(());
        let bb = graph.add_node(());
        let cc = graph.add_node(());
        let dd = graph.add_node(());
        graph.add_edge(aa, cc, 1.);
        graph.add_edge(aa, bb, 1.);
        graph.add_edge(cc, dd, 1.);
        graph.add_edge(bb, dd, 1.);

        for _ in 0..5 {
            let (cost, path) = dijkstra_to_any(&graph, &[aa], &[dd], |ww| *ww).unwrap();
            assert_eq!(cost, 2.);
            assert_eq!(path_targets(&graph, &path), vec![bb, dd]);
        }
    }

    #[test]
    fn test_no_targets() {
        let mut graph: GG = Graph::new();
        let aa = graph.add_node(());
        assert!(dijkstra_to_any(&graph, &[aa], &[], |ww| *ww).is_none());
    }
}
