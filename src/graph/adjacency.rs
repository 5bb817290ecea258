//! Adjacency-list graph store with node/edge tags

use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::graph::tag::NullTag;

/// Per-node bookkeeping, kept separate from the adjacency rows
#[derive(Debug, Clone, PartialEq)]
struct NodeEntry<N> {
    /// Number of edges pointing to this node
    indegree: usize,

    /// Number of edges leaving this node
    outdegree: usize,

    /// Application payload
    tag: N,
}

impl<N> NodeEntry<N> {
    fn new(tag: N) -> Self {
        Self { indegree: 0, outdegree: 0, tag }
    }

    fn is_isolated(&self) -> bool {
        self.indegree == 0 && self.outdegree == 0
    }
}

/// Directed or undirected graph stored as one ordered map per node
///
/// Node IDs are dense integers `0..num_nodes()`. Each node owns an ordered
/// mapping from neighbour ID to edge tag, so neighbour enumeration is always
/// in ascending neighbour order. Undirected graphs store every edge twice,
/// once per direction, and all mutation goes through methods that keep the
/// two mirrors (and their tags) identical.
///
/// Out-of-range node indices are a caller bug and panic.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph<N = NullTag, E = NullTag> {
    /// Whether every edge is mirrored
    undirected: bool,

    /// adjacency[u] maps v -> tag of edge u->v
    adjacency: Vec<BTreeMap<usize, E>>,

    /// Degree counters and node tags
    nodes: Vec<NodeEntry<N>>,

    /// Nodes with indegree = outdegree = 0
    isolated: BTreeSet<usize>,

    /// Number of stored directed entries (mirrors counted separately)
    entries: usize,

    /// Number of stored self-loops
    loops: usize,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<N, E> Graph<N, E> {
    /// Create an empty graph
    pub fn new(undirected: bool) -> Self {
        Self {
            undirected,
            adjacency: Vec::new(),
            nodes: Vec::new(),
            isolated: BTreeSet::new(),
            entries: 0,
            loops: 0,
        }
    }

    /// Create a graph with `n` isolated nodes carrying default tags
    pub fn with_nodes(n: usize, undirected: bool) -> Self
    where
        N: Default,
    {
        let mut graph = Self::new(undirected);
        for _ in 0..n {
            graph.add_node(N::default());
        }
        graph
    }

    /// Shorthand for `with_nodes(n, false)`
    pub fn directed(n: usize) -> Self
    where
        N: Default,
    {
        Self::with_nodes(n, false)
    }

    /// Shorthand for `with_nodes(n, true)`
    pub fn undirected(n: usize) -> Self
    where
        N: Default,
    {
        Self::with_nodes(n, true)
    }

    #[inline]
    fn check_bounds(&self, k: usize) {
        assert!(
            k < self.nodes.len(),
            "node index {} out of range (graph has {} nodes)",
            k,
            self.nodes.len()
        );
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_undirected(&self) -> bool {
        self.undirected
    }

    /// Number of edges; mirrored pairs of an undirected graph count once
    pub fn num_edges(&self) -> usize {
        if self.undirected {
            (self.entries + self.loops) / 2
        } else {
            self.entries
        }
    }

    /// Number of nodes with at least one incident edge
    pub fn num_non_isolated(&self) -> usize {
        self.nodes.len() - self.isolated.len()
    }

    /// Average number of edge endpoints per node (2E/N)
    pub fn average_connectivity(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        (self.num_edges() * 2) as f64 / self.nodes.len() as f64
    }

    /// Whether the edge u->v exists
    pub fn connected(&self, u: usize, v: usize) -> bool {
        self.check_bounds(u);
        self.check_bounds(v);
        self.adjacency[u].contains_key(&v)
    }

    pub fn indegree(&self, k: usize) -> usize {
        self.check_bounds(k);
        self.nodes[k].indegree
    }

    pub fn outdegree(&self, k: usize) -> usize {
        self.check_bounds(k);
        self.nodes[k].outdegree
    }

    /// Total degree. Undirected graphs count each mirrored edge once.
    pub fn degree(&self, k: usize) -> usize {
        self.check_bounds(k);
        let node = &self.nodes[k];
        if self.undirected {
            node.indegree
        } else {
            node.indegree + node.outdegree
        }
    }

    /// Maximum (indegree, outdegree) over all nodes
    pub fn max_degree(&self) -> (usize, usize) {
        self.nodes.iter().fold((0, 0), |(mx_in, mx_out), node| {
            (mx_in.max(node.indegree), mx_out.max(node.outdegree))
        })
    }

    pub fn is_isolated(&self, k: usize) -> bool {
        self.check_bounds(k);
        self.nodes[k].is_isolated()
    }

    /// Smallest isolated node, if any
    pub fn first_free(&self) -> Option<usize> {
        self.isolated.iter().next().copied()
    }

    pub fn has_self_loop(&self, k: usize) -> bool {
        self.connected(k, k)
    }

    /// Number of nodes adjacent (by outgoing edge) to both `i` and `j`
    pub fn common_neighbours(&self, i: usize, j: usize) -> usize {
        self.check_bounds(i);
        self.check_bounds(j);
        let (small, large) = if self.adjacency[i].len() <= self.adjacency[j].len() {
            (&self.adjacency[i], &self.adjacency[j])
        } else {
            (&self.adjacency[j], &self.adjacency[i])
        };
        small.keys().filter(|k| large.contains_key(k)).count()
    }

    pub fn node_tag(&self, k: usize) -> &N {
        self.check_bounds(k);
        &self.nodes[k].tag
    }

    pub fn node_tag_mut(&mut self, k: usize) -> &mut N {
        self.check_bounds(k);
        &mut self.nodes[k].tag
    }

    pub fn set_node_tag(&mut self, k: usize, tag: N) {
        self.check_bounds(k);
        self.nodes[k].tag = tag;
    }

    /// All nodes whose tag equals `tag`, ascending
    pub fn indices_with_tag(&self, tag: &N) -> Vec<usize>
    where
        N: PartialEq,
    {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.tag == *tag)
            .map(|(k, _)| k)
            .collect()
    }

    /// Tag of the edge u->v
    pub fn edge_tag(&self, u: usize, v: usize) -> Option<&E> {
        self.check_bounds(u);
        self.check_bounds(v);
        self.adjacency[u].get(&v)
    }

    /// Outgoing neighbours of `u` with their edge tags, in ascending order
    ///
    /// The iterator is lazy and can be cloned to restart the enumeration.
    pub fn neighbours(&self, u: usize) -> Neighbours<'_, E> {
        self.check_bounds(u);
        Neighbours { inner: self.adjacency[u].iter() }
    }

    /// Every stored edge `(u, v, tag)`, ascending by `u` then `v`
    ///
    /// Undirected graphs yield both mirrors.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &E)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(u, row)| row.iter().map(move |(&v, tag)| (u, v, tag)))
    }

    /// Append a node and return its ID. The new node is isolated.
    pub fn add_node(&mut self, tag: N) -> usize {
        let id = self.nodes.len();
        self.adjacency.push(BTreeMap::new());
        self.nodes.push(NodeEntry::new(tag));
        self.isolated.insert(id);
        id
    }

    /// Remove every edge, keeping nodes and their tags
    pub fn clear(&mut self) {
        for row in &mut self.adjacency {
            row.clear();
        }
        for node in &mut self.nodes {
            node.indegree = 0;
            node.outdegree = 0;
        }
        self.isolated = (0..self.nodes.len()).collect();
        self.entries = 0;
        self.loops = 0;
    }

    // Single-direction insert; returns false if the entry already exists.
    fn insert_entry(&mut self, u: usize, v: usize, tag: E) -> bool {
        match self.adjacency[u].entry(v) {
            btree_map::Entry::Occupied(_) => return false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(tag);
            }
        }
        self.nodes[u].outdegree += 1;
        self.nodes[v].indegree += 1;
        self.isolated.remove(&u);
        self.isolated.remove(&v);
        self.entries += 1;
        if u == v {
            self.loops += 1;
        }
        true
    }

    // Single-direction removal; returns false if there was nothing to remove.
    fn remove_entry(&mut self, u: usize, v: usize) -> Option<E> {
        let tag = self.adjacency[u].remove(&v)?;
        self.nodes[u].outdegree -= 1;
        self.nodes[v].indegree -= 1;
        self.entries -= 1;
        if u == v {
            self.loops -= 1;
        }
        if self.nodes[u].is_isolated() {
            self.isolated.insert(u);
        }
        if self.nodes[v].is_isolated() {
            self.isolated.insert(v);
        }
        Some(tag)
    }

    /// Remove the edge u->v (and its mirror when undirected)
    ///
    /// Returns false, without touching the graph, if the edge does not exist.
    pub fn remove_edge(&mut self, u: usize, v: usize) -> bool {
        if !self.connected(u, v) {
            return false;
        }
        self.remove_entry(u, v);
        if self.undirected && u != v {
            self.remove_entry(v, u);
        }
        true
    }

    /// Reverse the direction of every edge
    ///
    /// On an undirected graph the structure is unchanged.
    pub fn transpose(&mut self) {
        let mut transposed: Vec<BTreeMap<usize, E>> =
            (0..self.adjacency.len()).map(|_| BTreeMap::new()).collect();
        for (u, row) in std::mem::take(&mut self.adjacency).into_iter().enumerate() {
            for (v, tag) in row {
                transposed[v].insert(u, tag);
            }
        }
        self.adjacency = transposed;

        for node in &mut self.nodes {
            std::mem::swap(&mut node.indegree, &mut node.outdegree);
        }
    }

    /// Whether every edge u->v has its mirror v->u. Does not mutate.
    pub fn check_undirected(&self) -> bool {
        self.edges().all(|(u, v, _)| self.adjacency[v].contains_key(&u))
    }
}

impl<N, E: Clone> Graph<N, E> {
    /// Insert the edge u->v with `tag` (plus its mirror when undirected)
    ///
    /// Returns false, without touching the graph, if u->v already exists.
    /// A self-loop is stored once in both modes.
    pub fn add_edge(&mut self, u: usize, v: usize, tag: E) -> bool {
        if self.connected(u, v) {
            return false;
        }
        if self.undirected && u != v {
            self.insert_entry(v, u, tag.clone());
        }
        self.insert_entry(u, v, tag)
    }

    /// Apply `f` to the tag of u->v; when undirected the mirror receives the
    /// same resulting value
    ///
    /// Returns false if the edge does not exist.
    pub fn update_edge_tag<F>(&mut self, u: usize, v: usize, f: F) -> bool
    where
        F: FnOnce(&mut E),
    {
        self.check_bounds(u);
        self.check_bounds(v);
        let updated = match self.adjacency[u].get_mut(&v) {
            Some(tag) => {
                f(tag);
                tag.clone()
            }
            None => return false,
        };
        if self.undirected && u != v {
            let mirror = self.adjacency[v].get_mut(&u);
            assert!(mirror.is_some(), "undirected edge {}-{} has no mirror", u, v);
            if let Some(tag) = mirror {
                *tag = updated;
            }
        }
        true
    }

    /// Replace the tag of u->v (and its mirror when undirected)
    pub fn set_edge_tag(&mut self, u: usize, v: usize, tag: E) -> bool {
        self.update_edge_tag(u, v, |t| *t = tag)
    }

    /// Apply `f` to every edge leaving `u`, keeping mirrors in sync
    pub fn update_outgoing_tags<F>(&mut self, u: usize, mut f: F)
    where
        F: FnMut(&mut E),
    {
        self.check_bounds(u);
        let targets: Vec<usize> = self.adjacency[u].keys().copied().collect();
        for v in targets {
            self.update_edge_tag(u, v, &mut f);
        }
    }

    /// Mirror every edge and switch the graph to undirected mode
    ///
    /// Existing mirrors keep their own tag. Idempotent.
    pub fn to_undirected(&mut self) {
        let missing: Vec<(usize, usize, E)> = self
            .edges()
            .filter(|&(u, v, _)| !self.adjacency[v].contains_key(&u))
            .map(|(u, v, tag)| (v, u, tag.clone()))
            .collect();
        for (u, v, tag) in missing {
            self.insert_entry(u, v, tag);
        }
        self.undirected = true;
    }
}

impl<N: Clone, E: Clone> Graph<N, E> {
    /// Densely renumbered copy holding exactly the nodes where `mask` is true
    ///
    /// New IDs follow ascending old-ID order. Node tags are preserved and only
    /// edges with both endpoints kept are copied.
    pub fn subgraph(&self, mask: &[bool]) -> Graph<N, E> {
        assert_eq!(
            mask.len(),
            self.nodes.len(),
            "subgraph mask length must equal the node count"
        );

        let mut sub = Graph::new(self.undirected);
        let mut old_to_new = vec![usize::MAX; self.nodes.len()];
        for (old, _) in mask.iter().enumerate().filter(|(_, &keep)| keep) {
            old_to_new[old] = sub.add_node(self.nodes[old].tag.clone());
        }

        for (u, v, tag) in self.edges() {
            if mask[u] && mask[v] {
                sub.insert_entry(old_to_new[u], old_to_new[v], tag.clone());
            }
        }

        sub
    }
}

/// Lazy, restartable enumeration of `(neighbour, tag)` pairs
#[derive(Debug)]
pub struct Neighbours<'a, E> {
    inner: btree_map::Iter<'a, usize, E>,
}

impl<E> Clone for Neighbours<'_, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<'a, E> Iterator for Neighbours<'a, E> {
    type Item = (usize, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(&v, tag)| (v, tag))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<E> ExactSizeIterator for Neighbours<'_, E> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize, undirected: bool) -> Graph<usize, f64> {
        let mut g = Graph::new(undirected);
        for k in 0..n {
            g.add_node(k);
        }
        for k in 1..n {
            g.add_edge(k - 1, k, k as f64);
        }
        g
    }

    #[test]
    fn test_add_edge_updates_degrees_and_isolation() {
        let mut g: Graph = Graph::directed(3);
        assert_eq!(g.first_free(), Some(0));
        assert!(g.add_edge(0, 1, NullTag));
        assert!(!g.add_edge(0, 1, NullTag));
        assert_eq!(g.outdegree(0), 1);
        assert_eq!(g.indegree(1), 1);
        assert_eq!(g.degree(0), 1);
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.first_free(), Some(2));
        assert_eq!(g.num_non_isolated(), 2);
        assert!(!g.connected(1, 0));
    }

    #[test]
    fn test_undirected_edges_are_mirrored() {
        let mut g = path(3, true);
        assert!(g.connected(1, 0));
        assert_eq!(g.edge_tag(1, 0), Some(&1.0));
        assert_eq!(g.num_edges(), 2);
        for k in 0..3 {
            assert_eq!(g.degree(k), g.indegree(k));
        }

        assert!(g.update_edge_tag(0, 1, |t| *t += 4.0));
        assert_eq!(g.edge_tag(1, 0), Some(&5.0));
        assert!(!g.update_edge_tag(0, 2, |t| *t += 1.0));

        assert!(g.remove_edge(1, 0));
        assert!(!g.connected(0, 1));
        assert!(g.is_isolated(0));
        assert!(!g.remove_edge(0, 1));
        assert_eq!(g.first_free(), Some(0));
    }

    #[test]
    fn test_self_loop_counts_once() {
        let mut g: Graph = Graph::undirected(2);
        assert!(g.add_edge(1, 1, NullTag));
        assert!(g.has_self_loop(1));
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.degree(1), 1);
        assert!(g.check_undirected());
        assert!(g.remove_edge(1, 1));
        assert!(g.is_isolated(1));
    }

    #[test]
    fn test_directed_degree_is_sum() {
        let g = path(4, false);
        for k in 0..4 {
            assert_eq!(g.degree(k), g.indegree(k) + g.outdegree(k));
        }
        assert_eq!(g.max_degree(), (1, 1));
    }

    #[test]
    fn test_neighbours_are_sorted_and_restartable() {
        let mut g: Graph = Graph::directed(5);
        g.add_edge(0, 4, NullTag);
        g.add_edge(0, 2, NullTag);
        g.add_edge(0, 3, NullTag);
        let nbrs = g.neighbours(0);
        let first: Vec<usize> = nbrs.clone().map(|(v, _)| v).collect();
        let second: Vec<usize> = nbrs.map(|(v, _)| v).collect();
        assert_eq!(first, vec![2, 3, 4]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_to_undirected_is_idempotent() {
        let mut g = path(4, false);
        g.add_edge(3, 0, 9.0);
        assert!(!g.check_undirected());

        g.to_undirected();
        assert!(g.check_undirected());
        assert!(g.is_undirected());
        let once = g.clone();
        g.to_undirected();
        assert_eq!(g, once);
        assert_eq!(g.num_edges(), 4);
    }

    #[test]
    fn test_transpose_swaps_degrees() {
        let mut g = path(3, false);
        g.transpose();
        assert!(g.connected(1, 0));
        assert!(!g.connected(0, 1));
        assert_eq!(g.outdegree(2), 1);
        assert_eq!(g.indegree(0), 1);
        assert_eq!(g.edge_tag(2, 1), Some(&2.0));

        let mut u = path(3, true);
        let before = u.clone();
        u.transpose();
        assert_eq!(u, before);
    }

    #[test]
    fn test_subgraph_renumbers_densely() {
        let g = path(5, true);
        let sub = g.subgraph(&[false, true, true, false, true]);
        assert_eq!(sub.num_nodes(), 3);
        assert_eq!(*sub.node_tag(0), 1);
        assert_eq!(*sub.node_tag(2), 4);
        assert!(sub.connected(0, 1));
        assert!(sub.connected(1, 0));
        assert_eq!(sub.num_edges(), 1);
        assert!(sub.is_isolated(2));

        let all = g.subgraph(&[true; 5]);
        assert_eq!(all, g);
    }

    #[test]
    fn test_common_neighbours() {
        let mut g: Graph = Graph::undirected(4);
        g.add_edge(0, 2, NullTag);
        g.add_edge(1, 2, NullTag);
        g.add_edge(0, 3, NullTag);
        g.add_edge(1, 3, NullTag);
        assert_eq!(g.common_neighbours(0, 1), 2);
        assert_eq!(g.common_neighbours(2, 3), 2);
        assert_eq!(g.common_neighbours(0, 2), 0);
    }

    #[test]
    fn test_clear_keeps_tags() {
        let mut g = path(3, true);
        g.clear();
        assert_eq!(g.num_edges(), 0);
        assert_eq!(g.num_non_isolated(), 0);
        assert_eq!(*g.node_tag(2), 2);
        assert_eq!(g.indices_with_tag(&1), vec![1]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_is_fatal() {
        let g: Graph = Graph::directed(2);
        g.degree(2);
    }
}
