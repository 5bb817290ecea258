//! Betweenness centrality (Brandes) over an annotated working copy
//!
//! Based on: "A Faster Algorithm for Betweenness Centrality", U. Brandes,
//! J. Math. Sociol. 25(2):163-177 (2001).
//!
//! Scores are accumulated in place on an [`AnnotatedGraph`]: each node tag
//! carries its centrality and each edge tag is the edge betweenness. The
//! engine can be restricted to a node subset, in which case only those nodes
//! act as BFS sources. Combined with [`reset`] on the same subset this
//! refreshes one connected component without touching the rest of the graph.
//!
//! On undirected graphs every unordered pair is reached from both endpoints,
//! so contributions are halved: a star centre with `k` leaves scores `C(k,2)`.

use std::collections::VecDeque;

use crate::graph::{Graph, Scored};

/// Working copy whose node tags carry centrality and whose edge tags are
/// edge betweenness
pub type AnnotatedGraph<N> = Graph<Scored<N>, f64>;

/// Build a zeroed working copy with the same nodes, tags and edges as `graph`
pub fn init_annotated<N: Clone, E>(graph: &Graph<N, E>) -> AnnotatedGraph<N> {
    let mut res = Graph::new(graph.is_undirected());
    for k in 0..graph.num_nodes() {
        res.add_node(Scored::new(graph.node_tag(k).clone()));
    }
    for (u, v, _) in graph.edges() {
        // mirrors of undirected edges are inserted together by add_edge
        res.add_edge(u, v, 0.0);
    }
    res
}

/// Zero the node scores of `subset` and every edge leaving those nodes
pub fn reset<N>(res: &mut AnnotatedGraph<N>, subset: &[bool]) {
    assert_eq!(subset.len(), res.num_nodes(), "subset mask length must equal the node count");

    for k in 0..res.num_nodes() {
        if subset[k] {
            res.node_tag_mut(k).centrality = 0.0;
            res.update_outgoing_tags(k, |t| *t = 0.0);
        }
    }
}

/// Accumulate betweenness using the nodes in `subset` as sources
///
/// Scores are added to whatever is already stored; call [`reset`] first to
/// recompute. With `normalize` each shortest path contributes `1/(N(N-1))`
/// instead of 1.
pub fn compute<N>(res: &mut AnnotatedGraph<N>, subset: &[bool], normalize: bool) {
    let n = res.num_nodes();
    assert_eq!(subset.len(), n, "subset mask length must equal the node count");

    let start_value = if normalize && n > 1 {
        1.0 / (n * (n - 1)) as f64
    } else {
        1.0
    };
    let scale = if res.is_undirected() { 0.5 } else { 1.0 };

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut dist: Vec<Option<usize>> = vec![None; n];
    let mut delta = vec![0.0_f64; n];
    let mut queue = VecDeque::new();

    for s in (0..n).filter(|&s| subset[s]) {
        // Only nodes touched by the previous source need clearing
        for &k in &stack {
            predecessors[k].clear();
            sigma[k] = 0.0;
            dist[k] = None;
            delta[k] = 0.0;
        }
        stack.clear();

        sigma[s] = 1.0;
        dist[s] = Some(0);
        queue.push_back(s);

        // Single-source shortest paths
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].unwrap_or(0);
            for (w, _) in res.neighbours(v) {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        // Back-propagation of dependencies
        for &w in stack.iter().rev() {
            for &v in &predecessors[w] {
                let flux = sigma[v] / sigma[w] * (start_value + delta[w]);
                delta[v] += flux;
                res.update_edge_tag(v, w, |t| *t += flux * scale);
            }
            if w != s {
                res.node_tag_mut(w).centrality += delta[w] * scale;
            }
        }
    }
}

/// Accumulate betweenness with every node as a source
pub fn compute_all<N>(res: &mut AnnotatedGraph<N>, normalize: bool) {
    let all = vec![true; res.num_nodes()];
    compute(res, &all, normalize);
}

/// Build the working copy of `graph` and fill in full betweenness scores
pub fn betweenness<N: Clone, E>(graph: &Graph<N, E>, normalize: bool) -> AnnotatedGraph<N> {
    log::debug!(
        "Computing betweenness for {} nodes and {} edges",
        graph.num_nodes(),
        graph.num_edges()
    );
    let mut res = init_annotated(graph);
    compute_all(&mut res, normalize);
    res
}
