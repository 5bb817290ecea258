//! Descriptive graph statistics

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::cluster::hierarchical::SimilarityMatrix;
use crate::graph::traversal::{component_sizes, minimum_distances};
use crate::graph::Graph;

/// Which degree a distribution counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeKind {
    Total,
    In,
    Out,
}

fn degree_of<N, E>(graph: &Graph<N, E>, k: usize, kind: DegreeKind) -> usize {
    match kind {
        DegreeKind::Total => graph.degree(k),
        DegreeKind::In => graph.indegree(k),
        DegreeKind::Out => graph.outdegree(k),
    }
}

/// Number of nodes with each degree value, indexed by degree
pub fn degree_distribution<N, E>(graph: &Graph<N, E>, kind: DegreeKind) -> Vec<f64> {
    let degrees: Vec<usize> = (0..graph.num_nodes()).map(|k| degree_of(graph, k, kind)).collect();
    let mut dist = vec![0.0; degrees.iter().max().map_or(0, |&m| m + 1)];
    for d in degrees {
        dist[d] += 1.0;
    }
    dist
}

/// Cumulative form of a distribution: for every non-empty degree `k`, the
/// number of nodes with degree `k` or more
pub fn cumulative(dist: &[f64]) -> BTreeMap<usize, f64> {
    let mut acc = 0.0;
    let mut out = BTreeMap::new();
    for (k, &count) in dist.iter().enumerate().rev() {
        if count != 0.0 {
            acc += count;
            out.insert(k, acc);
        }
    }
    out
}

pub fn average_degree<N: Sync, E: Sync>(graph: &Graph<N, E>, kind: DegreeKind) -> f64 {
    if graph.num_nodes() == 0 {
        return 0.0;
    }
    let degrees: Vec<f64> = (0..graph.num_nodes())
        .into_par_iter()
        .map(|k| degree_of(graph, k, kind) as f64)
        .collect();
    degrees.mean()
}

/// Fraction of neighbour pairs of `node` that are themselves connected
///
/// Self-loops are ignored. Nodes with fewer than two neighbours score 0.
pub fn clustering_coefficient<N, E>(graph: &Graph<N, E>, node: usize) -> f64 {
    assert!(graph.is_undirected(), "clustering coefficient requires an undirected graph");

    let nbrs: Vec<usize> = graph.neighbours(node).map(|(v, _)| v).filter(|&v| v != node).collect();
    let k = nbrs.len();
    if k < 2 {
        return 0.0;
    }

    let mut links = 0usize;
    for (a, &u) in nbrs.iter().enumerate() {
        for &v in &nbrs[a + 1..] {
            if graph.connected(u, v) {
                links += 1;
            }
        }
    }
    2.0 * links as f64 / (k * (k - 1)) as f64
}

pub fn average_clustering<N: Sync, E: Sync>(graph: &Graph<N, E>) -> f64 {
    if graph.num_nodes() == 0 {
        return 0.0;
    }
    let cc: Vec<f64> = (0..graph.num_nodes())
        .into_par_iter()
        .map(|k| clustering_coefficient(graph, k))
        .collect();
    cc.mean()
}

/// Mean hop distance over all ordered pairs of distinct nodes
///
/// `None` when some node cannot reach another or there are fewer than two
/// nodes.
pub fn average_minimum_distance<N: Sync, E: Sync>(graph: &Graph<N, E>) -> Option<f64> {
    let n = graph.num_nodes();
    if n < 2 {
        return None;
    }
    let all = vec![true; n];
    let totals: Option<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|from| {
            let dist = minimum_distances(graph, from, &all);
            dist.iter()
                .enumerate()
                .filter(|&(to, _)| to != from)
                .map(|(_, d)| *d)
                .sum::<Option<usize>>()
        })
        .collect();
    let total: usize = totals?.into_iter().sum();
    Some(total as f64 / (n * (n - 1)) as f64)
}

/// Mean inverse hop distance inside `subset`, walking only through `subset`
///
/// Unreachable pairs contribute 0. Subsets of one node or fewer score 0.
pub fn efficiency<N, E>(graph: &Graph<N, E>, subset: &BTreeSet<usize>) -> f64 {
    let size = subset.len();
    if size <= 1 {
        return 0.0;
    }
    let mut mask = vec![false; graph.num_nodes()];
    for &k in subset {
        mask[k] = true;
    }

    let mut acc = 0.0;
    for &u in subset {
        let dist = minimum_distances(graph, u, &mask);
        for &v in subset {
            match dist[v] {
                Some(d) if v != u => acc += 1.0 / d as f64,
                _ => {}
            }
        }
    }
    acc / (size * (size - 1)) as f64
}

pub fn global_efficiency<N, E>(graph: &Graph<N, E>) -> f64 {
    assert!(graph.is_undirected(), "efficiency requires an undirected graph");
    efficiency(graph, &(0..graph.num_nodes()).collect())
}

/// Efficiency of the neighbourhood of `node`, `node` itself excluded
pub fn local_efficiency<N, E>(graph: &Graph<N, E>, node: usize) -> f64 {
    assert!(graph.is_undirected(), "efficiency requires an undirected graph");
    let subset: BTreeSet<usize> = graph.neighbours(node).map(|(v, _)| v).filter(|&v| v != node).collect();
    efficiency(graph, &subset)
}

pub fn average_local_efficiency<N: Sync, E: Sync>(graph: &Graph<N, E>) -> f64 {
    if graph.num_nodes() == 0 {
        return 0.0;
    }
    let le: Vec<f64> = (0..graph.num_nodes())
        .into_par_iter()
        .map(|k| local_efficiency(graph, k))
        .collect();
    le.mean()
}

/// Degree assortativity: Pearson correlation between the indegree of an
/// edge's source and the outdegree of its target, over all stored edges
///
/// `None` for graphs without edges or without degree variance.
pub fn assortative_mixing<N, E>(graph: &Graph<N, E>) -> Option<f64> {
    let (mut sjk, mut sj, mut sk, mut sj2, mut sk2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut count = 0usize;
    for (u, v, _) in graph.edges() {
        let j = graph.indegree(u) as f64;
        let k = graph.outdegree(v) as f64;
        sjk += j * k;
        sj += j;
        sk += k;
        sj2 += j * j;
        sk2 += k * k;
        count += 1;
    }
    if count == 0 {
        return None;
    }

    let l = count as f64;
    let denom = ((sj2 - sj * sj / l) * (sk2 - sk * sk / l)).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sjk - sj * sk / l) / denom)
}

/// Per-node percolation term: `k(k-2)` (undirected) or `2jk - j - k` (directed)
pub fn local_percolation<N, E>(graph: &Graph<N, E>, node: usize) -> i64 {
    if graph.is_undirected() {
        let k = graph.degree(node) as i64;
        k * (k - 2)
    } else {
        let j = graph.indegree(node) as i64;
        let k = graph.outdegree(node) as i64;
        2 * j * k - j - k
    }
}

/// Mean of [`local_percolation`] over nodes
pub fn percolation_threshold<N, E>(graph: &Graph<N, E>) -> f64 {
    let n = graph.num_nodes();
    if n == 0 {
        return 0.0;
    }
    let total: i64 = (0..n).map(|i| local_percolation(graph, i)).sum();
    total as f64 / n as f64
}

/// One row of the per-node statistics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub index: usize,
    pub degree: usize,
    pub indegree: usize,
    pub outdegree: usize,
    pub local_efficiency: f64,
    pub clustering: f64,
    pub percolation: i64,
}

/// Degrees, local efficiency, clustering and percolation term of every node
///
/// Efficiency and clustering are taken on an undirected copy when the
/// graph is directed; degrees and percolation use the graph as stored.
pub fn node_statistics<N, E>(graph: &Graph<N, E>) -> Vec<NodeStats>
where
    N: Clone + Send + Sync,
    E: Clone + Send + Sync,
{
    let mirrored;
    let undirected = if graph.is_undirected() {
        graph
    } else {
        let mut copy = graph.clone();
        copy.to_undirected();
        mirrored = copy;
        &mirrored
    };

    (0..graph.num_nodes())
        .into_par_iter()
        .map(|k| NodeStats {
            index: k,
            degree: graph.degree(k),
            indegree: graph.indegree(k),
            outdegree: graph.outdegree(k),
            local_efficiency: local_efficiency(undirected, k),
            clustering: clustering_coefficient(undirected, k),
            percolation: local_percolation(graph, k),
        })
        .collect()
}

/// Topological overlap between every pair of distinct nodes
///
/// `(common neighbours + [i, j connected]) / min(degree i, degree j)`; pairs
/// with no overlap are left out of the matrix.
pub fn topological_overlap<N: Sync, E: Sync>(graph: &Graph<N, E>) -> SimilarityMatrix {
    assert!(graph.is_undirected(), "topological overlap requires an undirected graph");

    let n = graph.num_nodes();
    let rows: Vec<Vec<(usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (i + 1..n)
                .filter_map(|j| {
                    let shared = graph.common_neighbours(i, j) + usize::from(graph.connected(i, j));
                    let min_degree = graph.degree(i).min(graph.degree(j));
                    (shared != 0 && min_degree != 0).then(|| (j, shared as f64 / min_degree as f64))
                })
                .collect()
        })
        .collect();

    let mut overlap = SimilarityMatrix::new(n);
    for (i, row) in rows.into_iter().enumerate() {
        for (j, w) in row {
            overlap.set(i, j, w);
        }
    }
    log::debug!("Topological overlap has {} entries", overlap.num_entries());
    overlap
}

/// Summary printed and saved by the `stats` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    pub undirected: bool,
    pub num_nodes: usize,
    pub num_edges: usize,
    pub num_non_isolated: usize,
    pub average_connectivity: f64,
    pub max_indegree: usize,
    pub max_outdegree: usize,
    pub num_components: usize,
    pub largest_component: usize,

    /// Only meaningful for undirected graphs
    pub average_clustering: Option<f64>,
    pub average_minimum_distance: Option<f64>,
    pub global_efficiency: Option<f64>,
    pub average_local_efficiency: Option<f64>,
    pub assortative_mixing: Option<f64>,
    pub percolation_threshold: f64,

    /// Cumulative total-degree distribution, `(degree, nodes)`
    pub cumulative_degrees: Vec<(usize, f64)>,
}

impl GraphSummary {
    pub fn compute<N: Sync, E: Sync>(graph: &Graph<N, E>) -> Self {
        log::info!("Computing statistics for {} nodes", graph.num_nodes());

        let undirected = graph.is_undirected();
        let (max_indegree, max_outdegree) = graph.max_degree();
        let sizes = component_sizes(graph);

        Self {
            undirected,
            num_nodes: graph.num_nodes(),
            num_edges: graph.num_edges(),
            num_non_isolated: graph.num_non_isolated(),
            average_connectivity: graph.average_connectivity(),
            max_indegree,
            max_outdegree,
            num_components: sizes.len(),
            largest_component: sizes.first().copied().unwrap_or(0),
            average_clustering: undirected.then(|| average_clustering(graph)),
            average_minimum_distance: average_minimum_distance(graph),
            global_efficiency: undirected.then(|| global_efficiency(graph)),
            average_local_efficiency: undirected.then(|| average_local_efficiency(graph)),
            assortative_mixing: assortative_mixing(graph),
            percolation_threshold: percolation_threshold(graph),
            cumulative_degrees: cumulative(&degree_distribution(graph, DegreeKind::Total))
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NullTag;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn undirected(n: usize, edges: &[(usize, usize)]) -> Graph {
        let mut g = Graph::undirected(n);
        for &(u, v) in edges {
            g.add_edge(u, v, NullTag);
        }
        g
    }

    #[test]
    fn test_degree_distribution_and_cumulative() {
        // star with centre 0 and three leaves
        let g = undirected(4, &[(0, 1), (0, 2), (0, 3)]);
        let dd = degree_distribution(&g, DegreeKind::Total);
        assert_eq!(dd, vec![0.0, 3.0, 0.0, 1.0]);
        let cdd = cumulative(&dd);
        assert_eq!(cdd.get(&3), Some(&1.0));
        assert_eq!(cdd.get(&1), Some(&4.0));
        assert_eq!(cdd.get(&2), None);
        assert!(approx(average_degree(&g, DegreeKind::Total), 1.5));
    }

    #[test]
    fn test_clustering_coefficient() {
        // triangle 0-1-2 with a pendant 3 on node 0
        let g = undirected(4, &[(0, 1), (1, 2), (0, 2), (0, 3)]);
        assert!(approx(clustering_coefficient(&g, 0), 1.0 / 3.0));
        assert!(approx(clustering_coefficient(&g, 1), 1.0));
        assert!(approx(clustering_coefficient(&g, 3), 0.0));
        assert!(approx(average_clustering(&g), (1.0 / 3.0 + 2.0) / 4.0));
    }

    #[test]
    fn test_node_statistics_of_directed_graph() {
        // cycle 0 -> 1 -> 2 -> 0 plus 0 -> 3
        let mut g: Graph = Graph::directed(4);
        for (u, v) in [(0, 1), (1, 2), (2, 0), (0, 3)] {
            g.add_edge(u, v, NullTag);
        }
        let stats = node_statistics(&g);
        assert_eq!(stats.len(), 4);

        let hub = &stats[0];
        assert_eq!((hub.degree, hub.indegree, hub.outdegree), (3, 1, 2));
        assert_eq!(hub.percolation, 2 * 1 * 2 - 1 - 2);
        // on the mirrored graph 0 sees 1, 2, 3 and only 1-2 are linked
        assert!(approx(hub.clustering, 1.0 / 3.0));
        assert!(approx(stats[1].clustering, 1.0));
        assert!(approx(stats[1].local_efficiency, 1.0));

        let leaf = &stats[3];
        assert_eq!((leaf.indegree, leaf.outdegree), (1, 0));
        assert_eq!(leaf.percolation, -1);
        assert!(approx(leaf.clustering, 0.0));
        assert!(!g.is_undirected());
    }

    #[test]
    fn test_average_minimum_distance() {
        let path = undirected(3, &[(0, 1), (1, 2)]);
        // ordered pairs: 1,2,1,1,2,1
        assert!(approx(average_minimum_distance(&path).unwrap_or(-1.0), 8.0 / 6.0));

        let split = undirected(3, &[(0, 1)]);
        assert_eq!(average_minimum_distance(&split), None);
    }

    #[test]
    fn test_efficiency() {
        let path = undirected(3, &[(0, 1), (1, 2)]);
        // (1 + 1/2 + 1 + 1 + 1/2 + 1) / 6
        assert!(approx(global_efficiency(&path), 5.0 / 6.0));
        // neighbours of 1 are 0 and 2, not connected without 1
        assert!(approx(local_efficiency(&path, 1), 0.0));

        let triangle = undirected(3, &[(0, 1), (1, 2), (0, 2)]);
        assert!(approx(local_efficiency(&triangle, 0), 1.0));
        assert!(approx(average_local_efficiency(&triangle), 1.0));
    }

    #[test]
    fn test_assortativity_of_star_is_negative() {
        let g = undirected(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
        let r = assortative_mixing(&g).unwrap_or(0.0);
        assert!(approx(r, -1.0));
        assert_eq!(assortative_mixing(&undirected(2, &[])), None);
    }

    #[test]
    fn test_topological_overlap() {
        // triangle 0-1-2 plus pendant 3 on node 2
        let g = undirected(4, &[(0, 1), (1, 2), (0, 2), (2, 3)]);
        let t = topological_overlap(&g);
        // 0,1: one common neighbour plus direct link, min degree 2
        assert_eq!(t.get(0, 1), Some(1.0));
        assert_eq!(t.get(1, 0), Some(1.0));
        // 0,3: common neighbour 2, min degree 1
        assert_eq!(t.get(0, 3), Some(1.0));
        // 2,3: linked only, min degree 1
        assert_eq!(t.get(2, 3), Some(1.0));
        // 0,2: common neighbour 1 plus link, min degree 2
        assert_eq!(t.get(0, 2), Some(1.0));
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn test_summary() {
        let g = undirected(5, &[(0, 1), (1, 2), (3, 4)]);
        let s = GraphSummary::compute(&g);
        assert_eq!(s.num_edges, 3);
        assert_eq!(s.num_components, 2);
        assert_eq!(s.largest_component, 3);
        assert_eq!(s.average_minimum_distance, None);
        assert!(s.average_clustering.is_some());
        assert!(approx(s.percolation_threshold, (-1.0 + 0.0 - 1.0 - 1.0 - 1.0) / 5.0));
    }
}
