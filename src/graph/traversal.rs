//! Breadth-first traversal and connected components

use std::collections::VecDeque;

use crate::graph::Graph;

/// Component label for every node; `None` for nodes outside the mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLabels {
    /// labels[k] = component of node k
    pub labels: Vec<Option<usize>>,

    /// Number of components found
    pub count: usize,
}

impl ComponentLabels {
    /// Members of component `c`, ascending
    pub fn members(&self, c: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == Some(c))
            .map(|(k, _)| k)
            .collect()
    }

    /// Members of every component, indexed by label
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.count];
        for (k, label) in self.labels.iter().enumerate() {
            if let Some(c) = label {
                groups[*c].push(k);
            }
        }
        groups
    }

    /// Size of every component, indexed by label
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.count];
        for label in self.labels.iter().flatten() {
            sizes[*label] += 1;
        }
        sizes
    }
}

/// Nodes reachable from `start` through nodes allowed by `mask`, in BFS order
///
/// Neighbours are visited in ascending ID order. `start` is always included.
pub fn breadth_first<N, E>(graph: &Graph<N, E>, start: usize, mask: Option<&[bool]>) -> Vec<usize> {
    let allowed = |k: usize| mask.map_or(true, |m| m[k]);
    let mut visited = vec![false; graph.num_nodes()];
    let mut order = Vec::new();
    let mut queue = VecDeque::new();

    visited[start] = true;
    queue.push_back(start);
    while let Some(curr) = queue.pop_front() {
        order.push(curr);
        for (nbr, _) in graph.neighbours(curr) {
            if allowed(nbr) && !visited[nbr] {
                visited[nbr] = true;
                queue.push_back(nbr);
            }
        }
    }

    order
}

/// Hop distance from `from` to every node, moving only through `to_mask`
///
/// Unreachable nodes get `None`.
pub fn minimum_distances<N, E>(graph: &Graph<N, E>, from: usize, to_mask: &[bool]) -> Vec<Option<usize>> {
    assert_eq!(to_mask.len(), graph.num_nodes(), "mask length must equal the node count");

    let mut dist = vec![None; graph.num_nodes()];
    let mut queue = VecDeque::new();
    dist[from] = Some(0);
    queue.push_back(from);

    while let Some(curr) = queue.pop_front() {
        let next = dist[curr].map_or(0, |d| d + 1);
        for (nbr, _) in graph.neighbours(curr) {
            if to_mask[nbr] && dist[nbr].is_none() {
                dist[nbr] = Some(next);
                queue.push_back(nbr);
            }
        }
    }

    dist
}

/// Label connected components, optionally restricted to the nodes in `mask`
///
/// Components are discovered from the lowest unlabelled node upward, so
/// label 0 always holds the smallest masked node ID. Edges are followed as
/// stored, so on a directed graph this labels forward reachability.
pub fn connected_components<N, E>(graph: &Graph<N, E>, mask: Option<&[bool]>) -> ComponentLabels {
    if let Some(m) = mask {
        assert_eq!(m.len(), graph.num_nodes(), "mask length must equal the node count");
    }

    let allowed = |k: usize| mask.map_or(true, |m| m[k]);
    let mut labels = vec![None; graph.num_nodes()];
    let mut count = 0;
    let mut queue = VecDeque::new();

    // A labelled node doubles as visited
    for seed in 0..graph.num_nodes() {
        if labels[seed].is_some() || !allowed(seed) {
            continue;
        }
        labels[seed] = Some(count);
        queue.push_back(seed);
        while let Some(curr) = queue.pop_front() {
            for (nbr, _) in graph.neighbours(curr) {
                if allowed(nbr) && labels[nbr].is_none() {
                    labels[nbr] = Some(count);
                    queue.push_back(nbr);
                }
            }
        }
        count += 1;
    }

    ComponentLabels { labels, count }
}

/// Component sizes of the whole graph, largest first
pub fn component_sizes<N, E>(graph: &Graph<N, E>) -> Vec<usize> {
    let mut sizes = connected_components(graph, None).sizes();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes
}

/// Extract the `rank`-th largest component (0 = largest) as a new graph
///
/// Equal-sized components keep discovery order. `None` if there are not
/// that many components.
pub fn extract_component<N: Clone, E: Clone>(graph: &Graph<N, E>, rank: usize) -> Option<Graph<N, E>> {
    let components = connected_components(graph, None);
    let sizes = components.sizes();

    let mut by_size: Vec<usize> = (0..components.count).collect();
    by_size.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]));
    let which = *by_size.get(rank)?;

    log::debug!(
        "Extracting component {} of {} ({} nodes)",
        rank,
        components.count,
        sizes[which]
    );

    let mask: Vec<bool> = components.labels.iter().map(|l| *l == Some(which)).collect();
    Some(graph.subgraph(&mask))
}
