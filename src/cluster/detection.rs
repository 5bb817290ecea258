//! Community detection by iterative edge removal (Girvan-Newman)

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cluster::{CommunityTree, TreeTag};
use crate::graph::betweenness::{self, AnnotatedGraph};
use crate::graph::traversal::connected_components;
use crate::graph::{Graph, NullTag, Tag};

/// Options for [`find_communities`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CommunityOptions {
    /// Collect a [`SplitRecord`] every time a community splits
    pub record_splits: bool,
}

/// Snapshot taken when a community splits in two
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// Edges removed from the whole graph so far
    pub edges_removed: usize,

    /// Fraction of the original edges removed so far
    pub removed_fraction: f64,

    /// Size of the community that split
    pub region_size: usize,

    /// Largest live community before the split, as a fraction of all nodes
    pub largest_region_fraction: f64,

    /// Size of the right part
    pub right_size: usize,

    /// Size of the left part
    pub left_size: usize,
}

/// Community tree plus optional split instrumentation
#[derive(Debug, Clone)]
pub struct CommunityResult {
    pub tree: CommunityTree,
    pub splits: Vec<SplitRecord>,
}

/// A live community: its member nodes and the tree node that stands for it
struct Region {
    members: BTreeSet<usize>,
    tree_node: usize,
}

impl Region {
    fn mask(&self, n: usize) -> Vec<bool> {
        let mut mask = vec![false; n];
        for &k in &self.members {
            mask[k] = true;
        }
        mask
    }
}

fn root_name(idx: usize) -> String {
    format!("<r{}>", idx)
}

fn branch_name(idx: usize) -> String {
    format!("<b{}>", idx)
}

/// Edge with the strictly largest betweenness
///
/// Ties go to the first edge met scanning sources in ascending ID order and
/// each source's neighbours in ascending order.
pub fn max_edge_betweenness<N>(work: &AnnotatedGraph<N>) -> Option<(usize, usize)> {
    let mut best = None;
    let mut max = f64::NEG_INFINITY;
    for (u, v, &score) in work.edges() {
        if score > max {
            max = score;
            best = Some((u, v));
        }
    }
    best
}

/// Build the community tree of an undirected graph
///
/// Every connected component becomes a root. The edge with the highest
/// betweenness is removed repeatedly; whenever the community holding it
/// falls apart the two halves become children of that community's tree
/// node. Betweenness is refreshed only inside the affected community.
pub fn find_communities<N: Tag, E>(graph: &Graph<N, E>, options: CommunityOptions) -> CommunityResult {
    assert!(
        graph.is_undirected() && graph.check_undirected(),
        "community detection requires an undirected graph"
    );

    let n = graph.num_nodes();
    let total_edges = graph.num_edges();
    log::info!("Finding communities in graph with {} nodes and {} edges", n, total_edges);

    let mut work = betweenness::init_annotated(graph);
    let leaf_name = |work: &AnnotatedGraph<N>, k: usize| work.node_tag(k).tag.to_text();

    // One root per connected component, single nodes included
    let components = connected_components(graph, None);
    let mut tree: Graph<TreeTag, NullTag> = Graph::new(false);
    let mut roots = Vec::with_capacity(components.count);
    let mut regions = Vec::with_capacity(components.count);
    for (c, members) in components.groups().into_iter().enumerate() {
        let members: BTreeSet<usize> = members.into_iter().collect();
        let tree_node = tree.add_node(TreeTag::new(root_name(c), members.len()));
        roots.push(tree_node);
        regions.push(Region { members, tree_node });
    }
    log::info!("Graph has {} connected components", components.count);

    betweenness::compute_all(&mut work, false);

    let mut next_branch = 0;
    let mut num_splits = 0;
    let mut splits = Vec::new();
    while work.num_edges() > 0 {
        let Some((u, v)) = max_edge_betweenness(&work) else {
            break;
        };
        work.remove_edge(u, v);

        // Exactly one live region holds both endpoints
        let holders: Vec<usize> = regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.members.contains(&u))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(holders.len(), 1, "edge {}-{} is not inside exactly one community", u, v);
        let idx = holders[0];
        assert!(
            regions[idx].members.contains(&v),
            "edge {}-{} crosses two communities",
            u,
            v
        );
        let largest_region = regions.iter().map(|r| r.members.len()).max().unwrap_or(0);

        let parent = regions[idx].tree_node;
        tree.node_tag_mut(parent).edges_removed += 1;

        let mask = regions[idx].mask(n);
        let parts = connected_components(&work, Some(&mask));
        assert!(parts.count <= 2, "removing one edge split a community in {} parts", parts.count);

        if parts.count == 2 {
            num_splits += 1;
            let right: BTreeSet<usize> = parts.members(0).into_iter().collect();
            let left: BTreeSet<usize> = parts.members(1).into_iter().collect();

            let record = SplitRecord {
                edges_removed: total_edges - work.num_edges(),
                removed_fraction: 1.0 - work.num_edges() as f64 / total_edges as f64,
                region_size: regions[idx].members.len(),
                largest_region_fraction: largest_region as f64 / n as f64,
                right_size: right.len(),
                left_size: left.len(),
            };
            log::debug!(
                "Split community of {} into {} + {} after {} removed edges",
                record.region_size,
                record.right_size,
                record.left_size,
                record.edges_removed
            );
            if options.record_splits {
                splits.push(record);
            }

            let mut side = |members: BTreeSet<usize>| {
                let name = match (members.len(), members.iter().next()) {
                    (1, Some(&k)) => leaf_name(&work, k),
                    _ => {
                        next_branch += 1;
                        branch_name(next_branch - 1)
                    }
                };
                let tree_node = tree.add_node(TreeTag::new(name, members.len()));
                tree.add_edge(parent, tree_node, NullTag);
                Region { members, tree_node }
            };
            let right_region = side(right);
            let left_region = side(left);

            regions.swap_remove(idx);
            regions.push(right_region);
            regions.push(left_region);
        }

        betweenness::reset(&mut work, &mask);
        betweenness::compute(&mut work, &mask, false);
    }

    log::info!(
        "Community tree built with {} nodes ({} splits)",
        tree.num_nodes(),
        num_splits
    );

    CommunityResult {
        tree: CommunityTree::new(tree, roots),
        splits,
    }
}
