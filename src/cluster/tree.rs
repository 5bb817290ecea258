//! Community-tree analysis: leaf order, level collapsing, names, modularity

use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::cluster::CommunityTree;
use crate::graph::{Graph, NullTag, Tag};

/// Parse a generated tree name such as `<r12>` (kind `'r'`) or `<b3>` (kind `'b'`)
pub fn parse_tree_name(name: &str, kind: char) -> Option<usize> {
    let inner = name.strip_prefix('<')?.strip_suffix('>')?;
    let rest = inner.strip_prefix(kind)?;
    rest.parse().ok()
}

pub fn is_root_name(name: &str) -> bool {
    parse_tree_name(name, 'r').is_some()
}

pub fn is_branch_name(name: &str) -> bool {
    parse_tree_name(name, 'b').is_some()
}

/// Leaf names below `root` in depth-first order
///
/// Children are scanned in enumeration order; leaves are emitted as they are
/// met and internal children are deferred onto a stack.
pub fn leaf_order(tree: &CommunityTree, root: usize) -> Vec<String> {
    if tree.is_leaf(root) {
        return vec![tree.tag(root).name.clone()];
    }

    let mut order = Vec::with_capacity(tree.tag(root).size);
    let mut stack = vec![root];
    while let Some(curr) = stack.pop() {
        for child in tree.children(curr) {
            if tree.is_leaf(child) {
                order.push(tree.tag(child).name.clone());
            } else {
                stack.push(child);
            }
        }
    }
    order
}

/// Leaf order of every root, concatenated in root order
pub fn order(tree: &CommunityTree) -> Vec<String> {
    tree.roots().iter().flat_map(|&r| leaf_order(tree, r)).collect()
}

/// Size of every tree node, by node ID
pub fn sizes(tree: &CommunityTree) -> Vec<usize> {
    (0..tree.num_nodes()).map(|k| tree.tag(k).size).collect()
}

/// Level of every tree node
///
/// Leaves are level 1. A split whose two children share a level sits one
/// above them; otherwise it inherits the larger child level.
///
/// Panics if an internal node does not have exactly two children.
pub fn levels(tree: &CommunityTree) -> Vec<usize> {
    let n = tree.num_nodes();
    let mut level = vec![0usize; n];

    // Post-order over every root
    for &root in tree.roots() {
        let mut stack = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            let children = tree.children(node);
            if children.is_empty() {
                level[node] = 1;
                continue;
            }
            assert_eq!(
                children.len(),
                2,
                "tree node {} has {} children, expected 2",
                node,
                children.len()
            );
            if expanded {
                let (right, left) = (level[children[0]], level[children[1]]);
                level[node] = if right == left { right + 1 } else { right.max(left) };
            } else {
                stack.push((node, true));
                stack.extend(children.into_iter().map(|c| (c, false)));
            }
        }
    }

    level
}

/// Collapse every split into its parent when both sit on the same level
///
/// The grandchildren are re-attached to the parent, so nodes may end up
/// with more than two children. Detached nodes are dropped and the rest
/// renumbered densely; roots are kept even when they have no children.
pub fn clean(tree: &CommunityTree) -> CommunityTree {
    let level = levels(tree);
    let mut graph = tree.graph().clone();

    let mut stack: Vec<usize> = tree.roots().to_vec();
    while let Some(curr) = stack.pop() {
        if graph.outdegree(curr) == 0 {
            continue;
        }
        let children: Vec<usize> = graph.neighbours(curr).map(|(c, _)| c).collect();
        let Some(&collapse) = children.iter().rev().find(|&&c| level[c] == level[curr]) else {
            stack.extend(children);
            continue;
        };

        let grandchildren: Vec<usize> = graph.neighbours(collapse).map(|(c, _)| c).collect();
        assert_eq!(
            grandchildren.len(),
            2,
            "collapsed tree node {} has {} children, expected 2",
            collapse,
            grandchildren.len()
        );
        for &g in &grandchildren {
            graph.remove_edge(collapse, g);
            graph.add_edge(curr, g, NullTag);
        }
        graph.remove_edge(curr, collapse);
        stack.push(curr);
    }

    let roots = tree.roots();
    let mask: Vec<bool> = (0..graph.num_nodes())
        .map(|k| graph.degree(k) > 0 || roots.contains(&k))
        .collect();

    // Roots keep their relative order under the dense renumbering
    let mut new_roots = Vec::with_capacity(roots.len());
    let mut next = 0;
    for (k, &keep) in mask.iter().enumerate() {
        if keep {
            if roots.contains(&k) {
                new_roots.push(next);
            }
            next += 1;
        }
    }

    log::debug!(
        "Cleaned community tree from {} to {} nodes",
        graph.num_nodes(),
        next
    );

    CommunityTree::new(graph.subgraph(&mask), new_roots)
}

/// Newman modularity of `modules`, relative to the expected modularity of a
/// random graph with the same size and edge count
///
/// Only edges whose target belongs to some module are counted, once per
/// stored direction. The random baseline (Guimera et al.) is
/// `(1 - 2/sqrt(SZ)) * ((SZ - 1) / L)^(2/3)` with `SZ` nodes in all modules
/// and `L` counted edges. `None` when no edge is counted or the baseline is
/// not positive, which is the case for four nodes or fewer.
pub fn modularity_measure<N, E>(graph: &Graph<N, E>, modules: &[BTreeSet<usize>]) -> Option<f64> {
    let mut module_of = vec![None; graph.num_nodes()];
    for (m, module) in modules.iter().enumerate() {
        for &k in module {
            module_of[k] = Some(m);
        }
    }

    let mut inside = vec![0.0; modules.len()];
    let mut ends = vec![0.0; modules.len()];
    let mut total = 0usize;
    for (m, module) in modules.iter().enumerate() {
        for &i in module {
            for (j, _) in graph.neighbours(i) {
                if let Some(mj) = module_of[j] {
                    if mj == m {
                        inside[m] += 1.0;
                    }
                    ends[m] += 1.0;
                    total += 1;
                }
            }
        }
    }
    if total == 0 {
        return None;
    }

    let total = total as f64;
    let modularity: f64 = inside
        .iter()
        .zip(&ends)
        .map(|(e, a)| e / total - (a / total).powi(2))
        .sum();

    let size = modules.iter().map(|m| m.len()).sum::<usize>() as f64;
    let random = (1.0 - 2.0 / size.sqrt()) * ((size - 1.0) / total).powf(2.0 / 3.0);
    (random > 0.0).then(|| modularity / random)
}

/// Modularity score of one internal community-tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleScore {
    pub tree_node: usize,
    pub name: String,

    /// Size of the tree node over the size of all roots together
    pub size_fraction: f64,

    /// [`modularity_measure`] of the node's children
    pub modularity: f64,
}

/// Score every internal tree node by the modularity of its children
///
/// Each child is a module holding the graph nodes of the leaves below it;
/// leaves are matched to graph nodes by tag text. Nodes whose children are
/// all leaves, or that cover four graph nodes or fewer, are skipped, as are
/// nodes whose measure is undefined.
pub fn module_scores<N: Tag, E>(tree: &CommunityTree, graph: &Graph<N, E>) -> Result<Vec<ModuleScore>> {
    let index: HashMap<String, usize> = (0..graph.num_nodes())
        .map(|k| (graph.node_tag(k).to_text(), k))
        .collect();
    let total_size = tree.total_size().max(1) as f64;

    let mut scores = Vec::new();
    for node in 0..tree.num_nodes() {
        let children = tree.children(node);
        if children.iter().all(|&c| tree.is_leaf(c)) {
            continue;
        }

        let mut modules = Vec::with_capacity(children.len());
        for child in children {
            let module = leaf_order(tree, child)
                .into_iter()
                .map(|name| {
                    index
                        .get(&name)
                        .copied()
                        .ok_or_else(|| anyhow!("tree leaf '{}' is not a node of the graph", name))
                })
                .collect::<Result<BTreeSet<usize>>>()?;
            modules.push(module);
        }
        if modules.iter().map(|m| m.len()).sum::<usize>() <= 4 {
            continue;
        }

        let tag = tree.tag(node);
        match modularity_measure(graph, &modules) {
            Some(modularity) => scores.push(ModuleScore {
                tree_node: node,
                name: tag.name.clone(),
                size_fraction: tag.size as f64 / total_size,
                modularity,
            }),
            None => log::debug!("No modularity for tree node {} ({})", node, tag.name),
        }
    }

    log::info!("Scored {} of {} tree nodes", scores.len(), tree.num_nodes());
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::TreeTag;
    use crate::graph::Graph;

    /// ((a b) c) under root r
    fn lopsided() -> CommunityTree {
        let mut g: Graph<TreeTag, NullTag> = Graph::new(false);
        let r = g.add_node(TreeTag::new("<r0>", 3));
        let b0 = g.add_node(TreeTag::new("<b0>", 2));
        let c = g.add_node(TreeTag::new("c", 1));
        let a = g.add_node(TreeTag::new("a", 1));
        let b = g.add_node(TreeTag::new("b", 1));
        g.add_edge(r, b0, NullTag);
        g.add_edge(r, c, NullTag);
        g.add_edge(b0, a, NullTag);
        g.add_edge(b0, b, NullTag);
        CommunityTree::from_graph(g)
    }

    #[test]
    fn test_tree_names() {
        assert_eq!(parse_tree_name("<r12>", 'r'), Some(12));
        assert!(is_branch_name("<b0>"));
        assert!(!is_root_name("<b0>"));
        assert!(!is_root_name("r1"));
        assert!(!is_root_name("<rx>"));
    }

    #[test]
    fn test_leaf_order_emits_leaves_before_deferred_branches() {
        let tree = lopsided();
        assert_eq!(leaf_order(&tree, 0), vec!["c", "a", "b"]);
        assert_eq!(order(&tree), vec!["c", "a", "b"]);
        assert_eq!(sizes(&tree), vec![3, 2, 1, 1, 1]);
    }

    #[test]
    fn test_levels() {
        let tree = lopsided();
        assert_eq!(levels(&tree), vec![2, 2, 1, 1, 1]);
    }

    #[test]
    fn test_clean_collapses_equal_levels() {
        let tree = lopsided();
        let clean = clean(&tree);
        // <b0> is folded into the root, which now holds c, a, b directly
        assert_eq!(clean.num_nodes(), 4);
        assert_eq!(clean.roots(), &[0]);
        let kids = clean.children(0);
        assert_eq!(kids.len(), 3);
        let mut names: Vec<String> = kids.iter().map(|&k| clean.tag(k).name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clean_keeps_balanced_tree() {
        // ((a b) (c d))
        let mut g: Graph<TreeTag, NullTag> = Graph::new(false);
        let r = g.add_node(TreeTag::new("<r0>", 4));
        let l = g.add_node(TreeTag::new("<b0>", 2));
        let rr = g.add_node(TreeTag::new("<b1>", 2));
        let leaves: Vec<usize> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| g.add_node(TreeTag::new(*n, 1)))
            .collect();
        g.add_edge(r, l, NullTag);
        g.add_edge(r, rr, NullTag);
        g.add_edge(l, leaves[0], NullTag);
        g.add_edge(l, leaves[1], NullTag);
        g.add_edge(rr, leaves[2], NullTag);
        g.add_edge(rr, leaves[3], NullTag);
        let tree = CommunityTree::from_graph(g);

        assert_eq!(levels(&tree)[r], 3);
        let clean = clean(&tree);
        assert_eq!(clean, tree);
    }

    #[test]
    fn test_modularity_of_two_joined_triangles() {
        let mut g: Graph = Graph::undirected(6);
        for (u, v) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
            g.add_edge(u, v, NullTag);
        }
        let halves: Vec<BTreeSet<usize>> = vec![[0, 1, 2].into(), [3, 4, 5].into()];

        // 14 directed edge ends, 6 of them inside each half
        let q = 2.0 * (6.0 / 14.0 - 0.25);
        let random = (1.0 - 2.0 / 6f64.sqrt()) * (5.0f64 / 14.0).powf(2.0 / 3.0);
        let measure = modularity_measure(&g, &halves).unwrap();
        assert!((measure - q / random).abs() < 1e-12);

        let small: Vec<BTreeSet<usize>> = vec![[0, 1].into(), [2, 3].into()];
        assert_eq!(modularity_measure(&g, &small), None);
        let edgeless: Graph = Graph::undirected(6);
        assert_eq!(modularity_measure(&edgeless, &halves), None);
    }

    #[test]
    fn test_module_scores_rejects_unknown_leaves() {
        let tree = lopsided();
        let mut g: Graph<String, NullTag> = Graph::new(true);
        g.add_node("a".to_string());
        assert!(module_scores(&tree, &g).is_err());
    }

    #[test]
    #[should_panic(expected = "expected 2")]
    fn test_malformed_tree_is_fatal() {
        let mut g: Graph<TreeTag, NullTag> = Graph::new(false);
        let r = g.add_node(TreeTag::new("<r0>", 1));
        let a = g.add_node(TreeTag::new("a", 1));
        g.add_edge(r, a, NullTag);
        levels(&CommunityTree::from_graph(g));
    }
}
