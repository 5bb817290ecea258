//! Community and hierarchical cluster analysis module

pub mod detection;
pub mod hierarchical;
pub mod metrics;
pub mod tree;

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NullTag, Tag};

/// Payload of a community-tree node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeTag {
    /// Original node tag for leaves, `<rK>` for roots, `<bK>` for branches
    pub name: String,

    /// Number of original nodes below this tree node
    pub size: usize,

    /// Edges removed from this community before it split
    pub edges_removed: usize,
}

impl TreeTag {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self { name: name.into(), size, edges_removed: 0 }
    }
}

/// Text form is `size edges_removed name`
impl Tag for TreeTag {
    fn to_text(&self) -> String {
        format!("{} {} {}", self.size, self.edges_removed, self.name)
    }

    fn from_text(text: &str) -> Option<Self> {
        let mut parts = text.trim().splitn(3, char::is_whitespace);
        let size = parts.next()?.parse().ok()?;
        let edges_removed = parts.next()?.parse().ok()?;
        let name = parts.next()?.trim().to_string();
        Some(Self { name, size, edges_removed })
    }
}

/// Binary community tree produced by Girvan-Newman
///
/// Stored as a directed graph: an edge parent -> child per split. Leaves
/// have no outgoing edges; roots have no incoming edges and stand for one
/// connected component of the analysed graph. Children of a split are
/// enumerated right first, then left.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityTree {
    graph: Graph<TreeTag, NullTag>,
    roots: Vec<usize>,
}

impl CommunityTree {
    pub(crate) fn new(graph: Graph<TreeTag, NullTag>, roots: Vec<usize>) -> Self {
        Self { graph, roots }
    }

    /// Wrap a tree read from elsewhere; roots are the nodes nobody points to
    ///
    /// An edgeless graph is accepted in either mode, since the readers mark
    /// it undirected.
    pub fn from_graph(graph: Graph<TreeTag, NullTag>) -> Self {
        assert!(
            !graph.is_undirected() || graph.num_edges() == 0,
            "community trees are directed graphs"
        );
        let roots = (0..graph.num_nodes()).filter(|&k| graph.indegree(k) == 0).collect();
        Self { graph, roots }
    }

    pub fn graph(&self) -> &Graph<TreeTag, NullTag> {
        &self.graph
    }

    pub fn into_graph(self) -> Graph<TreeTag, NullTag> {
        self.graph
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    pub fn tag(&self, node: usize) -> &TreeTag {
        self.graph.node_tag(node)
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.graph.outdegree(node) == 0
    }

    /// Children in enumeration order (right, then left for a split)
    pub fn children(&self, node: usize) -> Vec<usize> {
        self.graph.neighbours(node).map(|(child, _)| child).collect()
    }

    /// Total number of original nodes covered by the roots
    pub fn total_size(&self) -> usize {
        self.roots.iter().map(|&r| self.tag(r).size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_tag_text_form() {
        let mut tag = TreeTag::new("<b3>", 7);
        tag.edges_removed = 2;
        assert_eq!(tag.to_text(), "7 2 <b3>");
        assert_eq!(TreeTag::from_text("7 2 <b3>"), Some(tag));
        assert_eq!(TreeTag::from_text("seven 2 x"), None);
    }

    #[test]
    fn test_from_graph_finds_roots() {
        let mut g: Graph<TreeTag, NullTag> = Graph::new(false);
        let root = g.add_node(TreeTag::new("<r0>", 2));
        let a = g.add_node(TreeTag::new("a", 1));
        let b = g.add_node(TreeTag::new("b", 1));
        let lone = g.add_node(TreeTag::new("c", 1));
        g.add_edge(root, a, NullTag);
        g.add_edge(root, b, NullTag);

        let tree = CommunityTree::from_graph(g);
        assert_eq!(tree.roots(), &[root, lone]);
        assert_eq!(tree.children(root), vec![a, b]);
        assert!(tree.is_leaf(a));
        assert_eq!(tree.total_size(), 3);
    }
}
