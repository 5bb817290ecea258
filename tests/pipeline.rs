use std::collections::BTreeSet;
use std::io::Cursor;

use graph_community_analyzer::cluster::detection::{find_communities, CommunityOptions};
use graph_community_analyzer::cluster::hierarchical::hierarchical_clustering;
use graph_community_analyzer::cluster::{metrics, tree, CommunityTree, TreeTag};
use graph_community_analyzer::data::formats::{read_graph, read_ladj, write_edgl, write_ladj, GraphFormat};
use graph_community_analyzer::data::FormatError;
use graph_community_analyzer::data::similarity::read_similarity;
use graph_community_analyzer::graph::{betweenness, traversal, Graph, NullTag};

const EPS: f64 = 1e-9;

/// Two triangles joined by the bridge c-d, as an undirected edge list
const BRIDGED_TRIANGLES: &str = "\
a b
b a
b c
c b
a c
c a
c d
d c
d e
e d
e f
f e
d f
f d
";

fn bridged() -> Graph<String, NullTag> {
    let (format, graph) = read_graph(Cursor::new(BRIDGED_TRIANGLES)).unwrap();
    assert_eq!(format, GraphFormat::EdgeList);
    graph
}

fn leaves(tree: &CommunityTree, node: usize) -> BTreeSet<String> {
    tree::leaf_order(tree, node).into_iter().collect()
}

#[test]
fn test_bridge_splits_graph_into_triangles() {
    let graph = bridged();
    assert!(graph.is_undirected());
    assert_eq!(graph.num_edges(), 7);

    let res = betweenness::betweenness(&graph, false);
    // c and d each carry the 3 x 3 cross pairs plus their own side pairs
    assert!((res.node_tag(2).centrality - 6.0).abs() < EPS);
    assert!((res.node_tag(0).centrality).abs() < EPS);
    assert!((res.edge_tag(2, 3).copied().unwrap_or(0.0) - 9.0).abs() < EPS);

    let result = find_communities(&graph, CommunityOptions { record_splits: true });
    let community = &result.tree;
    let root = community.roots()[0];
    let children = community.children(root);
    assert_eq!(children.len(), 2);

    let expected: [BTreeSet<String>; 2] = [
        ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
        ["d", "e", "f"].iter().map(|s| s.to_string()).collect(),
    ];
    assert_eq!(leaves(community, children[0]), expected[0]);
    assert_eq!(leaves(community, children[1]), expected[1]);
    assert_eq!(tree::order(community).len(), 6);
    assert!(!result.splits.is_empty());
}

#[test]
fn test_community_tree_survives_adjacency_list() {
    let result = find_communities(&bridged(), CommunityOptions::default());

    let mut buf = Vec::new();
    write_ladj(result.tree.graph(), &mut buf).unwrap();
    let back: Graph<TreeTag, NullTag> = read_ladj(Cursor::new(buf)).unwrap();
    let back = CommunityTree::from_graph(back);

    assert_eq!(back.roots(), result.tree.roots());
    assert_eq!(tree::order(&back), tree::order(&result.tree));
    assert!(tree::is_root_name(&back.tag(back.roots()[0]).name));

    let clean = tree::clean(&back);
    assert_eq!(clean.total_size(), 6);
    assert_eq!(leaves(&clean, clean.roots()[0]).len(), 6);
}

#[test]
fn test_community_tree_with_lone_node_needs_adjacency_list() {
    let mut graph: Graph<String, NullTag> = Graph::new(true);
    for name in ["a", "b", "c", "lone"] {
        graph.add_node(name.to_string());
    }
    graph.add_edge(0, 1, NullTag);
    graph.add_edge(1, 2, NullTag);
    let result = find_communities(&graph, CommunityOptions::default());
    assert_eq!(result.tree.roots().len(), 2);

    // tree labels hold spaces and the lone root has no edge to sit on
    let mut buf = Vec::new();
    let err = write_edgl(result.tree.graph(), &mut buf).unwrap_err();
    assert!(matches!(err, FormatError::Unwritable { format: "edgl", .. }));
    assert!(buf.is_empty());

    write_ladj(result.tree.graph(), &mut buf).unwrap();
    let back: Graph<TreeTag, NullTag> = read_ladj(Cursor::new(buf)).unwrap();
    let back = CommunityTree::from_graph(back);
    assert_eq!(back.roots(), result.tree.roots());
    assert_eq!(back.total_size(), 4);
    assert_eq!(tree::order(&back), tree::order(&result.tree));
}

#[test]
fn test_modularity_scores_the_bridge_split() {
    let graph = bridged();
    let result = find_communities(&graph, CommunityOptions::default());

    let scores = tree::module_scores(&result.tree, &graph).unwrap();
    assert_eq!(scores.len(), 1);
    let top = &scores[0];
    assert_eq!(top.name, "<r0>");
    assert_eq!(top.tree_node, result.tree.roots()[0]);
    assert!((top.size_fraction - 1.0).abs() < EPS);

    let q = 2.0 * (6.0 / 14.0 - 0.25);
    let random = (1.0 - 2.0 / 6f64.sqrt()) * (5.0f64 / 14.0).powf(2.0 / 3.0);
    assert!((top.modularity - q / random).abs() < EPS);
}

#[test]
fn test_star_centre_counts_every_leaf_pair() {
    let k = 6;
    let mut star: Graph = Graph::undirected(k + 1);
    for leaf in 1..=k {
        star.add_edge(0, leaf, NullTag);
    }
    let res = betweenness::betweenness(&star, false);
    assert!((res.node_tag(0).centrality - (k * (k - 1) / 2) as f64).abs() < EPS);
    for leaf in 1..=k {
        assert!(res.node_tag(leaf).centrality.abs() < EPS);
    }
}

#[test]
fn test_restricted_recompute_matches_full_on_a_component() {
    // path 0-1-2-3 plus a separate triangle 4-5-6
    let mut g: Graph = Graph::undirected(7);
    for (u, v) in [(0, 1), (1, 2), (2, 3), (4, 5), (5, 6), (4, 6)] {
        g.add_edge(u, v, NullTag);
    }
    let full = betweenness::betweenness(&g, false);

    let mut partial = betweenness::init_annotated(&g);
    let component: Vec<bool> = (0..7).map(|k| k < 4).collect();
    betweenness::reset(&mut partial, &component);
    betweenness::compute(&mut partial, &component, false);

    for k in 0..4 {
        assert!((partial.node_tag(k).centrality - full.node_tag(k).centrality).abs() < EPS);
        for (v, score) in partial.neighbours(k) {
            let expected = full.edge_tag(k, v).copied().unwrap_or(f64::NAN);
            assert!((score - expected).abs() < EPS);
        }
    }
}

#[test]
fn test_to_undirected_is_idempotent_and_subgraph_preserves_structure() {
    let mut g: Graph<String, NullTag> = Graph::new(false);
    for name in ["p", "q", "r"] {
        g.add_node(name.to_string());
    }
    g.add_edge(0, 1, NullTag);
    g.add_edge(2, 1, NullTag);

    g.to_undirected();
    assert!(g.check_undirected());
    let once = g.clone();
    g.to_undirected();
    assert_eq!(g, once);

    for k in 0..3 {
        assert_eq!(g.degree(k), g.indegree(k));
    }

    let copy = g.subgraph(&[true, true, true]);
    assert_eq!(copy, g);

    let largest = traversal::extract_component(&g, 0).unwrap();
    assert_eq!(largest.num_nodes(), 3);
}

#[test]
fn test_overlap_feeds_hierarchical_clustering() {
    let graph = bridged();
    let overlap = metrics::topological_overlap(&graph);
    let dendrogram = hierarchical_clustering(&overlap);

    assert_eq!(dendrogram.roots().len(), 1);
    let root = dendrogram.roots()[0];
    assert_eq!(dendrogram.size(root), 6);

    let order = dendrogram.extract_order(root);
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..6).collect::<Vec<_>>());
    assert_eq!(dendrogram.extract_sizes(root)[0], 6);
}

#[test]
fn test_similarity_file_clustering() {
    let input = "\
x y 0.9
y z 0.1
u v 0.8
";
    let similarity = read_similarity(Cursor::new(input)).unwrap();
    let dendrogram = hierarchical_clustering(&similarity.matrix);

    // x, y and z end together; u and v form a separate root
    let sizes: Vec<usize> = dendrogram.roots().iter().map(|&r| dendrogram.size(r)).collect();
    assert_eq!(sizes, vec![3, 2]);

    let first_merge = dendrogram.branch(5);
    assert_eq!(first_merge.size, 2);
    let names: Vec<&str> = dendrogram
        .order()
        .into_iter()
        .map(|k| similarity.names[k].as_str())
        .collect();
    assert_eq!(names.len(), 5);
}
