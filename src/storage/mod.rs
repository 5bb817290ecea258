//! Results persistence module

use anyhow::Result;
use itertools::Itertools;
use serde_json::{json, to_string_pretty};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::cluster::detection::CommunityResult;
use crate::cluster::hierarchical::Dendrogram;
use crate::cluster::metrics::GraphSummary;
use crate::cluster::tree;
use crate::graph::{AnnotatedGraph, Tag};

/// One `label score` output line of the betweenness tool
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLine {
    pub label: String,
    pub score: f64,
}

fn name_of<N: Tag>(res: &AnnotatedGraph<N>, k: usize) -> String {
    let text = res.node_tag(k).tag.to_text();
    if text.is_empty() {
        k.to_string()
    } else {
        text
    }
}

/// Node betweenness, one line per node in ID order
pub fn node_scores<N: Tag>(res: &AnnotatedGraph<N>) -> Vec<ScoreLine> {
    (0..res.num_nodes())
        .map(|k| ScoreLine {
            label: name_of(res, k),
            score: res.node_tag(k).centrality,
        })
        .collect()
}

/// Edge betweenness, one line per stored edge (`source target`)
pub fn edge_scores<N: Tag>(res: &AnnotatedGraph<N>) -> Vec<ScoreLine> {
    res.edges()
        .map(|(u, v, &score)| ScoreLine {
            label: format!("{} {}", name_of(res, u), name_of(res, v)),
            score,
        })
        .collect()
}

/// Order lines by score, ascending or (with `reverse`) descending
///
/// Lines with equal scores keep their relative order.
pub fn sort_scores(lines: Vec<ScoreLine>, reverse: bool) -> Vec<ScoreLine> {
    lines
        .into_iter()
        .sorted_by(|a, b| {
            let ord = a.score.total_cmp(&b.score);
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        })
        .collect()
}

pub fn write_scores<W: Write>(lines: &[ScoreLine], mut out: W) -> Result<()> {
    for line in lines {
        writeln!(out, "{} {}", line.label, line.score)?;
    }
    out.flush()?;
    Ok(())
}

/// Write one item per line
pub fn write_lines<W: Write, T: Display>(items: &[T], mut out: W) -> Result<()> {
    for item in items {
        writeln!(out, "{}", item)?;
    }
    out.flush()?;
    Ok(())
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(value)?.as_bytes())?;
    Ok(())
}

/// Save node and edge betweenness as JSON
pub fn save_betweenness<N: Tag>(res: &AnnotatedGraph<N>, normalized: bool, path: &Path) -> Result<()> {
    log::info!("Saving betweenness of {} nodes to {}", res.num_nodes(), path.display());

    let nodes = node_scores(res)
        .into_iter()
        .enumerate()
        .map(|(k, line)| {
            json!({
                "index": k,
                "name": line.label,
                "betweenness": line.score,
            })
        })
        .collect::<Vec<_>>();

    // Undirected mirrors carry the same score, so keep one per pair
    let edges = res
        .edges()
        .filter(|&(u, v, _)| !res.is_undirected() || u <= v)
        .map(|(u, v, &score)| {
            json!({
                "source": name_of(res, u),
                "target": name_of(res, v),
                "betweenness": score,
            })
        })
        .collect::<Vec<_>>();

    let value = json!({
        "undirected": res.is_undirected(),
        "normalized": normalized,
        "node_count": res.num_nodes(),
        "edge_count": res.num_edges(),
        "nodes": nodes,
        "edges": edges,
    });

    write_json(path, &value)
}

/// Save the community tree and any recorded splits as JSON
pub fn save_communities(result: &CommunityResult, path: &Path) -> Result<()> {
    let community = &result.tree;
    log::info!("Saving community tree with {} nodes to {}", community.num_nodes(), path.display());

    let nodes = (0..community.num_nodes())
        .map(|k| {
            let tag = community.tag(k);
            json!({
                "id": k,
                "name": tag.name,
                "size": tag.size,
                "edges_removed": tag.edges_removed,
                "children": community.children(k),
            })
        })
        .collect::<Vec<_>>();

    let value = json!({
        "roots": community.roots(),
        "order": tree::order(community),
        "nodes": nodes,
        "splits": result.splits,
    });

    write_json(path, &value)
}

/// Save dendrogram leaf order and merge sizes per root as JSON
pub fn save_dendrogram(dendrogram: &Dendrogram, names: &[String], path: &Path) -> Result<()> {
    log::info!(
        "Saving dendrogram with {} roots to {}",
        dendrogram.roots().len(),
        path.display()
    );

    let roots = dendrogram
        .roots()
        .iter()
        .map(|&r| {
            let order = dendrogram
                .extract_order(r)
                .into_iter()
                .map(|item| names.get(item).cloned().unwrap_or_else(|| item.to_string()))
                .collect::<Vec<_>>();
            json!({
                "size": dendrogram.size(r),
                "depth": dendrogram.depth(r),
                "order": order,
                "merge_sizes": dendrogram.extract_sizes(r),
            })
        })
        .collect::<Vec<_>>();

    let value = json!({
        "items": names.len(),
        "max_root_size": dendrogram.max_root_size(),
        "roots": roots,
    });

    write_json(path, &value)
}

pub fn save_summary(summary: &GraphSummary, path: &Path) -> Result<()> {
    log::info!("Saving graph statistics to {}", path.display());
    write_json(path, &serde_json::to_value(summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{betweenness, Graph, NullTag};

    fn path_graph() -> AnnotatedGraph<String> {
        let mut g: Graph<String, NullTag> = Graph::new(true);
        for name in ["a", "b", "c"] {
            g.add_node(name.to_string());
        }
        g.add_edge(0, 1, NullTag);
        g.add_edge(1, 2, NullTag);
        betweenness::betweenness(&g, false)
    }

    #[test]
    fn test_node_scores() {
        let res = path_graph();
        let lines = node_scores(&res);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].label, "b");
        assert_eq!(lines[1].score, 1.0);
    }

    #[test]
    fn test_sorted_edge_scores() {
        let res = path_graph();
        let lines = sort_scores(edge_scores(&res), true);
        assert_eq!(lines.len(), 4);
        assert!(lines.windows(2).all(|w| w[0].score >= w[1].score));

        let mut buf = Vec::new();
        write_scores(&lines[..1], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a b 2\n");
    }

    #[test]
    fn test_write_lines() {
        let mut buf = Vec::new();
        write_lines(&[3, 1, 2], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "3\n1\n2\n");
    }
}
