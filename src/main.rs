use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use graph_community_analyzer::cluster::{detection, hierarchical, metrics, tree, CommunityTree, TreeTag};
use graph_community_analyzer::config::Config;
use graph_community_analyzer::data::formats::{node_label, read_graph_from_path, write_graph_to_path};
use graph_community_analyzer::data::similarity::{self, NamedSimilarity};
use graph_community_analyzer::graph::{betweenness, traversal, Graph, NullTag};
use graph_community_analyzer::storage;

/// Graphs as read from disk: node names and raw edge labels
type NamedGraph = Graph<String, String>;

#[derive(Parser, Debug)]
#[clap(
    name = "graph-community-analyzer",
    about = "Betweenness, community structure and hierarchical clustering of networks"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0", global = true)]
    threads: usize,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edge (or node) betweenness centrality
    Btwns {
        input: PathBuf,
        output: PathBuf,

        /// Normalize by 1/(N(N-1))
        #[clap(long, short = 'm')]
        normalize: bool,

        /// Report node betweenness instead of edge betweenness
        #[clap(long, short = 'n')]
        node: bool,

        /// Sort output by score
        #[clap(long, short)]
        sort: bool,

        /// Sort descending
        #[clap(long, short)]
        reverse: bool,

        /// Also save the scores as JSON
        #[clap(long)]
        json: Option<PathBuf>,
    },

    /// Girvan-Newman community tree, written as a graph file
    Community {
        input: PathBuf,
        output: PathBuf,

        /// Record every split (removed edges, sizes)
        #[clap(long, short = 't')]
        record_splits: bool,

        /// Also save the tree and splits as JSON
        #[clap(long)]
        json: Option<PathBuf>,
    },

    /// Analyse a community tree produced by `community`
    Treeanlz {
        #[clap(value_enum)]
        command: TreeCommand,
        input: PathBuf,
        output: PathBuf,
    },

    /// Agglomerative clustering of a `name1 name2 value` similarity file
    Hierclust {
        #[clap(value_enum)]
        command: DendroCommand,
        input: PathBuf,
        output: PathBuf,

        /// Width factor for the drawing depth
        #[clap(long, short = 'd', default_value = "0.3")]
        dendro_width_factor: f64,

        /// Also save the dendrogram as JSON
        #[clap(long)]
        json: Option<PathBuf>,
    },

    /// Transform a graph and write the result
    Manip {
        #[clap(value_enum)]
        command: ManipCommand,
        input: PathBuf,
        output: PathBuf,

        /// Component rank (1 = largest) or space-separated node names
        #[clap(long, short, default_value = "")]
        parameter: String,
    },

    /// Modularity of every split of a community tree over its graph
    Modmeas {
        graph: PathBuf,
        tree: PathBuf,
        output: PathBuf,
    },

    /// Topological overlap of an undirected graph as a similarity file
    Topovrlp { input: PathBuf, output: PathBuf },

    /// Re-encode a graph in the format named by the output extension
    Convert { input: PathBuf, output: PathBuf },

    /// Descriptive statistics
    Stats {
        input: PathBuf,

        /// Save the statistics as JSON
        #[clap(long)]
        json: Option<PathBuf>,

        /// Write degree, indegree, outdegree, local efficiency, clustering
        /// and percolation of every node to this file
        #[clap(long)]
        per_node: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TreeCommand {
    /// Leaf names in drawing order
    Order,
    /// The tree with equal-level splits collapsed
    Tree,
    /// Size of every tree node
    Sizes,
    /// Level of every tree node
    Levels,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DendroCommand {
    /// Item names in drawing order
    Order,
    /// Merge sizes of every root, breadth first
    Sizes,
    /// Size, depth and drawing depth of every root
    Depth,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ManipCommand {
    /// Extract the component of rank <parameter>
    Comp,
    /// Keep the nodes named in <parameter>
    Subgraph,
    /// Remove the nodes named in <parameter>
    Remove,
    /// Mirror every edge
    Undirected,
    /// Reverse every edge
    Transpose,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn run_btwns(
    config: &Config,
    input: &Path,
    output: &Path,
    node: bool,
    sort: bool,
    reverse: bool,
    json: Option<&Path>,
) -> Result<()> {
    let graph: NamedGraph = read_graph_from_path(input)?;
    let res = betweenness::betweenness(&graph, config.normalize);

    let lines = if node {
        storage::node_scores(&res)
    } else {
        storage::edge_scores(&res)
    };
    let lines = if sort { storage::sort_scores(lines, reverse) } else { lines };
    storage::write_scores(&lines, create(output)?)?;

    if let Some(path) = json {
        storage::save_betweenness(&res, config.normalize, path)?;
    }
    Ok(())
}

fn run_community(config: &Config, input: &Path, output: &Path, json: Option<&Path>) -> Result<()> {
    let mut graph: NamedGraph = read_graph_from_path(input)?;
    if !graph.is_undirected() {
        log::warn!("Making graph undirected");
        graph.to_undirected();
    }

    let result = detection::find_communities(&graph, config.community_options());
    write_graph_to_path(result.tree.graph(), output)?;

    if let Some(path) = json {
        storage::save_communities(&result, path)?;
    }
    Ok(())
}

fn run_treeanlz(command: TreeCommand, input: &Path, output: &Path) -> Result<()> {
    let graph: Graph<TreeTag, NullTag> = read_graph_from_path(input)?;
    let community = CommunityTree::from_graph(graph);
    let unnamed = community
        .roots()
        .iter()
        .filter(|&&r| !community.is_leaf(r) && !tree::is_root_name(&community.tag(r).name))
        .count();
    if unnamed > 0 {
        log::warn!("{} tree roots do not carry a root name", unnamed);
    }

    match command {
        TreeCommand::Order => storage::write_lines(&tree::order(&community), create(output)?),
        TreeCommand::Tree => {
            write_graph_to_path(tree::clean(&community).graph(), output)?;
            Ok(())
        }
        TreeCommand::Sizes => storage::write_lines(&tree::sizes(&community), create(output)?),
        TreeCommand::Levels => storage::write_lines(&tree::levels(&community), create(output)?),
    }
}

fn run_hierclust(
    config: &Config,
    command: DendroCommand,
    input: &Path,
    output: &Path,
    json: Option<&Path>,
) -> Result<()> {
    let NamedSimilarity { matrix, names } = similarity::read_similarity(BufReader::new(File::open(input)?))?;
    let dendrogram = hierarchical::hierarchical_clustering(&matrix);
    log::info!(
        "Dendrogram has {} roots, largest holds {} items",
        dendrogram.roots().len(),
        dendrogram.max_root_size()
    );

    match command {
        DendroCommand::Order => {
            let order: Vec<&str> = dendrogram.order().into_iter().map(|k| names[k].as_str()).collect();
            storage::write_lines(&order, create(output)?)?;
        }
        DendroCommand::Sizes => {
            let lines: Vec<String> = dendrogram
                .roots()
                .iter()
                .map(|&r| {
                    dendrogram
                        .extract_sizes(r)
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            storage::write_lines(&lines, create(output)?)?;
        }
        DendroCommand::Depth => {
            let lines: Vec<String> = dendrogram
                .roots()
                .iter()
                .map(|&r| {
                    format!(
                        "{} {} {}",
                        dendrogram.size(r),
                        dendrogram.depth(r),
                        dendrogram.graphical_depth(r, config.dendrogram_width_factor)
                    )
                })
                .collect();
            storage::write_lines(&lines, create(output)?)?;
        }
    }

    if let Some(path) = json {
        storage::save_dendrogram(&dendrogram, &names, path)?;
    }
    Ok(())
}

fn mask_of_names(graph: &NamedGraph, parameter: &str, keep: bool) -> Vec<bool> {
    let mut mask = vec![!keep; graph.num_nodes()];
    for name in parameter.split_whitespace() {
        let found = graph.indices_with_tag(&name.to_string());
        if found.is_empty() {
            log::warn!("No node named '{}'", name);
        }
        for k in found {
            mask[k] = keep;
        }
    }
    mask
}

fn run_manip(command: ManipCommand, input: &Path, output: &Path, parameter: &str) -> Result<()> {
    let mut graph: NamedGraph = read_graph_from_path(input)?;

    let graph = match command {
        ManipCommand::Comp => {
            let rank = if parameter.is_empty() {
                1
            } else {
                parameter.trim().parse::<usize>().unwrap_or_else(|_| {
                    log::warn!("Didn't understand '{}', assuming first component", parameter);
                    1
                })
            };
            let count = traversal::component_sizes(&graph).len();
            traversal::extract_component(&graph, rank.saturating_sub(1))
                .ok_or_else(|| anyhow!("The graph has only {} components", count))?
        }
        ManipCommand::Subgraph => graph.subgraph(&mask_of_names(&graph, parameter, true)),
        ManipCommand::Remove => graph.subgraph(&mask_of_names(&graph, parameter, false)),
        ManipCommand::Undirected => {
            graph.to_undirected();
            graph
        }
        ManipCommand::Transpose => {
            graph.transpose();
            graph
        }
    };

    log::info!("Result has {} nodes and {} edges", graph.num_nodes(), graph.num_edges());
    write_graph_to_path(&graph, output)?;
    Ok(())
}

fn run_modmeas(graph: &Path, tree_file: &Path, output: &Path) -> Result<()> {
    let community = CommunityTree::from_graph(read_graph_from_path(tree_file)?);
    let graph: NamedGraph = read_graph_from_path(graph)?;

    let lines: Vec<String> = tree::module_scores(&community, &graph)?
        .into_iter()
        .map(|score| format!("{} {} {}", score.name, score.size_fraction, score.modularity))
        .collect();
    storage::write_lines(&lines, create(output)?)
}

fn run_convert(input: &Path, output: &Path) -> Result<()> {
    let graph: NamedGraph = read_graph_from_path(input)?;
    write_graph_to_path(&graph, output)?;
    Ok(())
}

fn run_topovrlp(input: &Path, output: &Path) -> Result<()> {
    let mut graph: NamedGraph = read_graph_from_path(input)?;
    graph.to_undirected();

    let overlap = NamedSimilarity {
        matrix: metrics::topological_overlap(&graph),
        names: (0..graph.num_nodes()).map(|k| node_label(&graph, k)).collect(),
    };
    similarity::write_similarity(&overlap, create(output)?)?;
    Ok(())
}

fn run_stats(input: &Path, json: Option<&Path>, per_node: Option<&Path>) -> Result<()> {
    let graph: NamedGraph = read_graph_from_path(input)?;
    let summary = metrics::GraphSummary::compute(&graph);

    log::info!(
        "{} nodes, {} edges, {} components (largest {})",
        summary.num_nodes,
        summary.num_edges,
        summary.num_components,
        summary.largest_component
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = json {
        storage::save_summary(&summary, path)?;
    }

    if let Some(path) = per_node {
        let lines: Vec<String> = metrics::node_statistics(&graph)
            .into_iter()
            .map(|row| {
                format!(
                    "{} {} {} {} {} {} {} {}",
                    row.index,
                    node_label(&graph, row.index),
                    row.degree,
                    row.indegree,
                    row.outdegree,
                    row.local_efficiency,
                    row.clustering,
                    row.percolation
                )
            })
            .collect();
        storage::write_lines(&lines, create(path)?)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let mut config = Config {
        threads: args.threads,
        ..Config::default()
    };

    let num_threads = config.num_threads();
    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    match args.command {
        Command::Btwns { input, output, normalize, node, sort, reverse, json } => {
            config.normalize = normalize;
            run_btwns(&config, &input, &output, node, sort, reverse, json.as_deref())
        }
        Command::Community { input, output, record_splits, json } => {
            config.record_splits = record_splits;
            run_community(&config, &input, &output, json.as_deref())
        }
        Command::Treeanlz { command, input, output } => run_treeanlz(command, &input, &output),
        Command::Hierclust { command, input, output, dendro_width_factor, json } => {
            config.dendrogram_width_factor = dendro_width_factor;
            run_hierclust(&config, command, &input, &output, json.as_deref())
        }
        Command::Manip { command, input, output, parameter } => run_manip(command, &input, &output, &parameter),
        Command::Modmeas { graph, tree, output } => run_modmeas(&graph, &tree, &output),
        Command::Topovrlp { input, output } => run_topovrlp(&input, &output),
        Command::Convert { input, output } => run_convert(&input, &output),
        Command::Stats { input, json, per_node } => run_stats(&input, json.as_deref(), per_node.as_deref()),
    }
}
