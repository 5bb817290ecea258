//! Line-oriented graph formats
//!
//! `edgl` is an edge list: one `u_tag v_tag [edge_tag]` line per edge, with
//! nodes created in order of first appearance.
//!
//! `ladj` is an adjacency list: a node count line followed by one line per
//! node, `u[tag] v[tag] w[tag] ...`, where every bracketed tag is optional
//! and node lines must be consecutive starting at 0.
//!
//! Both readers mark the result undirected when every edge has its mirror.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::FormatError;
use crate::graph::{Graph, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphFormat {
    /// `.edgl`
    EdgeList,

    /// `.ladj`
    AdjacencyList,
}

impl GraphFormat {
    /// Order in which [`read_graph`] tries the readers. The adjacency list is
    /// strict about its layout, the edge list accepts almost anything.
    pub const PRIORITY: [GraphFormat; 2] = [GraphFormat::AdjacencyList, GraphFormat::EdgeList];

    pub fn name(self) -> &'static str {
        match self {
            GraphFormat::EdgeList => "edgl",
            GraphFormat::AdjacencyList => "ladj",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "edgl" => Some(GraphFormat::EdgeList),
            "ladj" => Some(GraphFormat::AdjacencyList),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    pub fn read<N: Tag, E: Tag, R: BufRead>(self, reader: R) -> Result<Graph<N, E>, FormatError> {
        match self {
            GraphFormat::EdgeList => read_edgl(reader),
            GraphFormat::AdjacencyList => read_ladj(reader),
        }
    }

    pub fn write<N: Tag, E: Tag, W: Write>(self, graph: &Graph<N, E>, writer: W) -> Result<(), FormatError> {
        match self {
            GraphFormat::EdgeList => write_edgl(graph, writer),
            GraphFormat::AdjacencyList => write_ladj(graph, writer),
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name written for a node: its tag text, or its index when the tag is empty
pub fn node_label<N: Tag, E>(graph: &Graph<N, E>, k: usize) -> String {
    let text = graph.node_tag(k).to_text();
    if text.is_empty() {
        k.to_string()
    } else {
        text
    }
}

/// First whitespace-delimited token of `text` and the remainder after it
fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

fn finish<N: Tag, E: Tag>(mut graph: Graph<N, E>) -> Graph<N, E> {
    if graph.check_undirected() {
        graph.to_undirected();
    }
    graph
}

fn intern<N: Tag, E>(
    graph: &mut Graph<N, E>,
    index: &mut HashMap<String, usize>,
    token: &str,
    line: usize,
) -> Result<usize, FormatError> {
    if let Some(&k) = index.get(token) {
        return Ok(k);
    }
    let tag = N::from_text(token)
        .ok_or_else(|| FormatError::wrong("edgl", line, format!("invalid node tag '{}'", token)))?;
    let k = graph.add_node(tag);
    index.insert(token.to_string(), k);
    Ok(k)
}

pub fn read_edgl<N: Tag, E: Tag, R: BufRead>(reader: R) -> Result<Graph<N, E>, FormatError> {
    let mut graph = Graph::new(false);
    let mut index = HashMap::new();

    for (k, line) in reader.lines().enumerate() {
        let line_no = k + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let (first, rest) = split_token(&line);
        let (second, rest) = split_token(rest);
        if second.is_empty() {
            return Err(FormatError::wrong("edgl", line_no, "tag for the second vertex expected"));
        }
        let u = intern(&mut graph, &mut index, first, line_no)?;
        let v = intern(&mut graph, &mut index, second, line_no)?;

        let rest = rest.trim();
        let tag = if rest.is_empty() {
            E::default()
        } else {
            E::from_text(rest)
                .ok_or_else(|| FormatError::wrong("edgl", line_no, format!("invalid edge tag '{}'", rest)))?
        };
        graph.add_edge(u, v, tag);
    }

    Ok(finish(graph))
}

/// Write every stored edge, mirrors included, so the reader can tell an
/// undirected graph apart
///
/// Fails before writing anything when a node could not be read back: an
/// isolated node has no line to appear on, and a label with whitespace
/// would be split into several tokens.
pub fn write_edgl<N: Tag, E: Tag, W: Write>(graph: &Graph<N, E>, writer: W) -> Result<(), FormatError> {
    let unwritable = |node: usize, message: String| FormatError::Unwritable {
        format: "edgl",
        node,
        message,
    };
    let labels: Vec<String> = (0..graph.num_nodes()).map(|k| node_label(graph, k)).collect();
    for (k, label) in labels.iter().enumerate() {
        if graph.is_isolated(k) {
            return Err(unwritable(k, format!("'{}' is isolated, use ladj", label)));
        }
        if label.contains(char::is_whitespace) {
            return Err(unwritable(k, format!("label '{}' contains whitespace, use ladj", label)));
        }
    }

    let mut out = BufWriter::new(writer);
    for (u, v, tag) in graph.edges() {
        write!(out, "{} {}", labels[u], labels[v])?;
        let text = tag.to_text();
        if !text.is_empty() {
            write!(out, " {}", text)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Leading index of `text`, its optional `[tag]`, and what follows
fn parse_item(text: &str) -> Result<(usize, Option<&str>, &str), String> {
    let digits = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    if digits == 0 {
        let (token, _) = split_token(text);
        return Err(format!("expected an integer: got \"{}\"", token));
    }
    let index = text[..digits]
        .parse()
        .map_err(|_| format!("index {} is too large", &text[..digits]))?;

    let rest = &text[digits..];
    match rest.strip_prefix('[') {
        Some(inner) => {
            let close = inner.find(']').ok_or_else(|| "parenthesis '[' not closed".to_string())?;
            Ok((index, Some(&inner[..close]), &inner[close + 1..]))
        }
        None => Ok((index, None, rest)),
    }
}

pub fn read_ladj<N: Tag, E: Tag, R: BufRead>(reader: R) -> Result<Graph<N, E>, FormatError> {
    const FMT: &str = "ladj";
    let wrong = |line: usize, message: String| FormatError::wrong(FMT, line, message);

    let mut lines = reader.lines().enumerate().map(|(k, l)| (k + 1, l));

    let (n, mut graph) = loop {
        let Some((line_no, line)) = lines.next() else {
            return Err(wrong(0, "expecting graph size at the beginning".into()));
        };
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let n: usize = text
            .parse()
            .map_err(|_| wrong(line_no, "expecting graph size at the beginning".into()))?;
        break (n, Graph::<N, E>::with_nodes(n, false));
    };

    let mut last: Option<usize> = None;
    for (line_no, line) in lines {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let (u, tag, rest) = parse_item(text).map_err(|m| wrong(line_no, m))?;
        match last {
            None if u != 0 => return Err(wrong(line_no, "adjacency list doesn't start with 0".into())),
            Some(prev) if u != prev + 1 => return Err(wrong(line_no, "vertices must be consecutive".into())),
            _ => {}
        }
        if u >= n {
            return Err(wrong(line_no, format!("index {} exceeds graph size {}", u, n)));
        }
        last = Some(u);

        if let Some(text) = tag {
            let tag = N::from_text(text).ok_or_else(|| wrong(line_no, format!("invalid node tag '{}'", text)))?;
            graph.set_node_tag(u, tag);
        }

        let mut rest = rest.trim_start();
        while !rest.is_empty() {
            let (v, tag, tail) = parse_item(rest).map_err(|m| wrong(line_no, m))?;
            if v >= n {
                return Err(wrong(line_no, format!("index {} exceeds graph size {}", v, n)));
            }
            let tag = match tag {
                Some(text) => E::from_text(text).ok_or_else(|| wrong(line_no, format!("invalid edge tag '{}'", text)))?,
                None => E::default(),
            };
            graph.add_edge(u, v, tag);
            rest = tail.trim_start();
        }
    }

    Ok(finish(graph))
}

pub fn write_ladj<N: Tag, E: Tag, W: Write>(graph: &Graph<N, E>, writer: W) -> Result<(), FormatError> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "{}", graph.num_nodes())?;
    for u in 0..graph.num_nodes() {
        write!(out, "{}", u)?;
        let text = graph.node_tag(u).to_text();
        if !text.is_empty() {
            write!(out, "[{}]", text)?;
        }
        for (v, tag) in graph.neighbours(u) {
            write!(out, " {}", v)?;
            let text = tag.to_text();
            if !text.is_empty() {
                write!(out, "[{}]", text)?;
            }
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Try every reader in [`GraphFormat::PRIORITY`] order on the whole input
///
/// Returns the first graph that parses together with its format, or every
/// reader's failure when none accepts the input.
pub fn read_graph<N: Tag, E: Tag, R: Read>(mut reader: R) -> Result<(GraphFormat, Graph<N, E>), FormatError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut failures = Vec::new();
    for format in GraphFormat::PRIORITY {
        match format.read(text.as_bytes()) {
            Ok(graph) => {
                log::debug!("Input recognised as {}", format);
                return Ok((format, graph));
            }
            Err(e) => failures.push(e.to_string()),
        }
    }
    Err(FormatError::NoReaderAccepted(failures))
}

/// Read a graph file, choosing the reader by extension when it is known
pub fn read_graph_from_path<N: Tag, E: Tag>(path: &Path) -> Result<Graph<N, E>, FormatError> {
    let reader = BufReader::new(File::open(path)?);
    let graph = match GraphFormat::from_path(path) {
        Some(format) => format.read(reader)?,
        None => read_graph(reader)?.1,
    };
    log::info!(
        "Read {} with {} nodes and {} edges ({})",
        path.display(),
        graph.num_nodes(),
        graph.num_edges(),
        if graph.is_undirected() { "undirected" } else { "directed" }
    );
    Ok(graph)
}

pub fn write_graph_to_path<N: Tag, E: Tag>(graph: &Graph<N, E>, path: &Path) -> Result<(), FormatError> {
    let format = GraphFormat::from_path(path).ok_or_else(|| {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        FormatError::UnknownExtension(ext.to_string())
    })?;
    format.write(graph, File::create(path)?)?;
    log::info!("Wrote {} as {}", path.display(), format);
    Ok(())
}
