//! Pairwise similarity files: one `name1 name2 value` triple per line

use std::collections::HashMap;
use std::io::{BufRead, BufWriter, Write};

use super::FormatError;
use crate::cluster::hierarchical::SimilarityMatrix;

/// Similarity matrix together with the name of every item
#[derive(Debug, Clone, Default)]
pub struct NamedSimilarity {
    pub matrix: SimilarityMatrix,

    /// Item names by index, in order of first appearance
    pub names: Vec<String>,
}

/// Read a similarity file
///
/// Items are numbered in order of first appearance. The matrix is symmetric,
/// so `a b` and `b a` name the same pair; when a pair repeats the last value
/// wins and a warning is logged.
pub fn read_similarity<R: BufRead>(reader: R) -> Result<NamedSimilarity, FormatError> {
    const FMT: &str = "similarity";

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();
    let mut matrix = SimilarityMatrix::default();
    let mut repeated = 0;

    for (k, line) in reader.lines().enumerate() {
        let line_no = k + 1;
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let [n1, n2, value] = fields[..] else {
            return Err(FormatError::wrong(FMT, line_no, "format must be '<name1> <name2> <value>'"));
        };
        let value: f64 = value
            .parse()
            .map_err(|_| FormatError::wrong(FMT, line_no, format!("invalid similarity value '{}'", value)))?;

        let mut id = |name: &str| {
            *index.entry(name.to_string()).or_insert_with(|| {
                names.push(name.to_string());
                names.len() - 1
            })
        };
        let i = id(n1);
        let j = id(n2);

        if matrix.set(i, j, value).is_some() {
            repeated += 1;
            log::warn!("Repeated pair {} {} on line {}, using most recent value", n1, n2, line_no);
        }
    }
    matrix.resize(names.len());

    log::info!(
        "Read similarity over {} items with {} entries ({} repeated)",
        names.len(),
        matrix.num_entries(),
        repeated
    );

    Ok(NamedSimilarity { matrix, names })
}

/// Write every stored entry, both orientations, as `name1 name2 value`
pub fn write_similarity<W: Write>(similarity: &NamedSimilarity, writer: W) -> Result<(), FormatError> {
    let mut out = BufWriter::new(writer);
    for i in 0..similarity.matrix.len() {
        for (j, w) in similarity.matrix.row(i) {
            writeln!(out, "{} {} {}", similarity.names[i], similarity.names[j], w)?;
        }
    }
    out.flush()?;
    Ok(())
}
