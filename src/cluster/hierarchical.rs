//! Agglomerative hierarchical clustering over a sparse similarity matrix
//!
//! The most similar pair of live clusters is merged repeatedly. After a
//! merge the similarity between the new cluster and any other cluster is
//! the size-weighted average of the two old similarities, with a missing
//! entry counting as 0. Merging stops when no strictly positive similarity
//! is left, so the result is a forest: one dendrogram root per group of
//! items that never became similar to each other.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Symmetric sparse similarity matrix over items `0..len()`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    rows: Vec<BTreeMap<usize, f64>>,
}

impl SimilarityMatrix {
    /// Matrix over `size` items with no entries
    pub fn new(size: usize) -> Self {
        Self { rows: vec![BTreeMap::new(); size] }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Grow to at least `size` items
    pub fn resize(&mut self, size: usize) {
        if size > self.rows.len() {
            self.rows.resize(size, BTreeMap::new());
        }
    }

    /// Store `weight` for both (i, j) and (j, i), growing the matrix if needed
    ///
    /// Returns the previous value of (i, j).
    pub fn set(&mut self, i: usize, j: usize, weight: f64) -> Option<f64> {
        self.resize(i.max(j) + 1);
        let previous = self.rows[i].insert(j, weight);
        self.rows[j].insert(i, weight);
        previous
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.rows.get(i)?.get(&j).copied()
    }

    /// Entries of row `i`, ascending by column
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows[i].iter().map(|(&j, &w)| (j, w))
    }

    /// Number of stored (i, j) entries, mirrors included
    pub fn num_entries(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    /// Highest strictly positive entry (i, j) with i > j
    ///
    /// Rows are scanned ascending and, within a row, columns ascending; the
    /// first maximum met wins.
    fn highest_weight(&self) -> Option<(usize, usize)> {
        let mut max = 0.0;
        let mut best = None;
        for (i, row) in self.rows.iter().enumerate() {
            for (&j, &w) in row.range(..i) {
                if w > max {
                    max = w;
                    best = Some((i, j));
                }
            }
        }
        best
    }

    /// Fold row/column `j` into row/column `i` with size-weighted averages
    fn collapse(&mut self, i: usize, j: usize, size_i: f64, size_j: f64) {
        for row in &mut self.rows {
            row.remove(&j);
        }

        for k in 0..self.rows.len() {
            if k == i || k == j {
                continue;
            }
            let wi = self.rows[i].get(&k).copied().unwrap_or(0.0);
            let wj = self.rows[j].get(&k).copied().unwrap_or(0.0);
            if wi > 0.0 || wj > 0.0 {
                let w = (wi * size_i + wj * size_j) / (size_i + size_j);
                self.rows[i].insert(k, w);
                self.rows[k].insert(i, w);
            }
        }

        self.rows[j].clear();
    }
}

/// Index of a branch inside a [`Dendrogram`]
pub type BranchId = usize;

/// Leaf or merge node of a dendrogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    /// Original item index
    Leaf(usize),

    /// Two merged subtrees
    Merge { left: BranchId, right: BranchId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub kind: BranchKind,

    /// Number of leaves below (1 for a leaf)
    pub size: usize,
}

/// Arena holding every branch of a clustering run plus its roots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    branches: Vec<Branch>,
    roots: Vec<BranchId>,
}

impl Dendrogram {
    fn leaf(&mut self, item: usize) -> BranchId {
        self.branches.push(Branch { kind: BranchKind::Leaf(item), size: 1 });
        self.branches.len() - 1
    }

    fn merge(&mut self, left: BranchId, right: BranchId) -> BranchId {
        let size = self.branches[left].size + self.branches[right].size;
        self.branches.push(Branch { kind: BranchKind::Merge { left, right }, size });
        self.branches.len() - 1
    }

    pub fn roots(&self) -> &[BranchId] {
        &self.roots
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id]
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn size(&self, id: BranchId) -> usize {
        self.branches[id].size
    }

    pub fn is_leaf(&self, id: BranchId) -> bool {
        matches!(self.branches[id].kind, BranchKind::Leaf(_))
    }

    /// Item index of a leaf
    pub fn data(&self, id: BranchId) -> Option<usize> {
        match self.branches[id].kind {
            BranchKind::Leaf(item) => Some(item),
            BranchKind::Merge { .. } => None,
        }
    }

    pub fn left(&self, id: BranchId) -> Option<BranchId> {
        match self.branches[id].kind {
            BranchKind::Merge { left, .. } => Some(left),
            BranchKind::Leaf(_) => None,
        }
    }

    pub fn right(&self, id: BranchId) -> Option<BranchId> {
        match self.branches[id].kind {
            BranchKind::Merge { right, .. } => Some(right),
            BranchKind::Leaf(_) => None,
        }
    }

    /// Leaf items below `root`, depth first with the right subtree first
    pub fn extract_order(&self, root: BranchId) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.size(root));
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match self.branches[id].kind {
                BranchKind::Leaf(item) => order.push(item),
                BranchKind::Merge { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        order
    }

    /// Leaf order of every root, concatenated in root order
    pub fn order(&self) -> Vec<usize> {
        self.roots.iter().flat_map(|&r| self.extract_order(r)).collect()
    }

    /// Sizes of the merge nodes below `root`, breadth first, larger child first
    pub fn extract_sizes(&self, root: BranchId) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if let BranchKind::Merge { left, right } = self.branches[id].kind {
                sizes.push(self.branches[id].size);
                let (big, small) = if self.size(left) > self.size(right) {
                    (left, right)
                } else {
                    (right, left)
                };
                queue.push_back(big);
                queue.push_back(small);
            }
        }
        sizes
    }

    /// Evaluate `merge(left, right, left_value, right_value)` bottom-up over
    /// the subtree of `root`, with every leaf worth `leaf`
    ///
    /// Children always sit below their parent in the arena, so values are
    /// kept in a buffer indexed by branch ID.
    fn fold_subtree<T, F>(&self, root: BranchId, leaf: T, merge: F) -> T
    where
        T: Copy,
        F: Fn(BranchId, BranchId, T, T) -> T,
    {
        let mut values = vec![leaf; root + 1];
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if let BranchKind::Merge { left, right } = self.branches[id].kind {
                if expanded {
                    values[id] = merge(left, right, values[left], values[right]);
                } else {
                    stack.push((id, true));
                    stack.push((left, false));
                    stack.push((right, false));
                }
            }
        }
        values[root]
    }

    /// Number of levels below and including `root`
    pub fn depth(&self, root: BranchId) -> usize {
        self.fold_subtree(root, 1, |_, _, l, r| 1 + l.max(r))
    }

    /// Drawing depth where each merge costs `factor` times its smaller side
    pub fn graphical_depth(&self, root: BranchId, factor: f64) -> f64 {
        self.fold_subtree(root, 1.0, |left, right, l: f64, r: f64| {
            let step = self.size(left).min(self.size(right)) as f64 * factor;
            step + l.max(r)
        })
    }

    /// Largest root size
    pub fn max_root_size(&self) -> usize {
        self.roots.iter().map(|&r| self.size(r)).max().unwrap_or(0)
    }
}

/// Cluster the items of `weights` by repeatedly merging the most similar pair
///
/// The input is not modified. Roots come back in ascending order of the item
/// index that represents each surviving cluster.
pub fn hierarchical_clustering(weights: &SimilarityMatrix) -> Dendrogram {
    let mut weights = weights.clone();
    let size = weights.len();
    log::info!(
        "Clustering {} items with {} similarity entries",
        size,
        weights.num_entries()
    );

    let mut dendrogram = Dendrogram::default();
    let mut tree: Vec<Option<BranchId>> = (0..size).map(|k| Some(dendrogram.leaf(k))).collect();

    let mut merges = 0;
    while let Some((i, j)) = weights.highest_weight() {
        let (Some(left), Some(right)) = (tree[i], tree[j]) else {
            panic!("similarity entry ({}, {}) refers to a merged cluster", i, j);
        };
        let size_i = dendrogram.size(left) as f64;
        let size_j = dendrogram.size(right) as f64;

        weights.collapse(i, j, size_i, size_j);

        tree[i] = Some(dendrogram.merge(left, right));
        tree[j] = None;
        merges += 1;
    }

    dendrogram.roots = tree.into_iter().flatten().collect();
    log::info!(
        "Hierarchical clustering finished after {} merges with {} roots",
        merges,
        dendrogram.roots.len()
    );

    dendrogram
}
