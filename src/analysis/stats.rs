//! Recursive statistics over a [`TreeStore`].
//!
//! Each walk starts at the root (node 0) and carries the tree and a depth
//! ceiling explicitly, so walks are reentrant and fail with
//! [`Error::DepthExceeded`] instead of growing the stack without bound.

use serde::Serialize;

use crate::tree::{NodeKind, TreeStore};
use crate::util::{Error, Result, DEFAULT_MAX_DEPTH};

/// Number of nodes found at each depth, root at depth 0.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DepthHistogram(Vec<usize>);

impl DepthHistogram {
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.0
    }

    #[inline]
    pub fn get(&self, depth: usize) -> usize {
        self.0.get(depth).copied().unwrap_or(0)
    }

    /// Deepest level with at least one node.
    pub fn max_depth(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }

    /// Widest level, useful for laying out a diagram.
    pub fn max_width(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Total nodes visited.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

/// Leaf-list entries below each node.
///
/// Nodes not reachable from the root keep a count of zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PrimitiveCounts(Vec<usize>);

impl PrimitiveCounts {
    #[inline]
    pub fn get(&self, node: usize) -> Option<usize> {
        self.0.get(node).copied()
    }

    /// Entries enumerable from all leaves.
    #[inline]
    pub fn root(&self) -> usize {
        self.0.first().copied().unwrap_or(0)
    }

    #[inline]
    pub fn per_node(&self) -> &[usize] {
        &self.0
    }
}

/// Whole-tree shape numbers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TreeSummary {
    pub nodes: usize,
    pub internal: usize,
    pub leaves: usize,
    /// Leaves whose list has no entries.
    pub empty_leaves: usize,
    pub max_depth: usize,
    pub leaf_entries: usize,
    pub largest_leaf: usize,
    pub smallest_leaf: usize,
    /// Mean over non-empty leaves.
    pub mean_leaf_entries: f64,
}

/// Statistics entry point over one tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeStatistics<'a> {
    tree: &'a TreeStore,
    max_depth: usize,
}

impl<'a> TreeStatistics<'a> {
    pub fn new(tree: &'a TreeStore) -> Self {
        Self { tree, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Count nodes per depth, internal and leaf alike.
    pub fn depth_histogram(&self) -> Result<DepthHistogram> {
        let mut levels = Vec::new();
        self.histogram_visit(0, 0, &mut levels)?;
        Ok(DepthHistogram(levels))
    }

    fn histogram_visit(&self, index: usize, depth: usize, levels: &mut Vec<usize>) -> Result<()> {
        let node = self.enter(index, depth)?;
        if levels.len() <= depth {
            levels.resize(depth + 1, 0);
        }
        levels[depth] += 1;

        if let NodeKind::Internal { left, right, .. } = node {
            self.histogram_visit(left, depth + 1, levels)?;
            self.histogram_visit(right, depth + 1, levels)?;
        }
        Ok(())
    }

    /// Count leaf-list entries below every node, memoized per node index.
    pub fn primitive_counts(&self) -> Result<PrimitiveCounts> {
        let mut memo = vec![0; self.tree.num_nodes()];
        self.count_visit(0, 0, &mut memo)?;
        Ok(PrimitiveCounts(memo))
    }

    fn count_visit(&self, index: usize, depth: usize, memo: &mut [usize]) -> Result<usize> {
        let count = match self.enter(index, depth)? {
            NodeKind::Leaf { head } => self.leaf_len(head)?,
            NodeKind::Internal { left, right, .. } => {
                self.count_visit(left, depth + 1, memo)? + self.count_visit(right, depth + 1, memo)?
            }
        };
        memo[index] = count;
        Ok(count)
    }

    /// Shape summary in a single walk.
    pub fn summary(&self) -> Result<TreeSummary> {
        let mut s = TreeSummary { smallest_leaf: usize::MAX, ..Default::default() };
        self.summary_visit(0, 0, &mut s)?;
        if s.leaves == 0 {
            s.smallest_leaf = 0;
        }
        let filled = s.leaves - s.empty_leaves;
        if filled > 0 {
            s.mean_leaf_entries = s.leaf_entries as f64 / filled as f64;
        }
        Ok(s)
    }

    fn summary_visit(&self, index: usize, depth: usize, s: &mut TreeSummary) -> Result<()> {
        s.nodes += 1;
        s.max_depth = s.max_depth.max(depth);
        match self.enter(index, depth)? {
            NodeKind::Leaf { head } => {
                let n = self.leaf_len(head)?;
                s.leaves += 1;
                s.empty_leaves += usize::from(n == 0);
                s.leaf_entries += n;
                s.largest_leaf = s.largest_leaf.max(n);
                s.smallest_leaf = s.smallest_leaf.min(n);
            }
            NodeKind::Internal { left, right, .. } => {
                s.internal += 1;
                self.summary_visit(left, depth + 1, s)?;
                self.summary_visit(right, depth + 1, s)?;
            }
        }
        Ok(())
    }

    fn enter(&self, index: usize, depth: usize) -> Result<NodeKind> {
        if depth > self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }
        self.tree
            .node(index)
            .ok_or_else(|| Error::invalid(format!("node {index} cannot be decoded")))
    }

    fn leaf_len(&self, head: usize) -> Result<usize> {
        self.tree.leaf_entries(head).try_fold(0, |n, entry| entry.map(|_| n + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{MatrixRow, NodeListRow};
    use crate::util::{Aabb, Axis, DVec3};
    use fixed16::Fixed;

    fn bounds() -> Aabb {
        Aabb::new(DVec3::ZERO, DVec3::splat(8.0))
    }

    fn chain(lens: &[usize]) -> (Vec<NodeListRow>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut heads = Vec::new();
        let mut prim = 0;
        for &len in lens {
            heads.push(rows.len());
            for i in 0..len {
                let next = if i + 1 == len { -1 } else { rows.len() as i32 + 1 };
                rows.push(NodeListRow { primitive: prim, next });
                prim += 1;
            }
        }
        (rows, heads)
    }

    /// Root splits into a leaf and an internal node with two leaves.
    fn lopsided() -> TreeStore {
        let (list, heads) = chain(&[2, 1, 4]);
        TreeStore::from_nodes(
            bounds(),
            vec![
                MatrixRow::split(Axis::X, Fixed::from_f64(4.0), 1, 2),
                MatrixRow::leaf(heads[0]),
                MatrixRow::split(Axis::Z, Fixed::from_f64(2.0), 3, 4),
                MatrixRow::leaf(heads[1]),
                MatrixRow::leaf(heads[2]),
            ],
            list,
        )
        .unwrap()
    }

    #[test]
    fn test_single_leaf_root() {
        let (list, heads) = chain(&[3]);
        let tree = TreeStore::from_nodes(bounds(), vec![MatrixRow::leaf(heads[0])], list).unwrap();
        let stats = TreeStatistics::new(&tree);

        assert_eq!(stats.depth_histogram().unwrap().counts(), &[1]);
        assert_eq!(stats.primitive_counts().unwrap().root(), 3);
    }

    #[test]
    fn test_histogram() {
        let tree = lopsided();
        let hist = TreeStatistics::new(&tree).depth_histogram().unwrap();
        assert_eq!(hist.counts(), &[1, 2, 2]);
        assert_eq!(hist.total(), tree.num_nodes());
        assert_eq!(hist.max_depth(), Some(2));
        assert_eq!(hist.max_width(), 2);
        assert_eq!(hist.get(7), 0);
    }

    #[test]
    fn test_primitive_counts_memoized() {
        let tree = lopsided();
        let counts = TreeStatistics::new(&tree).primitive_counts().unwrap();
        assert_eq!(counts.per_node(), &[7, 2, 5, 1, 4]);
        assert_eq!(counts.root(), tree.node_list().len());
    }

    #[test]
    fn test_summary() {
        let tree = lopsided();
        let s = TreeStatistics::new(&tree).summary().unwrap();
        assert_eq!(s.nodes, 5);
        assert_eq!(s.internal, 2);
        assert_eq!(s.leaves, 3);
        assert_eq!(s.empty_leaves, 0);
        assert_eq!(s.max_depth, 2);
        assert_eq!(s.leaf_entries, 7);
        assert_eq!(s.largest_leaf, 4);
        assert_eq!(s.smallest_leaf, 1);
        assert!((s.mean_leaf_entries - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_depth_ceiling() {
        let tree = lopsided();
        let stats = TreeStatistics::new(&tree).with_max_depth(1);
        assert!(matches!(stats.depth_histogram(), Err(Error::DepthExceeded(1))));
        assert!(matches!(stats.primitive_counts(), Err(Error::DepthExceeded(1))));
        assert!(TreeStatistics::new(&tree).with_max_depth(2).depth_histogram().is_ok());
    }

    #[test]
    fn test_cyclic_leaf_reported() {
        let list = vec![NodeListRow { primitive: 0, next: 0 }];
        let tree = TreeStore::from_nodes(bounds(), vec![MatrixRow::leaf(0)], list).unwrap();
        assert!(matches!(
            TreeStatistics::new(&tree).primitive_counts(),
            Err(Error::CyclicLeafList(0))
        ));
    }
}
