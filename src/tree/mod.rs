//! In-memory BSP tree.
//!
//! The tree is kept as the flat row arrays the tree builder writes, root at
//! matrix row 0. Rows keep their raw fixed-point fields so a reload is
//! bit-identical; [`TreeStore::node`] decodes a row into a [`NodeKind`].

use fixed16::Fixed;
use serde::Serialize;

use crate::util::{Aabb, Axis, DVec3, Error, Result};

/// Counts and stack top from the tree file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TreeHeader {
    pub split_list_top: i32,
    pub split_list_count: i32,
    pub tree_list_count: i32,
    pub tree_matrix_count: i32,
    pub node_list_count: i32,
}

/// Scene bounding box as stored: location xyz then size xyz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxRecord(pub [Fixed; 6]);

impl BoxRecord {
    pub fn to_aabb(&self) -> Aabb {
        let v = self.0.map(Fixed::to_f64);
        Aabb::new(DVec3::new(v[0], v[1], v[2]), DVec3::new(v[3], v[4], v[5]))
    }

    pub fn from_aabb(aabb: &Aabb) -> Self {
        let (l, s) = (aabb.location, aabb.size);
        Self([l.x, l.y, l.z, s.x, s.y, s.z].map(Fixed::from_f64))
    }
}

/// One tree-matrix row. A non-negative `leaf` marks a leaf whose primitive
/// list starts at that node-list index; otherwise the row is a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixRow {
    pub split_position: Fixed,
    pub axis: i32,
    pub left: i32,
    pub right: i32,
    pub leaf: i32,
}

impl MatrixRow {
    /// Leaf row pointing at the start of a node-list chain.
    pub fn leaf(head: usize) -> Self {
        Self {
            split_position: Fixed::ZERO,
            axis: 0,
            left: -1,
            right: -1,
            leaf: head as i32,
        }
    }

    /// Split row.
    pub fn split(axis: Axis, position: Fixed, left: usize, right: usize) -> Self {
        Self {
            split_position: position,
            axis: axis.index() as i32,
            left: left as i32,
            right: right as i32,
            leaf: -1,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf >= 0
    }
}

/// Builder bookkeeping row (next, extend left, extend right, split position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeListRow {
    pub next: i32,
    pub extend_left: i32,
    pub extend_right: i32,
    pub split_position: Fixed,
}

/// Builder split candidate row (split position, next, left count, right count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitListRow {
    pub split_position: Fixed,
    pub next: i32,
    pub left_count: i32,
    pub right_count: i32,
}

/// Leaf primitive list entry. A negative `next` ends the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeListRow {
    pub primitive: i32,
    pub next: i32,
}

/// Decoded tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Internal {
        axis: Axis,
        split: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        head: usize,
    },
}

/// BSP tree loaded from a tree file.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStore {
    pub(crate) bounds: BoxRecord,
    pub(crate) header: TreeHeader,
    pub(crate) matrix: Vec<MatrixRow>,
    pub(crate) tree_list: Vec<TreeListRow>,
    pub(crate) split_list: Vec<SplitListRow>,
    pub(crate) node_list: Vec<NodeListRow>,
}

impl TreeStore {
    /// Assemble a tree from its arrays and validate it.
    ///
    /// Header counts are derived from the array lengths.
    pub fn new(
        bounds: BoxRecord,
        split_list_top: i32,
        matrix: Vec<MatrixRow>,
        tree_list: Vec<TreeListRow>,
        split_list: Vec<SplitListRow>,
        node_list: Vec<NodeListRow>,
    ) -> Result<Self> {
        let header = TreeHeader {
            split_list_top,
            split_list_count: split_list.len() as i32,
            tree_list_count: tree_list.len() as i32,
            tree_matrix_count: matrix.len() as i32,
            node_list_count: node_list.len() as i32,
        };
        let store = Self { bounds, header, matrix, tree_list, split_list, node_list };
        store.validate()?;
        Ok(store)
    }

    /// Tree with only a matrix and leaf lists; builder arrays left empty.
    pub fn from_nodes(bounds: Aabb, matrix: Vec<MatrixRow>, node_list: Vec<NodeListRow>) -> Result<Self> {
        Self::new(BoxRecord::from_aabb(&bounds), 0, matrix, Vec::new(), Vec::new(), node_list)
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds.to_aabb()
    }

    #[inline]
    pub fn bounds_record(&self) -> &BoxRecord {
        &self.bounds
    }

    #[inline]
    pub fn header(&self) -> &TreeHeader {
        &self.header
    }

    #[inline]
    pub fn matrix(&self) -> &[MatrixRow] {
        &self.matrix
    }

    #[inline]
    pub fn tree_list(&self) -> &[TreeListRow] {
        &self.tree_list
    }

    #[inline]
    pub fn split_list(&self) -> &[SplitListRow] {
        &self.split_list
    }

    #[inline]
    pub fn node_list(&self) -> &[NodeListRow] {
        &self.node_list
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.matrix.len()
    }

    /// Decode node `index`. `None` if out of range.
    pub fn node(&self, index: usize) -> Option<NodeKind> {
        self.matrix.get(index).and_then(|row| self.decode(index, row).ok())
    }

    fn decode(&self, index: usize, row: &MatrixRow) -> Result<NodeKind> {
        if row.is_leaf() {
            let head = row.leaf as usize;
            if head >= self.node_list.len() {
                return Err(Error::LeafIndexOutOfBounds {
                    index: row.leaf as i64,
                    count: self.node_list.len(),
                });
            }
            return Ok(NodeKind::Leaf { head });
        }

        let axis = Axis::from_index(row.axis).ok_or(Error::InvalidAxis { node: index, axis: row.axis })?;
        let count = self.matrix.len();
        let child = |c: i32| -> Result<usize> {
            if c < 0 || c as usize >= count {
                Err(Error::ChildOutOfBounds { node: index, child: c as i64, count })
            } else {
                Ok(c as usize)
            }
        };
        Ok(NodeKind::Internal {
            axis,
            split: row.split_position.to_f64(),
            left: child(row.left)?,
            right: child(row.right)?,
        })
    }

    /// Check the tree is a proper binary tree rooted at node 0.
    ///
    /// Every row must decode, and every node may be reached from the root at
    /// most once, which also rules out cycles. Unreachable rows are allowed.
    pub fn validate(&self) -> Result<()> {
        if self.matrix.is_empty() {
            return Err(Error::invalid("tree has no root node"));
        }

        let mut seen = vec![false; self.matrix.len()];
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            if std::mem::replace(&mut seen[index], true) {
                return Err(Error::SharedNode(index));
            }
            if let NodeKind::Internal { left, right, .. } = self.decode(index, &self.matrix[index])? {
                stack.push(right);
                stack.push(left);
            }
        }
        Ok(())
    }

    /// Primitive indices of the leaf list starting at `head`.
    pub fn leaf_entries(&self, head: usize) -> LeafEntries<'_> {
        LeafEntries {
            nodes: &self.node_list,
            head,
            next: Some(head as i64),
            steps: 0,
        }
    }
}

/// Iterator over a leaf primitive list.
///
/// Stops with an error if an index leaves the node list or the chain runs
/// longer than the node list itself.
pub struct LeafEntries<'a> {
    nodes: &'a [NodeListRow],
    head: usize,
    next: Option<i64>,
    steps: usize,
}

impl Iterator for LeafEntries<'_> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next.take()?;
        if index < 0 {
            return None;
        }
        let Some(row) = self.nodes.get(index as usize) else {
            return Some(Err(Error::LeafIndexOutOfBounds { index, count: self.nodes.len() }));
        };
        self.steps += 1;
        if self.steps > self.nodes.len() {
            return Some(Err(Error::CyclicLeafList(self.head)));
        }
        if row.primitive < 0 {
            return Some(Err(Error::invalid(format!(
                "negative primitive index {} in leaf list entry {}",
                row.primitive, index
            ))));
        }
        self.next = Some(row.next as i64);
        Some(Ok(row.primitive as usize))
    }
}
