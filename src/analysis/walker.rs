//! Bounding-box walk over the split hierarchy.
//!
//! [`SplitIter`] visits internal nodes in pre-order (left child first) and
//! yields the box each split cuts, the clamped plane position and the two
//! child boxes. Leaves yield nothing. The walk keeps its own stack, so deep
//! trees cost heap rather than call stack.

use bytemuck::{Pod, Zeroable};

use super::consumer::TreeConsumer;
use crate::tree::{NodeKind, TreeStore};
use crate::util::{Aabb, Axis, DVec3, Error, Result, DEFAULT_MAX_DEPTH};

/// Geometry of one split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitGeometry {
    pub node: usize,
    pub depth: usize,
    /// Box of the node being split.
    pub bounds: Aabb,
    pub axis: Axis,
    /// Split coordinate as stored.
    pub stored_position: f64,
    /// Split coordinate clamped into `bounds`.
    pub position: f64,
    pub left: Aabb,
    pub right: Aabb,
    /// Where the split plane cuts `bounds`.
    pub plane: [DVec3; 4],
    pub left_child: usize,
    pub right_child: usize,
}

struct Pending {
    node: usize,
    depth: usize,
    bounds: Aabb,
}

/// Lazy pre-order iterator over splits.
pub struct SplitIter<'a> {
    tree: &'a TreeStore,
    stack: Vec<Pending>,
    max_depth: usize,
}

impl<'a> SplitIter<'a> {
    pub fn new(tree: &'a TreeStore) -> Self {
        Self {
            tree,
            stack: vec![Pending { node: 0, depth: 0, bounds: tree.bounds() }],
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Iterator for SplitIter<'_> {
    type Item = Result<SplitGeometry>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Pending { node, depth, bounds }) = self.stack.pop() {
            if depth > self.max_depth {
                self.stack.clear();
                return Some(Err(Error::DepthExceeded(self.max_depth)));
            }
            let Some(kind) = self.tree.node(node) else {
                self.stack.clear();
                return Some(Err(Error::invalid(format!("node {node} cannot be decoded"))));
            };
            let NodeKind::Internal { axis, split, left, right } = kind else {
                continue;
            };

            let position = bounds.clamp_on_axis(axis, split);
            let (left_box, right_box) = bounds.split(axis, split);
            self.stack.push(Pending { node: right, depth: depth + 1, bounds: right_box });
            self.stack.push(Pending { node: left, depth: depth + 1, bounds: left_box });

            return Some(Ok(SplitGeometry {
                node,
                depth,
                bounds,
                axis,
                stored_position: split,
                position,
                left: left_box,
                right: right_box,
                plane: bounds.split_plane(axis, position),
                left_child: left,
                right_child: right,
            }));
        }
        None
    }
}

/// Walk all splits of `tree` from the root box.
pub fn splits(tree: &TreeStore) -> SplitIter<'_> {
    SplitIter::new(tree)
}

/// Line vertex for GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    /// Tree depth the line belongs to; the root box is depth 0.
    pub depth: u32,
}

impl LineVertex {
    fn new(p: DVec3, depth: usize) -> Self {
        Self {
            position: p.as_vec3().to_array(),
            depth: depth as u32,
        }
    }
}

/// Collects the root box and every split rectangle as a line list.
#[derive(Debug, Default)]
pub struct WireframeBuilder {
    vertices: Vec<LineVertex>,
}

impl WireframeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the twelve edges of a box.
    pub fn add_box(&mut self, aabb: &Aabb, depth: usize) {
        for [a, b] in aabb.edges() {
            self.line(a, b, depth);
        }
    }

    fn line(&mut self, a: DVec3, b: DVec3, depth: usize) {
        self.vertices.push(LineVertex::new(a, depth));
        self.vertices.push(LineVertex::new(b, depth));
    }

    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

impl TreeConsumer for WireframeBuilder {
    fn bounds(&mut self, bounds: &Aabb) {
        self.add_box(bounds, 0);
    }

    fn split(&mut self, split: &SplitGeometry) {
        let p = split.plane;
        for i in 0..4 {
            self.line(p[i], p[(i + 1) % 4], split.depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{MatrixRow, NodeListRow};
    use fixed16::Fixed;

    fn two_leaves() -> TreeStore {
        TreeStore::from_nodes(
            Aabb::new(DVec3::ZERO, DVec3::splat(4.0)),
            vec![
                MatrixRow::split(Axis::Y, Fixed::from_f64(2.0), 1, 2),
                MatrixRow::leaf(0),
                MatrixRow::leaf(1),
            ],
            vec![NodeListRow { primitive: 0, next: -1 }, NodeListRow { primitive: 1, next: -1 }],
        )
        .unwrap()
    }

    #[test]
    fn test_single_split() {
        let tree = two_leaves();
        let all: Vec<SplitGeometry> = splits(&tree).collect::<Result<_>>().unwrap();
        assert_eq!(all.len(), 1);

        let s = &all[0];
        assert_eq!((s.node, s.depth, s.axis), (0, 0, Axis::Y));
        assert_eq!(s.position, 2.0);
        assert_eq!(s.left.max(), DVec3::new(4.0, 2.0, 4.0));
        assert_eq!(s.right.min(), DVec3::new(0.0, 2.0, 0.0));
        assert!(s.plane.iter().all(|p| p.y == 2.0));
        assert_eq!((s.left_child, s.right_child), (1, 2));
    }

    #[test]
    fn test_leaf_root_yields_nothing() {
        let tree = TreeStore::from_nodes(
            Aabb::default(),
            vec![MatrixRow::leaf(0)],
            vec![NodeListRow { primitive: 0, next: -1 }],
        )
        .unwrap();
        assert_eq!(splits(&tree).count(), 0);
    }

    #[test]
    fn test_preorder_left_first() {
        let tree = TreeStore::from_nodes(
            Aabb::new(DVec3::ZERO, DVec3::splat(8.0)),
            vec![
                MatrixRow::split(Axis::X, Fixed::from_f64(4.0), 1, 2),
                MatrixRow::split(Axis::Z, Fixed::from_f64(1.0), 3, 4),
                MatrixRow::split(Axis::Y, Fixed::from_f64(20.0), 5, 6),
                MatrixRow::leaf(0),
                MatrixRow::leaf(0),
                MatrixRow::leaf(0),
                MatrixRow::leaf(0),
            ],
            vec![NodeListRow { primitive: 0, next: -1 }],
        )
        .unwrap();

        let all: Vec<SplitGeometry> = splits(&tree).collect::<Result<_>>().unwrap();
        assert_eq!(all.iter().map(|s| s.node).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(all[1].bounds.max().x, 4.0);
        assert_eq!(all[2].bounds.min().x, 4.0);
        // Out-of-box split clamps to the far face
        assert_eq!(all[2].stored_position, 20.0);
        assert_eq!(all[2].position, 8.0);

        let again: Vec<SplitGeometry> = splits(&tree).collect::<Result<_>>().unwrap();
        assert_eq!(all, again);
    }

    #[test]
    fn test_depth_ceiling() {
        let tree = two_leaves();
        let mut iter = splits(&tree).with_max_depth(0);
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(iter.next(), Some(Err(Error::DepthExceeded(0)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_wireframe() {
        let tree = two_leaves();
        let mut wire = WireframeBuilder::new();
        wire.bounds(&tree.bounds());
        for s in splits(&tree) {
            wire.split(&s.unwrap());
        }
        // 12 box edges + 4 plane edges, two vertices each
        assert_eq!(wire.vertices().len(), 32);
        assert_eq!(wire.as_bytes().len(), 32 * std::mem::size_of::<LineVertex>());
        assert!(wire.vertices()[24..].iter().all(|v| v.position[1] == 2.0 && v.depth == 1));
    }
}
