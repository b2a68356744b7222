//! Axis-aligned bounding box tree over walkmesh faces
//!
//! Every room of an area owns one tree. A node is either a leaf tagged with a face
//! index, or an internal node with exactly two children; the children are uniquely
//! owned so the tree is dropped without any manual bookkeeping.
//!
//! Queries work on the XY projection, except for the 3D segment queries used by
//! ray casts. All traversals use an explicit stack since trees are read from files.

use glam::{Vec2, Vec3};
use walkmesh_common::{
    point_in_bounds_2d, polygons_intersect_2d, segment_intersects_bounds_2d, bounds_polygon_2d,
    overlap_bounds_2d, Error, Result,
};

use crate::placement::Rotation;

/// Node of an AABB tree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AabbNode {
    min: Vec3,
    max: Vec3,
    /// Face tag, only set on leaves
    face: Option<u32>,
    children: Option<Box<[AabbNode; 2]>>,
    #[cfg_attr(feature = "serialization", serde(skip))]
    selected: bool,
}

impl AabbNode {
    /// Creates a node from two corners and an optional face tag
    ///
    /// Corners given in the wrong order are swapped per axis, so the node always
    /// satisfies `min <= max`.
    pub fn new(min: Vec3, max: Vec3, face: Option<u32>) -> Self {
        let (lo, hi) = (min.min(max), min.max(max));
        if lo != min {
            log::warn!(
                "AABB corners out of order ({:?} / {:?}), normalizing",
                min,
                max
            );
        }

        Self {
            min: lo,
            max: hi,
            face,
            children: None,
            selected: false,
        }
    }

    /// Creates a leaf bounding the given points
    pub fn from_points(points: &[Vec3], face: u32) -> Self {
        let (min, max) = points.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        Self::new(min, max, Some(face))
    }

    /// Builds a tree over face bounds by recursive median splits on the longest axis
    ///
    /// Returns `None` when there is nothing to index.
    pub fn build(mut items: Vec<AabbNode>) -> Option<AabbNode> {
        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => {
                let (min, max) = items.iter().fold(
                    (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
                    |(min, max), n| (min.min(n.min), max.max(n.max)),
                );
                let extent = max - min;
                let axis = if extent.x >= extent.y && extent.x >= extent.z {
                    0
                } else if extent.y >= extent.z {
                    1
                } else {
                    2
                };

                items.sort_by(|a, b| {
                    let ca = a.min[axis] + a.max[axis];
                    let cb = b.min[axis] + b.max[axis];
                    ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
                });
                let right_items = items.split_off(items.len() / 2);

                let mut node = AabbNode::new(min, max, None);
                node.children = Some(Box::new([
                    Self::build(items)?,
                    Self::build(right_items)?,
                ]));
                Some(node)
            }
        }
    }

    /// Attaches two children, turning this node into an internal node
    ///
    /// A node is either a leaf or has exactly two children, so both must be given.
    pub fn set_children(&mut self, left: Option<AabbNode>, right: Option<AabbNode>) -> Result<()> {
        match (left, right) {
            (Some(left), Some(right)) => {
                self.face = None;
                self.children = Some(Box::new([left, right]));
                Ok(())
            }
            (left, right) => Err(Error::InvalidAabb(format!(
                "children must come in pairs (left: {}, right: {})",
                if left.is_some() { "set" } else { "missing" },
                if right.is_some() { "set" } else { "missing" },
            ))),
        }
    }

    /// Minimum corner
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Face tag of a leaf
    pub fn face(&self) -> Option<u32> {
        self.face
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Both children of an internal node
    pub fn children(&self) -> Option<(&AabbNode, &AabbNode)> {
        self.children.as_ref().map(|c| (&c[0], &c[1]))
    }

    /// Whether this node is highlighted for debug drawing
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Marks this node, and optionally its whole subtree, for debug highlighting
    pub fn select(&mut self, selected: bool, recursive: bool) {
        if !recursive {
            self.selected = selected;
            return;
        }
        self.for_each_mut(|node| node.selected = selected);
    }

    /// Moves the whole subtree
    pub fn translate(&mut self, offset: Vec3) {
        self.for_each_mut(|node| {
            node.min += offset;
            node.max += offset;
        });
    }

    /// Rotates the whole subtree about the Z axis through the origin
    pub fn rotate(&mut self, rotation: Rotation) {
        if rotation == Rotation::R0 {
            return;
        }
        self.for_each_mut(|node| {
            let a = rotation.apply(node.min);
            let b = rotation.apply(node.max);
            node.min = a.min(b);
            node.max = a.max(b);
        });
    }

    /// Adds an offset to every face tag of the subtree
    pub fn offset_faces(&mut self, offset: u32) {
        self.for_each_mut(|node| {
            if let Some(face) = node.face.as_mut() {
                *face += offset;
            }
        });
    }

    /// Checks whether the XY projection of this box contains the point
    pub fn contains_2d(&self, p: Vec2) -> bool {
        point_in_bounds_2d(p, self.min.truncate(), self.max.truncate())
    }

    /// First leaf containing the point, searching left before right
    pub fn get_node(&self, p: Vec2) -> Option<&AabbNode> {
        self.first_leaf(|node| node.contains_2d(p))
    }

    /// First leaf whose box is crossed by the 3D segment
    pub fn get_node_segment(&self, start: Vec3, end: Vec3) -> Option<&AabbNode> {
        self.first_leaf(|node| segment_intersects_box_3d(start, end, node.min, node.max))
    }

    /// All leaves containing the point
    pub fn get_nodes_point(&self, p: Vec2) -> Vec<&AabbNode> {
        self.all_leaves(|node| node.contains_2d(p))
    }

    /// All leaves whose box is crossed by the 3D segment
    pub fn get_nodes_segment_3d(&self, start: Vec3, end: Vec3) -> Vec<&AabbNode> {
        self.all_leaves(|node| segment_intersects_box_3d(start, end, node.min, node.max))
    }

    /// All leaves overlapping a 2D axis-aligned box
    pub fn get_nodes_box_2d(&self, min: Vec2, max: Vec2) -> Vec<&AabbNode> {
        self.all_leaves(|node| overlap_bounds_2d(node.min.truncate(), node.max.truncate(), min, max))
    }

    /// All leaves overlapping a polygon
    pub fn get_nodes_polygon(&self, polygon: &[Vec2]) -> Vec<&AabbNode> {
        self.all_leaves(|node| {
            let square = bounds_polygon_2d(node.min.truncate(), node.max.truncate());
            polygons_intersect_2d(&square, polygon)
        })
    }

    /// All leaves touched by a 2D segment
    pub fn get_nodes_segment_2d(&self, start: Vec2, end: Vec2) -> Vec<&AabbNode> {
        self.all_leaves(|node| {
            segment_intersects_bounds_2d(start, end, node.min.truncate(), node.max.truncate())
        })
    }

    /// All leaves of the tree, left to right
    pub fn leaves(&self) -> Vec<&AabbNode> {
        self.all_leaves(|_| true)
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Length of the longest root-to-leaf chain, a lone leaf having depth 1
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some((left, right)) = node.children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }

    /// Leaf tagged with the given face
    pub fn find_leaf_mut(&mut self, face: u32) -> Option<&mut AabbNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.children.is_none() {
                if node.face == Some(face) {
                    return Some(node);
                }
                continue;
            }
            if let Some(children) = node.children.as_mut() {
                let [left, right] = &mut **children;
                stack.push(right);
                stack.push(left);
            }
        }
        None
    }

    /// Replaces the leaf of `face` with an internal node holding two leaves
    ///
    /// Used when a face is cut in two: the leaves reference the cut face and the
    /// newly created remainder.
    pub fn split_leaf(&mut self, face: u32, cut: AabbNode, remainder: AabbNode) -> Result<()> {
        let leaf = self
            .find_leaf_mut(face)
            .ok_or_else(|| Error::InvalidAabb(format!("no leaf for face {face}")))?;

        leaf.min = leaf.min.min(cut.min).min(remainder.min);
        leaf.max = leaf.max.max(cut.max).max(remainder.max);
        leaf.set_children(Some(cut), Some(remainder))
    }

    fn for_each_mut(&mut self, mut f: impl FnMut(&mut AabbNode)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            f(node);
            if let Some(children) = node.children.as_mut() {
                let [left, right] = &mut **children;
                stack.push(right);
                stack.push(left);
            }
        }
    }

    fn first_leaf(&self, hit: impl Fn(&AabbNode) -> bool) -> Option<&AabbNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if !hit(node) {
                continue;
            }
            match node.children() {
                None => return Some(node),
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        None
    }

    fn all_leaves(&self, hit: impl Fn(&AabbNode) -> bool) -> Vec<&AabbNode> {
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if !hit(node) {
                continue;
            }
            match node.children() {
                None => result.push(node),
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        result
    }
}

/// Slab test of a 3D segment against a box
fn segment_intersects_box_3d(start: Vec3, end: Vec3, min: Vec3, max: Vec3) -> bool {
    let d = end - start;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for axis in 0..3 {
        if d[axis].abs() < f32::EPSILON {
            if start[axis] < min[axis] || start[axis] > max[axis] {
                return false;
            }
            continue;
        }

        let mut near = (min[axis] - start[axis]) / d[axis];
        let mut far = (max[axis] - start[axis]) / d[axis];
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }
        t0 = t0.max(near);
        t1 = t1.min(far);
        if t0 > t1 {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(x0: f32, y0: f32, x1: f32, y1: f32, face: u32) -> AabbNode {
        AabbNode::new(Vec3::new(x0, y0, 0.0), Vec3::new(x1, y1, 0.0), Some(face))
    }

    fn pair(left: AabbNode, right: AabbNode) -> AabbNode {
        let mut node = AabbNode::new(
            left.min().min(right.min()),
            left.max().max(right.max()),
            None,
        );
        node.set_children(Some(left), Some(right)).unwrap();
        node
    }

    /// Four unit squares in a row along X
    fn row_tree() -> AabbNode {
        pair(
            pair(leaf(0.0, 0.0, 1.0, 1.0, 0), leaf(1.0, 0.0, 2.0, 1.0, 1)),
            pair(leaf(2.0, 0.0, 3.0, 1.0, 2), leaf(3.0, 0.0, 4.0, 1.0, 3)),
        )
    }

    fn faces(nodes: &[&AabbNode]) -> Vec<u32> {
        nodes.iter().filter_map(|n| n.face()).collect()
    }

    #[test]
    fn test_constructor_normalizes_corners() {
        let node = AabbNode::new(Vec3::new(2.0, 0.0, 5.0), Vec3::new(1.0, 3.0, -1.0), None);
        assert_eq!(node.min(), Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(node.max(), Vec3::new(2.0, 3.0, 5.0));
    }

    #[test]
    fn test_set_children_requires_pairs() {
        let mut node = leaf(0.0, 0.0, 2.0, 1.0, 7);
        assert!(node
            .set_children(Some(leaf(0.0, 0.0, 1.0, 1.0, 0)), None)
            .is_err());
        assert!(node
            .set_children(None, Some(leaf(0.0, 0.0, 1.0, 1.0, 0)))
            .is_err());
        assert!(node.set_children(None, None).is_err());
        // A failed call leaves the leaf untouched
        assert!(node.is_leaf());
        assert_eq!(node.face(), Some(7));

        node.set_children(
            Some(leaf(0.0, 0.0, 1.0, 1.0, 0)),
            Some(leaf(1.0, 0.0, 2.0, 1.0, 1)),
        )
        .unwrap();
        assert!(!node.is_leaf());
        assert_eq!(node.face(), None);
    }

    #[test]
    fn test_point_query_completeness() {
        let tree = row_tree();
        for face in 0..4u32 {
            let p = Vec2::new(face as f32 + 0.5, 0.5);
            assert_eq!(faces(&tree.get_nodes_point(p)), vec![face]);
            assert_eq!(tree.get_node(p).and_then(|n| n.face()), Some(face));
        }
        assert!(tree.get_nodes_point(Vec2::new(5.0, 0.5)).is_empty());
        assert!(tree.get_node(Vec2::new(0.5, 3.0)).is_none());
    }

    #[test]
    fn test_get_node_prefers_left() {
        let tree = row_tree();
        // On the border of faces 1 and 2
        assert_eq!(tree.get_node(Vec2::new(2.0, 0.5)).unwrap().face(), Some(1));
        assert_eq!(faces(&tree.get_nodes_point(Vec2::new(2.0, 0.5))), vec![1, 2]);
    }

    #[test]
    fn test_region_queries() {
        let tree = row_tree();
        let boxed = tree.get_nodes_box_2d(Vec2::new(0.5, 0.2), Vec2::new(1.5, 0.4));
        assert_eq!(faces(&boxed), vec![0, 1]);

        let seg = tree.get_nodes_segment_2d(Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5));
        assert_eq!(faces(&seg), vec![0, 1, 2, 3]);

        let polygon = [
            Vec2::new(2.2, 0.2),
            Vec2::new(3.8, 0.2),
            Vec2::new(3.0, 0.8),
        ];
        assert_eq!(faces(&tree.get_nodes_polygon(&polygon)), vec![2, 3]);

        let ray = tree.get_nodes_segment_3d(Vec3::new(3.5, 0.5, 5.0), Vec3::new(3.5, 0.5, -5.0));
        assert_eq!(faces(&ray), vec![3]);
        assert!(tree
            .get_node_segment(Vec3::new(9.0, 0.5, 5.0), Vec3::new(9.0, 0.5, -5.0))
            .is_none());
    }

    #[test]
    fn test_translate_and_rotate() {
        let mut tree = row_tree();
        tree.translate(Vec3::new(10.0, 0.0, 1.0));
        assert_eq!(tree.min(), Vec3::new(10.0, 0.0, 1.0));
        assert_eq!(tree.get_node(Vec2::new(10.5, 0.5)).unwrap().face(), Some(0));

        let mut tree = row_tree();
        tree.rotate(Rotation::R90);
        // (x, y) -> (-y, x): the row now runs along +Y, left of the origin
        assert!(tree.min().distance(Vec3::new(-1.0, 0.0, 0.0)) < 1e-5);
        assert!(tree.max().distance(Vec3::new(0.0, 4.0, 0.0)) < 1e-5);
        assert_eq!(tree.get_node(Vec2::new(-0.5, 3.5)).unwrap().face(), Some(3));
        for node in tree.leaves() {
            assert!(node.min().cmple(node.max()).all());
        }
    }

    #[test]
    fn test_split_leaf() {
        let mut tree = row_tree();
        tree.split_leaf(
            2,
            leaf(2.0, 0.0, 2.5, 1.0, 2),
            leaf(2.5, 0.0, 3.0, 1.0, 9),
        )
        .unwrap();
        assert_eq!(tree.leaf_count(), 5);
        assert_eq!(tree.depth(), 4);
        assert_eq!(tree.get_node(Vec2::new(2.75, 0.5)).unwrap().face(), Some(9));
        assert!(tree
            .split_leaf(42, leaf(0.0, 0.0, 1.0, 1.0, 42), leaf(0.0, 0.0, 1.0, 1.0, 43))
            .is_err());
    }

    #[test]
    fn test_select_recursive() {
        let mut tree = row_tree();
        tree.select(true, true);
        assert!(tree.leaves().iter().all(|n| n.is_selected()));
        tree.select(false, false);
        assert!(!tree.is_selected());
        assert!(tree.leaves().iter().all(|n| n.is_selected()));
    }

    #[test]
    fn test_build_indexes_every_leaf() {
        let items: Vec<AabbNode> = (0..7u32)
            .map(|i| leaf(i as f32, 0.0, i as f32 + 1.0, 1.0, i))
            .collect();
        let tree = AabbNode::build(items).unwrap();

        assert_eq!(tree.leaf_count(), 7);
        assert!(tree.depth() <= 4);
        for i in 0..7u32 {
            let hits = tree.get_nodes_point(Vec2::new(i as f32 + 0.5, 0.5));
            assert_eq!(faces(&hits), vec![i]);
        }
        assert!(AabbNode::build(Vec::new()).is_none());
    }

    #[test]
    fn test_offset_faces() {
        let mut tree = row_tree();
        tree.offset_faces(100);
        assert_eq!(faces(&tree.leaves()), vec![100, 101, 102, 103]);
    }
}
