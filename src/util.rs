use glam::{Quat, Vec3};
use ord_subset::OrdVar;

/// An axis-aligned box. `min` is component-wise at most `max`.
#[derive(PartialEq, Clone, Copy, Debug)]
pub(crate) struct BoundingBox {
  pub(crate) min: Vec3,
  pub(crate) max: Vec3,
}

impl BoundingBox {
  /// The smallest box holding all of `points`, or `None` if there are none.
  pub(crate) fn around(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
    let mut points = points.into_iter();
    let first = points.next()?;
    Some(points.fold(Self::spanning(first, first), |bounds, point| {
      bounds.including(point)
    }))
  }

  /// The box with `a` and `b` at opposite corners.
  pub(crate) fn spanning(a: Vec3, b: Vec3) -> Self {
    Self { min: a.min(b), max: a.max(b) }
  }

  pub(crate) fn including(&self, point: Vec3) -> Self {
    Self { min: self.min.min(point), max: self.max.max(point) }
  }

  /// Moves every side of the box outward by `margin`.
  pub(crate) fn grow(&self, margin: f32) -> Self {
    Self { min: self.min - margin, max: self.max + margin }
  }

  fn union(&self, other: &Self) -> Self {
    Self { min: self.min.min(other.min), max: self.max.max(other.max) }
  }

  fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  fn longest_axis(&self) -> usize {
    let size = self.max - self.min;
    if size.x >= size.y && size.x >= size.z {
      0
    } else if size.y >= size.z {
      1
    } else {
      2
    }
  }

  /// Whether the boxes share any point, including along their sides.
  pub(crate) fn overlaps(&self, other: &Self) -> bool {
    self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
  }
}

/// The placement of a world object. Y is up.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Transform {
  /// The translation to apply.
  pub translation: Vec3,
  /// The rotation to apply (before translating).
  pub rotation: Quat,
}

impl Default for Transform {
  fn default() -> Self {
    Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY }
  }
}

impl Transform {
  /// Creates a transform that only translates.
  pub fn from_translation(translation: Vec3) -> Self {
    Self { translation, rotation: Quat::IDENTITY }
  }

  /// Applies the transformation.
  pub fn apply(&self, point: Vec3) -> Vec3 {
    self.rotation * point + self.translation
  }

  /// Rotates `direction` without translating it.
  pub fn apply_to_direction(&self, direction: Vec3) -> Vec3 {
    self.rotation * direction
  }

  /// Whether the rotation leaves every axis in place (within a small angle).
  pub(crate) fn has_identity_rotation(&self) -> bool {
    self.rotation.angle_between(Quat::IDENTITY) < 1e-4
  }
}

/// A bounding volume hierarchy over a list of boxes. The boxes are split at
/// the median of their centers along the longest axis.
#[derive(Clone, Debug)]
pub(crate) struct BoxTree {
  /// Depth-first order. A branch is directly followed by its first child.
  nodes: Vec<BoxTreeNode>,
}

#[derive(Clone, Debug)]
struct BoxTreeNode {
  bounds: BoundingBox,
  kind: BoxTreeNodeKind,
}

#[derive(Clone, Copy, Debug)]
enum BoxTreeNodeKind {
  /// Holds the index of its box.
  Leaf(usize),
  Branch { second_child: usize },
}

impl BoxTree {
  /// Builds the tree over `boxes`. Returns `None` if there are no boxes.
  pub(crate) fn new(boxes: &[BoundingBox]) -> Option<Self> {
    if boxes.is_empty() {
      return None;
    }
    let mut order = (0..boxes.len()).collect::<Vec<_>>();
    let mut nodes = Vec::with_capacity(boxes.len() * 2 - 1);
    Self::push_nodes(boxes, &mut order, &mut nodes);
    Some(Self { nodes })
  }

  fn push_nodes(
    boxes: &[BoundingBox],
    order: &mut [usize],
    nodes: &mut Vec<BoxTreeNode>,
  ) {
    let bounds = order[1..]
      .iter()
      .fold(boxes[order[0]], |bounds, &index| bounds.union(&boxes[index]));
    if order.len() == 1 {
      nodes.push(BoxTreeNode { bounds, kind: BoxTreeNodeKind::Leaf(order[0]) });
      return;
    }

    let axis = bounds.longest_axis();
    // Stable, so boxes with equal centers keep their order.
    order.sort_by_key(|&index| {
      OrdVar::new_unchecked(boxes[index].center()[axis])
    });

    let branch_index = nodes.len();
    nodes.push(BoxTreeNode {
      bounds,
      kind: BoxTreeNodeKind::Branch { second_child: 0 },
    });
    let (first, second) = order.split_at_mut(order.len() / 2);
    Self::push_nodes(boxes, first, nodes);
    nodes[branch_index].kind =
      BoxTreeNodeKind::Branch { second_child: nodes.len() };
    Self::push_nodes(boxes, second, nodes);
  }

  /// The indices of the boxes overlapping `query`, in ascending order.
  pub(crate) fn query(&self, query: &BoundingBox) -> Vec<usize> {
    let mut found = Vec::new();
    let mut pending = vec![0];
    while let Some(node_index) = pending.pop() {
      let node = &self.nodes[node_index];
      if !node.bounds.overlaps(query) {
        continue;
      }
      match node.kind {
        BoxTreeNodeKind::Leaf(index) => found.push(index),
        BoxTreeNodeKind::Branch { second_child } => {
          pending.push(second_child);
          pending.push(node_index + 1);
        }
      }
    }
    found.sort_unstable();
    found
  }
}

#[cfg(test)]
#[path = "util_test.rs"]
mod test;
