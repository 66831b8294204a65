use glam::Vec3;
use thiserror::Error;

use crate::nav_mesh::TriangleRef;

/// The kind of traversal a link represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavLinkType {
  /// The triangles share an edge within the same polygon.
  Standard,
  /// The triangles belong to different polygons but share part of a boundary
  /// edge.
  JoinPolygons,
  /// The agent leaps from an edge of one triangle to a possibly distant
  /// triangle.
  Jump,
}

/// A directed connection from a triangle (the owner of the link) to another
/// triangle.
#[derive(Clone, Debug, PartialEq)]
pub struct NavLink {
  pub link_type: NavLinkType,
  /// The edge of the source triangle the link leaves from. Edge `i` goes from
  /// point `i` to point `(i + 1) % 3`.
  pub source_edge_index: usize,
  /// The triangle the link leads to.
  pub target: TriangleRef,
  /// The part of the source edge (and the target edge) the link applies to.
  /// Always present for join and jump links.
  pub constraint: Option<NavJumpConstraint>,
}

impl NavLink {
  pub(crate) fn standard(
    source_edge_index: usize,
    target: TriangleRef,
  ) -> Self {
    Self {
      link_type: NavLinkType::Standard,
      source_edge_index,
      target,
      constraint: None,
    }
  }
}

/// An error when creating a [`NavJumpConstraint`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum JumpConstraintError {
  #[error("The edge range ({start}, {end}) must lie within [0, 1].")]
  RangeOutOfBounds { start: f32, end: f32 },
  #[error(
    "The edge range start ({start}) must be at least the range end ({end})."
  )]
  InvertedRange { start: f32, end: f32 },
  #[error("The target edge index {0} must be 0, 1, or 2.")]
  InvalidTargetEdge(usize),
}

/// Restricts a link to part of its source edge. The range is expressed as
/// weights of the edge's start point: a point `s` along the range is
/// `s * A + (1 - s) * B` for the source edge from `A` to `B`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavJumpConstraint {
  source_edge_start_range: f32,
  source_edge_end_range: f32,
  target_edge_index: usize,
}

impl NavJumpConstraint {
  pub fn new(
    source_edge_start_range: f32,
    source_edge_end_range: f32,
    target_edge_index: usize,
  ) -> Result<Self, JumpConstraintError> {
    let in_bounds = |value: f32| (0.0..=1.0).contains(&value);
    if !in_bounds(source_edge_start_range) || !in_bounds(source_edge_end_range)
    {
      return Err(JumpConstraintError::RangeOutOfBounds {
        start: source_edge_start_range,
        end: source_edge_end_range,
      });
    }
    if source_edge_start_range < source_edge_end_range {
      return Err(JumpConstraintError::InvertedRange {
        start: source_edge_start_range,
        end: source_edge_end_range,
      });
    }
    if target_edge_index > 2 {
      return Err(JumpConstraintError::InvalidTargetEdge(target_edge_index));
    }
    Ok(Self {
      source_edge_start_range,
      source_edge_end_range,
      target_edge_index,
    })
  }

  pub fn source_edge_start_range(&self) -> f32 {
    self.source_edge_start_range
  }

  pub fn source_edge_end_range(&self) -> f32 {
    self.source_edge_end_range
  }

  /// The edge of the target triangle that the link lands on.
  pub fn target_edge_index(&self) -> usize {
    self.target_edge_index
  }

  /// The sub-segment of the source edge (`start`, `end`) covered by the
  /// constraint, in the direction of the edge.
  pub fn compute_source_jump_edge(
    &self,
    source_edge: (Vec3, Vec3),
  ) -> (Vec3, Vec3) {
    let (start, end) = source_edge;
    (
      start * self.source_edge_start_range
        + end * (1.0 - self.source_edge_start_range),
      start * self.source_edge_end_range
        + end * (1.0 - self.source_edge_end_range),
    )
  }
}

#[cfg(test)]
#[path = "link_test.rs"]
mod test;
