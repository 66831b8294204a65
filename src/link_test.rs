use glam::Vec3;

use super::{JumpConstraintError, NavJumpConstraint};

#[test]
fn constraint_validates_ranges() {
  assert_eq!(
    NavJumpConstraint::new(1.5, 0.0, 0),
    Err(JumpConstraintError::RangeOutOfBounds { start: 1.5, end: 0.0 })
  );
  assert_eq!(
    NavJumpConstraint::new(1.0, -0.1, 0),
    Err(JumpConstraintError::RangeOutOfBounds { start: 1.0, end: -0.1 })
  );
  assert!(matches!(
    NavJumpConstraint::new(f32::NAN, 0.0, 0),
    Err(JumpConstraintError::RangeOutOfBounds { .. })
  ));
  assert_eq!(
    NavJumpConstraint::new(0.25, 0.75, 1),
    Err(JumpConstraintError::InvertedRange { start: 0.25, end: 0.75 })
  );
  assert_eq!(
    NavJumpConstraint::new(1.0, 0.0, 3),
    Err(JumpConstraintError::InvalidTargetEdge(3))
  );
}

#[test]
fn constraint_accepts_single_point_range() {
  let constraint =
    NavJumpConstraint::new(0.5, 0.5, 2).expect("constraint is valid");
  assert_eq!(constraint.source_edge_start_range(), 0.5);
  assert_eq!(constraint.source_edge_end_range(), 0.5);
  assert_eq!(constraint.target_edge_index(), 2);
}

#[test]
fn full_range_covers_the_whole_edge() {
  let constraint =
    NavJumpConstraint::new(1.0, 0.0, 0).expect("constraint is valid");
  let edge = (Vec3::new(1.0, 2.0, 3.0), Vec3::new(5.0, 2.0, -1.0));

  assert_eq!(constraint.compute_source_jump_edge(edge), edge);
}

#[test]
fn partial_range_weights_the_edge_start() {
  // Weights of the start point: 0.75 is a quarter of the way along the edge.
  let constraint =
    NavJumpConstraint::new(0.75, 0.25, 0).expect("constraint is valid");
  let edge = (Vec3::new(0.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 8.0));

  assert_eq!(
    constraint.compute_source_jump_edge(edge),
    (Vec3::new(1.0, 0.0, 2.0), Vec3::new(3.0, 0.0, 6.0))
  );
}

#[test]
fn errors_read_as_sentences() {
  assert_eq!(
    JumpConstraintError::InvertedRange { start: 0.25, end: 0.75 }.to_string(),
    "The edge range start (0.25) must be at least the range end (0.75)."
  );
  assert_eq!(
    JumpConstraintError::InvalidTargetEdge(4).to_string(),
    "The target edge index 4 must be 0, 1, or 2."
  );
}
