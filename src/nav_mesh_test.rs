use std::sync::Arc;

use glam::Vec3;
use googletest::{expect_that, matchers::*};

use crate::{
  link::{NavJumpConstraint, NavLink, NavLinkType},
  topography::NavTopography,
};

use super::{JumpLinkError, NavMesh, NavPolygon, TriangleRef};

fn triangle_ref(polygon_index: usize, triangle_index: usize) -> TriangleRef {
  TriangleRef { polygon_index, triangle_index }
}

/// A unit square at `height`, split along its diagonal from (0, 0) to (1, 1).
fn square(name: &str, height: f32) -> NavPolygon {
  NavPolygon::new(
    name,
    vec![
      Vec3::new(0.0, height, 0.0),
      Vec3::new(0.0, height, 1.0),
      Vec3::new(1.0, height, 1.0),
      Vec3::new(1.0, height, 0.0),
    ],
    vec![[0, 1, 2], [0, 2, 3]],
    None,
  )
}

#[test]
fn triangles_sharing_an_edge_are_linked_both_ways() {
  let nav_mesh = NavMesh::new(vec![square("square", 0.0)]);

  let triangles = nav_mesh.polygons()[0].triangles();
  assert_eq!(
    triangles[0].links(),
    &[NavLink::standard(2, triangle_ref(0, 1))]
  );
  assert_eq!(
    triangles[1].links(),
    &[NavLink::standard(0, triangle_ref(0, 0))]
  );
  assert!(nav_mesh.are_connected(triangle_ref(0, 0), triangle_ref(0, 1)));
}

#[test]
fn triangle_centers_and_areas() {
  let nav_mesh = NavMesh::new(vec![square("a", 0.0), square("b", 3.0)]);

  let polygon = &nav_mesh.polygons()[0];
  assert_eq!(
    polygon.triangles()[0].center(),
    Vec3::new(1.0 / 3.0, 0.0, 2.0 / 3.0)
  );
  assert_eq!(polygon.triangles()[1].indices(), [0, 2, 3]);
  assert_eq!(
    polygon.edge_points(1, 1),
    (Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0))
  );
  assert_eq!(polygon.compute_area(), 1.0);
  assert_eq!(nav_mesh.compute_area(), 2.0);
  assert_eq!(nav_mesh.triangle_count(), 4);
}

#[googletest::test]
fn nearby_boundary_edges_are_joined_over_their_overlap() {
  // The edge of "west" at x = 1 runs from z = 1 to z = 0. The edge of "east"
  // at x = 1.01 only covers z in [0, 0.5].
  let nav_mesh = NavMesh::new(vec![
    NavPolygon::new(
      "west",
      vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
      ],
      vec![[0, 1, 2]],
      None,
    ),
    NavPolygon::new(
      "east",
      vec![
        Vec3::new(1.01, 0.0, 0.0),
        Vec3::new(1.01, 0.0, 0.5),
        Vec3::new(2.0, 0.0, 0.0),
      ],
      vec![[0, 1, 2]],
      None,
    ),
  ]);

  let west_links = nav_mesh.polygons()[0].triangles()[0].links();
  expect_that!(west_links, len(eq(1)));
  let link = &west_links[0];
  expect_that!(link.link_type, eq(NavLinkType::JoinPolygons));
  expect_that!(link.source_edge_index, eq(1));
  expect_that!(link.target, eq(triangle_ref(1, 0)));
  let constraint = link.constraint.expect("join links are constrained");
  expect_that!(constraint.source_edge_start_range(), near(0.5, 1e-4));
  expect_that!(constraint.source_edge_end_range(), near(0.0, 1e-4));
  expect_that!(constraint.target_edge_index(), eq(0));

  let east_links = nav_mesh.polygons()[1].triangles()[0].links();
  expect_that!(east_links, len(eq(1)));
  let link = &east_links[0];
  expect_that!(link.source_edge_index, eq(0));
  expect_that!(link.target, eq(triangle_ref(0, 0)));
  let constraint = link.constraint.expect("join links are constrained");
  expect_that!(constraint.source_edge_start_range(), near(1.0, 1e-4));
  expect_that!(constraint.source_edge_end_range(), near(0.0, 1e-4));
  expect_that!(constraint.target_edge_index(), eq(1));

  assert!(nav_mesh.are_connected(triangle_ref(0, 0), triangle_ref(1, 0)));
}

#[test]
fn distant_polygons_are_not_joined() {
  let nav_mesh = NavMesh::new(vec![square("lower", 0.0), square("upper", 2.0)]);

  for polygon in nav_mesh.polygons() {
    for triangle in polygon.triangles() {
      assert!(triangle
        .links()
        .iter()
        .all(|link| link.link_type == NavLinkType::Standard));
    }
  }
  assert!(!nav_mesh.are_connected(triangle_ref(0, 0), triangle_ref(1, 0)));
}

#[test]
fn jump_links_join_regions() {
  let mut nav_mesh =
    NavMesh::new(vec![square("lower", 0.0), square("upper", 2.0)]);
  let constraint =
    NavJumpConstraint::new(0.75, 0.25, 2).expect("constraint is valid");

  nav_mesh
    .add_jump_link(triangle_ref(0, 1), 1, triangle_ref(1, 0), constraint)
    .expect("jump link is valid");

  assert_eq!(
    nav_mesh
      .triangle(triangle_ref(0, 1))
      .expect("triangle exists")
      .links()
      .last(),
    Some(&NavLink {
      link_type: NavLinkType::Jump,
      source_edge_index: 1,
      target: triangle_ref(1, 0),
      constraint: Some(constraint),
    })
  );
  assert!(nav_mesh.are_connected(triangle_ref(0, 0), triangle_ref(1, 1)));
}

#[test]
fn invalid_jump_links_are_rejected() {
  let mut nav_mesh = NavMesh::new(vec![square("square", 0.0)]);
  let constraint =
    NavJumpConstraint::new(1.0, 0.0, 0).expect("constraint is valid");

  assert_eq!(
    nav_mesh.add_jump_link(
      triangle_ref(0, 0),
      0,
      triangle_ref(3, 0),
      constraint
    ),
    Err(JumpLinkError::InvalidTriangle(triangle_ref(3, 0)))
  );
  assert_eq!(
    nav_mesh.add_jump_link(
      triangle_ref(0, 2),
      0,
      triangle_ref(0, 0),
      constraint
    ),
    Err(JumpLinkError::InvalidTriangle(triangle_ref(0, 2)))
  );
  assert_eq!(
    nav_mesh.add_jump_link(
      triangle_ref(0, 0),
      3,
      triangle_ref(0, 1),
      constraint
    ),
    Err(JumpLinkError::InvalidSourceEdge(3))
  );
  // Nothing was added.
  assert_eq!(
    nav_mesh.triangle(triangle_ref(0, 0)).expect("exists").links().len(),
    1
  );
}

#[test]
fn finds_the_triangle_under_a_point() {
  let nav_mesh = NavMesh::new(vec![square("lower", 0.0), square("upper", 2.0)]);

  assert_eq!(
    nav_mesh.find_triangle(Vec3::new(0.5, 2.5, 0.25)),
    Some(triangle_ref(1, 1))
  );
  assert_eq!(
    nav_mesh.find_triangle(Vec3::new(0.25, 1.0, 0.5)),
    Some(triangle_ref(0, 0))
  );
  // Points on the surface stand on it.
  assert_eq!(
    nav_mesh.find_triangle(Vec3::new(0.5, 2.0, 0.25)),
    Some(triangle_ref(1, 1))
  );
  assert_eq!(nav_mesh.find_triangle(Vec3::new(0.5, -0.5, 0.25)), None);
  assert_eq!(nav_mesh.find_triangle(Vec3::new(1.5, 3.0, 0.5)), None);
}

#[test]
fn points_on_shared_edges_pick_the_first_triangle() {
  let nav_mesh = NavMesh::new(vec![square("square", 0.0)]);

  assert_eq!(
    nav_mesh.find_triangle(Vec3::new(0.5, 0.0, 0.5)),
    Some(triangle_ref(0, 0))
  );
}

#[test]
fn empty_mesh_has_no_triangles() {
  let nav_mesh = NavMesh::new(vec![]);

  assert_eq!(nav_mesh.triangle_count(), 0);
  assert_eq!(nav_mesh.find_triangle(Vec3::ZERO), None);
  assert!(nav_mesh.polygon(0).is_none());
}

struct Flat;

impl NavTopography for Flat {
  fn follow_topography(&self, start: Vec3, end: Vec3) -> Vec<Vec3> {
    vec![start, end]
  }
}

#[test]
fn polygons_share_only_the_same_topography() {
  let flat: Arc<dyn NavTopography> = Arc::new(Flat);
  let other_flat: Arc<dyn NavTopography> = Arc::new(Flat);
  let with_topography = |topography: &Arc<dyn NavTopography>| {
    NavPolygon::new(
      "polygon",
      vec![Vec3::ZERO, Vec3::Z, Vec3::X],
      vec![[0, 1, 2]],
      Some(topography.clone()),
    )
  };
  let without_topography = NavPolygon::new(
    "polygon",
    vec![Vec3::ZERO, Vec3::Z, Vec3::X],
    vec![[0, 1, 2]],
    None,
  );

  assert!(with_topography(&flat).shares_topography(&with_topography(&flat)));
  assert!(
    !with_topography(&flat).shares_topography(&with_topography(&other_flat))
  );
  assert!(!with_topography(&flat).shares_topography(&without_topography));
  assert!(without_topography.shares_topography(&without_topography));
}
