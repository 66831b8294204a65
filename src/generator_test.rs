use std::sync::Arc;

use glam::{Quat, Vec3};
use googletest::{expect_that, matchers::*};

use crate::{
  nav_mesh::{NavMesh, NavPolygon},
  shape::{Axis, Shape},
  util::Transform,
  AIObject, AIWorld, NavMeshAgent, NavMeshConfig, PathfindingAStar,
  PathfindingConfig,
};

use super::{GenerationError, NavMeshGenerator};

fn box_object(name: &str, half_size: Vec3, center: Vec3) -> AIObject {
  AIObject::new(
    name,
    Shape::Box { half_size },
    Transform::from_translation(center),
  )
}

/// A generator for agents with no radius, so walkable faces keep their
/// horizontal size.
fn thin_agent_generator() -> NavMeshGenerator {
  NavMeshGenerator::new(NavMeshConfig {
    agent: NavMeshAgent::new(1.0, 0.0),
    ..Default::default()
  })
}

fn find_polygon<'a>(
  nav_mesh: &'a NavMesh,
  name: &str,
) -> Option<&'a NavPolygon> {
  nav_mesh.polygons().iter().find(|polygon| polygon.name() == name)
}

/// Whether every triangle of `polygon` is counter-clockwise viewed from
/// above.
fn is_counter_clockwise(polygon: &NavPolygon) -> bool {
  (0..polygon.triangles().len()).all(|triangle_index| {
    let (a, b, c) = polygon.triangle_points(triangle_index);
    let (u, v) = (b - a, c - a);
    u.z * v.x - u.x * v.z > 0.0
  })
}

#[googletest::test]
fn floor_with_pillar_has_a_hole() {
  let mut world = AIWorld::new();
  world.add_object(box_object(
    "floor",
    Vec3::new(5.0, 0.5, 5.0),
    Vec3::ZERO,
  ));
  world.add_object(box_object(
    "pillar",
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(0.0, 1.0, 0.0),
  ));

  let nav_mesh =
    thin_agent_generator().generate(&world).expect("generation succeeds");

  let floor = find_polygon(&nav_mesh, "floor").expect("the floor is walkable");
  // The 10x10 top face shrinks by 0.005 on each side, then loses the 2x2
  // pillar.
  expect_that!(floor.compute_area(), near(9.99 * 9.99 - 4.0, 1e-3));
  // Four outline points and four hole points.
  expect_that!(floor.points(), len(eq(8)));
  expect_that!(floor.triangles(), len(eq(8)));
  expect_that!(floor.topography().is_none(), eq(true));
  for point in floor.points() {
    expect_that!(point.y, approx_eq(0.5));
  }
  expect_that!(is_counter_clockwise(floor), eq(true));

  // The top of the pillar is walkable too.
  let pillar = find_polygon(&nav_mesh, "pillar").expect("the top is walkable");
  expect_that!(pillar.compute_area(), near(1.99 * 1.99, 1e-3));
  expect_that!(nav_mesh.polygons(), len(eq(2)));
}

#[googletest::test]
fn fully_covered_face_is_skipped() {
  let mut world = AIWorld::new();
  world.add_object(box_object(
    "floor",
    Vec3::new(1.0, 0.5, 1.0),
    Vec3::ZERO,
  ));
  world.add_object(box_object(
    "cover",
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(0.0, 1.0, 0.0),
  ));

  let nav_mesh =
    thin_agent_generator().generate(&world).expect("generation succeeds");

  expect_that!(find_polygon(&nav_mesh, "floor").is_none(), eq(true));
  expect_that!(
    nav_mesh
      .polygons()
      .iter()
      .map(|polygon| polygon.name())
      .collect::<Vec<_>>(),
    elements_are!(eq(&"cover"))
  );
}

#[googletest::test]
fn walkable_area_shrinks_by_agent_radius_around_obstacles() {
  let mut world = AIWorld::new();
  world.add_object(box_object(
    "floor",
    Vec3::new(5.0, 0.5, 5.0),
    Vec3::ZERO,
  ));
  world.add_object(box_object(
    "crate",
    Vec3::new(0.5, 0.5, 0.5),
    Vec3::new(0.0, 1.0, 0.0),
  ));

  // The default agent has a radius of 0.25.
  let nav_mesh = NavMeshGenerator::default()
    .generate(&world)
    .expect("generation succeeds");

  let floor = find_polygon(&nav_mesh, "floor").expect("the floor is walkable");
  // The floor grows to 10.5 by 10.5 and the crate to 1.5 by 1.5.
  expect_that!(floor.compute_area(), near(10.49 * 10.49 - 2.25, 1e-2));
}

#[googletest::test]
fn abutting_floors_meet_along_an_edge() {
  let mut world = AIWorld::new();
  world.add_object(box_object(
    "west",
    Vec3::new(2.0, 0.5, 2.0),
    Vec3::new(-2.0, 0.0, 0.0),
  ));
  world.add_object(box_object(
    "east",
    Vec3::new(2.0, 0.5, 3.0),
    Vec3::new(2.0, 0.0, 0.0),
  ));

  let nav_mesh = NavMeshGenerator::default()
    .generate(&world)
    .expect("generation succeeds");

  // Both floors grow by 0.25 towards each other. The west floor keeps the
  // overlap and the east floor loses it.
  let west = find_polygon(&nav_mesh, "west").expect("west is walkable");
  expect_that!(west.compute_area(), near(4.49 * 4.49, 1e-2));
  let east = find_polygon(&nav_mesh, "east").expect("east is walkable");
  expect_that!(
    east.compute_area(),
    near(4.49 * 6.49 - 0.49 * 4.49, 1e-2)
  );
  expect_that!(is_counter_clockwise(east), eq(true));

  let pathfinder =
    PathfindingAStar::new(Arc::new(nav_mesh), PathfindingConfig::default());
  let start = Vec3::new(-3.0, 0.5, -1.0);
  let end = Vec3::new(3.0, 0.5, 2.5);
  let path = pathfinder.find_path(start, end);
  expect_that!(path.first().map(|point| point.point), some(eq(start)));
  expect_that!(path.last().map(|point| point.point), some(eq(end)));
  expect_that!(path.iter().any(|point| point.jump_point), eq(false));
}

#[googletest::test]
fn tilted_face_is_elevated_onto_its_own_plane() {
  let rotation = Quat::from_rotation_z(0.3);
  let mut world = AIWorld::new();
  world.add_object(AIObject::new(
    "ramp",
    Shape::Box { half_size: Vec3::new(3.0, 0.25, 2.0) },
    Transform { translation: Vec3::new(1.0, 2.0, -1.0), rotation },
  ));

  let nav_mesh = NavMeshGenerator::default()
    .generate(&world)
    .expect("generation succeeds");

  let ramp = find_polygon(&nav_mesh, "ramp").expect("the ramp is walkable");
  expect_that!(ramp.triangles(), not(empty()));
  let normal = rotation * Vec3::Y;
  let distance = normal.dot(Vec3::new(1.0, 2.0, -1.0) + normal * 0.25);
  for point in ramp.points() {
    expect_that!(normal.dot(*point) - distance, near(0.0, 1e-3));
  }
  expect_that!(is_counter_clockwise(ramp), eq(true));
}

#[googletest::test]
fn faces_steeper_than_max_slope_are_not_walkable() {
  let mut world = AIWorld::new();
  world.add_object(AIObject::new(
    "ramp",
    Shape::Box { half_size: Vec3::new(3.0, 0.25, 2.0) },
    Transform {
      translation: Vec3::ZERO,
      rotation: Quat::from_rotation_z(0.3),
    },
  ));

  let generator = NavMeshGenerator::new(NavMeshConfig {
    max_slope: 0.2,
    ..Default::default()
  });
  let nav_mesh = generator.generate(&world).expect("generation succeeds");

  expect_that!(nav_mesh.polygons(), empty());
}

#[googletest::test]
fn only_cylinder_caps_are_walkable() {
  let mut world = AIWorld::new();
  // Lying on its side, the caps of the cylinder are vertical.
  world.add_object(AIObject::new(
    "log",
    Shape::Cylinder { radius: 1.0, height: 4.0, axis: Axis::X },
    Transform::default(),
  ));
  world.add_object(AIObject::new(
    "post",
    Shape::Cylinder { radius: 1.0, height: 4.0, axis: Axis::Y },
    Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
  ));

  let nav_mesh = NavMeshGenerator::default()
    .generate(&world)
    .expect("generation succeeds");

  expect_that!(
    nav_mesh
      .polygons()
      .iter()
      .map(|polygon| polygon.name())
      .collect::<Vec<_>>(),
    elements_are!(eq(&"post"))
  );
}

#[googletest::test]
fn flat_terrain_becomes_one_polygon_with_topography() {
  let mut world = AIWorld::new();
  world.add_object(AIObject::new(
    "ground",
    Shape::Terrain {
      x_len: 3,
      z_len: 3,
      spacing: 1.0,
      heights: vec![1.0; 9],
    },
    Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
  ));

  let nav_mesh = NavMeshGenerator::default()
    .generate(&world)
    .expect("generation succeeds");

  expect_that!(nav_mesh.polygons(), len(eq(1)));
  let ground = &nav_mesh.polygons()[0];
  expect_that!(ground.name(), eq("ground"));
  expect_that!(ground.topography().is_some(), eq(true));
  expect_that!(ground.compute_area(), near(1.99 * 1.99, 1e-3));
  for point in ground.points() {
    expect_that!(point.y, approx_eq(1.0));
    expect_that!(point.x, ge(9.0));
  }
}

#[googletest::test]
fn steep_terrain_squares_are_cut_out() {
  let mut world = AIWorld::new();
  // The square between x = 0 and x = 1 rises by 5 and is too steep.
  world.add_object(AIObject::new(
    "hill",
    Shape::Terrain {
      x_len: 3,
      z_len: 2,
      spacing: 1.0,
      heights: vec![0.0, 0.0, 5.0, 0.0, 0.0, 5.0],
    },
    Transform::default(),
  ));

  let nav_mesh = NavMeshGenerator::default()
    .generate(&world)
    .expect("generation succeeds");

  let hill = find_polygon(&nav_mesh, "hill").expect("the foot is walkable");
  expect_that!(hill.compute_area(), near(0.995 * 0.99, 1e-3));
  for point in hill.points() {
    expect_that!(point.x, le(0.0));
    expect_that!(point.y, approx_eq(0.0));
  }
}

#[googletest::test]
fn solids_on_terrain_are_cut_out() {
  let mut world = AIWorld::new();
  world.add_object(AIObject::new(
    "ground",
    Shape::Terrain {
      x_len: 5,
      z_len: 5,
      spacing: 1.0,
      heights: vec![0.0; 25],
    },
    Transform::default(),
  ));
  world.add_object(box_object(
    "crate",
    Vec3::new(0.5, 0.5, 0.5),
    Vec3::new(0.0, 0.5, 0.0),
  ));

  let nav_mesh = NavMeshGenerator::default()
    .generate(&world)
    .expect("generation succeeds");

  let ground = find_polygon(&nav_mesh, "ground").expect("ground is walkable");
  // The crate grows by the default agent radius of 0.25.
  expect_that!(ground.compute_area(), near(3.99 * 3.99 - 2.25, 1e-2));
  // Terrains never cut holes into solids.
  let crate_top = find_polygon(&nav_mesh, "crate").expect("crate is walkable");
  expect_that!(crate_top.compute_area(), near(1.49 * 1.49, 1e-2));
}

#[test]
fn malformed_shape_aborts_generation() {
  let mut world = AIWorld::new();
  world.add_object(box_object("floor", Vec3::new(5.0, 0.5, 5.0), Vec3::ZERO));
  world.add_object(AIObject::new(
    "broken",
    Shape::Sphere { radius: -1.0 },
    Transform::default(),
  ));

  assert_eq!(
    NavMeshGenerator::default().generate(&world).map(|_| ()),
    Err(GenerationError::MalformedShape {
      object: "broken".to_string(),
      reason: "sphere radius must be positive".to_string(),
    })
  );
}

#[test]
fn rotated_terrain_is_unsupported() {
  let mut world = AIWorld::new();
  world.add_object(AIObject::new(
    "tilted",
    Shape::Terrain {
      x_len: 2,
      z_len: 2,
      spacing: 1.0,
      heights: vec![0.0; 4],
    },
    Transform {
      translation: Vec3::ZERO,
      rotation: Quat::from_rotation_y(0.5),
    },
  ));

  let error = NavMeshGenerator::default()
    .generate(&world)
    .expect_err("rotated terrains are rejected");
  assert_eq!(
    error.to_string(),
    "The object \"tilted\" has an unsupported shape: terrains cannot be \
     rotated."
  );
}

#[test]
fn empty_world_generates_empty_mesh() {
  let nav_mesh = NavMeshGenerator::default()
    .generate(&AIWorld::new())
    .expect("generation succeeds");

  assert_eq!(nav_mesh.polygons().len(), 0);
  assert_eq!(nav_mesh.triangle_count(), 0);
}

#[test]
fn generator_keeps_its_config() {
  let config = NavMeshConfig {
    agent: NavMeshAgent::new(2.0, 0.5),
    max_slope: 0.5,
  };
  assert_eq!(NavMeshGenerator::new(config).config(), &config);
}
