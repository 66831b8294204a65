use glam::Vec3;
use googletest::{expect_that, matchers::*};

use crate::{shape::Shape, util::Transform};

use super::{AIObject, AIWorld, NavMeshAgent, NavMeshConfig, PathfindingConfig};

#[googletest::test]
fn expand_distance_depends_on_face_direction() {
  let agent = NavMeshAgent::new(2.0, 0.5);

  expect_that!(agent.compute_expand_distance(Vec3::Y), approx_eq(1.0));
  expect_that!(agent.compute_expand_distance(Vec3::NEG_Y), approx_eq(1.0));
  expect_that!(agent.compute_expand_distance(Vec3::X), approx_eq(0.5));
  expect_that!(agent.compute_expand_distance(Vec3::NEG_Z), approx_eq(0.5));

  let diagonal = Vec3::new(1.0, 1.0, 0.0).normalize();
  expect_that!(
    agent.compute_expand_distance(diagonal),
    near(1.5 * std::f32::consts::FRAC_1_SQRT_2, 1e-5)
  );
}

#[test]
fn defaults() {
  assert_eq!(NavMeshAgent::default(), NavMeshAgent::new(1.8, 0.25));
  assert_eq!(
    NavMeshConfig::default(),
    NavMeshConfig {
      agent: NavMeshAgent::new(1.8, 0.25),
      max_slope: std::f32::consts::FRAC_PI_4,
    }
  );
  assert_eq!(PathfindingConfig::default().jump_additional_cost, 2.0);
}

#[test]
fn world_keeps_objects_in_order() {
  let mut world = AIWorld::new();
  world.add_object(AIObject::new(
    "first",
    Shape::Sphere { radius: 1.0 },
    Transform::default(),
  ));
  world.add_object(AIObject::new(
    String::from("second"),
    Shape::Box { half_size: Vec3::ONE },
    Transform::from_translation(Vec3::X),
  ));

  let names: Vec<_> =
    world.objects.iter().map(|object| object.name.as_str()).collect();
  assert_eq!(names, ["first", "second"]);
  assert_eq!(world.objects[1].transform.translation, Vec3::X);
}
