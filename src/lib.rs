#![doc = include_str!("../README.md")]

mod astar;
mod csg;
mod generator;
mod geometry;
mod link;
mod monotone;
mod nav_mesh;
mod path;
mod pathfinding;
mod polytope;
mod shape;
mod topography;
mod triangulation;
mod util;

pub use glam::{Quat, Vec3};

pub use csg::CsgPolygon;
pub use generator::{GenerationError, NavMeshGenerator};
pub use link::{JumpConstraintError, NavJumpConstraint, NavLink, NavLinkType};
pub use nav_mesh::{
  JumpLinkError, NavMesh, NavPolygon, NavTriangle, TriangleRef,
};
pub use path::{PathPoint, PathPortal};
pub use pathfinding::PathfindingAStar;
pub use polytope::{
  find_walkable_faces, Polyhedron, PolyhedronFace, PolyhedronFaceIndex,
  PolyhedronPoint,
};
pub use shape::{Axis, Heightfield, Shape};
pub use topography::{NavTopography, TerrainTopography};
pub use triangulation::Triangulation;
pub use util::Transform;

/// An object in the world that navigation is generated from.
#[derive(Clone, Debug, PartialEq)]
pub struct AIObject {
  /// The name of the object. Used to tag generated polygons and in errors.
  pub name: String,
  /// The shape of the object in its own space.
  pub shape: Shape,
  /// The placement of the object in the world.
  pub transform: Transform,
}

impl AIObject {
  pub fn new(
    name: impl Into<String>,
    shape: Shape,
    transform: Transform,
  ) -> Self {
    Self { name: name.into(), shape, transform }
  }
}

/// A snapshot of every object that takes part in navigation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AIWorld {
  /// The objects in the world, in order.
  pub objects: Vec<AIObject>,
}

impl AIWorld {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_object(&mut self, object: AIObject) {
    self.objects.push(object);
  }
}

/// The size of the agents that walk the generated mesh. Agents are treated as
/// upright cylinders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavMeshAgent {
  /// The full height of the agent.
  pub height: f32,
  /// The horizontal radius of the agent.
  pub radius: f32,
}

impl Default for NavMeshAgent {
  fn default() -> Self {
    Self { height: 1.8, radius: 0.25 }
  }
}

impl NavMeshAgent {
  pub fn new(height: f32, radius: f32) -> Self {
    Self { height, radius }
  }

  /// Computes how far a plane with `normal` must move outward so that the
  /// agent touching the moved plane just touches the original one. `normal`
  /// must be normalized.
  pub fn compute_expand_distance(&self, normal: Vec3) -> f32 {
    let horizontal = (normal.x * normal.x + normal.z * normal.z).sqrt();
    self.radius * horizontal + self.height * 0.5 * normal.y.abs()
  }
}

/// Options for generating a navigation mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavMeshConfig {
  /// The agent the mesh is generated for.
  pub agent: NavMeshAgent,
  /// The steepest slope (in radians) that an agent can walk on. Faces at
  /// this angle or steeper are not walkable.
  pub max_slope: f32,
}

impl Default for NavMeshConfig {
  fn default() -> Self {
    Self {
      agent: NavMeshAgent::default(),
      max_slope: std::f32::consts::FRAC_PI_4,
    }
  }
}

/// Options for finding paths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathfindingConfig {
  /// The cost added to a path for every jump it takes.
  pub jump_additional_cost: f32,
}

impl Default for PathfindingConfig {
  fn default() -> Self {
    Self { jump_additional_cost: 2.0 }
  }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
