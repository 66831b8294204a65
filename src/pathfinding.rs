use std::sync::Arc;

use glam::Vec3;

use crate::{
  astar::{self, AStarProblem},
  link::NavLink,
  nav_mesh::{NavMesh, TriangleRef},
  path::{
    add_missing_transition_points, build_portals, portals_to_path_points,
    resolve_funnel, PathPoint,
  },
  PathfindingConfig,
};

/// A link of a nav mesh, identified by the triangle that owns it and its
/// index in that triangle's links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LinkRef {
  source: TriangleRef,
  link_index: usize,
}

struct NavMeshPathProblem<'a> {
  pathfinder: &'a PathfindingAStar,
  start_point: Vec3,
  start_triangle: TriangleRef,
  end_point: Vec3,
  end_triangle: TriangleRef,
}

impl<'a> NavMeshPathProblem<'a> {
  /// Finds the links that `actions` refer to.
  fn resolve_steps(
    &self,
    actions: &[LinkRef],
  ) -> Vec<(TriangleRef, &'a NavLink)> {
    let nav_mesh: &'a NavMesh = self.pathfinder.nav_mesh.as_ref();
    actions
      .iter()
      .map(|link_ref| {
        let triangle = nav_mesh
          .triangle(link_ref.source)
          .expect("link sources come from the searched mesh");
        (link_ref.source, &triangle.links()[link_ref.link_index])
      })
      .collect()
  }
}

impl AStarProblem for NavMeshPathProblem<'_> {
  type ActionType = LinkRef;
  type StateType = TriangleRef;

  fn initial_state(&self) -> Self::StateType {
    self.start_triangle
  }

  fn successors(
    &self,
    state: &Self::StateType,
  ) -> Vec<(Self::ActionType, Self::StateType)> {
    let Some(triangle) = self.pathfinder.nav_mesh.triangle(*state) else {
      return vec![];
    };
    triangle
      .links()
      .iter()
      .enumerate()
      .map(|(link_index, link)| {
        (LinkRef { source: *state, link_index }, link.target)
      })
      .collect()
  }

  // The cost of reaching a triangle is the length of the straightened path
  // from the start point to the triangle's center.
  fn path_cost(&self, actions: &[Self::ActionType]) -> f32 {
    let nav_mesh = &self.pathfinder.nav_mesh;
    let steps = self.resolve_steps(actions);
    let Some(target_center) = steps
      .last()
      .and_then(|(_, link)| nav_mesh.triangle(link.target))
      .map(|triangle| triangle.center())
    else {
      return 0.0;
    };

    let mut portals = build_portals(
      nav_mesh,
      self.start_point,
      self.start_triangle,
      &steps,
      target_center,
    );
    resolve_funnel(&mut portals);
    add_missing_transition_points(&mut portals, nav_mesh);
    self.pathfinder.compute_path_cost(&portals_to_path_points(
      &portals, nav_mesh, /* follow_topography= */ false,
    ))
  }

  fn heuristic(&self, state: &Self::StateType) -> f32 {
    let Some(triangle) = self.pathfinder.nav_mesh.triangle(*state) else {
      return 0.0;
    };
    let delta = (triangle.center() - self.end_point).abs();
    delta.x + delta.y + delta.z
  }

  fn is_goal_state(&self, state: &Self::StateType) -> bool {
    *state == self.end_triangle
  }
}

/// Finds paths over a [`NavMesh`].
#[derive(Clone, Debug)]
pub struct PathfindingAStar {
  nav_mesh: Arc<NavMesh>,
  config: PathfindingConfig,
}

impl PathfindingAStar {
  pub fn new(nav_mesh: Arc<NavMesh>, config: PathfindingConfig) -> Self {
    Self { nav_mesh, config }
  }

  pub fn nav_mesh(&self) -> &NavMesh {
    &self.nav_mesh
  }

  pub fn config(&self) -> &PathfindingConfig {
    &self.config
  }

  /// Finds a path from `start_point` to `end_point`. The path includes both
  /// points. Returns an empty path if either point is off the mesh or no
  /// sequence of links connects them.
  pub fn find_path(
    &self,
    start_point: Vec3,
    end_point: Vec3,
  ) -> Vec<PathPoint> {
    let nav_mesh = self.nav_mesh.as_ref();
    let (Some(start_triangle), Some(end_triangle)) =
      (nav_mesh.find_triangle(start_point), nav_mesh.find_triangle(end_point))
    else {
      log::debug!(
        "No path from {start_point} to {end_point}: a point is off the mesh."
      );
      return vec![];
    };
    if !nav_mesh.are_connected(start_triangle, end_triangle) {
      log::debug!(
        "No path from {start_point} to {end_point}: the triangles are in \
         different regions."
      );
      return vec![];
    }

    let problem = NavMeshPathProblem {
      pathfinder: self,
      start_point,
      start_triangle,
      end_point,
      end_triangle,
    };
    let result = match astar::find_path(&problem) {
      Ok(result) => result,
      Err(stats) => {
        log::debug!(
          "No path from {start_point} to {end_point} after exploring {} \
           triangles.",
          stats.explored_nodes
        );
        return vec![];
      }
    };

    let steps = problem.resolve_steps(&result.path);
    let mut portals =
      build_portals(nav_mesh, start_point, start_triangle, &steps, end_point);
    resolve_funnel(&mut portals);
    add_missing_transition_points(&mut portals, nav_mesh);
    let path = portals_to_path_points(
      &portals, nav_mesh, /* follow_topography= */ true,
    );

    log::debug!(
      "Found a path of {} points over {} links after exploring {} triangles.",
      path.len(),
      steps.len(),
      result.stats.explored_nodes
    );
    path
  }

  /// Computes the cost of following `path`: its length plus the jump cost for
  /// every jump it takes.
  pub fn compute_path_cost(&self, path: &[PathPoint]) -> f32 {
    let length: f32 =
      path.windows(2).map(|pair| pair[0].point.distance(pair[1].point)).sum();
    let jumps = path
      .iter()
      .take(path.len().saturating_sub(1))
      .filter(|point| point.jump_point)
      .count();
    length + jumps as f32 * self.config.jump_additional_cost
  }
}

#[cfg(test)]
#[path = "pathfinding_test.rs"]
mod test;
