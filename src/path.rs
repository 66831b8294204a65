use glam::Vec3;

use crate::{
  geometry::project_point_to_line_segment,
  link::{NavLink, NavLinkType},
  nav_mesh::{NavMesh, TriangleRef},
};

/// Points closer than this (squared) are treated as the same point.
const POINT_EPSILON_SQUARED: f32 = 1e-10;

/// A segment of the corridor that a path must cross.
#[derive(Clone, Debug, PartialEq)]
pub struct PathPortal {
  /// The ends of the portal. The first point is on the traveller's left.
  pub portal: (Vec3, Vec3),
  /// Where the path crosses the portal, once it is known.
  pub transition_point: Option<Vec3>,
  /// Whether the agent jumps off the corridor from this portal. The portal
  /// after a jump origin is always the landing portal.
  pub jump_origin: bool,
  /// The triangle the path leaves through this portal. `None` for the start
  /// portal.
  pub previous_triangle: Option<TriangleRef>,
  /// The triangle the path enters through this portal. `None` for the end
  /// portal.
  pub next_triangle: Option<TriangleRef>,
}

impl PathPortal {
  /// A portal that is only a single point, which the path must pass through.
  fn point(
    point: Vec3,
    previous_triangle: Option<TriangleRef>,
    next_triangle: Option<TriangleRef>,
  ) -> Self {
    Self {
      portal: (point, point),
      transition_point: Some(point),
      jump_origin: false,
      previous_triangle,
      next_triangle,
    }
  }
}

/// A point along a path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
  pub point: Vec3,
  /// Whether the agent jumps from this point to the next one.
  pub jump_point: bool,
}

/// Creates the portals crossed by following `steps` from `start` (in
/// `start_triangle`) to `end`. Each step is a link and the triangle that owns
/// it.
pub(crate) fn build_portals(
  nav_mesh: &NavMesh,
  start: Vec3,
  start_triangle: TriangleRef,
  steps: &[(TriangleRef, &NavLink)],
  end: Vec3,
) -> Vec<PathPortal> {
  let mut portals = Vec::with_capacity(steps.len() + 2);
  portals.push(PathPortal::point(start, None, Some(start_triangle)));

  let mut last_triangle = start_triangle;
  let mut last_portal = (start, start);
  for &(source, link) in steps {
    let source_edge = nav_mesh.polygons()[source.polygon_index]
      .edge_points(source.triangle_index, link.source_edge_index);
    let crossed_edge = match &link.constraint {
      Some(constraint) => constraint.compute_source_jump_edge(source_edge),
      None => source_edge,
    };

    let is_jump =
      link.link_type == NavLinkType::Jump && link.constraint.is_some();
    last_portal = orient_portal(last_portal, crossed_edge);
    portals.push(PathPortal {
      portal: last_portal,
      transition_point: None,
      jump_origin: is_jump,
      previous_triangle: Some(source),
      next_triangle: Some(link.target),
    });

    if let (true, Some(constraint)) = (is_jump, &link.constraint) {
      let landing_edge = nav_mesh.polygons()[link.target.polygon_index]
        .edge_points(
          link.target.triangle_index,
          constraint.target_edge_index(),
        );
      last_portal = orient_portal(last_portal, landing_edge);
      portals.push(PathPortal {
        portal: last_portal,
        transition_point: None,
        jump_origin: false,
        previous_triangle: Some(source),
        next_triangle: Some(link.target),
      });
    }
    last_triangle = link.target;
  }

  portals.push(PathPortal::point(end, Some(last_triangle), None));
  portals
}

fn midpoint(segment: (Vec3, Vec3)) -> Vec3 {
  (segment.0 + segment.1) * 0.5
}

/// Orders the ends of `edge` so the first is on the left of a traveller
/// heading from the middle of `previous` to the middle of `edge`.
fn orient_portal(
  previous: (Vec3, Vec3),
  edge: (Vec3, Vec3),
) -> (Vec3, Vec3) {
  if triangle_area_2(midpoint(previous), midpoint(edge), edge.0) < 0.0 {
    (edge.1, edge.0)
  } else {
    edge
  }
}

/// Twice the signed area of the triangle (`apex`, `a`, `b`) viewed from above.
/// Positive when `b` is left of the ray from `apex` through `a`.
fn triangle_area_2(apex: Vec3, a: Vec3, b: Vec3) -> f32 {
  let u = a - apex;
  let v = b - apex;
  u.z * v.x - u.x * v.z
}

fn same_point(a: Vec3, b: Vec3) -> bool {
  a.distance_squared(b) < POINT_EPSILON_SQUARED
}

/// The string-pulling state: the apex and both sides of the funnel.
struct Funnel {
  apex: Vec3,
  left: Vec3,
  left_index: usize,
  right: Vec3,
  right_index: usize,
}

impl Funnel {
  fn new(apex: Vec3, apex_index: usize) -> Self {
    Self {
      apex,
      left: apex,
      left_index: apex_index,
      right: apex,
      right_index: apex_index,
    }
  }
}

/// Runs the funnel algorithm over `portals`, setting the transition point of
/// every portal the straightened path bends or jumps at. The first and last
/// portals must be single points.
pub(crate) fn resolve_funnel(portals: &mut [PathPortal]) {
  assert!(portals.len() >= 2, "paths have a start and an end portal");
  let mut funnel = Funnel::new(portals[0].portal.0, 0);

  // Emits the corner at `index` and restarts the funnel from it.
  fn turn_at(
    portals: &mut [PathPortal],
    funnel: &mut Funnel,
    corner: Vec3,
    index: usize,
  ) -> usize {
    if !same_point(corner, funnel.apex) {
      portals[index].transition_point = Some(corner);
    }
    *funnel = Funnel::new(corner, index);
    index + 1
  }

  let mut index = 1;
  while index < portals.len() {
    let is_last = index == portals.len() - 1;
    let portal = &portals[index];

    if portal.jump_origin || is_last {
      let target = if is_last {
        portal.portal.0
      } else {
        project_point_to_line_segment(funnel.apex, portal.portal).0
      };

      if !same_point(funnel.apex, funnel.right)
        && triangle_area_2(funnel.apex, funnel.right, target) < 0.0
      {
        let (corner, corner_index) = (funnel.right, funnel.right_index);
        index = turn_at(portals, &mut funnel, corner, corner_index);
        continue;
      }
      if !same_point(funnel.apex, funnel.left)
        && triangle_area_2(funnel.apex, funnel.left, target) > 0.0
      {
        let (corner, corner_index) = (funnel.left, funnel.left_index);
        index = turn_at(portals, &mut funnel, corner, corner_index);
        continue;
      }
      if is_last {
        break;
      }

      assert!(
        index + 2 < portals.len(),
        "jump origin portals are followed by a landing portal"
      );
      portals[index].transition_point = Some(target);
      let landing =
        project_point_to_line_segment(target, portals[index + 1].portal).0;
      portals[index + 1].transition_point = Some(landing);
      funnel = Funnel::new(landing, index + 1);
      index += 2;
      continue;
    }

    let (portal_left, portal_right) = portal.portal;

    if triangle_area_2(funnel.apex, funnel.right, portal_right) >= 0.0 {
      if same_point(funnel.apex, funnel.right)
        || triangle_area_2(funnel.apex, funnel.left, portal_right) < 0.0
      {
        funnel.right = portal_right;
        funnel.right_index = index;
      } else {
        let (corner, corner_index) = (funnel.left, funnel.left_index);
        index = turn_at(portals, &mut funnel, corner, corner_index);
        continue;
      }
    }

    if triangle_area_2(funnel.apex, funnel.left, portal_left) <= 0.0 {
      if same_point(funnel.apex, funnel.left)
        || triangle_area_2(funnel.apex, funnel.right, portal_left) > 0.0
      {
        funnel.left = portal_left;
        funnel.left_index = index;
      } else {
        let (corner, corner_index) = (funnel.right, funnel.right_index);
        index = turn_at(portals, &mut funnel, corner, corner_index);
        continue;
      }
    }

    index += 1;
  }
}

/// Gives a transition point to every portal between polygons that do not
/// share a topography, so each stretch of the path stays on one surface. The
/// point is the closest point on the portal to the previous transition point.
pub(crate) fn add_missing_transition_points(
  portals: &mut [PathPortal],
  nav_mesh: &NavMesh,
) {
  let Some(mut previous_point) =
    portals.first().and_then(|portal| portal.transition_point)
  else {
    return;
  };

  for portal in portals.iter_mut() {
    if let Some(point) = portal.transition_point {
      previous_point = point;
      continue;
    }
    let (Some(previous_triangle), Some(next_triangle)) =
      (portal.previous_triangle, portal.next_triangle)
    else {
      continue;
    };
    let polygons = nav_mesh.polygons();
    if polygons[previous_triangle.polygon_index]
      .shares_topography(&polygons[next_triangle.polygon_index])
    {
      continue;
    }

    let point = project_point_to_line_segment(previous_point, portal.portal).0;
    portal.transition_point = Some(point);
    previous_point = point;
  }
}

/// Converts resolved portals into path points. With `follow_topography`,
/// walked stretches over polygons with a topography hug that surface.
pub(crate) fn portals_to_path_points(
  portals: &[PathPortal],
  nav_mesh: &NavMesh,
  follow_topography: bool,
) -> Vec<PathPoint> {
  fn push_point(points: &mut Vec<PathPoint>, point: PathPoint) {
    match points.last_mut() {
      Some(last) if same_point(last.point, point.point) => {
        last.jump_point |= point.jump_point;
      }
      _ => points.push(point),
    }
  }

  let mut points: Vec<PathPoint> = Vec::new();
  let mut previous_portal: Option<(&PathPortal, Vec3)> = None;
  for portal in portals {
    let Some(point) = portal.transition_point else {
      continue;
    };

    if let (true, Some((previous, previous_point))) =
      (follow_topography, previous_portal)
    {
      // Nothing to follow while in the air.
      let topography = previous
        .next_triangle
        .filter(|_| !previous.jump_origin)
        .and_then(|triangle| nav_mesh.polygon(triangle.polygon_index))
        .and_then(|polygon| polygon.topography());
      if let Some(topography) = topography {
        let followed = topography.follow_topography(previous_point, point);
        let inner = followed.len().saturating_sub(2);
        for &followed_point in followed.iter().skip(1).take(inner) {
          push_point(
            &mut points,
            PathPoint { point: followed_point, jump_point: false },
          );
        }
      }
    }

    push_point(
      &mut points,
      PathPoint { point, jump_point: portal.jump_origin },
    );
    previous_portal = Some((portal, point));
  }
  points
}

#[cfg(test)]
#[path = "path_test.rs"]
mod test;
