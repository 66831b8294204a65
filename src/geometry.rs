use glam::{Vec2, Vec3};

/// A plane in Hessian normal form: points `p` on the plane satisfy
/// `normal.dot(p) == distance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Plane {
  pub(crate) normal: Vec3,
  pub(crate) distance: f32,
}

impl Plane {
  /// Creates the plane through three points. The normal follows the right hand
  /// rule: `(point_1 - point_0) x (point_2 - point_0)`.
  pub(crate) fn from_points(
    point_0: Vec3,
    point_1: Vec3,
    point_2: Vec3,
  ) -> Self {
    let normal =
      (point_1 - point_0).cross(point_2 - point_0).normalize_or_zero();
    Self { normal, distance: normal.dot(point_0) }
  }

  /// The signed distance from the plane to `point`. Positive on the side the
  /// normal points to.
  pub(crate) fn signed_distance(&self, point: Vec3) -> f32 {
    self.normal.dot(point) - self.distance
  }

  /// Finds the height of the plane directly above/below `point_xz`. Returns
  /// `None` for vertical planes.
  pub(crate) fn height_at(&self, point_xz: Vec2) -> Option<f32> {
    if self.normal.y.abs() <= f32::EPSILON {
      return None;
    }
    Some(
      (self.distance - self.normal.x * point_xz.x - self.normal.z * point_xz.y)
        / self.normal.y,
    )
  }
}

/// Intersects three planes. Returns `None` if they do not meet in a single
/// point. Also returns the absolute determinant, which measures how
/// independent the planes are.
pub(crate) fn intersect_planes(
  plane_0: &Plane,
  plane_1: &Plane,
  plane_2: &Plane,
) -> Option<(Vec3, f32)> {
  let cross_12 = plane_1.normal.cross(plane_2.normal);
  let determinant = plane_0.normal.dot(cross_12);
  if determinant.abs() <= 1e-6 {
    return None;
  }
  let point = (cross_12 * plane_0.distance
    + plane_2.normal.cross(plane_0.normal) * plane_1.distance
    + plane_0.normal.cross(plane_1.normal) * plane_2.distance)
    / determinant;
  Some((point, determinant.abs()))
}

/// Projects `point` onto `segment`. Returns the projected point and the
/// fraction along the segment (0 at `segment.0`, 1 at `segment.1`).
pub(crate) fn project_point_to_line_segment(
  point: Vec3,
  segment: (Vec3, Vec3),
) -> (Vec3, f32) {
  let segment_delta = segment.1 - segment.0;
  let length_squared = segment_delta.length_squared();
  if length_squared == 0.0 {
    return (segment.0, 0.0);
  }
  let fraction =
    ((point - segment.0).dot(segment_delta) / length_squared).clamp(0.0, 1.0);
  (segment.0 + segment_delta * fraction, fraction)
}

/// Drops the height of `point`, keeping the (X, Z) ground coordinates.
pub(crate) fn xz(point: Vec3) -> Vec2 {
  Vec2::new(point.x, point.z)
}

/// Determines whether `point` is inside (or on the boundary of) `triangle`.
/// Works for either winding.
pub(crate) fn is_point_in_triangle(
  point: Vec2,
  triangle: (Vec2, Vec2, Vec2),
) -> bool {
  let d0 = (triangle.1 - triangle.0).perp_dot(point - triangle.0);
  let d1 = (triangle.2 - triangle.1).perp_dot(point - triangle.1);
  let d2 = (triangle.0 - triangle.2).perp_dot(point - triangle.2);

  let has_negative = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
  let has_positive = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
  !(has_negative && has_positive)
}

/// Finds the part of `edge_1` that overlaps `edge_2`, where the edges point
/// in opposite directions (like the shared edge of two neighbouring
/// counter-clockwise triangles). The overlap is returned in the direction of
/// `edge_1`. Returns `None` if the edges do not overlap or are further apart
/// than `intersection_distance_squared`.
pub(crate) fn edge_intersection(
  edge_1: (Vec3, Vec3),
  edge_2: (Vec3, Vec3),
  intersection_distance_squared: f32,
) -> Option<(Vec3, Vec3)> {
  let edge_1_dir = edge_1.1 - edge_1.0;
  let edge_2_on_edge_1_t_ = (
    edge_1_dir.dot(edge_2.0 - edge_1.0) / edge_1_dir.length_squared(),
    edge_1_dir.dot(edge_2.1 - edge_1.0) / edge_1_dir.length_squared(),
  );
  let edge_2_on_edge_1_t = (
    edge_2_on_edge_1_t_.0.clamp(0.0, 1.0),
    edge_2_on_edge_1_t_.1.clamp(0.0, 1.0),
  );
  if edge_2_on_edge_1_t.0 <= edge_2_on_edge_1_t.1 {
    return None;
  }

  let edge_2_dir = edge_2.1 - edge_2.0;
  let edge_1_on_edge_2_t_ = (
    edge_2_dir.dot(edge_1.0 - edge_2.0) / edge_2_dir.length_squared(),
    edge_2_dir.dot(edge_1.1 - edge_2.0) / edge_2_dir.length_squared(),
  );
  let edge_1_on_edge_2_t = (
    edge_1_on_edge_2_t_.0.clamp(0.0, 1.0),
    edge_1_on_edge_2_t_.1.clamp(0.0, 1.0),
  );
  if edge_1_on_edge_2_t.0 <= edge_1_on_edge_2_t.1 {
    return None;
  }

  let edge_2_on_edge_1 = (
    edge_2_on_edge_1_t.0 * edge_1_dir + edge_1.0,
    edge_2_on_edge_1_t.1 * edge_1_dir + edge_1.0,
  );
  let edge_1_on_edge_2 = (
    edge_1_on_edge_2_t.0 * edge_2_dir + edge_2.0,
    edge_1_on_edge_2_t.1 * edge_2_dir + edge_2.0,
  );

  if edge_2_on_edge_1.1.distance_squared(edge_1_on_edge_2.0)
    > intersection_distance_squared
    || edge_2_on_edge_1.0.distance_squared(edge_1_on_edge_2.1)
      > intersection_distance_squared
  {
    None
  } else {
    Some((
      (edge_2_on_edge_1.1 + edge_1_on_edge_2.0) * 0.5,
      (edge_2_on_edge_1.0 + edge_1_on_edge_2.1) * 0.5,
    ))
  }
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod test;
