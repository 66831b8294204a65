use geo::{
  BooleanOps, ConvexHull, Coord, LineString, MultiPoint, MultiPolygon, Point,
  Polygon,
};
use glam::{DVec2, I64Vec2, Vec2};

/// The number of integer units per world unit.
const INTEGER_SCALE: f32 = 1000.0;

/// Converts a flattened world point to exact integer coordinates.
pub(crate) fn to_integer_point(point: Vec2) -> I64Vec2 {
  I64Vec2::new(
    (point.x * INTEGER_SCALE).round() as i64,
    (point.y * INTEGER_SCALE).round() as i64,
  )
}

/// Converts integer coordinates back to a flattened world point.
pub(crate) fn to_float_point(point: I64Vec2) -> Vec2 {
  Vec2::new(point.x as f32 / INTEGER_SCALE, point.y as f32 / INTEGER_SCALE)
}

/// A closed ring of integer points, clockwise in the flattened (X, -Z)
/// plane. Consecutive duplicate points and a duplicated closing point are
/// never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsgPolygon {
  name: String,
  cw_points: Vec<I64Vec2>,
}

impl CsgPolygon {
  /// Creates a polygon from clockwise points, dropping duplicates.
  pub fn new(name: impl Into<String>, cw_points: Vec<I64Vec2>) -> Self {
    let mut points: Vec<I64Vec2> = Vec::with_capacity(cw_points.len());
    for point in cw_points {
      if points.last() != Some(&point) {
        points.push(point);
      }
    }
    while points.len() > 1 && points.first() == points.last() {
      points.pop();
    }
    Self { name: name.into(), cw_points: points }
  }

  /// Creates a polygon from world points that have already been flattened to
  /// (X, -Z). The points are reversed if they are counter-clockwise.
  pub fn from_float_points(name: impl Into<String>, points: &[Vec2]) -> Self {
    let points = points.iter().copied().map(to_integer_point).collect();
    Self::new(name, points).into_clockwise()
  }

  /// Creates the clockwise convex hull of `points`.
  pub(crate) fn from_convex_hull(
    name: impl Into<String>,
    points: &[I64Vec2],
  ) -> Self {
    let hull = MultiPoint::new(
      points
        .iter()
        .map(|point| Point::new(point.x as f64, point.y as f64))
        .collect(),
    )
    .convex_hull();
    Self::new(name, ring_to_points(hull.exterior())).into_clockwise()
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn cw_points(&self) -> &[I64Vec2] {
    &self.cw_points
  }

  /// The points converted back to world units.
  pub fn float_points(&self) -> Vec<Vec2> {
    self.cw_points.iter().copied().map(to_float_point).collect()
  }

  /// Whether the polygon has enough points to enclose an area.
  pub fn is_valid(&self) -> bool {
    self.cw_points.len() >= 3
  }

  /// Twice the signed area. Positive for counter-clockwise rings.
  fn signed_area_2(&self) -> i128 {
    let len = self.cw_points.len();
    (0..len)
      .map(|i| {
        let a = self.cw_points[i];
        let b = self.cw_points[(i + 1) % len];
        a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128
      })
      .sum()
  }

  /// The enclosed area, in integer units squared.
  pub fn compute_area(&self) -> f64 {
    (self.signed_area_2().abs() as f64) * 0.5
  }

  fn into_clockwise(mut self) -> Self {
    if self.signed_area_2() > 0 {
      self.cw_points.reverse();
    }
    self
  }

  /// Moves every edge outward by `distance` integer units (inward for a
  /// negative distance).
  pub fn expand(&self, distance: f64) -> Self {
    let len = self.cw_points.len();
    if len < 3 {
      return self.clone();
    }
    // Outward is to the left of travel for clockwise rings.
    let orientation = if self.signed_area_2() > 0 { 1.0 } else { -1.0 };

    let points = self
      .cw_points
      .iter()
      .map(|point| DVec2::new(point.x as f64, point.y as f64))
      .collect::<Vec<_>>();
    let offset_edge = |start: DVec2, end: DVec2| {
      let direction = end - start;
      let normal =
        DVec2::new(direction.y, -direction.x).normalize_or_zero() * orientation;
      (start + normal * distance, direction, normal)
    };

    let expanded_points = (0..len)
      .map(|i| {
        let previous = points[(i + len - 1) % len];
        let current = points[i];
        let next = points[(i + 1) % len];

        let (previous_start, previous_direction, previous_normal) =
          offset_edge(previous, current);
        let (current_start, current_direction, _) = offset_edge(current, next);

        let denominator = previous_direction.perp_dot(current_direction);
        let expanded = if denominator.abs() <= f64::EPSILON {
          current + previous_normal * distance
        } else {
          let t = (current_start - previous_start).perp_dot(current_direction)
            / denominator;
          previous_start + previous_direction * t
        };
        I64Vec2::new(expanded.x.round() as i64, expanded.y.round() as i64)
      })
      .collect();

    Self::new(self.name.clone(), expanded_points)
  }

  fn to_geo(&self) -> Polygon<f64> {
    Polygon::new(
      LineString::new(
        self
          .cw_points
          .iter()
          .map(|point| Coord { x: point.x as f64, y: point.y as f64 })
          .collect(),
      ),
      vec![],
    )
  }

  /// Intersects this polygon with `other`. Pieces with fewer than 3 points
  /// are dropped. Results keep the name of `self`.
  pub fn intersection(&self, other: &CsgPolygon) -> Vec<CsgPolygon> {
    if !self.is_valid() || !other.is_valid() {
      return vec![];
    }
    from_geo(&self.name, &self.to_geo().intersection(&other.to_geo()))
  }

  /// Merges all `polygons` into the fewest disjoint outlines.
  pub fn union_all(polygons: &[CsgPolygon]) -> Vec<CsgPolygon> {
    let valid = polygons.iter().filter(|polygon| polygon.is_valid());
    let name =
      valid.clone().map(|polygon| polygon.name.as_str()).collect::<Vec<_>>();
    if name.is_empty() {
      return vec![];
    }
    let merged = valid
      .map(|polygon| MultiPolygon::new(vec![polygon.to_geo()]))
      .reduce(|merged, polygon| merged.union(&polygon))
      .unwrap_or_else(|| MultiPolygon::new(vec![]));
    from_geo(&name.join("+"), &merged)
  }

  /// Removes `holes` from this polygon. Each remaining part is returned as its
  /// outline and the holes strictly inside it. Holes touching the boundary
  /// become part of the outline instead.
  pub fn difference(
    &self,
    holes: &[CsgPolygon],
  ) -> Vec<(CsgPolygon, Vec<CsgPolygon>)> {
    if !self.is_valid() {
      return vec![];
    }
    let remaining = holes
      .iter()
      .filter(|hole| hole.is_valid())
      .fold(MultiPolygon::new(vec![self.to_geo()]), |remaining, hole| {
        remaining.difference(&MultiPolygon::new(vec![hole.to_geo()]))
      });

    remaining
      .iter()
      .filter_map(|polygon| {
        let outline =
          CsgPolygon::new(&self.name, ring_to_points(polygon.exterior()))
            .into_clockwise();
        if !outline.is_valid() {
          return None;
        }
        let holes = polygon
          .interiors()
          .iter()
          .map(|ring| {
            CsgPolygon::new(&self.name, ring_to_points(ring)).into_clockwise()
          })
          .filter(CsgPolygon::is_valid)
          .collect();
        Some((outline, holes))
      })
      .collect()
  }
}

fn ring_to_points(ring: &LineString<f64>) -> Vec<I64Vec2> {
  ring
    .coords()
    .map(|coord| I64Vec2::new(coord.x.round() as i64, coord.y.round() as i64))
    .collect()
}

// Interior rings are dropped: a hole in a merged obstacle is not walkable
// from outside it.
fn from_geo(name: &str, multi_polygon: &MultiPolygon<f64>) -> Vec<CsgPolygon> {
  multi_polygon
    .iter()
    .map(|polygon| {
      CsgPolygon::new(name, ring_to_points(polygon.exterior())).into_clockwise()
    })
    .filter(CsgPolygon::is_valid)
    .collect()
}

#[cfg(test)]
#[path = "csg_test.rs"]
mod test;
