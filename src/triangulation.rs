use glam::Vec2;

use crate::monotone::MonotonePolygon;

/// A polygon with holes to be split into triangles. The outer contour and
/// every hole share one point buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Triangulation {
  points: Vec<Vec2>,
  /// One past the last point of each ring. The outer contour is ring 0, hole
  /// `i` is ring `i + 1`.
  end_contour_indices: Vec<usize>,
}

/// A point of a monotone piece, tagged with the chain it belongs to.
#[derive(Clone, Copy, Debug)]
struct SidedPoint {
  point_index: usize,
  on_left: bool,
}

impl Triangulation {
  /// Creates a triangulation of the polygon with `ccw_polygon_points`. Points
  /// must be unique.
  pub fn new(ccw_polygon_points: Vec<Vec2>) -> Self {
    let end_contour_indices = vec![ccw_polygon_points.len()];
    Self { points: ccw_polygon_points, end_contour_indices }
  }

  /// Adds a hole to the polygon. The hole must be clockwise and inside the
  /// outer contour. Returns the index of the hole (starting at 0).
  pub fn add_hole_points(&mut self, cw_hole_points: Vec<Vec2>) -> usize {
    self.points.extend(cw_hole_points);
    self.end_contour_indices.push(self.points.len());
    self.end_contour_indices.len() - 2
  }

  /// The number of holes.
  pub fn holes_len(&self) -> usize {
    self.end_contour_indices.len() - 1
  }

  /// The points of the outer contour, counter-clockwise.
  pub fn polygon_points(&self) -> &[Vec2] {
    &self.points[..self.end_contour_indices[0]]
  }

  /// The points of the hole at `hole_index`, clockwise.
  pub fn hole_points(&self, hole_index: usize) -> &[Vec2] {
    &self.points[self.end_contour_indices[hole_index]
      ..self.end_contour_indices[hole_index + 1]]
  }

  /// Every point: the outer contour followed by each hole. Triangle indices
  /// refer to this list.
  pub fn all_points(&self) -> &[Vec2] {
    &self.points
  }

  pub fn all_points_len(&self) -> usize {
    self.points.len()
  }

  /// Splits the polygon into counter-clockwise triangles. A polygon with `n`
  /// points in total and `h` holes produces `n - 2 + 2h` triangles.
  pub fn triangulate(&self) -> Vec<[usize; 3]> {
    let monotone_polygons =
      MonotonePolygon::new(&self.points, &self.end_contour_indices)
        .create_y_monotone_polygons();

    let mut triangles = Vec::with_capacity(
      (self.points.len().saturating_sub(2)) + 2 * self.holes_len(),
    );
    for monotone_polygon in monotone_polygons.iter() {
      self.triangulate_monotone_polygon(monotone_polygon, &mut triangles);
    }
    triangles
  }

  fn is_above(&self, first: usize, second: usize) -> bool {
    let (a, b) = (self.points[first], self.points[second]);
    if a.y == b.y {
      return a.x < b.x;
    }
    a.y > b.y
  }

  fn push_triangle(
    &self,
    triangles: &mut Vec<[usize; 3]>,
    triangle: [usize; 3],
  ) {
    let [a, b, c] = triangle.map(|index| self.points[index]);
    if (b - a).perp_dot(c - a) < 0.0 {
      triangles.push([triangle[0], triangle[2], triangle[1]]);
    } else {
      triangles.push(triangle);
    }
  }

  fn build_sorted_sided_points(
    &self,
    monotone_polygon: &[usize],
  ) -> Vec<SidedPoint> {
    let mut sided_points = monotone_polygon
      .iter()
      .enumerate()
      .map(|(i, &point_index)| {
        let next_index = monotone_polygon[(i + 1) % monotone_polygon.len()];
        SidedPoint {
          point_index,
          on_left: self.is_above(point_index, next_index),
        }
      })
      .collect::<Vec<_>>();
    sided_points.sort_by(|left, right| {
      if self.is_above(left.point_index, right.point_index) {
        std::cmp::Ordering::Less
      } else if self.is_above(right.point_index, left.point_index) {
        std::cmp::Ordering::Greater
      } else {
        std::cmp::Ordering::Equal
      }
    });
    sided_points
  }

  fn triangulate_monotone_polygon(
    &self,
    monotone_polygon: &[usize],
    triangles: &mut Vec<[usize; 3]>,
  ) {
    if monotone_polygon.len() < 3 {
      return;
    }
    let sorted = self.build_sorted_sided_points(monotone_polygon);

    let mut stack = vec![sorted[0], sorted[1]];
    for j in 2..(sorted.len() - 1) {
      let current = sorted[j];
      let top_on_left = stack.last().map_or(current.on_left, |top| top.on_left);

      if current.on_left != top_on_left {
        // Opposite chain: every stacked point can see the current one.
        while let [.., top_2, top] = stack.as_slice() {
          self.push_triangle(
            triangles,
            [current.point_index, top.point_index, top_2.point_index],
          );
          stack.pop();
        }
        stack.clear();
        stack.push(sorted[j - 1]);
        stack.push(current);
      } else {
        while let [.., top_2, top] = stack.as_slice() {
          let (top, top_2) = (*top, *top_2);

          let diagonal =
            self.points[top_2.point_index] - self.points[current.point_index];
          let stack_edge =
            self.points[top_2.point_index] - self.points[top.point_index];
          let orientation = diagonal.perp_dot(stack_edge);

          if (orientation <= 0.0 && top.on_left)
            || (orientation >= 0.0 && !top.on_left)
          {
            self.push_triangle(
              triangles,
              [current.point_index, top_2.point_index, top.point_index],
            );
            stack.pop();
          } else {
            break;
          }
        }
        stack.push(current);
      }
    }

    let current = sorted[sorted.len() - 1];
    while let [.., top_2, top] = stack.as_slice() {
      self.push_triangle(
        triangles,
        [current.point_index, top_2.point_index, top.point_index],
      );
      stack.pop();
    }
  }
}

#[cfg(test)]
#[path = "triangulation_test.rs"]
mod test;
