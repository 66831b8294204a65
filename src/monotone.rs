use std::collections::HashSet;
use std::f32::consts::TAU;

use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VertexType {
  Start,
  Split,
  End,
  Merge,
  Regular,
}

/// An edge intersecting the sweep line, with the polygon interior to its
/// right, and the lowest vertex above the sweep line that can see it.
struct EdgeHelper {
  /// The edge goes from this point to the next point of its ring.
  edge_start: usize,
  helper: usize,
}

/// Splits a polygon with holes into y-monotone pieces. The outer contour must
/// be counter-clockwise and holes clockwise, so the interior is always on the
/// left of each ring's edges.
pub(crate) struct MonotonePolygon<'a> {
  points: &'a [Vec2],
  end_contour_indices: &'a [usize],
}

impl<'a> MonotonePolygon<'a> {
  /// `end_contour_indices[i]` is one past the last point of ring `i` in
  /// `points`. Ring 0 is the outer contour.
  pub(crate) fn new(
    points: &'a [Vec2],
    end_contour_indices: &'a [usize],
  ) -> Self {
    Self { points, end_contour_indices }
  }

  fn ring_bounds(&self, point_index: usize) -> (usize, usize) {
    let ring = self
      .end_contour_indices
      .iter()
      .position(|&end| point_index < end)
      .expect("point index is within the rings");
    let start = if ring == 0 { 0 } else { self.end_contour_indices[ring - 1] };
    (start, self.end_contour_indices[ring])
  }

  fn next(&self, point_index: usize) -> usize {
    let (start, end) = self.ring_bounds(point_index);
    if point_index + 1 == end {
      start
    } else {
      point_index + 1
    }
  }

  fn previous(&self, point_index: usize) -> usize {
    let (start, end) = self.ring_bounds(point_index);
    if point_index == start {
      end - 1
    } else {
      point_index - 1
    }
  }

  /// Whether `first` comes before `second` when sweeping from top to bottom.
  /// Points at the same height sweep from left to right.
  fn is_above(&self, first: usize, second: usize) -> bool {
    let (a, b) = (self.points[first], self.points[second]);
    if a.y == b.y {
      if a.x == b.x {
        return first < second;
      }
      return a.x < b.x;
    }
    a.y > b.y
  }

  fn classify(&self, point_index: usize) -> VertexType {
    let previous = self.previous(point_index);
    let next = self.next(point_index);
    let previous_below = self.is_above(point_index, previous);
    let next_below = self.is_above(point_index, next);

    let point = self.points[point_index];
    let convex = (point - self.points[previous])
      .perp_dot(self.points[next] - point)
      > 0.0;

    match (previous_below, next_below) {
      (true, true) if convex => VertexType::Start,
      (true, true) => VertexType::Split,
      (false, false) if convex => VertexType::End,
      (false, false) => VertexType::Merge,
      _ => VertexType::Regular,
    }
  }

  /// Finds the x coordinate where the edge starting at `edge_start` crosses
  /// the horizontal line through `point`.
  fn edge_x_at(&self, edge_start: usize, point: Vec2) -> f32 {
    let a = self.points[edge_start];
    let b = self.points[self.next(edge_start)];
    if a.y == b.y {
      return a.x.max(b.x);
    }
    a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y)
  }

  /// Finds the status entry of the edge directly left of `point_index`.
  fn find_left_edge(
    &self,
    status: &[EdgeHelper],
    point_index: usize,
  ) -> Option<usize> {
    let point = self.points[point_index];
    let mut best: Option<(usize, f32)> = None;
    for (status_index, edge) in status.iter().enumerate() {
      let x = self.edge_x_at(edge.edge_start, point);
      if x > point.x {
        continue;
      }
      if best.map_or(true, |(_, best_x)| x > best_x) {
        best = Some((status_index, x));
      }
    }
    if best.is_none() {
      log::warn!("No edge found left of point {point_index} ({point}).");
    }
    best.map(|(status_index, _)| status_index)
  }

  /// Computes the diagonals that split the polygon into y-monotone pieces.
  fn compute_diagonals(&self) -> Vec<(usize, usize)> {
    let point_count = self.points.len();
    let vertex_types =
      (0..point_count).map(|i| self.classify(i)).collect::<Vec<_>>();

    let mut sorted_points = (0..point_count).collect::<Vec<_>>();
    sorted_points.sort_by(|&a, &b| {
      if a == b {
        std::cmp::Ordering::Equal
      } else if self.is_above(a, b) {
        std::cmp::Ordering::Less
      } else {
        std::cmp::Ordering::Greater
      }
    });

    let mut status = Vec::<EdgeHelper>::new();
    let mut diagonals = Vec::new();
    let mut seen_diagonals = HashSet::new();
    let mut add_diagonal = |a: usize, b: usize| {
      if a == b || self.next(a) == b || self.next(b) == a {
        return;
      }
      if seen_diagonals.insert((a.min(b), a.max(b))) {
        diagonals.push((a, b));
      }
    };

    // Connects `point_index` to the helper of the edge ending at it (if that
    // helper is a merge vertex) and stops tracking the edge.
    let finish_edge = |status: &mut Vec<EdgeHelper>,
                       add_diagonal: &mut dyn FnMut(usize, usize),
                       point_index: usize| {
      let edge_start = self.previous(point_index);
      let Some(position) =
        status.iter().position(|edge| edge.edge_start == edge_start)
      else {
        log::warn!("Edge ending at point {point_index} was never started.");
        return;
      };
      let edge = status.remove(position);
      if vertex_types[edge.helper] == VertexType::Merge {
        add_diagonal(point_index, edge.helper);
      }
    };

    for &point_index in sorted_points.iter() {
      match vertex_types[point_index] {
        VertexType::Start => {
          status
            .push(EdgeHelper { edge_start: point_index, helper: point_index });
        }
        VertexType::End => {
          finish_edge(&mut status, &mut add_diagonal, point_index);
        }
        VertexType::Split => {
          if let Some(left) = self.find_left_edge(&status, point_index) {
            add_diagonal(point_index, status[left].helper);
            status[left].helper = point_index;
          }
          status
            .push(EdgeHelper { edge_start: point_index, helper: point_index });
        }
        VertexType::Merge => {
          finish_edge(&mut status, &mut add_diagonal, point_index);
          if let Some(left) = self.find_left_edge(&status, point_index) {
            if vertex_types[status[left].helper] == VertexType::Merge {
              add_diagonal(point_index, status[left].helper);
            }
            status[left].helper = point_index;
          }
        }
        VertexType::Regular => {
          let interior_on_right =
            self.is_above(self.previous(point_index), point_index);
          if interior_on_right {
            finish_edge(&mut status, &mut add_diagonal, point_index);
            status.push(EdgeHelper {
              edge_start: point_index,
              helper: point_index,
            });
          } else if let Some(left) = self.find_left_edge(&status, point_index)
          {
            if vertex_types[status[left].helper] == VertexType::Merge {
              add_diagonal(point_index, status[left].helper);
            }
            status[left].helper = point_index;
          }
        }
      }
    }

    diagonals
  }

  /// Splits the polygon into y-monotone pieces. Each piece is a list of point
  /// indices in counter-clockwise order.
  pub(crate) fn create_y_monotone_polygons(&self) -> Vec<Vec<usize>> {
    let point_count = self.points.len();
    let diagonals = self.compute_diagonals();

    let mut outgoing = vec![Vec::new(); point_count];
    for point_index in 0..point_count {
      outgoing[point_index].push(self.next(point_index));
    }
    for &(a, b) in diagonals.iter() {
      outgoing[a].push(b);
      outgoing[b].push(a);
    }

    let half_edge_count = point_count + diagonals.len() * 2;
    let mut used_half_edges = HashSet::new();
    let mut pieces = Vec::new();
    for start in 0..point_count {
      for &first_target in outgoing[start].iter() {
        if used_half_edges.contains(&(start, first_target)) {
          continue;
        }

        let mut piece = Vec::new();
        let (mut from, mut to) = (start, first_target);
        let closed = loop {
          if !used_half_edges.insert((from, to))
            || piece.len() > half_edge_count
          {
            break false;
          }
          piece.push(from);
          let after = self.next_half_edge_target(&outgoing, from, to);
          if (to, after) == (start, first_target) {
            break true;
          }
          (from, to) = (to, after);
        };

        if closed && piece.len() >= 3 {
          pieces.push(piece);
        } else {
          log::warn!("Dropped a monotone piece that could not be closed.");
        }
      }
    }
    pieces
  }

  /// Picks the edge leaving `to` that turns most sharply left after arriving
  /// from `from`. Following these keeps a single face on the left.
  fn next_half_edge_target(
    &self,
    outgoing: &[Vec<usize>],
    from: usize,
    to: usize,
  ) -> usize {
    let origin = self.points[to];
    let reverse = self.points[from] - origin;
    let clockwise_angle = |target: usize| {
      let direction = self.points[target] - origin;
      let angle = direction.perp_dot(reverse).atan2(direction.dot(reverse));
      if angle <= 0.0 {
        angle + TAU
      } else {
        angle
      }
    };

    let mut best = (from, f32::INFINITY);
    for &target in outgoing[to].iter() {
      let angle = clockwise_angle(target);
      if angle < best.1 {
        best = (target, angle);
      }
    }
    best.0
  }
}

#[cfg(test)]
#[path = "monotone_test.rs"]
mod test;
