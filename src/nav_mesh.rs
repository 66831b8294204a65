use std::{collections::HashMap, sync::Arc};

use disjoint::DisjointSet;
use glam::Vec3;
use thiserror::Error;

use crate::{
  geometry::{edge_intersection, is_point_in_triangle, xz, Plane},
  link::{NavJumpConstraint, NavLink, NavLinkType},
  topography::NavTopography,
  util::{BoundingBox, BoxTree},
};

/// How far apart boundary edges of different polygons may be and still be
/// joined. Walkable polygons are shrunk by 0.005 on each side, so touching
/// neighbours end up 0.01 apart. Overlapping coplanar neighbours are clipped
/// against each other during generation and share their edges exactly.
const JOIN_TOLERANCE: f32 = 0.015;

/// How far above a point a surface may be and still be found as the surface
/// under the point.
const VERTICAL_TOLERANCE: f32 = 1e-4;

/// A reference to a triangle in a [`NavMesh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleRef {
  /// The index of the polygon in the mesh.
  pub polygon_index: usize,
  /// The index of the triangle in the polygon.
  pub triangle_index: usize,
}

/// A triangle of a [`NavPolygon`].
#[derive(Clone, Debug, PartialEq)]
pub struct NavTriangle {
  indices: [usize; 3],
  center: Vec3,
  links: Vec<NavLink>,
}

impl NavTriangle {
  /// The indices of the triangle's points in its polygon, counter-clockwise
  /// when viewed from above.
  pub fn indices(&self) -> [usize; 3] {
    self.indices
  }

  /// The centroid of the triangle.
  pub fn center(&self) -> Vec3 {
    self.center
  }

  /// The links leaving this triangle.
  pub fn links(&self) -> &[NavLink] {
    &self.links
  }

  /// The point indices of the edge at `edge_index`.
  pub fn edge_indices(&self, edge_index: usize) -> (usize, usize) {
    (self.indices[edge_index], self.indices[(edge_index + 1) % 3])
  }
}

/// A walkable surface made of triangles.
#[derive(Clone)]
pub struct NavPolygon {
  name: String,
  points: Vec<Vec3>,
  triangles: Vec<NavTriangle>,
  topography: Option<Arc<dyn NavTopography>>,
}

// Manual Debug impl since topographies do not need to be Debug.
impl std::fmt::Debug for NavPolygon {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NavPolygon")
      .field("name", &self.name)
      .field("points", &self.points)
      .field("triangles", &self.triangles)
      .field("has_topography", &self.topography.is_some())
      .finish()
  }
}

impl NavPolygon {
  /// Creates a polygon from its points and triangles (as indices into
  /// `points`).
  pub fn new(
    name: impl Into<String>,
    points: Vec<Vec3>,
    triangles: Vec<[usize; 3]>,
    topography: Option<Arc<dyn NavTopography>>,
  ) -> Self {
    let triangles = triangles
      .into_iter()
      .map(|indices| NavTriangle {
        indices,
        center: indices.iter().map(|&i| points[i]).sum::<Vec3>() / 3.0,
        links: vec![],
      })
      .collect();
    Self { name: name.into(), points, triangles, topography }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn points(&self) -> &[Vec3] {
    &self.points
  }

  pub fn triangles(&self) -> &[NavTriangle] {
    &self.triangles
  }

  /// The terrain this polygon follows, if any.
  pub fn topography(&self) -> Option<&dyn NavTopography> {
    self.topography.as_deref()
  }

  /// Whether paths over both polygons follow the same surface. Polygons
  /// without a topography share the flat one.
  pub(crate) fn shares_topography(&self, other: &NavPolygon) -> bool {
    match (&self.topography, &other.topography) {
      (None, None) => true,
      (Some(topography), Some(other_topography)) => {
        Arc::ptr_eq(topography, other_topography)
      }
      _ => false,
    }
  }

  /// The points of the triangle at `triangle_index`.
  pub fn triangle_points(&self, triangle_index: usize) -> (Vec3, Vec3, Vec3) {
    let [a, b, c] = self.triangles[triangle_index].indices;
    (self.points[a], self.points[b], self.points[c])
  }

  /// The points of an edge of the triangle at `triangle_index`.
  pub fn edge_points(
    &self,
    triangle_index: usize,
    edge_index: usize,
  ) -> (Vec3, Vec3) {
    let (a, b) = self.triangles[triangle_index].edge_indices(edge_index);
    (self.points[a], self.points[b])
  }

  /// The total area of the polygon's triangles.
  pub fn compute_area(&self) -> f32 {
    (0..self.triangles.len())
      .map(|triangle_index| {
        let (a, b, c) = self.triangle_points(triangle_index);
        (b - a).cross(c - a).length() * 0.5
      })
      .sum()
  }
}

/// An error when adding a jump link to a [`NavMesh`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum JumpLinkError {
  #[error("The triangle {0:?} does not exist in the navigation mesh.")]
  InvalidTriangle(TriangleRef),
  #[error("The source edge index {0} must be 0, 1, or 2.")]
  InvalidSourceEdge(usize),
}

/// The walkable surfaces of a world and the links between their triangles.
#[derive(Clone)]
pub struct NavMesh {
  polygons: Vec<NavPolygon>,
  /// The index of the first triangle of each polygon when all triangles are
  /// numbered together.
  triangle_offsets: Vec<usize>,
  /// Triangles that can reach each other share a region.
  regions: DisjointSet,
  /// Leaves hold global triangle indices.
  triangle_tree: Option<BoxTree>,
}

impl std::fmt::Debug for NavMesh {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NavMesh").field("polygons", &self.polygons).finish()
  }
}

/// A polygon edge used by only one triangle.
struct BoundaryEdge {
  triangle: TriangleRef,
  edge_index: usize,
  points: (Vec3, Vec3),
}

impl NavMesh {
  /// Creates a mesh from `polygons`, linking triangles that share edges within
  /// a polygon and boundary edges that coincide across polygons.
  pub fn new(mut polygons: Vec<NavPolygon>) -> Self {
    for polygon in polygons.iter_mut() {
      for triangle in polygon.triangles.iter_mut() {
        triangle.links.clear();
      }
    }

    let mut triangle_offsets = Vec::with_capacity(polygons.len());
    let mut triangle_count = 0;
    for polygon in polygons.iter() {
      triangle_offsets.push(triangle_count);
      triangle_count += polygon.triangles.len();
    }

    let mut nav_mesh = Self {
      polygons,
      triangle_offsets,
      regions: DisjointSet::with_len(triangle_count),
      triangle_tree: None,
    };

    let boundary_edges = nav_mesh.create_standard_links();
    nav_mesh.create_join_links(&boundary_edges);
    nav_mesh.triangle_tree = nav_mesh.build_triangle_tree();

    log::debug!(
      "Assembled nav mesh with {} polygons and {} triangles.",
      nav_mesh.polygons.len(),
      triangle_count
    );
    nav_mesh
  }

  /// Links triangles sharing an edge within each polygon. Returns the edges
  /// that no other triangle of the polygon uses.
  fn create_standard_links(&mut self) -> Vec<BoundaryEdge> {
    let mut boundary_edges = Vec::new();
    let mut new_links = Vec::new();

    for (polygon_index, polygon) in self.polygons.iter().enumerate() {
      let mut edge_to_triangles = HashMap::<(usize, usize), Vec<_>>::new();
      for (triangle_index, triangle) in polygon.triangles.iter().enumerate() {
        for edge_index in 0..3 {
          let (a, b) = triangle.edge_indices(edge_index);
          edge_to_triangles
            .entry((a.min(b), a.max(b)))
            .or_default()
            .push((triangle_index, edge_index));
        }
      }

      for users in edge_to_triangles.values() {
        if let &[(triangle_index, edge_index)] = users.as_slice() {
          boundary_edges.push(BoundaryEdge {
            triangle: TriangleRef { polygon_index, triangle_index },
            edge_index,
            points: polygon.edge_points(triangle_index, edge_index),
          });
          continue;
        }
        for &(triangle_1, edge_1) in users.iter() {
          for &(triangle_2, _) in users.iter() {
            if triangle_1 != triangle_2 {
              new_links.push((
                TriangleRef { polygon_index, triangle_index: triangle_1 },
                NavLink::standard(
                  edge_1,
                  TriangleRef { polygon_index, triangle_index: triangle_2 },
                ),
              ));
            }
          }
        }
      }
    }

    // Hash map iteration order is arbitrary.
    new_links.sort_by_key(|(source, link)| {
      (*source, link.source_edge_index, link.target)
    });
    let standard_link_count = new_links.len();
    for (source, link) in new_links {
      self.push_link(source, link);
    }
    log::debug!("Created {standard_link_count} standard links.");

    boundary_edges.sort_by_key(|edge| (edge.triangle, edge.edge_index));
    boundary_edges
  }

  /// Links boundary edges of different polygons that overlap.
  fn create_join_links(&mut self, boundary_edges: &[BoundaryEdge]) {
    let bounds_of = |edge: &BoundaryEdge| {
      BoundingBox::spanning(edge.points.0, edge.points.1).grow(JOIN_TOLERANCE)
    };
    let joinable_edges = boundary_edges
      .iter()
      .filter(|edge| {
        edge.points.0.distance_squared(edge.points.1)
          > JOIN_TOLERANCE * JOIN_TOLERANCE
      })
      .collect::<Vec<_>>();
    let edge_bounds =
      joinable_edges.iter().map(|edge| bounds_of(edge)).collect::<Vec<_>>();
    let Some(tree) = BoxTree::new(&edge_bounds) else {
      return;
    };

    let mut new_links = Vec::new();
    for &edge in joinable_edges.iter() {
      for other_index in tree.query(&bounds_of(edge)) {
        let other = joinable_edges[other_index];
        if other.triangle.polygon_index == edge.triangle.polygon_index {
          continue;
        }
        let Some(overlap) = edge_intersection(
          edge.points,
          other.points,
          JOIN_TOLERANCE * JOIN_TOLERANCE,
        ) else {
          continue;
        };

        let edge_length_squared = edge.points.0.distance_squared(edge.points.1);
        let weight_of_start = |point: Vec3| {
          let fraction = (point - edge.points.0)
            .dot(edge.points.1 - edge.points.0)
            / edge_length_squared;
          (1.0 - fraction).clamp(0.0, 1.0)
        };
        let start_range = weight_of_start(overlap.0);
        let end_range = weight_of_start(overlap.1).min(start_range);

        match NavJumpConstraint::new(start_range, end_range, other.edge_index) {
          Ok(constraint) => new_links.push((
            edge.triangle,
            NavLink {
              link_type: NavLinkType::JoinPolygons,
              source_edge_index: edge.edge_index,
              target: other.triangle,
              constraint: Some(constraint),
            },
          )),
          Err(error) => log::warn!("Skipped join link: {error}"),
        }
      }
    }

    log::debug!("Created {} join polygon links.", new_links.len());
    for (source, link) in new_links {
      self.push_link(source, link);
    }
  }

  fn build_triangle_tree(&self) -> Option<BoxTree> {
    let triangle_bounds = self
      .polygons
      .iter()
      .flat_map(|polygon| {
        (0..polygon.triangles.len()).map(move |triangle_index| {
          let (a, b, c) = polygon.triangle_points(triangle_index);
          BoundingBox::spanning(a, b).including(c).grow(VERTICAL_TOLERANCE)
        })
      })
      .collect::<Vec<_>>();
    BoxTree::new(&triangle_bounds)
  }

  fn global_triangle_index(&self, triangle: TriangleRef) -> usize {
    self.triangle_offsets[triangle.polygon_index] + triangle.triangle_index
  }

  fn triangle_at_global_index(&self, index: usize) -> TriangleRef {
    // Empty polygons share their offset with the next polygon.
    let polygon_index =
      self.triangle_offsets.partition_point(|&offset| offset <= index) - 1;
    TriangleRef {
      polygon_index,
      triangle_index: index - self.triangle_offsets[polygon_index],
    }
  }

  fn push_link(&mut self, source: TriangleRef, link: NavLink) {
    self.regions.join(
      self.global_triangle_index(source),
      self.global_triangle_index(link.target),
    );
    self.polygons[source.polygon_index].triangles[source.triangle_index]
      .links
      .push(link);
  }

  /// Adds a jump from part of an edge of `source` to an edge of `target`.
  pub fn add_jump_link(
    &mut self,
    source: TriangleRef,
    source_edge_index: usize,
    target: TriangleRef,
    constraint: NavJumpConstraint,
  ) -> Result<(), JumpLinkError> {
    for triangle in [source, target] {
      if self.triangle(triangle).is_none() {
        return Err(JumpLinkError::InvalidTriangle(triangle));
      }
    }
    if source_edge_index > 2 {
      return Err(JumpLinkError::InvalidSourceEdge(source_edge_index));
    }
    self.push_link(
      source,
      NavLink {
        link_type: NavLinkType::Jump,
        source_edge_index,
        target,
        constraint: Some(constraint),
      },
    );
    Ok(())
  }

  pub fn polygons(&self) -> &[NavPolygon] {
    &self.polygons
  }

  pub fn polygon(&self, polygon_index: usize) -> Option<&NavPolygon> {
    self.polygons.get(polygon_index)
  }

  pub fn triangle(&self, triangle: TriangleRef) -> Option<&NavTriangle> {
    self
      .polygons
      .get(triangle.polygon_index)
      .and_then(|polygon| polygon.triangles.get(triangle.triangle_index))
  }

  /// The number of triangles over all polygons.
  pub fn triangle_count(&self) -> usize {
    self.polygons.iter().map(|polygon| polygon.triangles.len()).sum()
  }

  /// The total area of all triangles.
  pub fn compute_area(&self) -> f32 {
    self.polygons.iter().map(NavPolygon::compute_area).sum()
  }

  /// Whether any sequence of links could lead from `first` to `second`.
  pub(crate) fn are_connected(
    &self,
    first: TriangleRef,
    second: TriangleRef,
  ) -> bool {
    self.regions.is_joined(
      self.global_triangle_index(first),
      self.global_triangle_index(second),
    )
  }

  /// Finds the triangle that an agent at `point` stands on: the nearest
  /// triangle at or below `point` whose footprint contains it.
  pub fn find_triangle(&self, point: Vec3) -> Option<TriangleRef> {
    let tree = self.triangle_tree.as_ref()?;
    let query = BoundingBox::spanning(
      Vec3::new(point.x, f32::MIN, point.z),
      Vec3::new(point.x, point.y + VERTICAL_TOLERANCE, point.z),
    );

    let point_xz = xz(point);
    let mut best: Option<(f32, TriangleRef)> = None;
    for index in tree.query(&query) {
      let triangle = self.triangle_at_global_index(index);
      let (a, b, c) = self.polygons[triangle.polygon_index]
        .triangle_points(triangle.triangle_index);
      if !is_point_in_triangle(point_xz, (xz(a), xz(b), xz(c))) {
        continue;
      }
      let Some(height) = Plane::from_points(a, b, c).height_at(point_xz) else {
        continue;
      };
      let offset = point.y - height;
      if offset < -VERTICAL_TOLERANCE {
        continue;
      }
      let offset = offset.max(0.0);
      let is_better = match best {
        None => true,
        Some((best_offset, best_triangle)) => {
          offset < best_offset
            || (offset == best_offset && triangle < best_triangle)
        }
      };
      if is_better {
        best = Some((offset, triangle));
      }
    }
    best.map(|(_, triangle)| triangle)
  }
}

#[cfg(test)]
#[path = "nav_mesh_test.rs"]
mod test;
