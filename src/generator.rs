use std::{sync::Arc, time::Instant};

use glam::{I64Vec2, Vec2, Vec3};
use thiserror::Error;

use crate::{
  csg::{to_integer_point, CsgPolygon},
  geometry::{xz, Plane},
  nav_mesh::{NavMesh, NavPolygon},
  polytope::{find_walkable_faces, Polyhedron, PolyhedronFaceIndex},
  shape::{AdaptedShape, Heightfield},
  topography::{NavTopography, TerrainTopography},
  triangulation::Triangulation,
  AIWorld, NavMeshConfig,
};

/// How far (in integer units) walkable polygons are shrunk, so that points on
/// their boundary are never exactly on an obstacle's boundary.
const WALKABLE_MARGIN: f64 = 5.0;

/// The slack (in integer units squared) when deciding whether obstacles cover
/// a whole walkable polygon.
const AREA_TOLERANCE: f64 = 1.0;

/// How close (in world units) the planes of two walkable faces must be for
/// the faces to count as one floor.
const COPLANAR_TOLERANCE: f32 = 1e-3;

/// An error when generating a navigation mesh.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GenerationError {
  #[error("The object \"{object}\" has a malformed shape: {reason}.")]
  MalformedShape { object: String, reason: String },
  #[error("The object \"{object}\" has an unsupported shape: {reason}.")]
  UnsupportedShape { object: String, reason: String },
}

/// Generates navigation meshes from worlds.
#[derive(Clone, Debug, Default)]
pub struct NavMeshGenerator {
  config: NavMeshConfig,
}

/// A walkable face of an expanded polyhedron, flattened for polygon
/// operations.
struct WalkableFace {
  face: PolyhedronFaceIndex,
  /// The face shrunk by the walkable margin.
  polygon: CsgPolygon,
  /// The plane of the expanded face.
  plane: Plane,
}

impl WalkableFace {
  fn is_coplanar_with(&self, other: &WalkableFace) -> bool {
    self.plane.normal.dot(other.plane.normal) >= 1.0 - COPLANAR_TOLERANCE
      && (self.plane.distance - other.plane.distance).abs()
        <= COPLANAR_TOLERANCE
  }
}

/// A terrain taking part in generation.
struct Surface {
  name: String,
  heightfield: Heightfield,
}

impl NavMeshGenerator {
  pub fn new(config: NavMeshConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &NavMeshConfig {
    &self.config
  }

  /// Generates the navigation mesh of `world`. Any object that cannot be
  /// adapted aborts the whole generation.
  pub fn generate(&self, world: &AIWorld) -> Result<NavMesh, GenerationError> {
    let start_time = Instant::now();

    let mut polyhedrons = Vec::new();
    let mut surfaces = Vec::new();
    for object in world.objects.iter() {
      match object.shape.adapt(&object.name, &object.transform)? {
        AdaptedShape::Solid(polyhedron) => polyhedrons.push(polyhedron),
        AdaptedShape::Surface(heightfield) => {
          surfaces.push(Surface { name: object.name.clone(), heightfield })
        }
      }
    }

    let expanded_polyhedrons = polyhedrons
      .iter()
      .map(|polyhedron| polyhedron.expand(&self.config.agent))
      .collect::<Vec<_>>();
    let walkable_faces =
      find_walkable_faces(&expanded_polyhedrons, self.config.max_slope);

    let flattened_faces = walkable_faces
      .iter()
      .filter_map(|&face| flatten_face(&expanded_polyhedrons, face))
      .collect::<Vec<_>>();

    let mut nav_polygons = Vec::new();
    for (index, face) in flattened_faces.iter().enumerate() {
      nav_polygons.extend(self.generate_face_polygon(
        &expanded_polyhedrons,
        &flattened_faces[..index],
        face,
      ));
    }
    for surface in surfaces.iter() {
      nav_polygons.extend(
        self.generate_surface_polygon(&expanded_polyhedrons, surface),
      );
    }

    let nav_mesh = NavMesh::new(nav_polygons);
    log::info!(
      "Generated a nav mesh from {} objects ({} walkable faces, {} surfaces) \
       with {} polygons and {} triangles in {}ms.",
      world.objects.len(),
      walkable_faces.len(),
      surfaces.len(),
      nav_mesh.polygons().len(),
      nav_mesh.triangle_count(),
      start_time.elapsed().as_millis()
    );
    Ok(nav_mesh)
  }

  /// Creates the walkable polygon of a face, with every other polyhedron
  /// crossing the face's plane cut out of it. Coplanar faces in
  /// `earlier_faces` already cover where they overlap this face, so they are
  /// cut out too and the two polygons meet along an edge.
  fn generate_face_polygon(
    &self,
    expanded_polyhedrons: &[Polyhedron],
    earlier_faces: &[WalkableFace],
    face: &WalkableFace,
  ) -> Option<NavPolygon> {
    let polyhedron_index = face.face.polyhedron_index;
    let mut footprints = Vec::new();
    for (index, obstacle) in expanded_polyhedrons.iter().enumerate() {
      if index == polyhedron_index {
        continue;
      }
      let crossings = plane_crossings(&face.plane, obstacle);
      if crossings.len() < 3 {
        continue;
      }
      let footprint = CsgPolygon::from_convex_hull(&obstacle.name, &crossings);
      footprints.extend(footprint.intersection(&face.polygon));
    }
    for other in earlier_faces.iter() {
      if other.face.polyhedron_index != polyhedron_index
        && other.is_coplanar_with(face)
      {
        footprints.extend(other.polygon.intersection(&face.polygon));
      }
    }

    // The surface the agent stands on, rather than the one its center moves
    // on.
    let normal = face.plane.normal;
    let plane = Plane {
      normal,
      distance: face.plane.distance
        - self.config.agent.compute_expand_distance(normal),
    };
    self.build_polygon(
      &face.polygon,
      &footprints,
      |point_xz| plane.height_at(point_xz),
      None,
    )
  }

  /// Creates the walkable polygon of a terrain. Squares too steep to walk on
  /// and polyhedrons standing on the terrain are cut out of it.
  fn generate_surface_polygon(
    &self,
    expanded_polyhedrons: &[Polyhedron],
    surface: &Surface,
  ) -> Option<NavPolygon> {
    let heightfield = &surface.heightfield;
    let (min, max) = heightfield.xz_bounds();
    let outline = CsgPolygon::from_float_points(
      &surface.name,
      &[
        Vec2::new(min.x, -min.y),
        Vec2::new(max.x, -min.y),
        Vec2::new(max.x, -max.y),
        Vec2::new(min.x, -max.y),
      ],
    )
    .expand(-WALKABLE_MARGIN);
    if !outline.is_valid() {
      return None;
    }

    let mut footprints = Vec::new();
    for z_index in 0..heightfield.z_len() - 1 {
      for x_index in 0..heightfield.x_len() - 1 {
        let triangles = heightfield.square_triangles(x_index, z_index);
        let is_steep = triangles.iter().any(|&[a, b, c]| {
          let normal = (b - a).cross(c - a).normalize_or_zero();
          normal.y.abs().clamp(0.0, 1.0).acos() >= self.config.max_slope
        });
        if !is_steep {
          continue;
        }
        let square = [
          heightfield.point(x_index, z_index),
          heightfield.point(x_index + 1, z_index),
          heightfield.point(x_index + 1, z_index + 1),
          heightfield.point(x_index, z_index + 1),
        ]
        .map(flatten);
        footprints.extend(
          CsgPolygon::from_float_points(&surface.name, &square)
            .intersection(&outline),
        );
      }
    }

    let (min_height, max_height) = heightfield.height_range();
    let max_height = max_height + self.config.agent.height * 0.5;
    for obstacle in expanded_polyhedrons.iter() {
      let Some(bounds) = obstacle.bounds() else {
        continue;
      };
      if bounds.max.y < min_height || bounds.min.y > max_height {
        continue;
      }
      let points = obstacle
        .points
        .iter()
        .map(|point| to_integer_point(flatten(point.point)))
        .collect::<Vec<_>>();
      footprints.extend(
        CsgPolygon::from_convex_hull(&obstacle.name, &points)
          .intersection(&outline),
      );
    }

    let topography: Arc<dyn NavTopography> =
      Arc::new(TerrainTopography::new(heightfield.clone()));
    self.build_polygon(
      &outline,
      &footprints,
      |point_xz| Some(heightfield.height_at(point_xz)),
      Some(topography),
    )
  }

  /// Cuts `footprints` out of `walkable_polygon`, triangulates what remains,
  /// and lifts the triangles to the heights given by `height_at`.
  fn build_polygon(
    &self,
    walkable_polygon: &CsgPolygon,
    footprints: &[CsgPolygon],
    height_at: impl Fn(Vec2) -> Option<f32>,
    topography: Option<Arc<dyn NavTopography>>,
  ) -> Option<NavPolygon> {
    let name = walkable_polygon.name();
    let holes = CsgPolygon::union_all(footprints);
    let hole_area = holes.iter().map(CsgPolygon::compute_area).sum::<f64>();
    if hole_area + AREA_TOLERANCE >= walkable_polygon.compute_area() {
      log::debug!("Skipped a fully obstructed polygon of \"{name}\".");
      return None;
    }
    log::debug!("Cutting {} holes from \"{name}\".", holes.len());

    let mut points = Vec::new();
    let mut triangles = Vec::new();
    for (outline, inner_holes) in walkable_polygon.difference(&holes) {
      let mut ccw_points = outline.float_points();
      ccw_points.reverse();
      let mut triangulation = Triangulation::new(ccw_points);
      for hole in inner_holes.iter() {
        triangulation.add_hole_points(hole.float_points());
      }

      let offset = points.len();
      for &point in triangulation.all_points() {
        let point_xz = Vec2::new(point.x, -point.y);
        let Some(height) = height_at(point_xz) else {
          log::warn!("Skipped a vertical walkable polygon of \"{name}\".");
          return None;
        };
        points.push(Vec3::new(point_xz.x, height, point_xz.y));
      }
      triangles.extend(
        triangulation
          .triangulate()
          .into_iter()
          .map(|triangle| triangle.map(|index| index + offset)),
      );
    }

    if triangles.is_empty() {
      return None;
    }
    Some(NavPolygon::new(name, points, triangles, topography))
  }
}

/// Flattens a world point onto the plane used for polygon operations, where
/// counter-clockwise viewed from above stays counter-clockwise.
fn flatten(point: Vec3) -> Vec2 {
  let point_xz = xz(point);
  Vec2::new(point_xz.x, -point_xz.y)
}

/// Flattens a walkable face and shrinks it by the walkable margin. Returns
/// `None` for faces too small to walk on.
fn flatten_face(
  expanded_polyhedrons: &[Polyhedron],
  face: PolyhedronFaceIndex,
) -> Option<WalkableFace> {
  let polyhedron = &expanded_polyhedrons[face.polyhedron_index];
  let flattened_points = polyhedron
    .face_points(face.face_index)
    .map(flatten)
    .collect::<Vec<_>>();
  let polygon =
    CsgPolygon::from_float_points(&polyhedron.name, &flattened_points)
      .expand(-WALKABLE_MARGIN);
  if !polygon.is_valid() {
    log::debug!(
      "Skipped face {} of \"{}\": too small to walk on.",
      face.face_index,
      polyhedron.name
    );
    return None;
  }
  Some(WalkableFace {
    face,
    polygon,
    plane: polyhedron.face_plane(face.face_index),
  })
}

/// Finds where the edges of `polyhedron` cross `plane`, flattened to integer
/// points.
fn plane_crossings(plane: &Plane, polyhedron: &Polyhedron) -> Vec<I64Vec2> {
  polyhedron
    .edges()
    .filter_map(|(start, end)| {
      let start_distance = plane.signed_distance(start);
      let end_distance = plane.signed_distance(end);
      let crosses = (start_distance > 0.0 && end_distance < 0.0)
        || (start_distance < 0.0 && end_distance > 0.0);
      if !crosses {
        return None;
      }
      let t = start_distance / (start_distance - end_distance);
      Some(to_integer_point(flatten(start + (end - start) * t)))
    })
    .collect()
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod test;
