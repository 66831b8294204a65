use glam::{Vec2, Vec3};

use crate::{
  generator::GenerationError, polytope::Polyhedron, util::Transform,
};

/// One of the three axes of a shape's own space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Axis {
  X,
  #[default]
  Y,
  Z,
}

impl Axis {
  fn index(self) -> usize {
    match self {
      Self::X => 0,
      Self::Y => 1,
      Self::Z => 2,
    }
  }
}

/// The native shape of a world object, in the object's own space.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
  /// A box centered on the origin.
  Box { half_size: Vec3 },
  /// A cylinder of `cylinder_height` capped by two half spheres.
  Capsule { radius: f32, cylinder_height: f32, axis: Axis },
  /// A cone with its base and tip along `axis`.
  Cone { radius: f32, height: f32, axis: Axis },
  /// A convex solid. Triangles are counter-clockwise when viewed from
  /// outside.
  ConvexHull { points: Vec<Vec3>, triangles: Vec<[usize; 3]> },
  Cylinder { radius: f32, height: f32, axis: Axis },
  Sphere { radius: f32 },
  /// A regular grid of heights, centered on the origin. `heights` holds
  /// `x_len * z_len` values, with X varying fastest.
  Terrain { x_len: usize, z_len: usize, spacing: f32, heights: Vec<f32> },
}

/// What a shape becomes for navigation generation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum AdaptedShape {
  Solid(Polyhedron),
  Surface(Heightfield),
}

// Faces of every box-like solid: right, left, top, bottom, front, back. Face
// `i` faces along axis `i / 2`, positively for even `i`.
const BOX_FACES: [[usize; 4]; 6] = [
  [0, 2, 3, 1],
  [4, 5, 7, 6],
  [0, 1, 5, 4],
  [3, 2, 6, 7],
  [0, 4, 6, 2],
  [1, 3, 7, 5],
];

// Corner signs in the order +++, ++-, +-+, +--, -++, -+-, --+, ---.
const BOX_CORNERS: [[f32; 3]; 8] = [
  [1.0, 1.0, 1.0],
  [1.0, 1.0, -1.0],
  [1.0, -1.0, 1.0],
  [1.0, -1.0, -1.0],
  [-1.0, 1.0, 1.0],
  [-1.0, 1.0, -1.0],
  [-1.0, -1.0, 1.0],
  [-1.0, -1.0, -1.0],
];

enum BoxWalkability {
  AllFaces,
  AxisFaces(Axis),
  NoFaces,
}

impl Shape {
  /// Converts the shape into a form that navigation can be generated from.
  pub(crate) fn adapt(
    &self,
    name: &str,
    transform: &Transform,
  ) -> Result<AdaptedShape, GenerationError> {
    let malformed = |reason: &str| GenerationError::MalformedShape {
      object: name.to_string(),
      reason: reason.to_string(),
    };

    let solid = match self {
      &Shape::Box { half_size } => {
        if !is_positive_vec(half_size) {
          return Err(malformed("box half sizes must be positive"));
        }
        oriented_box(name, half_size, transform, BoxWalkability::AllFaces)
      }
      &Shape::Capsule { radius, cylinder_height, axis } => {
        if !is_positive(radius)
          || !cylinder_height.is_finite()
          || cylinder_height < 0.0
        {
          return Err(malformed(
            "capsule radius must be positive and its height non-negative",
          ));
        }
        let mut half_size = Vec3::splat(radius);
        half_size[axis.index()] += cylinder_height * 0.5;
        oriented_box(name, half_size, transform, BoxWalkability::NoFaces)
      }
      &Shape::Cone { radius, height, axis } => {
        if !is_positive(radius) || !is_positive(height) {
          return Err(malformed("cone radius and height must be positive"));
        }
        let mut half_size = Vec3::splat(radius);
        half_size[axis.index()] = height * 0.5;
        oriented_box(name, half_size, transform, BoxWalkability::NoFaces)
      }
      Shape::ConvexHull { points, triangles } => {
        convex_hull(name, points, triangles, transform).map_err(malformed)?
      }
      &Shape::Cylinder { radius, height, axis } => {
        if !is_positive(radius) || !is_positive(height) {
          return Err(malformed("cylinder radius and height must be positive"));
        }
        let mut half_size = Vec3::splat(radius);
        half_size[axis.index()] = height * 0.5;
        oriented_box(
          name,
          half_size,
          transform,
          BoxWalkability::AxisFaces(axis),
        )
      }
      &Shape::Sphere { radius } => {
        if !is_positive(radius) {
          return Err(malformed("sphere radius must be positive"));
        }
        oriented_box(
          name,
          Vec3::splat(radius),
          transform,
          BoxWalkability::NoFaces,
        )
      }
      Shape::Terrain { x_len, z_len, spacing, heights } => {
        if !transform.has_identity_rotation() {
          return Err(GenerationError::UnsupportedShape {
            object: name.to_string(),
            reason: "terrains cannot be rotated".to_string(),
          });
        }
        let heightfield =
          Heightfield::new(*x_len, *z_len, *spacing, heights.clone(), transform)
            .map_err(malformed)?;
        return Ok(AdaptedShape::Surface(heightfield));
      }
    };
    Ok(AdaptedShape::Solid(solid))
  }
}

fn is_positive(value: f32) -> bool {
  value.is_finite() && value > 0.0
}

fn is_positive_vec(value: Vec3) -> bool {
  is_positive(value.x) && is_positive(value.y) && is_positive(value.z)
}

fn oriented_box(
  name: &str,
  half_size: Vec3,
  transform: &Transform,
  walkability: BoxWalkability,
) -> Polyhedron {
  let axes = [
    transform.apply_to_direction(Vec3::X),
    transform.apply_to_direction(Vec3::Y),
    transform.apply_to_direction(Vec3::Z),
  ];

  let points = BOX_CORNERS
    .iter()
    .map(|signs| {
      transform.translation
        + axes[0] * (signs[0] * half_size.x)
        + axes[1] * (signs[1] * half_size.y)
        + axes[2] * (signs[2] * half_size.z)
    })
    .collect();

  let faces = BOX_FACES
    .iter()
    .enumerate()
    .map(|(face_index, indices)| {
      let walkable = match walkability {
        BoxWalkability::AllFaces => true,
        BoxWalkability::AxisFaces(axis) => axis.index() == face_index / 2,
        BoxWalkability::NoFaces => false,
      };
      (indices.to_vec(), walkable)
    })
    .collect();

  let polyhedron_walkable = !matches!(walkability, BoxWalkability::NoFaces);
  Polyhedron::new(name.to_string(), points, faces, polyhedron_walkable)
}

fn convex_hull(
  name: &str,
  points: &[Vec3],
  triangles: &[[usize; 3]],
  transform: &Transform,
) -> Result<Polyhedron, &'static str> {
  if points.len() < 4 || triangles.len() < 4 {
    return Err("convex hulls need at least 4 points and 4 triangles");
  }
  if !points.iter().all(|point| point.is_finite()) {
    return Err("convex hull points must be finite");
  }
  if triangles.iter().flatten().any(|&index| index >= points.len()) {
    return Err("convex hull triangles reference missing points");
  }
  if triangles.iter().any(|[a, b, c]| a == b || b == c || a == c) {
    return Err("convex hull triangles must use distinct points");
  }

  let points = points.iter().map(|&point| transform.apply(point)).collect();
  let faces =
    triangles.iter().map(|triangle| (triangle.to_vec(), true)).collect();
  Ok(Polyhedron::new(name.to_string(), points, faces, true))
}

/// A world-space grid of heights.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightfield {
  /// The world position (with zero height) of the grid point at index
  /// (0, 0).
  origin: Vec3,
  x_len: usize,
  z_len: usize,
  spacing: f32,
  heights: Vec<f32>,
}

impl Heightfield {
  pub(crate) fn new(
    x_len: usize,
    z_len: usize,
    spacing: f32,
    heights: Vec<f32>,
    transform: &Transform,
  ) -> Result<Self, &'static str> {
    if x_len < 2 || z_len < 2 {
      return Err("terrains need at least 2 points along each axis");
    }
    if heights.len() != x_len * z_len {
      return Err("terrain heights do not match the grid size");
    }
    if !is_positive(spacing) || !heights.iter().all(|h| h.is_finite()) {
      return Err("terrain spacing must be positive and heights finite");
    }

    let half_extent = Vec3::new(
      (x_len - 1) as f32 * spacing * 0.5,
      0.0,
      (z_len - 1) as f32 * spacing * 0.5,
    );
    Ok(Self {
      origin: transform.translation - half_extent,
      x_len,
      z_len,
      spacing,
      heights,
    })
  }

  /// The number of grid points along X.
  pub fn x_len(&self) -> usize {
    self.x_len
  }

  /// The number of grid points along Z.
  pub fn z_len(&self) -> usize {
    self.z_len
  }

  /// The distance between neighbouring grid points.
  pub fn spacing(&self) -> f32 {
    self.spacing
  }

  /// The world position of the grid point at (`x_index`, `z_index`).
  pub fn point(&self, x_index: usize, z_index: usize) -> Vec3 {
    Vec3::new(
      self.origin.x + x_index as f32 * self.spacing,
      self.origin.y + self.heights[z_index * self.x_len + x_index],
      self.origin.z + z_index as f32 * self.spacing,
    )
  }

  /// The (X, Z) bounds of the grid as (min, max).
  pub fn xz_bounds(&self) -> (Vec2, Vec2) {
    let min = Vec2::new(self.origin.x, self.origin.z);
    let max = min
      + Vec2::new(
        (self.x_len - 1) as f32 * self.spacing,
        (self.z_len - 1) as f32 * self.spacing,
      );
    (min, max)
  }

  /// The lowest and highest world heights of the grid.
  pub fn height_range(&self) -> (f32, f32) {
    let (min, max) = self
      .heights
      .iter()
      .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &h| {
        (min.min(h), max.max(h))
      });
    (self.origin.y + min, self.origin.y + max)
  }

  /// The two triangles of the grid square whose lowest corner is
  /// (`x_index`, `z_index`). The square is split along the diagonal from
  /// (x + 1, z) to (x, z + 1).
  pub(crate) fn square_triangles(
    &self,
    x_index: usize,
    z_index: usize,
  ) -> [[Vec3; 3]; 2] {
    let p00 = self.point(x_index, z_index);
    let p10 = self.point(x_index + 1, z_index);
    let p01 = self.point(x_index, z_index + 1);
    let p11 = self.point(x_index + 1, z_index + 1);
    [[p00, p01, p10], [p10, p01, p11]]
  }

  /// The height of the surface at `point_xz`. Points outside the grid use the
  /// height of the nearest edge.
  pub fn height_at(&self, point_xz: Vec2) -> f32 {
    let local = (point_xz - Vec2::new(self.origin.x, self.origin.z))
      / self.spacing;
    let max_x = (self.x_len - 1) as f32;
    let max_z = (self.z_len - 1) as f32;
    let local = Vec2::new(local.x.clamp(0.0, max_x), local.y.clamp(0.0, max_z));

    let x_index = (local.x.floor() as usize).min(self.x_len - 2);
    let z_index = (local.y.floor() as usize).min(self.z_len - 2);
    let u = local.x - x_index as f32;
    let v = local.y - z_index as f32;

    let h = |x, z| self.heights[z * self.x_len + x];
    let h00 = h(x_index, z_index);
    let h10 = h(x_index + 1, z_index);
    let h01 = h(x_index, z_index + 1);
    let h11 = h(x_index + 1, z_index + 1);

    let height = if u + v <= 1.0 {
      h00 + u * (h10 - h00) + v * (h01 - h00)
    } else {
      h11 + (1.0 - u) * (h01 - h11) + (1.0 - v) * (h10 - h11)
    };
    self.origin.y + height
  }
}

#[cfg(test)]
#[path = "shape_test.rs"]
mod test;
