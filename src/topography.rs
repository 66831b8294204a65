use glam::Vec3;
use ord_subset::OrdSubsetSliceExt;

use crate::{geometry::xz, shape::Heightfield};

/// A surface that paths over a polygon must hug, instead of going in straight
/// lines between path points.
pub trait NavTopography: Send + Sync {
  /// Returns the points an agent passes going from `start` to `end` along
  /// the surface, including both ends.
  fn follow_topography(&self, start: Vec3, end: Vec3) -> Vec<Vec3>;
}

/// Follows the heights of a terrain.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainTopography {
  heightfield: Heightfield,
}

impl TerrainTopography {
  pub fn new(heightfield: Heightfield) -> Self {
    Self { heightfield }
  }
}

impl NavTopography for TerrainTopography {
  fn follow_topography(&self, start: Vec3, end: Vec3) -> Vec<Vec3> {
    let (min, _) = self.heightfield.xz_bounds();
    let spacing = self.heightfield.spacing();
    let start_xz = xz(start);
    let delta = xz(end) - start_xz;

    // Fractions along the segment where it crosses a grid line.
    let mut crossings = Vec::new();
    let mut add_crossings = |start: f32, delta: f32, min: f32, len: usize| {
      if delta.abs() <= f32::EPSILON {
        return;
      }
      for line in 0..len {
        let t = (min + line as f32 * spacing - start) / delta;
        if t > 0.0 && t < 1.0 {
          crossings.push(t);
        }
      }
    };
    add_crossings(start_xz.x, delta.x, min.x, self.heightfield.x_len());
    add_crossings(start_xz.y, delta.y, min.y, self.heightfield.z_len());
    crossings.ord_subset_sort();
    crossings.dedup_by(|a, b| (*a - *b).abs() <= 1e-6);

    let mut points = Vec::with_capacity(crossings.len() + 2);
    points.push(start);
    for t in crossings {
      let point_xz = start_xz + delta * t;
      points.push(Vec3::new(
        point_xz.x,
        self.heightfield.height_at(point_xz),
        point_xz.y,
      ));
    }
    points.push(end);
    points
  }
}

#[cfg(test)]
#[path = "topography_test.rs"]
mod test;
