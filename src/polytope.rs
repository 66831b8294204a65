use glam::Vec3;

use crate::{
  geometry::{intersect_planes, Plane},
  util::BoundingBox,
  NavMeshAgent,
};

/// A point of a polyhedron.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyhedronPoint {
  /// The position of the point.
  pub point: Vec3,
  /// The indices of the faces that touch this point.
  pub face_indices: Vec<usize>,
}

/// A planar face of a polyhedron.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyhedronFace {
  /// The indices of the face's points, counter-clockwise when viewed from
  /// outside the polyhedron.
  pub ccw_point_indices: Vec<usize>,
  /// The outward unit normal of the face.
  pub normal: Vec3,
  /// Whether the shape allows this face to be walked on at all.
  pub walkable_candidate: bool,
  /// The angle between the normal and the up direction. 0 for a floor, PI for
  /// a ceiling.
  pub angle_to_horizontal: f32,
}

impl PolyhedronFace {
  fn new(
    ccw_point_indices: Vec<usize>,
    points: &[Vec3],
    walkable_candidate: bool,
  ) -> Self {
    let point_0 = points[ccw_point_indices[0]];
    let point_1 = points[ccw_point_indices[1]];
    let point_2 = points[ccw_point_indices[2]];
    let normal =
      (point_1 - point_0).cross(point_2 - point_0).normalize_or_zero();
    Self {
      ccw_point_indices,
      normal,
      walkable_candidate,
      angle_to_horizontal: normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos(),
    }
  }
}

/// A convex solid made of planar faces.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyhedron {
  /// The name of the object this polyhedron was created from.
  pub name: String,
  /// The faces of the polyhedron.
  pub faces: Vec<PolyhedronFace>,
  /// The points of the polyhedron.
  pub points: Vec<PolyhedronPoint>,
  /// Whether any face of this polyhedron may be walked on.
  pub walkable_candidate: bool,
}

/// Identifies a face within a list of polyhedrons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PolyhedronFaceIndex {
  /// The index of the polyhedron.
  pub polyhedron_index: usize,
  /// The index of the face within the polyhedron.
  pub face_index: usize,
}

impl Polyhedron {
  /// Creates a polyhedron from its points and its faces. Each face is a list
  /// of point indices (counter-clockwise from outside) and whether the face
  /// is a walkable candidate.
  pub(crate) fn new(
    name: String,
    points: Vec<Vec3>,
    faces: Vec<(Vec<usize>, bool)>,
    walkable_candidate: bool,
  ) -> Self {
    let faces = faces
      .into_iter()
      .map(|(indices, walkable)| {
        PolyhedronFace::new(indices, &points, walkable)
      })
      .collect::<Vec<_>>();

    let mut polyhedron_points = points
      .into_iter()
      .map(|point| PolyhedronPoint { point, face_indices: vec![] })
      .collect::<Vec<_>>();
    for (face_index, face) in faces.iter().enumerate() {
      for &point_index in face.ccw_point_indices.iter() {
        let face_indices = &mut polyhedron_points[point_index].face_indices;
        if !face_indices.contains(&face_index) {
          face_indices.push(face_index);
        }
      }
    }

    Self { name, faces, points: polyhedron_points, walkable_candidate }
  }

  /// The positions of the points of the face at `face_index`, in order.
  pub(crate) fn face_points(
    &self,
    face_index: usize,
  ) -> impl Iterator<Item = Vec3> + '_ {
    self.faces[face_index]
      .ccw_point_indices
      .iter()
      .map(|&index| self.points[index].point)
  }

  /// The plane containing the face at `face_index`.
  pub(crate) fn face_plane(&self, face_index: usize) -> Plane {
    let face = &self.faces[face_index];
    let point = self.points[face.ccw_point_indices[0]].point;
    Plane { normal: face.normal, distance: face.normal.dot(point) }
  }

  /// Every edge of the polyhedron once per face that owns it.
  pub(crate) fn edges(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
    self.faces.iter().flat_map(move |face| {
      let indices = &face.ccw_point_indices;
      (0..indices.len()).map(move |i| {
        (
          self.points[indices[i]].point,
          self.points[indices[(i + 1) % indices.len()]].point,
        )
      })
    })
  }

  /// The box around every point. `None` for a polyhedron with no points.
  pub(crate) fn bounds(&self) -> Option<BoundingBox> {
    BoundingBox::around(self.points.iter().map(|point| point.point))
  }

  /// Grows the polyhedron so that the agent can be treated as a point. Every
  /// face plane moves outward by the agent's support distance along its
  /// normal, and each point becomes the meeting point of its three most
  /// independent planes.
  pub fn expand(&self, agent: &NavMeshAgent) -> Polyhedron {
    let planes = self
      .faces
      .iter()
      .enumerate()
      .map(|(face_index, face)| {
        let plane = self.face_plane(face_index);
        Plane {
          normal: plane.normal,
          distance: plane.distance + agent.compute_expand_distance(face.normal),
        }
      })
      .collect::<Vec<_>>();

    let points = self
      .points
      .iter()
      .map(|point| PolyhedronPoint {
        point: expand_point(point, &planes, self, agent),
        face_indices: point.face_indices.clone(),
      })
      .collect();

    Polyhedron {
      name: self.name.clone(),
      faces: self.faces.clone(),
      points,
      walkable_candidate: self.walkable_candidate,
    }
  }
}

fn expand_point(
  point: &PolyhedronPoint,
  expanded_planes: &[Plane],
  polyhedron: &Polyhedron,
  agent: &NavMeshAgent,
) -> Vec3 {
  let faces = &point.face_indices;
  let mut best: Option<(Vec3, f32)> = None;
  for i in 0..faces.len() {
    for j in (i + 1)..faces.len() {
      for k in (j + 1)..faces.len() {
        let Some((candidate, determinant)) = intersect_planes(
          &expanded_planes[faces[i]],
          &expanded_planes[faces[j]],
          &expanded_planes[faces[k]],
        ) else {
          continue;
        };
        if best.map_or(true, |(_, best_determinant)| {
          determinant > best_determinant
        }) {
          best = Some((candidate, determinant));
        }
      }
    }
  }

  if let Some((expanded, _)) = best {
    return expanded;
  }

  // Too few independent faces: push along the averaged normal.
  let normal = faces
    .iter()
    .map(|&face_index| polyhedron.faces[face_index].normal)
    .sum::<Vec3>()
    .normalize_or_zero();
  point.point + normal * agent.compute_expand_distance(normal)
}

/// Finds the faces that an agent can walk on: the polyhedron and the face are
/// both walkable candidates, and the face is less steep than `max_slope`.
pub fn find_walkable_faces(
  polyhedrons: &[Polyhedron],
  max_slope: f32,
) -> Vec<PolyhedronFaceIndex> {
  let mut walkable_faces = Vec::new();
  for (polyhedron_index, polyhedron) in polyhedrons.iter().enumerate() {
    if !polyhedron.walkable_candidate {
      continue;
    }
    for (face_index, face) in polyhedron.faces.iter().enumerate() {
      if face.walkable_candidate && face.angle_to_horizontal.abs() < max_slope
      {
        walkable_faces
          .push(PolyhedronFaceIndex { polyhedron_index, face_index });
      }
    }
  }
  walkable_faces
}

#[cfg(test)]
#[path = "polytope_test.rs"]
mod test;
