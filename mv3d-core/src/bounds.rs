/// Axis-aligned bounding boxes for camera framing
use nalgebra::{Point3, Vector3};

use crate::geometry::Mesh;

/// Minimal axis-aligned box containing a set of points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    /// Compute the bounding box of every vertex in a mesh.
    ///
    /// Returns `None` for a mesh with no triangles.
    pub fn from_mesh(mesh: &Mesh) -> Option<Self> {
        let mut positions = mesh.positions();
        let first = positions.next()?;
        let mut min = *first;
        let mut max = *first;

        for p in positions {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Largest extent along any axis, used to frame the camera
    pub fn max_dimension(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Triangle, Vertex};

    #[test]
    fn bounds_of_cube() {
        let cube = Mesh::cube(2.0);
        let bounds = Aabb::from_mesh(&cube).unwrap();
        assert!((bounds.min - Point3::new(-1.0, -1.0, -1.0)).norm() < 1e-6);
        assert!((bounds.max - Point3::new(1.0, 1.0, 1.0)).norm() < 1e-6);
        assert!(bounds.center().coords.norm() < 1e-6);
        assert!((bounds.max_dimension() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(Aabb::from_mesh(&Mesh::new()).is_none());
    }

    #[test]
    fn max_dimension_picks_longest_axis() {
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(
            Vertex::from_coords(0.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            Vertex::from_coords(10.0, 1.0, 0.0, 0.0, 0.0, 1.0),
            Vertex::from_coords(0.0, 2.0, 3.0, 0.0, 0.0, 1.0),
        ));
        let bounds = Aabb::from_mesh(&mesh).unwrap();
        assert!((bounds.max_dimension() - 10.0).abs() < 1e-6);
    }
}
