/// Geometry primitives for 3D model viewing
use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }

    pub fn from_coords(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self::new(Point3::new(x, y, z), Vector3::new(nx, ny, nz))
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's winding order
    pub fn face_normal(&self) -> Vector3<f32> {
        let [v0, v1, v2] = &self.vertices;
        let edge1 = v1.position - v0.position;
        let edge2 = v2.position - v0.position;
        edge1.cross(&edge2).normalize()
    }
}

/// A triangle-soup mesh, as produced by STL parsing
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Iterate over every vertex position in the mesh
    pub fn positions(&self) -> impl Iterator<Item = &Point3<f32>> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| &v.position))
    }

    /// Translate every vertex so the bounding-box center lands at the origin.
    ///
    /// Returns the applied offset, or `None` for an empty mesh.
    pub fn recenter(&mut self) -> Option<Vector3<f32>> {
        let bounds = Aabb::from_mesh(self)?;
        let offset = bounds.center().coords;
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position -= offset;
            }
        }
        Some(offset)
    }

    /// Create an axis-aligned cube mesh, used as a placeholder and in tests
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let mut mesh = Self::with_capacity(12);

        // Each face is two triangles sharing the face normal
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            // normal, corners in counter-clockwise order
            (
                [0.0, 0.0, 1.0],
                [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
            ),
            (
                [0.0, 0.0, -1.0],
                [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
            ),
            (
                [0.0, 1.0, 0.0],
                [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
            ),
            (
                [0.0, -1.0, 0.0],
                [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
            ),
            (
                [1.0, 0.0, 0.0],
                [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
            ),
            (
                [-1.0, 0.0, 0.0],
                [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
            ),
        ];

        for (normal, corners) in faces {
            let [nx, ny, nz] = normal;
            let v: Vec<Vertex> = corners
                .iter()
                .map(|&[x, y, z]| Vertex::from_coords(x, y, z, nx, ny, nz))
                .collect();
            mesh.add_triangle(Triangle::new(v[0], v[1], v[2]));
            mesh.add_triangle(Triangle::new(v[0], v[2], v[3]));
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_twelve_triangles() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.positions().count(), 36);
    }

    #[test]
    fn face_normal_matches_winding() {
        let triangle = Triangle::new(
            Vertex::from_coords(0.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            Vertex::from_coords(1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            Vertex::from_coords(0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
        );
        let normal = triangle.face_normal();
        assert!((normal - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn recenter_moves_box_center_to_origin() {
        let mut mesh = Mesh::cube(2.0);
        for triangle in &mut mesh.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position += Vector3::new(5.0, -3.0, 7.5);
            }
        }

        let offset = mesh.recenter().unwrap();
        assert!((offset - Vector3::new(5.0, -3.0, 7.5)).norm() < 1e-5);

        let bounds = Aabb::from_mesh(&mesh).unwrap();
        assert!(bounds.center().coords.norm() < 1e-5);
    }

    #[test]
    fn recenter_empty_mesh_is_none() {
        let mut mesh = Mesh::new();
        assert!(mesh.recenter().is_none());
    }
}
