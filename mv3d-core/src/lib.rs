/// MV3D Core Library - Shared mesh and camera logic
///
/// This library provides the stateless core functionality for the MV3D
/// system: STL parsing, mesh geometry and bounding boxes, camera framing,
/// and Wavefront OBJ export.

pub mod bounds;
pub mod camera;
pub mod geometry;
pub mod obj;
pub mod stl;

// Re-export commonly used types
pub use bounds::Aabb;
pub use camera::Camera;
pub use geometry::{Mesh, Triangle, Vertex};
