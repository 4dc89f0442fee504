/// Scene sessions: one per viewed model URL
///
/// A session exclusively owns the camera, orbit controls, rasterizer buffers
/// and (once loaded) the mesh, and exposes an explicit teardown contract so
/// no render surface or mesh outlives its owner.
use nalgebra::Matrix4;
use tracing::info;

use mv3d_core::{Aabb, Camera, Mesh};

use crate::controls::OrbitControls;
use crate::renderer::AsciiRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Session constructed, mesh fetch in flight
    Loading,
    /// Mesh attached and framed
    Ready,
    /// Torn down; owns no live resources
    Disposed,
}

pub struct SceneSession {
    url: String,
    generation: u64,
    state: SceneState,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub renderer: AsciiRenderer,
    mesh: Option<Mesh>,
}

impl SceneSession {
    pub fn new(url: String, generation: u64, width: usize, height: usize) -> Self {
        Self {
            url,
            generation,
            state: SceneState::Loading,
            camera: Camera::new(width as u32, height as u32),
            controls: OrbitControls::new(),
            renderer: AsciiRenderer::new(width, height),
            mesh: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Attach a parsed mesh: recenter it at the origin, frame the camera to
    /// its bounding box, and hand the framing to the orbit controls.
    pub fn attach_mesh(&mut self, mut mesh: Mesh) {
        if self.state == SceneState::Disposed {
            return;
        }

        mesh.recenter();
        if let Some(bounds) = Aabb::from_mesh(&mesh) {
            self.camera.frame_bounds(&bounds);
            info!(
                "framed mesh: {} triangles, max dimension {:.3}",
                mesh.triangle_count(),
                bounds.max_dimension()
            );
        }
        self.controls.sync_to_camera(&self.camera);
        self.mesh = Some(mesh);
        self.state = SceneState::Ready;
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.renderer.resize(width, height);
        self.camera.set_aspect(width as u32, height as u32);
    }

    /// Advance one frame: apply damped control motion
    pub fn update(&mut self) {
        self.controls.update(&mut self.camera);
    }

    /// Rasterize the current mesh into the renderer buffers
    pub fn render_frame(&mut self) {
        self.renderer.clear();
        if let Some(mesh) = &self.mesh {
            self.renderer
                .render_mesh(mesh, &Matrix4::identity(), &self.camera);
        }
    }

    /// Release the mesh and render buffers. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == SceneState::Disposed {
            return;
        }
        self.mesh = None;
        self.renderer.clear();
        self.state = SceneState::Disposed;
    }
}

impl Drop for SceneSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_loading_without_mesh() {
        let session = SceneSession::new("http://host/models/a.stl".into(), 1, 80, 40);
        assert_eq!(session.state(), SceneState::Loading);
        assert!(session.mesh().is_none());
    }

    #[test]
    fn attach_mesh_frames_and_recenters() {
        let mut session = SceneSession::new("u".into(), 1, 80, 40);
        session.attach_mesh(Mesh::cube(2.0));

        assert_eq!(session.state(), SceneState::Ready);
        let mesh = session.mesh().unwrap();
        let bounds = Aabb::from_mesh(mesh).unwrap();
        assert!(bounds.center().coords.norm() < 1e-5);

        let expected = session.camera.fit_distance(bounds.max_dimension()) * 2.0;
        let actual = (session.camera.position - session.camera.target).norm();
        assert!((actual - expected).abs() < 1e-4);
    }

    #[test]
    fn teardown_is_idempotent_and_releases_mesh() {
        let mut session = SceneSession::new("u".into(), 1, 80, 40);
        session.attach_mesh(Mesh::cube(2.0));

        session.teardown();
        assert_eq!(session.state(), SceneState::Disposed);
        assert!(session.mesh().is_none());

        session.teardown();
        assert_eq!(session.state(), SceneState::Disposed);
    }

    #[test]
    fn disposed_session_ignores_late_mesh() {
        let mut session = SceneSession::new("u".into(), 1, 80, 40);
        session.teardown();
        session.attach_mesh(Mesh::cube(2.0));
        assert!(session.mesh().is_none());
    }

    #[test]
    fn empty_mesh_leaves_default_framing() {
        let mut session = SceneSession::new("u".into(), 1, 80, 40);
        let before = session.camera.position;
        session.attach_mesh(Mesh::new());
        assert_eq!(session.state(), SceneState::Ready);
        // No bounds to frame, camera orbit home stays put
        let after = session.camera.position;
        assert!((after - before).norm() < 1e-4);
    }
}
